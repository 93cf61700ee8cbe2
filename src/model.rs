//! Core identifiers shared by every layer: stops, routes, and the two
//! reserved role markers used inside a [`crate::routeset_graph::RouteSetGraph`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stop in the road network / transit routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub u32);

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StopId {
    fn from(v: u32) -> Self {
        StopId(v)
    }
}

/// Identifier of a route within one individual's [`crate::routeset_graph::RouteSetGraph`].
///
/// Non-negative values name an actual route; [`ORIGIN`] and [`DEST`] are
/// reserved markers for the two virtual vertex roles every stop carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub i64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual role marker: shortest-path source for a stop acting as an origin.
pub const ORIGIN: RouteId = RouteId(-1);
/// Virtual role marker: shortest-path target for a stop acting as a destination.
pub const DEST: RouteId = RouteId(-2);

impl RouteId {
    /// True for an actual route id (not [`ORIGIN`]/[`DEST`]).
    pub fn is_route(self) -> bool {
        self.0 >= 0
    }
}

/// An ordered, non-empty sequence of distinct stops forming a valid path
/// in the road graph.
pub type Route = Vec<StopId>;
