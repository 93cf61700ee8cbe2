use thiserror::Error;

use crate::model::{RouteId, StopId};

/// Crate-wide error type.
///
/// Variants correspond to the error kinds of spec.md section 7:
/// `InvalidInput` and `InvariantViolation` are fatal and propagate up to the
/// CLI; `Unreachable` is recovered locally by callers (the initial-routeset
/// builder and `big_mod` skip the affected pair; the fitness evaluator folds
/// it into unsatisfied demand); `CheckpointIO` is logged and does not abort
/// an optimization run.
#[derive(Error, Debug)]
pub enum Error {
    /// A stop referenced by the ODX/DS/road graph input is missing from one
    /// of the others, or a persisted artifact is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No path exists in the road graph between a requested origin and
    /// destination.
    #[error("no path from {from} to {to}")]
    Unreachable { from: StopId, to: StopId },
    /// A `RouteSetGraph` mutation would violate a structural invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// `stop_id` is not a member of `route_id`.
    #[error("stop {stop_id} is not a member of route {route_id}")]
    StopNotInRoute { stop_id: StopId, route_id: RouteId },
    /// `route_id` does not exist in this individual.
    #[error("route {0} does not exist")]
    UnknownRoute(RouteId),
    /// Checkpoint persistence failed. Non-fatal: optimization continues.
    #[error("checkpoint I/O failed: {0}")]
    CheckpointIO(String),
    /// Generic I/O failure reading a config or artifact file.
    #[error("I/O error")]
    IO(#[from] std::io::Error),
    /// Malformed JSON artifact or config file.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("CSV error")]
    Csv(#[from] csv::Error),
    #[error("checkpoint encoding error")]
    Bincode(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, Error>;
