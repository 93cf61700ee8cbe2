//! Immutable directed graph over stop ids, with per-edge duration and
//! distance. Grounded on `layers/road_network.rs`'s petgraph wrapper,
//! generalized from geometry-keyed OSM nodes located via an `RTree` to bare
//! stop ids (spec.md section 4.1) and loaded from a persisted JSON artifact
//! (spec.md section 6) rather than a SQLite OSM export.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::Path;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Route, StopId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub duration_s: f64,
    pub distance_m: f64,
}

/// Persisted on-disk shape of a road graph artifact (spec.md section 6):
/// a flat edge list, `(from, to, duration_seconds, distance_meters)`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoadGraphArtifact {
    pub edges: Vec<RoadGraphEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoadGraphEdge {
    pub from: u32,
    pub to: u32,
    pub duration_s: f64,
    pub distance_m: f64,
}

/// Immutable directed road network over stop ids.
pub struct RoadGraph {
    graph: DiGraph<StopId, EdgeWeight>,
    node_index: HashMap<StopId, NodeIndex>,
}

impl RoadGraph {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let artifact: RoadGraphArtifact = serde_json::from_str(&text)?;
        Ok(Self::from_artifact(artifact))
    }

    pub fn from_artifact(artifact: RoadGraphArtifact) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();

        let mut node_of = |graph: &mut DiGraph<StopId, EdgeWeight>,
                            node_index: &mut HashMap<StopId, NodeIndex>,
                            sid: StopId| {
            *node_index.entry(sid).or_insert_with(|| graph.add_node(sid))
        };

        for e in &artifact.edges {
            let from = node_of(&mut graph, &mut node_index, StopId(e.from));
            let to = node_of(&mut graph, &mut node_index, StopId(e.to));
            graph.add_edge(
                from,
                to,
                EdgeWeight {
                    duration_s: e.duration_s,
                    distance_m: e.distance_m,
                },
            );
        }

        RoadGraph { graph, node_index }
    }

    pub fn print_stats(&self) {
        log::info!(
            "road graph: {} stops, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
    }

    fn index_of(&self, sid: StopId) -> Option<NodeIndex> {
        self.node_index.get(&sid).copied()
    }

    /// Unordered set of stops with an edge into `s`.
    pub fn in_neighbors(&self, s: StopId) -> HashSet<StopId> {
        let Some(idx) = self.index_of(s) else {
            return HashSet::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n])
            .collect()
    }

    /// Unordered set of stops with an edge out of `s`.
    pub fn out_neighbors(&self, s: StopId) -> HashSet<StopId> {
        let Some(idx) = self.index_of(s) else {
            return HashSet::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect()
    }

    fn edge_index(&self, from: StopId, to: StopId) -> Option<EdgeIndex> {
        let from = self.index_of(from)?;
        let to = self.index_of(to)?;
        self.graph.find_edge(from, to)
    }

    /// The `(duration, distance)` of the direct edge `a -> b`, if one exists.
    pub fn edge(&self, a: StopId, b: StopId) -> Option<(f64, f64)> {
        let eidx = self.edge_index(a, b)?;
        let w = self.graph[eidx];
        Some((w.duration_s, w.distance_m))
    }

    /// Dijkstra shortest path from `o` to `d`, weighted by duration. Ties in
    /// the priority queue are broken by lower stop id (spec.md section
    /// 4.1). Returns an empty path when `d` is unreachable, or when either
    /// endpoint is absent from the graph.
    pub fn shortest_path(&self, o: StopId, d: StopId) -> Route {
        let (Some(start), Some(goal)) = (self.index_of(o), self.index_of(d)) else {
            return Vec::new();
        };
        if start == goal {
            return vec![o];
        }

        let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
        let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(start, 0.0);
        heap.push(HeapEntry {
            cost: 0.0,
            stop: o,
            node: start,
        });

        while let Some(HeapEntry { cost, node, .. }) = heap.pop() {
            if node == goal {
                return reconstruct_path(&self.graph, &prev, start, goal);
            }
            if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
                continue;
            }
            for edge in self.graph.edges(node) {
                let next = edge.target();
                let next_cost = cost + edge.weight().duration_s;
                if next_cost < *dist.get(&next).unwrap_or(&f64::INFINITY) {
                    dist.insert(next, next_cost);
                    prev.insert(next, node);
                    heap.push(HeapEntry {
                        cost: next_cost,
                        stop: self.graph[next],
                        node: next,
                    });
                }
            }
        }
        Vec::new()
    }
}

fn reconstruct_path(
    graph: &DiGraph<StopId, EdgeWeight>,
    prev: &HashMap<NodeIndex, NodeIndex>,
    start: NodeIndex,
    goal: NodeIndex,
) -> Route {
    let mut path = vec![graph[goal]];
    let mut cur = goal;
    while cur != start {
        let Some(&p) = prev.get(&cur) else {
            return Vec::new();
        };
        path.push(graph[p]);
        cur = p;
    }
    path.reverse();
    path
}

/// Min-heap entry ordered by cost ascending, tie-broken by lower stop id.
struct HeapEntry {
    cost: f64,
    stop: StopId,
    node: NodeIndex,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.stop == other.stop
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse cost ordering for a min-heap,
        // then break ties by lower stop id (also reversed).
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.stop.cmp(&self.stop))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
