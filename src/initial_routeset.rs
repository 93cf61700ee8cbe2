//! Greedy construction of a starting set of routes before evolutionary
//! search begins. Grounded on `get_initial_routeset` in
//! `original_source/thesis/optimization/common.py`.

use std::collections::HashMap;

use crate::demand::{Ds, Odx};
use crate::model::{Route, StopId};
use crate::road_graph::RoadGraph;

/// Greedily builds `n_routes` routes: at each step, picks the `(o, d)` pair
/// with the largest remaining unsatisfied demand total, lays the shortest
/// path between them, then marks every pair dominated by that path
/// (spec.md section 4.4) as covered and decrements their totals.
///
/// `(o, d)` pairs with no path in `road_graph` are skipped and do not count
/// toward `n_routes`; a warning is logged for each one and the pair is
/// dropped from consideration so the loop cannot spin on it forever.
pub fn get_initial_routeset(
    n_routes: usize,
    road_graph: &RoadGraph,
    odx: &Odx,
    ds: &Ds,
) -> Vec<Route> {
    let mut totals: HashMap<(StopId, StopId), i64> = HashMap::new();
    let mut satisfied_by: HashMap<(StopId, StopId), Vec<(StopId, StopId)>> = HashMap::new();

    for &o in ds.origins() {
        for d in ds.get_dests(o) {
            let total = ds.get_ds_total(o, d).unwrap_or(0) as i64;
            totals.insert((o, d), total);
            for &(m, n) in ds.get_ds(o, d) {
                satisfied_by.entry((m, n)).or_default().push((o, d));
            }
        }
    }

    log::info!("generating initial route set with {n_routes} routes");

    let mut routes = Vec::with_capacity(n_routes);
    let mut newly_satisfied: Vec<(StopId, StopId)> = Vec::new();
    let mut attempts = 0usize;
    let max_attempts = n_routes.saturating_mul(8).max(64);

    while routes.len() < n_routes && attempts < max_attempts {
        attempts += 1;

        for &(m, n) in &newly_satisfied {
            let weight = odx.get_odx(m, n) as i64;
            if let Some(consumers) = satisfied_by.get(&(m, n)) {
                for &(o, d) in consumers {
                    if let Some(t) = totals.get_mut(&(o, d)) {
                        *t -= weight;
                    }
                }
            }
        }

        let Some(&(o, d)) = argmax_pair(&totals) else {
            break;
        };

        let path = road_graph.shortest_path(o, d);
        if path.is_empty() {
            log::error!("no path from {o} to {d}");
            totals.remove(&(o, d));
            newly_satisfied = Vec::new();
            continue;
        }

        newly_satisfied = ds.get_ds(o, d).to_vec();
        routes.push(path);
    }

    routes
}

/// Picks the `(o, d)` key with the largest value; ties broken by the
/// lexicographically smaller pair, for deterministic, reproducible runs.
fn argmax_pair(totals: &HashMap<(StopId, StopId), i64>) -> Option<&(StopId, StopId)> {
    totals
        .iter()
        .max_by(|(k1, v1), (k2, v2)| v1.cmp(v2).then_with(|| k2.cmp(k1)))
        .map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_graph::{RoadGraphArtifact, RoadGraphEdge};

    fn chain_graph() -> RoadGraph {
        RoadGraph::from_artifact(RoadGraphArtifact {
            edges: vec![
                RoadGraphEdge {
                    from: 1,
                    to: 2,
                    duration_s: 60.0,
                    distance_m: 100.0,
                },
                RoadGraphEdge {
                    from: 2,
                    to: 3,
                    duration_s: 60.0,
                    distance_m: 100.0,
                },
                RoadGraphEdge {
                    from: 10,
                    to: 11,
                    duration_s: 60.0,
                    distance_m: 100.0,
                },
            ],
        })
    }

    #[test]
    fn picks_highest_demand_pair_first() {
        let graph = chain_graph();
        let odx = Odx::from_table(HashMap::from([
            (StopId(1), HashMap::from([(StopId(3), 50)])),
            (StopId(10), HashMap::from([(StopId(11), 5)])),
        ]));
        let ds_table = HashMap::from([
            (
                StopId(1),
                HashMap::from([(StopId(3), vec![(StopId(1), StopId(3))])]),
            ),
            (
                StopId(10),
                HashMap::from([(StopId(11), vec![(StopId(10), StopId(11))])]),
            ),
        ]);
        let ds = Ds::from_parts(ds_table, &odx);

        let routes = get_initial_routeset(1, &graph, &odx, &ds);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0], vec![StopId(1), StopId(2), StopId(3)]);
    }

    #[test]
    fn unreachable_pair_is_skipped_and_does_not_loop_forever() {
        let graph = chain_graph();
        let odx = Odx::from_table(HashMap::from([(
            StopId(3),
            HashMap::from([(StopId(1), 50)]),
        )]));
        let ds_table = HashMap::from([(
            StopId(3),
            HashMap::from([(StopId(1), vec![(StopId(3), StopId(1))])]),
        )]);
        let ds = Ds::from_parts(ds_table, &odx);

        let routes = get_initial_routeset(2, &graph, &odx, &ds);
        assert!(routes.is_empty());
    }
}
