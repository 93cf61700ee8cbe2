//! The central mutable structure of one candidate solution: a directed
//! multigraph over three kinds of vertex per stop (origin, destination, and
//! one route vertex per route serving that stop), plus the objective
//! function computed over it.
//!
//! Grounded on `original_source/thesis/optimization/routeset_graph.py`'s
//! `RouteSetGraph` class. The original builds this graph with `graph_tool`,
//! whose `remove_vertex` reuses the highest-indexed vertex to fill the hole
//! left behind, forcing `_update_last_node_references` to manually patch
//! every directory entry pointing at that vertex before each removal. This
//! port instead uses [`petgraph::stable_graph::StableDiGraph`], whose
//! `NodeIndex` values stay valid across removals, so that bookkeeping has no
//! counterpart here; `stops`/the per-stop vertex directory are kept for the
//! same reason as the original (translating a stop id and role to a graph
//! vertex), not to work around index reuse.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::demand::{Durations, Odx};
use crate::error::{Error, Result};
use crate::model::{Route, RouteId, StopId, DEST, ORIGIN};

/// Label carried by every graph vertex: which stop it represents, and in
/// which role (`ORIGIN`, `DEST`, or an actual route id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct NodeLabel {
    stop_id: StopId,
    role: RouteId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RouteNode {
    stop_seq: usize,
    vertex: NodeIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StopEntry {
    origin: NodeIndex,
    dest: NodeIndex,
    route_nodes: HashMap<RouteId, RouteNode>,
}

/// One mutation applied to a [`RouteSetGraph`], recorded only when the
/// `history` feature is enabled, so it never affects observable behavior.
#[cfg(feature = "history")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
    AppendStop { stop_id: StopId, route_id: RouteId },
    PrependStop { stop_id: StopId, route_id: RouteId },
    AddRoute { route_id: RouteId },
    ReplaceRoute { route_id: RouteId },
    RemoveRoute { route_id: RouteId },
    RemoveNode { stop_id: StopId, route_id: RouteId },
}

/// Per-generation fitness breakdown, mirroring the `report` dict returned by
/// `RouteSetGraph._compute_fitness` in the original.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub nsatisfied_od_pairs: usize,
    pub nunsatisfied_od_pairs: usize,
    pub nsatisfied_stops: usize,
    pub nunsatisfied_stops: usize,
    pub satisfied_demand: u64,
    pub unsatisfied_demand: u64,
    pub average_travel_time_min: f64,
    pub transfers: HashMap<u32, u64>,
    pub no_path: usize,
    pub no_path_less_2_transfers: usize,
}

impl Report {
    pub fn satisfied_od_pairs_pct(&self) -> f64 {
        pct(self.nsatisfied_od_pairs, self.nunsatisfied_od_pairs)
    }

    pub fn satisfied_stops_pct(&self) -> f64 {
        pct(self.nsatisfied_stops, self.nunsatisfied_stops)
    }

    pub fn satisfied_demand_pct(&self) -> f64 {
        pct(self.satisfied_demand as usize, self.unsatisfied_demand as usize)
    }

    /// Demand-weighted mean number of transfers across satisfied trips.
    pub fn mean_transfers(&self) -> f64 {
        if self.satisfied_demand == 0 {
            return 0.0;
        }
        let weighted: u64 = self.transfers.iter().map(|(&n, &c)| n as u64 * c).sum();
        weighted as f64 / self.satisfied_demand as f64
    }
}

fn pct(satisfied: usize, unsatisfied: usize) -> f64 {
    let total = satisfied + unsatisfied;
    if total == 0 {
        return 0.0;
    }
    100.0 * satisfied as f64 / total as f64
}

/// One candidate solution: a set of bus routes and the multigraph derived
/// from them.
#[derive(Clone)]
pub struct RouteSetGraph {
    graph: StableDiGraph<NodeLabel, f64>,
    stops: HashMap<StopId, StopEntry>,
    routes: HashMap<RouteId, Route>,
    params: Parameters,
    durations: Arc<Durations>,
    routes_changed: bool,
    fitness: Option<f64>,
    report: Option<Report>,
    /// Mutation log keyed by route id, so crossover can swap a route's
    /// provenance along with the route itself.
    #[cfg(feature = "history")]
    history: HashMap<RouteId, Vec<HistoryEvent>>,
}

/// Durable, position-independent snapshot of a [`RouteSetGraph`] used for
/// checkpointing a population (spec.md section 6). Excludes `params` and
/// `durations`, which are process-wide and supplied again by the caller on
/// load, and the fitness cache, which is cheap to recompute.
#[derive(Serialize, Deserialize)]
pub struct RouteSetSnapshot {
    graph: StableDiGraph<NodeLabel, f64>,
    stops: HashMap<StopId, StopEntry>,
    routes: HashMap<RouteId, Route>,
}

impl RouteSetGraph {
    pub fn new(params: Parameters, durations: Arc<Durations>) -> Self {
        RouteSetGraph {
            graph: StableDiGraph::new(),
            stops: HashMap::new(),
            routes: HashMap::new(),
            params,
            durations,
            routes_changed: false,
            fitness: None,
            report: None,
            #[cfg(feature = "history")]
            history: HashMap::new(),
        }
    }

    pub fn nroutes(&self) -> usize {
        self.routes.len()
    }

    pub fn get_route(&self, route_id: RouteId) -> Result<&Route> {
        self.routes.get(&route_id).ok_or(Error::UnknownRoute(route_id))
    }

    pub fn get_routes(&self) -> impl Iterator<Item = (&RouteId, &Route)> {
        self.routes.iter()
    }

    pub fn route_ids(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.routes.keys().copied()
    }

    pub fn snapshot(&self) -> RouteSetSnapshot {
        RouteSetSnapshot {
            graph: self.graph.clone(),
            stops: self.stops.clone(),
            routes: self.routes.clone(),
        }
    }

    pub fn from_snapshot(
        snapshot: RouteSetSnapshot,
        params: Parameters,
        durations: Arc<Durations>,
    ) -> Self {
        RouteSetGraph {
            graph: snapshot.graph,
            stops: snapshot.stops,
            routes: snapshot.routes,
            params,
            durations,
            routes_changed: true,
            fitness: None,
            report: None,
            #[cfg(feature = "history")]
            history: HashMap::new(),
        }
    }

    #[cfg(feature = "history")]
    pub fn history(&self, route_id: RouteId) -> &[HistoryEvent] {
        self.history.get(&route_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    #[cfg(feature = "history")]
    fn record(&mut self, route_id: RouteId, event: HistoryEvent) {
        self.history.entry(route_id).or_default().push(event);
    }

    /// Swaps the recorded mutation history of `route_id` between `self` and
    /// `other`, mirroring the route swap crossover performs alongside it.
    #[cfg(feature = "history")]
    pub fn swap_history(&mut self, other: &mut Self, route_id: RouteId) {
        let a = self.history.remove(&route_id);
        let b = other.history.remove(&route_id);
        if let Some(b) = b {
            self.history.insert(route_id, b);
        }
        if let Some(a) = a {
            other.history.insert(route_id, a);
        }
    }

    /// Appends `stop_id` to the end of `route_id`.
    pub fn append_stop(&mut self, stop_id: StopId, route_id: RouteId) -> Result<()> {
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::AppendStop { stop_id, route_id });

        let route = self
            .routes
            .get(&route_id)
            .ok_or(Error::UnknownRoute(route_id))?;
        let seq = route.len();
        self.insert_stop_at(stop_id, route_id, seq)?;

        let route = self.routes.get(&route_id).unwrap();
        if route.len() > 1 {
            let prev_sid = route[route.len() - 2];
            let duration = self.travel_duration(prev_sid, stop_id)?;
            self.add_route_edge(prev_sid, stop_id, route_id, duration)?;
        }
        Ok(())
    }

    /// Prepends `stop_id` to the front of `route_id`. `route_id` must
    /// already contain at least one stop.
    pub fn prepend_stop(&mut self, stop_id: StopId, route_id: RouteId) -> Result<()> {
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::PrependStop { stop_id, route_id });

        let old_route = self
            .routes
            .get(&route_id)
            .ok_or(Error::UnknownRoute(route_id))?
            .clone();
        if old_route.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "cannot prepend to empty route {route_id}"
            )));
        }

        self.insert_stop_at(stop_id, route_id, 0)?;
        for sid in &old_route {
            self.bump_seq(*sid, route_id, 1)?;
        }

        let next_sid = old_route[0];
        let duration = self.travel_duration(stop_id, next_sid)?;
        self.add_route_edge(stop_id, next_sid, route_id, duration)
    }

    /// Appends a brand new route built from `route`, assigning it an id
    /// (the current route count, mirroring the original's `len(routes)`
    /// default) unless `route_id` names one explicitly.
    pub fn add_route(&mut self, route: &Route, route_id: Option<RouteId>) -> Result<RouteId> {
        if route.is_empty() {
            return Err(Error::InvariantViolation("route must be non-empty".into()));
        }
        let mut seen = std::collections::HashSet::with_capacity(route.len());
        for &sid in route {
            if !seen.insert(sid) {
                return Err(Error::InvariantViolation(format!(
                    "stop {sid} appears twice in route"
                )));
            }
        }

        let route_id = route_id.unwrap_or(RouteId(self.routes.len() as i64));
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::AddRoute { route_id });

        self.routes.insert(route_id, Vec::new());
        for &sid in route {
            self.append_stop(sid, route_id)?;
        }
        Ok(route_id)
    }

    pub fn replace_route(&mut self, route_id: RouteId, new_route: &Route) -> Result<()> {
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::ReplaceRoute { route_id });

        self.remove_route(route_id)?;
        self.add_route(new_route, Some(route_id))?;
        Ok(())
    }

    pub fn remove_route(&mut self, route_id: RouteId) -> Result<()> {
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::RemoveRoute { route_id });

        let route = self.routes.remove(&route_id).ok_or(Error::UnknownRoute(route_id))?;
        for &stop_id in route.iter().rev() {
            let vertex = {
                let stop = self
                    .stops
                    .get(&stop_id)
                    .ok_or(Error::InvariantViolation(format!("stop {stop_id} missing")))?;
                stop.route_nodes
                    .get(&route_id)
                    .ok_or(Error::StopNotInRoute { stop_id, route_id })?
                    .vertex
            };
            self.graph.remove_node(vertex);
            let empty = {
                let stop = self.stops.get_mut(&stop_id).unwrap();
                stop.route_nodes.remove(&route_id);
                stop.route_nodes.is_empty()
            };
            if empty {
                self.delete_stop(stop_id);
            }
        }
        Ok(())
    }

    /// Removes `stop_id` from `route_id`, splicing a direct edge between
    /// its former neighbours (summed duration, minus one bus stop time) if
    /// the removed stop was interior to the route.
    pub fn remove_node(&mut self, stop_id: StopId, route_id: RouteId) -> Result<()> {
        self.routes_changed = true;
        #[cfg(feature = "history")]
        self.record(route_id, HistoryEvent::RemoveNode { stop_id, route_id });

        let seq = self.seq_of(stop_id, route_id)?;
        let route_len = self.routes.get(&route_id).ok_or(Error::UnknownRoute(route_id))?.len();

        if seq > 0 && seq < route_len - 1 {
            let route = self.routes.get(&route_id).unwrap().clone();
            let prev_sid = route[seq - 1];
            let next_sid = route[seq + 1];
            let d1 = self.edge_duration(prev_sid, stop_id, route_id)?;
            let d2 = self.edge_duration(stop_id, next_sid, route_id)?;
            let duration = d1 + d2 - self.params.bus_stop_time;
            self.add_route_edge(prev_sid, next_sid, route_id, duration)?;
        }

        let vertex = self
            .stops
            .get(&stop_id)
            .and_then(|s| s.route_nodes.get(&route_id))
            .ok_or(Error::StopNotInRoute { stop_id, route_id })?
            .vertex;
        self.graph.remove_node(vertex);

        let empty = {
            let stop = self.stops.get_mut(&stop_id).unwrap();
            stop.route_nodes.remove(&route_id);
            stop.route_nodes.is_empty()
        };

        let route = self.routes.get_mut(&route_id).unwrap();
        for &sid in &route[seq + 1..] {
            let stop = self.stops.get_mut(&sid).unwrap();
            let rn = stop.route_nodes.get_mut(&route_id).unwrap();
            rn.stop_seq -= 1;
        }
        route.remove(seq);

        if empty {
            self.delete_stop(stop_id);
        }
        Ok(())
    }

    fn bump_seq(&mut self, stop_id: StopId, route_id: RouteId, delta: i64) -> Result<()> {
        let stop = self
            .stops
            .get_mut(&stop_id)
            .ok_or(Error::InvariantViolation(format!("stop {stop_id} missing")))?;
        let rn = stop
            .route_nodes
            .get_mut(&route_id)
            .ok_or(Error::StopNotInRoute { stop_id, route_id })?;
        rn.stop_seq = (rn.stop_seq as i64 + delta) as usize;
        Ok(())
    }

    fn seq_of(&self, stop_id: StopId, route_id: RouteId) -> Result<usize> {
        self.stops
            .get(&stop_id)
            .and_then(|s| s.route_nodes.get(&route_id))
            .map(|rn| rn.stop_seq)
            .ok_or(Error::StopNotInRoute { stop_id, route_id })
    }

    fn travel_duration(&self, from_sid: StopId, to_sid: StopId) -> Result<f64> {
        let d = self
            .durations
            .get_duration(from_sid, to_sid)
            .ok_or(Error::Unreachable { from: from_sid, to: to_sid })?;
        Ok(d + self.params.bus_stop_time)
    }

    fn insert_stop_at(&mut self, stop_id: StopId, route_id: RouteId, seq: usize) -> Result<()> {
        if !self.stops.contains_key(&stop_id) {
            self.add_stop_base(stop_id);
        }

        let route_node = self.graph.add_node(NodeLabel {
            stop_id,
            role: route_id,
        });

        self.routes
            .get_mut(&route_id)
            .ok_or(Error::UnknownRoute(route_id))?
            .insert(seq, stop_id);

        let (origin, dest) = {
            let stop = self.stops.get(&stop_id).unwrap();
            (stop.origin, stop.dest)
        };
        self.graph.add_edge(origin, route_node, 0.0);
        self.graph.add_edge(route_node, dest, 0.0);

        let other_nodes: Vec<NodeIndex> = self
            .stops
            .get(&stop_id)
            .unwrap()
            .route_nodes
            .values()
            .map(|rn| rn.vertex)
            .collect();
        for other in other_nodes {
            self.graph.add_edge(route_node, other, self.params.transfer_time);
            self.graph.add_edge(other, route_node, self.params.transfer_time);
        }

        let stop = self.stops.get_mut(&stop_id).unwrap();
        stop.route_nodes.insert(
            route_id,
            RouteNode {
                stop_seq: seq,
                vertex: route_node,
            },
        );
        Ok(())
    }

    fn add_stop_base(&mut self, stop_id: StopId) {
        let origin = self.graph.add_node(NodeLabel { stop_id, role: ORIGIN });
        let dest = self.graph.add_node(NodeLabel { stop_id, role: DEST });
        self.stops.insert(
            stop_id,
            StopEntry {
                origin,
                dest,
                route_nodes: HashMap::new(),
            },
        );
    }

    fn delete_stop(&mut self, stop_id: StopId) {
        if let Some(stop) = self.stops.remove(&stop_id) {
            self.graph.remove_node(stop.dest);
            self.graph.remove_node(stop.origin);
        }
    }

    fn route_vertex(&self, stop_id: StopId, route_id: RouteId) -> Result<NodeIndex> {
        self.stops
            .get(&stop_id)
            .and_then(|s| s.route_nodes.get(&route_id))
            .map(|rn| rn.vertex)
            .ok_or(Error::StopNotInRoute { stop_id, route_id })
    }

    fn add_route_edge(
        &mut self,
        from_sid: StopId,
        to_sid: StopId,
        route_id: RouteId,
        duration: f64,
    ) -> Result<()> {
        let from_v = self.route_vertex(from_sid, route_id)?;
        let to_v = self.route_vertex(to_sid, route_id)?;
        self.graph.add_edge(from_v, to_v, duration);
        Ok(())
    }

    fn edge_duration(&self, from_sid: StopId, to_sid: StopId, route_id: RouteId) -> Result<f64> {
        let from_v = self.route_vertex(from_sid, route_id)?;
        let to_v = self.route_vertex(to_sid, route_id)?;
        let e = self
            .graph
            .find_edge(from_v, to_v)
            .ok_or(Error::InvariantViolation(format!(
                "no edge {from_sid}->{to_sid} on route {route_id}"
            )))?;
        Ok(*self.graph.edge_weight(e).unwrap())
    }

    /// Single-source shortest path from `from_sid`'s origin vertex to each
    /// of `to_sids`'s destination vertices, weighted by edge duration.
    /// `None` for unreachable destinations. The returned distance already
    /// has the transfer/alighting bus-stop-time correction applied (spec.md
    /// section 4.3): each counted transfer and the final alighting do not
    /// make a waiting passenger pay the boarding stop time twice.
    pub fn get_distances_transfers(
        &self,
        from_sid: StopId,
        to_sids: &[StopId],
    ) -> Result<HashMap<StopId, Option<(f64, u32)>>> {
        let from_stop = self
            .stops
            .get(&from_sid)
            .ok_or(Error::InvariantViolation(format!("stop {from_sid} missing")))?;
        let start = from_stop.origin;

        let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
        let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(start, 0.0);
        heap.push(DistEntry { cost: 0.0, node: start });

        let mut remaining: std::collections::HashSet<NodeIndex> = to_sids
            .iter()
            .filter_map(|sid| self.stops.get(sid).map(|s| s.dest))
            .collect();

        while let Some(DistEntry { cost, node }) = heap.pop() {
            if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
                continue;
            }
            remaining.remove(&node);
            if remaining.is_empty() {
                break;
            }
            for edge in self.graph.edges(node) {
                let next = edge.target();
                let next_cost = cost + edge.weight();
                if next_cost < *dist.get(&next).unwrap_or(&f64::INFINITY) {
                    dist.insert(next, next_cost);
                    prev.insert(next, node);
                    heap.push(DistEntry { cost: next_cost, node: next });
                }
            }
        }

        let mut out = HashMap::with_capacity(to_sids.len());
        for &to_sid in to_sids {
            let Some(to_stop) = self.stops.get(&to_sid) else {
                out.insert(to_sid, None);
                continue;
            };
            let goal = to_stop.dest;
            let Some(&raw_dist) = dist.get(&goal) else {
                out.insert(to_sid, None);
                continue;
            };

            let mut route_ids = std::collections::HashSet::new();
            let mut cur = goal;
            while cur != start {
                let label = self.graph[cur];
                if label.role.is_route() {
                    route_ids.insert(label.role);
                }
                cur = *prev.get(&cur).ok_or(Error::InvariantViolation(
                    "broken predecessor chain".into(),
                ))?;
            }

            if route_ids.is_empty() {
                return Err(Error::InvariantViolation(format!(
                    "path from {from_sid} to {to_sid} crosses no route vertex"
                )));
            }
            let ntransfers = (route_ids.len() - 1) as u32;
            let adjusted = raw_dist
                - (self.params.bus_stop_time * ntransfers as f64 + self.params.bus_stop_time);
            out.insert(to_sid, Some((adjusted, ntransfers)));
        }
        Ok(out)
    }

    /// Returns the cached fitness value, recomputing it against `odx` if
    /// the route set has changed since the last call.
    pub fn get_fitness(&mut self, odx: &Odx) -> Result<f64> {
        if self.routes_changed {
            let (report, fitness) = self.compute_fitness(odx)?;
            self.report = Some(report);
            self.fitness = Some(fitness);
            self.routes_changed = false;
        }
        Ok(self.fitness.expect("fitness computed above when absent"))
    }

    pub fn get_report(&mut self, odx: &Odx) -> Result<&Report> {
        self.get_fitness(odx)?;
        Ok(self.report.as_ref().expect("report computed by get_fitness"))
    }

    fn compute_fitness(&self, odx: &Odx) -> Result<(Report, f64)> {
        let mut tt = 0.0f64;
        let mut ttr = 0.0f64;
        let mut transfers: HashMap<u32, u64> = HashMap::new();

        let mut unsatisfied_od_pairs = std::collections::HashSet::new();
        let mut unsatisfied_demand: u64 = 0;
        let mut unsatisfied_stops = std::collections::HashSet::new();

        let mut no_path = std::collections::HashSet::new();
        let mut no_path_l2 = std::collections::HashSet::new();

        let mut satisfied_od_pairs = std::collections::HashSet::new();
        let mut satisfied_demand: u64 = 0;
        let mut satisfied_stops = std::collections::HashSet::new();
        let mut travel_times: Vec<f64> = Vec::new();

        for o in odx.origins() {
            let dests: Vec<StopId> = odx.get_dests(o).collect();

            if !self.stops.contains_key(&o) {
                unsatisfied_stops.insert(o);
                for d in &dests {
                    unsatisfied_od_pairs.insert((o, *d));
                    unsatisfied_demand += odx.get_odx(o, *d);
                }
                continue;
            }
            satisfied_stops.insert(o);

            let mut destinations = Vec::new();
            for d in dests {
                if !self.stops.contains_key(&d) {
                    unsatisfied_stops.insert(d);
                    unsatisfied_od_pairs.insert((o, d));
                    unsatisfied_demand += odx.get_odx(o, d);
                    continue;
                }
                satisfied_stops.insert(d);
                destinations.push(d);
            }

            let distances = self.get_distances_transfers(o, &destinations)?;

            for d in destinations {
                let odx_val = odx.get_odx(o, d);
                match distances.get(&d).copied().flatten() {
                    None => {
                        no_path.insert((o, d));
                        unsatisfied_od_pairs.insert((o, d));
                        unsatisfied_demand += odx_val;
                    }
                    Some((dist, ntransfers)) => {
                        ttr += ntransfers as f64 * odx_val as f64;
                        *transfers.entry(ntransfers).or_insert(0) += odx_val;
                        travel_times.push(dist);

                        if ntransfers > 2 {
                            no_path_l2.insert((o, d));
                            unsatisfied_od_pairs.insert((o, d));
                            unsatisfied_demand += odx_val;
                        } else {
                            satisfied_od_pairs.insert((o, d));
                            satisfied_demand += odx_val;
                        }

                        tt += dist * odx_val as f64;
                    }
                }
            }
        }

        let tu = unsatisfied_demand as f64;
        let att = if travel_times.is_empty() {
            0.0
        } else {
            travel_times.iter().sum::<f64>() / travel_times.len() as f64
        };
        let w2 = att + self.params.w2_offset;

        let report = Report {
            nsatisfied_od_pairs: satisfied_od_pairs.len(),
            nunsatisfied_od_pairs: unsatisfied_od_pairs.len(),
            nsatisfied_stops: satisfied_stops.len(),
            nunsatisfied_stops: unsatisfied_stops.len(),
            satisfied_demand,
            unsatisfied_demand,
            average_travel_time_min: round2(att / 60.0),
            transfers,
            no_path: no_path.len(),
            no_path_less_2_transfers: no_path_l2.len(),
        };

        Ok((report, tt + ttr + tu * w2))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

struct DistEntry {
    cost: f64,
    node: NodeIndex,
}

impl PartialEq for DistEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for DistEntry {}
impl Ord for DistEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for DistEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdMap;

    fn params() -> Parameters {
        Parameters {
            bus_stop_time: 30.0,
            transfer_time: 300.0,
            w2_offset: 3000.0,
            ..Default::default()
        }
    }

    fn durations() -> Arc<Durations> {
        let mut table: StdMap<StopId, StdMap<StopId, f64>> = StdMap::new();
        for (a, b, d) in [(1u32, 2u32, 100.0), (2, 3, 100.0), (1, 3, 100.0), (3, 4, 100.0)] {
            table.entry(StopId(a)).or_default().insert(StopId(b), d);
        }
        Arc::new(Durations::from_table(table))
    }

    #[test]
    fn add_route_then_fitness_is_memoized_until_mutation() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();
        assert_eq!(r1, RouteId(0));
        assert_eq!(g.nroutes(), 1);

        let mut odx_table = StdMap::new();
        odx_table.insert(StopId(1), StdMap::from([(StopId(3), 10u64)]));
        let odx = Odx::from_table(odx_table);

        let f1 = g.get_fitness(&odx).unwrap();
        assert!(!g.routes_changed);
        let f2 = g.get_fitness(&odx).unwrap();
        assert_eq!(f1, f2);

        g.append_stop(StopId(4), r1).unwrap();
        assert!(g.routes_changed);
    }

    #[test]
    fn remove_node_interior_splices_edge() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();
        g.remove_node(StopId(2), r1).unwrap();
        let route = g.get_route(r1).unwrap();
        assert_eq!(route, &vec![StopId(1), StopId(3)]);
        let d = g.edge_duration(StopId(1), StopId(3), r1).unwrap();
        // 100 + 30 (1->2) + 100 + 30 (2->3) - 30 (one bus stop time removed)
        assert_eq!(d, 230.0);
    }

    #[test]
    fn remove_route_frees_stops_with_no_remaining_route() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2)], None).unwrap();
        g.remove_route(r1).unwrap();
        assert_eq!(g.nroutes(), 0);
        assert!(g.stops.is_empty());
    }

    #[test]
    fn shared_stop_gets_transfer_edges() {
        let mut g = RouteSetGraph::new(params(), durations());
        g.add_route(&vec![StopId(1), StopId(2)], None).unwrap();
        g.add_route(&vec![StopId(2), StopId(3)], None).unwrap();
        let stop = g.stops.get(&StopId(2)).unwrap();
        assert_eq!(stop.route_nodes.len(), 2);
    }

    #[test]
    fn transfer_edges_are_symmetric_with_fixed_weight() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2)], None).unwrap();
        let r2 = g.add_route(&vec![StopId(2), StopId(3)], None).unwrap();
        let v1 = g.route_vertex(StopId(2), r1).unwrap();
        let v2 = g.route_vertex(StopId(2), r2).unwrap();
        let e1 = g.graph.find_edge(v1, v2).unwrap();
        let e2 = g.graph.find_edge(v2, v1).unwrap();
        assert_eq!(*g.graph.edge_weight(e1).unwrap(), 300.0);
        assert_eq!(*g.graph.edge_weight(e2).unwrap(), 300.0);
        assert!(g.graph.find_edge(v1, v1).is_none());
    }

    #[test]
    fn add_route_rejects_duplicate_stop() {
        let mut g = RouteSetGraph::new(params(), durations());
        let err = g
            .add_route(&vec![StopId(1), StopId(2), StopId(1)], None)
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn add_route_rejects_empty_route() {
        let mut g = RouteSetGraph::new(params(), durations());
        let err = g.add_route(&vec![], None).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn append_then_remove_round_trips_route_and_stop_directory() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2)], None).unwrap();
        let before_route = g.get_route(r1).unwrap().clone();
        let before_edge = g.edge_duration(StopId(1), StopId(2), r1).unwrap();
        let before_nstops = g.stops.len();

        g.append_stop(StopId(3), r1).unwrap();
        assert_eq!(g.get_route(r1).unwrap().len(), 3);
        g.remove_node(StopId(3), r1).unwrap();

        assert_eq!(g.get_route(r1).unwrap(), &before_route);
        assert_eq!(
            g.edge_duration(StopId(1), StopId(2), r1).unwrap(),
            before_edge
        );
        assert_eq!(g.stops.len(), before_nstops);
        assert!(!g.stops.contains_key(&StopId(3)));
    }

    #[test]
    fn prepend_then_remove_round_trips_route_and_stop_directory() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(2), StopId(3)], None).unwrap();
        let before_route = g.get_route(r1).unwrap().clone();
        let before_edge = g.edge_duration(StopId(2), StopId(3), r1).unwrap();
        let before_nstops = g.stops.len();

        g.prepend_stop(StopId(1), r1).unwrap();
        assert_eq!(g.get_route(r1).unwrap(), &vec![StopId(1), StopId(2), StopId(3)]);
        g.remove_node(StopId(1), r1).unwrap();

        assert_eq!(g.get_route(r1).unwrap(), &before_route);
        assert_eq!(
            g.edge_duration(StopId(2), StopId(3), r1).unwrap(),
            before_edge
        );
        assert_eq!(g.stops.len(), before_nstops);
        assert!(!g.stops.contains_key(&StopId(1)));
    }

    #[test]
    fn clone_is_independent_of_original() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r1 = g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();
        let mut copy = g.clone();

        copy.append_stop(StopId(4), r1).unwrap();

        assert_eq!(g.get_route(r1).unwrap().len(), 3);
        assert_eq!(copy.get_route(r1).unwrap().len(), 4);
        assert!(!g.stops.contains_key(&StopId(4)));
        assert!(copy.stops.contains_key(&StopId(4)));
    }

    /// Scenario S1 (spec.md section 8): two routes sharing stop 3, uniform
    /// 60s hop durations, a single demand pair crossing the shared stop.
    #[test]
    fn scenario_s1_two_routes_one_transfer() {
        // The module-level `durations()` fixture covers 1-3 and 3-4 but not
        // 4-5, so build a fresh uniform 60s chain matching the scenario.
        let mut dur_table: StdMap<StopId, StdMap<StopId, f64>> = StdMap::new();
        for (a, b) in [(1u32, 2u32), (2, 3), (3, 4), (4, 5)] {
            dur_table
                .entry(StopId(a))
                .or_default()
                .insert(StopId(b), 60.0);
        }
        let mut g = RouteSetGraph::new(params(), Arc::new(Durations::from_table(dur_table)));
        g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();
        g.add_route(&vec![StopId(3), StopId(4), StopId(5)], None).unwrap();

        let mut odx_table = StdMap::new();
        odx_table.insert(StopId(1), StdMap::from([(StopId(5), 10u64)]));
        let odx = Odx::from_table(odx_table);

        let report = g.get_report(&odx).unwrap().clone();
        assert_eq!(report.satisfied_demand, 10);
        assert_eq!(report.unsatisfied_demand, 0);
        assert_eq!(report.transfers.get(&1).copied(), Some(10));

        let distances = g
            .get_distances_transfers(StopId(1), &[StopId(5)])
            .unwrap();
        let (dist, transfers) = distances[&StopId(5)].unwrap();
        assert_eq!(transfers, 1);
        assert_eq!(dist, 600.0);
    }

    /// Scenario S2 (spec.md section 8): single route, one destination absent
    /// from the route set.
    #[test]
    fn scenario_s2_single_route_partial_demand() {
        let mut g = RouteSetGraph::new(params(), durations());
        g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();

        let mut odx_table = StdMap::new();
        odx_table.insert(
            StopId(1),
            StdMap::from([(StopId(3), 7u64), (StopId(4), 2u64)]),
        );
        let odx = Odx::from_table(odx_table);

        let report = g.get_report(&odx).unwrap().clone();
        assert_eq!(report.satisfied_demand, 7);
        assert_eq!(report.unsatisfied_demand, 2);
        assert_eq!(report.transfers.get(&0).copied(), Some(7));
    }

    /// Scenario S3 (spec.md section 8): extending route 0 to include stop 4
    /// makes 1->4 served with zero transfers.
    #[test]
    fn scenario_s3_extend_route_serves_new_destination() {
        let mut g = RouteSetGraph::new(params(), durations());
        let r0 = g.add_route(&vec![StopId(1), StopId(2), StopId(3)], None).unwrap();
        g.append_stop(StopId(4), r0).unwrap();

        let mut odx_table = StdMap::new();
        odx_table.insert(StopId(1), StdMap::from([(StopId(4), 5u64)]));
        let odx = Odx::from_table(odx_table);

        let report = g.get_report(&odx).unwrap().clone();
        assert_eq!(report.satisfied_demand, 5);
        assert_eq!(report.unsatisfied_demand, 0);
        assert_eq!(report.transfers.get(&0).copied(), Some(5));
    }
}
