//! The evolutionary search loop: population management, selection,
//! crossover, mutation, and checkpointing.
//!
//! Grounded on `original_source/thesis/optimization/genetic.py`'s `Algorithm`
//! and `Metrics` classes for exact run-mode and operator semantics, and on
//! `opt/ga_params.rs`'s `GAConfig` for Rust idiom (tournament selection by
//! repeated random sampling, elitism via a sorted prefix, `&mut impl Rng`
//! threaded through every operator).

use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::demand::{Ds, Durations, Odx};
use crate::error::{Error, Result};
use crate::initial_routeset::get_initial_routeset;
use crate::model::{Route, RouteId};
use crate::road_graph::RoadGraph;
use crate::routeset_graph::{RouteSetGraph, RouteSetSnapshot};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One row of the per-generation metrics log (`df.csv`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRow {
    pub fitness: f64,
    pub satisfied_demand_pct: f64,
    pub satisfied_stops_pct: f64,
    pub satisfied_od_pairs_pct: f64,
    pub average_travel_time: f64,
    pub mean_transfers: f64,
    pub time: f64,
}

/// Run metadata persisted alongside a checkpoint (`meta.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub created_unix: u64,
    pub updated_unix: Option<u64>,
    pub config: Parameters,
    pub nroutes: usize,
    pub loaded_from: Option<String>,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns the `n` fittest individuals (lowest fitness first, since this
/// objective is a cost to minimize), cloned out of `population`.
fn fittest(population: &mut [RouteSetGraph], n: usize, odx: &Odx) -> Result<Vec<RouteSetGraph>> {
    #[cfg(feature = "parallel")]
    let scores: Result<Vec<f64>> = population
        .par_iter_mut()
        .map(|ind| ind.get_fitness(odx))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let scores: Result<Vec<f64>> = population.iter_mut().map(|ind| ind.get_fitness(odx)).collect();
    let scores = scores?;

    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));
    Ok(order.into_iter().take(n).map(|i| population[i].clone()).collect())
}

/// Inverse of a route's DS-weighted demand total, used to bias mutation
/// toward low-coverage routes; routes whose endpoints carry no DS entry get
/// a flat penalty weight of `2.0`.
fn route_inv_ds(route: &Route, ds: &Ds) -> f64 {
    let (Some(&o), Some(&d)) = (route.first(), route.last()) else {
        return 2.0;
    };
    match ds.get_ds_total(o, d) {
        Some(total) if total > 0 => 1.0 / total as f64,
        _ => 2.0,
    }
}

/// Drives the genetic search described in spec.md section 5: tournament
/// selection, elitism, route-slot crossover, and the `small_mod`/`big_mod`
/// mutation operators, evaluated against process-wide demand tables and the
/// road network.
pub struct Algorithm {
    pub road_graph: Arc<RoadGraph>,
    pub durations: Arc<Durations>,
    pub odx: Arc<Odx>,
    pub ds: Arc<Ds>,
    pub params: Parameters,
    population: Vec<RouteSetGraph>,
    pswap: f64,
    cancel: Arc<AtomicBool>,
    rng: StdRng,
}

impl Algorithm {
    pub fn new(
        road_graph: Arc<RoadGraph>,
        durations: Arc<Durations>,
        odx: Arc<Odx>,
        ds: Arc<Ds>,
        params: Parameters,
    ) -> Self {
        Algorithm {
            road_graph,
            durations,
            odx,
            ds,
            params,
            population: Vec::new(),
            pswap: 0.0,
            cancel: Arc::new(AtomicBool::new(false)),
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds every sampler this loop draws from (spec.md section 5/9:
    /// tournament draws, crossover swap Bernoulli trials, terminal/neighbor
    /// choice, `k` sampling) from one fixed source, so a run is
    /// reproducible byte-for-byte given the same seed and inputs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// A clone of the cooperative cancellation flag; setting it makes the
    /// run loop stop and checkpoint after the current generation.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn seed_population(&mut self, routes: Vec<Route>) -> Result<()> {
        let mut base = RouteSetGraph::new(self.params, self.durations.clone());
        for r in &routes {
            base.add_route(r, None)?;
        }
        self.pswap = 1.0 / routes.len().max(1) as f64;
        self.population = (0..self.params.pop_size).map(|_| base.clone()).collect();
        Ok(())
    }

    /// Builds an initial route set of `n_routes` routes greedily, then
    /// seeds `pop_size` identical copies of it and runs `niterations`
    /// generations.
    pub fn run_from_scratch(
        &mut self,
        n_routes: usize,
        niterations: usize,
        result_dir: Option<&Path>,
    ) -> Result<Vec<MetricsRow>> {
        let name = format!("r={n_routes},{}", self.params.experiment_suffix());
        log::info!("[{name}] generating initial route set with {n_routes} routes from scratch");
        let routes = get_initial_routeset(n_routes, &self.road_graph, &self.odx, &self.ds);
        self.seed_population(routes)?;

        let result_dir = result_dir.map(|base| base.join(&name));
        if let Some(dir) = &result_dir {
            self.write_meta(dir, self.population[0].nroutes(), None)?;
        }
        self.run(niterations, result_dir.as_deref(), false)
    }

    /// Seeds `pop_size` copies of a routeset built directly from
    /// caller-supplied `routes` and runs `niterations` generations.
    pub fn run_from_routes(
        &mut self,
        routes: Vec<Route>,
        niterations: usize,
        result_dir: Option<&Path>,
    ) -> Result<Vec<MetricsRow>> {
        let name = format!("routes_{}", self.params.experiment_suffix());
        log::info!("[{name}] running from pre-defined routes");
        self.seed_population(routes)?;
        let result_dir = result_dir.map(|base| base.join(&name));
        if let Some(dir) = &result_dir {
            self.write_meta(dir, self.population[0].nroutes(), None)?;
        }
        self.run(niterations, result_dir.as_deref(), false)
    }

    /// Loads a previously checkpointed population from `saved_dir` and
    /// continues the run. When `append` is true, run parameters are
    /// overwritten from the saved `meta.json` and the metrics log is
    /// appended to rather than restarted.
    pub fn run_from_saved(
        &mut self,
        saved_dir: &Path,
        niterations: usize,
        append: bool,
        result_dir: Option<&Path>,
    ) -> Result<Vec<MetricsRow>> {
        let pop_dir = saved_dir.join("saved_population");
        let mut population = Vec::new();
        for entry in std::fs::read_dir(&pop_dir)? {
            let entry = entry?;
            let bytes = std::fs::read(entry.path())?;
            let snapshot: RouteSetSnapshot = bincode::deserialize(&bytes)?;
            population.push(RouteSetGraph::from_snapshot(
                snapshot,
                self.params,
                self.durations.clone(),
            ));
        }
        if population.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "no saved individuals found under {}",
                pop_dir.display()
            )));
        }
        let nroutes = population[0].nroutes();
        self.pswap = 1.0 / nroutes.max(1) as f64;
        self.population = population;

        if append {
            let meta_path = saved_dir.join("meta.json");
            let text = std::fs::read_to_string(&meta_path)?;
            let mut meta: RunMeta = serde_json::from_str(&text)?;
            self.params = meta.config;
            meta.updated_unix = Some(now_unix());
            std::fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

            let prior = self.read_metrics_csv(&saved_dir.join("df.csv")).unwrap_or_default();
            return self.run_continuing(niterations, Some(saved_dir), prior);
        }

        if let Some(dir) = result_dir {
            self.write_meta(dir, nroutes, Some(saved_dir.display().to_string()))?;
        }
        self.run(niterations, result_dir, false)
    }

    fn write_meta(&self, dir: &Path, nroutes: usize, loaded_from: Option<String>) -> Result<()> {
        std::fs::create_dir_all(dir.join("saved_population"))?;
        let meta = RunMeta {
            created_unix: now_unix(),
            updated_unix: None,
            config: self.params,
            nroutes,
            loaded_from,
        };
        std::fs::write(dir.join("meta.json"), serde_json::to_string_pretty(&meta)?)?;
        Ok(())
    }

    fn read_metrics_csv(&self, path: &Path) -> Result<Vec<MetricsRow>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }

    fn run(
        &mut self,
        niterations: usize,
        result_dir: Option<&Path>,
        _append: bool,
    ) -> Result<Vec<MetricsRow>> {
        let initial_row = self.metrics_row(0.0)?;
        self.run_continuing(niterations, result_dir, vec![initial_row])
    }

    fn run_continuing(
        &mut self,
        niterations: usize,
        result_dir: Option<&Path>,
        mut results: Vec<MetricsRow>,
    ) -> Result<Vec<MetricsRow>> {
        const PRINT_FREQ: usize = 20;
        let save_freq = self.params.save_freq.max(1);

        log::info!("satisfied demand: {:.2}%", results[0].satisfied_demand_pct);

        // Taken out of `self` for the loop's duration so operator methods
        // (which borrow `self` immutably) can also receive it as `&mut`;
        // restored onto `self.rng` once the run loop exits below.
        let mut rng = std::mem::replace(&mut self.rng, StdRng::from_entropy());
        let mut last_time = SystemTime::now();

        for i in 0..niterations {
            if self.cancel.load(AtomicOrdering::Relaxed) {
                log::warn!("cancellation requested, stopping after generation {i}");
                break;
            }

            let mut next_gen = fittest(&mut self.population, self.params.elite_size, &self.odx)?;

            let nchildren = (self.params.pop_size - self.params.elite_size) / 2;
            for _ in 0..nchildren {
                let tournament_idx =
                    rand::seq::index::sample(&mut rng, self.population.len(), self.params.tournament_size)
                        .into_vec();
                let mut tournament: Vec<RouteSetGraph> =
                    tournament_idx.iter().map(|&idx| self.population[idx].clone()).collect();
                let mut parents = fittest(&mut tournament, 2, &self.odx)?;
                let (mut c1, mut c2) = (parents.remove(0), parents.remove(0));

                self.crossover(&mut c1, &mut c2, &mut rng)?;
                self.mutate(&mut c1, &mut rng)?;
                self.mutate(&mut c2, &mut rng)?;
                next_gen.push(c1);
                next_gen.push(c2);
            }

            self.population = next_gen;

            let elapsed = last_time.elapsed().unwrap_or_default().as_secs_f64();
            let row = self.metrics_row(elapsed)?;
            last_time = SystemTime::now();

            if i % PRINT_FREQ == 0 && i > 0 {
                let decrease = -((row.fitness - results.last().unwrap().fitness)
                    / results.last().unwrap().fitness
                    * 100.0);
                log::info!("iteration {i}: fitness decrease {decrease:.2}%");
                self.log_row(&row);
            }
            results.push(row);

            if let Some(dir) = result_dir {
                if i % save_freq == 0 {
                    self.try_checkpoint(dir, &results);
                }
            }
        }

        self.rng = rng;

        if let Some(dir) = result_dir {
            self.try_checkpoint(dir, &results);
        }
        Ok(results)
    }

    /// Checkpoints to `dir`, logging and swallowing the error rather than
    /// aborting the run (spec.md section 7: `CheckpointIO` is non-fatal).
    /// A failed checkpoint just means this generation's progress isn't on
    /// disk yet; the next `save_freq` tick tries again.
    fn try_checkpoint(&self, dir: &Path, results: &[MetricsRow]) {
        if let Err(e) = self.checkpoint(dir, results) {
            let err = Error::CheckpointIO(e.to_string());
            log::error!("{err}");
        }
    }

    fn log_row(&self, row: &MetricsRow) {
        log::info!("satisfied demand: {:.2}%", row.satisfied_demand_pct);
        log::info!("satisfied stops: {:.2}%", row.satisfied_stops_pct);
        log::info!("satisfied OD pairs: {:.2}%", row.satisfied_od_pairs_pct);
        log::info!("average travel time: {:.2} min", row.average_travel_time);
        log::info!("mean transfers: {:.2}", row.mean_transfers);
    }

    fn metrics_row(&mut self, time: f64) -> Result<MetricsRow> {
        let best = fittest(&mut self.population, 1, &self.odx)?;
        let mut best = best.into_iter().next().expect("population is non-empty");
        let fitness = best.get_fitness(&self.odx)?;
        let report = best.get_report(&self.odx)?;
        Ok(MetricsRow {
            fitness,
            satisfied_demand_pct: report.satisfied_demand_pct(),
            satisfied_stops_pct: report.satisfied_stops_pct(),
            satisfied_od_pairs_pct: report.satisfied_od_pairs_pct(),
            average_travel_time: report.average_travel_time_min,
            mean_transfers: report.mean_transfers(),
            time,
        })
    }

    fn checkpoint(&self, dir: &Path, results: &[MetricsRow]) -> Result<()> {
        let mut writer = csv::Writer::from_path(dir.join("df.csv"))?;
        for row in results {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let pop_dir = dir.join("saved_population");
        std::fs::create_dir_all(&pop_dir)?;
        for (idx, ind) in self.population.iter().enumerate() {
            let bytes = bincode::serialize(&ind.snapshot())?;
            std::fs::write(pop_dir.join(format!("{idx}.bin")), bytes)?;
        }
        Ok(())
    }

    /// Swaps routes between `p1` and `p2` at each slot independently with
    /// probability `pswap`, skipping slots where the two routes are
    /// already identical.
    fn crossover(&self, p1: &mut RouteSetGraph, p2: &mut RouteSetGraph, rng: &mut impl Rng) -> Result<()> {
        let nroutes = p1.nroutes();
        for idx in 0..nroutes {
            if !rng.gen_bool(self.pswap.clamp(0.0, 1.0)) {
                continue;
            }
            let route_id = RouteId(idx as i64);
            let r1 = p1.get_route(route_id)?.clone();
            let r2 = p2.get_route(route_id)?.clone();
            if r1 == r2 {
                continue;
            }
            p1.replace_route(route_id, &r2)?;
            p2.replace_route(route_id, &r1)?;
            #[cfg(feature = "history")]
            p1.swap_history(p2, route_id);
        }
        Ok(())
    }

    /// Picks a route biased toward low DS coverage, then applies
    /// `small_mod` with probability `pms` or `big_mod` otherwise.
    fn mutate(&self, p: &mut RouteSetGraph, rng: &mut impl Rng) -> Result<()> {
        let route_ids: Vec<RouteId> = p.route_ids().collect();
        let weights: Vec<f64> = route_ids
            .iter()
            .map(|&rid| route_inv_ds(p.get_route(rid).unwrap(), &self.ds))
            .collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| Error::InvariantViolation(format!("mutation weights: {e}")))?;
        let route_id = route_ids[dist.sample(rng)];

        if rng.gen_bool(self.params.pms) {
            self.small_mod(p, route_id, rng)?;
        } else {
            self.big_mod(p, route_id, rng)?;
        }
        Ok(())
    }

    fn small_mod(&self, p: &mut RouteSetGraph, route_id: RouteId, rng: &mut impl Rng) -> Result<()> {
        let terminal_first = rng.gen_bool(0.5);
        let route_len = p.get_route(route_id)?.len();

        let use_extend = route_len <= self.params.min_route_size || !rng.gen_bool(self.params.pdelete);

        if use_extend {
            self.small_mod_extend(p, route_id, terminal_first, rng)
        } else {
            let seq = if terminal_first { 0 } else { route_len - 1 };
            let sid = p.get_route(route_id)?[seq];
            p.remove_node(sid, route_id)
        }
    }

    fn small_mod_extend(
        &self,
        p: &mut RouteSetGraph,
        route_id: RouteId,
        terminal_first: bool,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let route = p.get_route(route_id)?.clone();
        let in_route: std::collections::HashSet<_> = route.iter().copied().collect();

        if terminal_first {
            let sid = route[0];
            let candidates: Vec<_> = self
                .road_graph
                .in_neighbors(sid)
                .into_iter()
                .filter(|c| !in_route.contains(c))
                .collect();
            if let Some(&new_sid) = candidates.choose(rng) {
                p.prepend_stop(new_sid, route_id)?;
            } else {
                log::info!("stop {sid} has no extend candidates");
            }
        } else {
            let sid = *route.last().unwrap();
            let candidates: Vec<_> = self
                .road_graph
                .out_neighbors(sid)
                .into_iter()
                .filter(|c| !in_route.contains(c))
                .collect();
            if let Some(&new_sid) = candidates.choose(rng) {
                p.append_stop(new_sid, route_id)?;
            } else {
                log::info!("stop {sid} has no extend candidates");
            }
        }
        Ok(())
    }

    /// Replaces one end of `route_id` with the shortest path to a
    /// DS-weighted random stop reachable from that end, or trims both ends
    /// when neither is a demand origin.
    fn big_mod(&self, p: &mut RouteSetGraph, route_id: RouteId, rng: &mut impl Rng) -> Result<()> {
        let route = p.get_route(route_id)?.clone();
        let first_is_origin = self.ds.origins().contains(route.first().unwrap());
        let last_is_origin = self.ds.origins().contains(route.last().unwrap());

        let pick_first = if last_is_origin {
            if first_is_origin {
                rng.gen_bool(0.5)
            } else {
                false
            }
        } else if first_is_origin {
            true
        } else {
            log::warn!("route {route_id} has no demand-origin endpoint, trimming both ends");
            if route.len() > 1 {
                p.remove_node(route[0], route_id)?;
                let route = p.get_route(route_id)?.clone();
                if let Some(&last) = route.last() {
                    p.remove_node(last, route_id)?;
                }
            } else {
                log::warn!("route {route_id} has only one stop");
            }
            return Ok(());
        };

        let i = if pick_first { route[0] } else { *route.last().unwrap() };

        let dests: Vec<_> = self.ds.get_dests(i).collect();
        let weights: Vec<u64> = self.ds.get_ds_totals(i).collect();
        if dests.is_empty() {
            log::info!("stop {i} has no DS destinations, skipping big_mod");
            return Ok(());
        }
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| Error::InvariantViolation(format!("big_mod weights: {e}")))?;
        let k = dests[dist.sample(rng)];

        let new_route = self.road_graph.shortest_path(i, k);
        if new_route.is_empty() {
            log::warn!("no path from {i} to {k}, skipping big_mod");
            return Ok(());
        }
        p.replace_route(route_id, &new_route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::Odx as OdxTable;
    use crate::road_graph::{RoadGraphArtifact, RoadGraphEdge};
    use std::collections::HashMap;

    fn tiny_algorithm() -> Algorithm {
        let edges = vec![
            (1, 2, 60.0),
            (2, 3, 60.0),
            (3, 4, 60.0),
            (2, 1, 60.0),
            (3, 2, 60.0),
            (4, 3, 60.0),
        ];
        let road_graph = RoadGraph::from_artifact(RoadGraphArtifact {
            edges: edges
                .into_iter()
                .map(|(f, t, d)| RoadGraphEdge {
                    from: f,
                    to: t,
                    duration_s: d,
                    distance_m: d * 10.0,
                })
                .collect(),
        });

        let mut dur_table = HashMap::new();
        for (a, b) in [(1u32, 2u32), (2, 3), (3, 4)] {
            dur_table
                .entry(crate::model::StopId(a))
                .or_insert_with(HashMap::new)
                .insert(crate::model::StopId(b), 60.0);
        }
        let durations = Arc::new(Durations::from_table(dur_table));

        let mut odx_table = HashMap::new();
        odx_table.insert(
            crate::model::StopId(1),
            HashMap::from([(crate::model::StopId(4), 20u64)]),
        );
        let odx = Arc::new(OdxTable::from_table(odx_table));

        let ds_table = HashMap::from([(
            crate::model::StopId(1),
            HashMap::from([(
                crate::model::StopId(4),
                vec![(crate::model::StopId(1), crate::model::StopId(4))],
            )]),
        )]);
        let ds = Arc::new(Ds::from_parts(ds_table, &odx));

        let mut params = Parameters::default();
        params.pop_size = 4;
        params.elite_size = 2;
        params.tournament_size = 2;

        Algorithm::new(road_graph.into(), durations, odx, ds, params)
    }

    #[test]
    fn run_from_scratch_converges_without_error() {
        let mut algo = tiny_algorithm();
        let rows = algo.run_from_scratch(1, 3, None).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.fitness.is_finite()));
    }

    #[test]
    fn run_from_routes_respects_pop_size() {
        let mut algo = tiny_algorithm();
        let routes = vec![vec![
            crate::model::StopId(1),
            crate::model::StopId(2),
            crate::model::StopId(3),
            crate::model::StopId(4),
        ]];
        let rows = algo.run_from_routes(routes, 2, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(algo.population.len(), 4);
    }

    /// Builds a standalone individual (its own durations table, independent
    /// of `tiny_algorithm`'s) covering every consecutive pair in `routes`.
    fn make_individual(routes: &[Route]) -> RouteSetGraph {
        use crate::model::StopId;
        let mut dur_table: HashMap<StopId, HashMap<StopId, f64>> = HashMap::new();
        for r in routes {
            for w in r.windows(2) {
                dur_table.entry(w[0]).or_default().insert(w[1], 60.0);
            }
        }
        let durations = Arc::new(Durations::from_table(dur_table));
        let mut g = RouteSetGraph::new(Parameters::default(), durations);
        for r in routes {
            g.add_route(r, None).unwrap();
        }
        g
    }

    /// Scenario S5 (spec.md section 8), `p_swap = 0`: crossover leaves both
    /// parents' route lists untouched.
    #[test]
    fn scenario_s5_pswap_zero_yields_clones() {
        use crate::model::StopId;
        let algo = tiny_algorithm();
        assert_eq!(algo.pswap, 0.0);

        let mut p1 = make_individual(&[vec![StopId(1), StopId(2)], vec![StopId(5), StopId(6)]]);
        let mut p2 = make_individual(&[vec![StopId(3), StopId(4)], vec![StopId(5), StopId(6)]]);
        let mut rng = StdRng::seed_from_u64(1);

        algo.crossover(&mut p1, &mut p2, &mut rng).unwrap();

        assert_eq!(p1.get_route(RouteId(0)).unwrap(), &vec![StopId(1), StopId(2)]);
        assert_eq!(p2.get_route(RouteId(0)).unwrap(), &vec![StopId(3), StopId(4)]);
    }

    /// Scenario S5 (spec.md section 8), `p_swap = 1`: children carry the
    /// parents' route lists exchanged; a slot where both parents already
    /// agree is left alone.
    #[test]
    fn scenario_s5_pswap_one_swaps_routes() {
        use crate::model::StopId;
        let mut algo = tiny_algorithm();
        algo.pswap = 1.0;

        let mut p1 = make_individual(&[vec![StopId(1), StopId(2)], vec![StopId(5), StopId(6)]]);
        let mut p2 = make_individual(&[vec![StopId(3), StopId(4)], vec![StopId(5), StopId(6)]]);
        let mut rng = StdRng::seed_from_u64(1);

        algo.crossover(&mut p1, &mut p2, &mut rng).unwrap();

        assert_eq!(p1.get_route(RouteId(0)).unwrap(), &vec![StopId(3), StopId(4)]);
        assert_eq!(p2.get_route(RouteId(0)).unwrap(), &vec![StopId(1), StopId(2)]);
        // identical route at slot 1 is skipped regardless of p_swap.
        assert_eq!(p1.get_route(RouteId(1)).unwrap(), &vec![StopId(5), StopId(6)]);
        assert_eq!(p2.get_route(RouteId(1)).unwrap(), &vec![StopId(5), StopId(6)]);
    }

    /// Scenario S6 (spec.md section 8): mutation driven by a fixed-seed RNG
    /// on a fixed parent reproduces the same child.
    #[test]
    fn scenario_s6_mutation_with_fixed_seed_is_deterministic() {
        use crate::model::StopId;
        let algo = tiny_algorithm();
        let base = make_individual(&[vec![StopId(1), StopId(2), StopId(3), StopId(4)]]);

        let mut c1 = base.clone();
        let mut c2 = base.clone();
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        algo.mutate(&mut c1, &mut rng1).unwrap();
        algo.mutate(&mut c2, &mut rng2).unwrap();

        assert_eq!(c1.get_route(RouteId(0)).unwrap(), c2.get_route(RouteId(0)).unwrap());
    }
}
