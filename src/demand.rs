//! Read-only, process-wide demand tables: ODX, DS (dominated stop pairs),
//! and pairwise stop durations.
//!
//! Grounded on `original_source/thesis/optimization/common.py`'s `ODX`, `DS`
//! and `Durations` singletons. Re-modeled per spec.md section 9 as immutable
//! value handles constructed once at start-up and passed by shared
//! reference (`Arc`), rather than as lazily-initialized global singletons.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Route, StopId};

/// Origin-Destination transaction matrix: inferred passenger demand between
/// stop pairs.
#[derive(Debug, Clone, Default)]
pub struct Odx {
    table: HashMap<StopId, HashMap<StopId, u64>>,
    origins: HashSet<StopId>,
}

impl Odx {
    /// Loads an ODX matrix from a JSON artifact (nested mapping
    /// `StopId -> StopId -> count`, spec.md section 6), then applies the
    /// circular-route exclusion preprocessing of spec.md section 4.4.
    pub fn load(path: impl AsRef<Path>, circular_routes: &[Route]) -> Result<Self> {
        let raw: NestedMap<u64> = read_nested(path)?;
        let mut table = parse_nested(raw)?;
        exclude_circular_pairs(&mut table, circular_routes);
        let origins = table.keys().copied().collect();
        Ok(Odx { table, origins })
    }

    pub fn from_table(table: HashMap<StopId, HashMap<StopId, u64>>) -> Self {
        let origins = table.keys().copied().collect();
        Odx { table, origins }
    }

    /// Demand for pair `(o, d)`, or `0` if absent.
    pub fn get_odx(&self, o: StopId, d: StopId) -> u64 {
        self.table
            .get(&o)
            .and_then(|dests| dests.get(&d))
            .copied()
            .unwrap_or(0)
    }

    /// All destinations with recorded demand from `o`.
    pub fn get_dests(&self, o: StopId) -> impl Iterator<Item = StopId> + '_ {
        self.table
            .get(&o)
            .into_iter()
            .flat_map(|dests| dests.keys().copied())
    }

    /// All stops that appear as an origin in the table.
    pub fn origins(&self) -> impl Iterator<Item = StopId> + '_ {
        self.origins.iter().copied()
    }
}

/// For a pair `(o, d)`, the set of intermediate `(m, n)` pairs whose demand
/// is considered served when a route runs the shortest path from `o` to `d`.
#[derive(Debug, Clone, Default)]
pub struct Ds {
    ds: HashMap<StopId, HashMap<StopId, Vec<(StopId, StopId)>>>,
    ds_totals: HashMap<StopId, HashMap<StopId, u64>>,
    origins: HashSet<StopId>,
}

impl Ds {
    /// Loads a DS table from a JSON artifact (nested mapping
    /// `StopId -> StopId -> [[m, n], ...]`, spec.md section 6), derives
    /// `ds_totals` against `odx`, and applies circular-route exclusion.
    pub fn load(path: impl AsRef<Path>, odx: &Odx, circular_routes: &[Route]) -> Result<Self> {
        let raw: NestedMap<Vec<[u32; 2]>> = read_nested(path)?;
        let mut ds: HashMap<StopId, HashMap<StopId, Vec<(StopId, StopId)>>> = HashMap::new();
        for (o_str, dests) in raw {
            let o = parse_stop(&o_str)?;
            let mut dmap = HashMap::new();
            for (d_str, pairs) in dests {
                let d = parse_stop(&d_str)?;
                dmap.insert(
                    d,
                    pairs
                        .into_iter()
                        .map(|[m, n]| (StopId(m), StopId(n)))
                        .collect(),
                );
            }
            ds.insert(o, dmap);
        }

        exclude_circular_pairs(&mut ds, circular_routes);

        let mut ds_totals: HashMap<StopId, HashMap<StopId, u64>> = HashMap::new();
        for (o, dests) in &ds {
            for (d, pairs) in dests {
                let mut total = 0u64;
                for &(m, n) in pairs {
                    total += odx.get_odx(m, n);
                }
                ds_totals.entry(*o).or_default().insert(*d, total);
            }
        }

        let origins = ds_totals.keys().copied().collect();
        Ok(Ds {
            ds,
            ds_totals,
            origins,
        })
    }

    /// Builds a `Ds` directly from an in-memory dominance table, without
    /// going through JSON or circular-route exclusion. Used by tests and by
    /// callers that already hold the table in memory.
    pub fn from_parts(
        ds: HashMap<StopId, HashMap<StopId, Vec<(StopId, StopId)>>>,
        odx: &Odx,
    ) -> Self {
        let mut ds_totals: HashMap<StopId, HashMap<StopId, u64>> = HashMap::new();
        for (o, dests) in &ds {
            for (d, pairs) in dests {
                let total = pairs.iter().map(|&(m, n)| odx.get_odx(m, n)).sum();
                ds_totals.entry(*o).or_default().insert(*d, total);
            }
        }
        let origins = ds_totals.keys().copied().collect();
        Ds {
            ds,
            ds_totals,
            origins,
        }
    }

    pub fn get_ds(&self, o: StopId, d: StopId) -> &[(StopId, StopId)] {
        self.ds
            .get(&o)
            .and_then(|dests| dests.get(&d))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_ds_total(&self, o: StopId, d: StopId) -> Option<u64> {
        self.ds_totals.get(&o).and_then(|dests| dests.get(&d)).copied()
    }

    pub fn get_dests(&self, o: StopId) -> impl Iterator<Item = StopId> + '_ {
        self.ds_totals
            .get(&o)
            .into_iter()
            .flat_map(|dests| dests.keys().copied())
    }

    pub fn get_ds_totals(&self, o: StopId) -> impl Iterator<Item = u64> + '_ {
        self.ds_totals
            .get(&o)
            .into_iter()
            .flat_map(|dests| dests.values().copied())
    }

    /// Stops that appear as an origin with at least one dominance entry.
    pub fn origins(&self) -> &HashSet<StopId> {
        &self.origins
    }
}

/// Pairwise travel duration in seconds between stops.
#[derive(Debug, Clone, Default)]
pub struct Durations {
    table: HashMap<StopId, HashMap<StopId, f64>>,
}

impl Durations {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw: NestedMap<f64> = read_nested(path)?;
        let table = parse_nested(raw)?;
        Ok(Durations { table })
    }

    pub fn from_table(table: HashMap<StopId, HashMap<StopId, f64>>) -> Self {
        Durations { table }
    }

    pub fn get_duration(&self, o: StopId, d: StopId) -> Option<f64> {
        self.table.get(&o).and_then(|dests| dests.get(&d)).copied()
    }
}

type NestedMap<T> = HashMap<String, HashMap<String, T>>;

fn read_nested<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<NestedMap<T>> {
    let text = std::fs::read_to_string(path)?;
    let raw: NestedMap<T> = serde_json::from_str(&text)?;
    Ok(raw)
}

fn parse_stop(s: &str) -> Result<StopId> {
    s.parse::<u32>()
        .map(StopId)
        .map_err(|_| Error::InvalidInput(format!("stop id '{s}' is not a valid integer")))
}

fn parse_nested<T>(raw: NestedMap<T>) -> Result<HashMap<StopId, HashMap<StopId, T>>> {
    let mut out = HashMap::with_capacity(raw.len());
    for (o_str, dests) in raw {
        let o = parse_stop(&o_str)?;
        let mut dmap = HashMap::with_capacity(dests.len());
        for (d_str, v) in dests {
            let d = parse_stop(&d_str)?;
            dmap.insert(d, v);
        }
        out.insert(o, dmap);
    }
    Ok(out)
}

/// Strips `(o, d)` pairs from `table` that a closed loop would spuriously
/// over-cover: for every circular route, for each non-initial stop `o` in
/// the route, remove `(o, d)` for every `d` that appears earlier in the
/// same route. Mirrors the identical preprocessing duplicated in `ODX`'s and
/// `DS`'s constructors in `original_source/thesis/optimization/common.py`.
fn exclude_circular_pairs<V>(
    table: &mut HashMap<StopId, HashMap<StopId, V>>,
    circular_routes: &[Route],
) {
    for route in circular_routes {
        for (idx, &o) in route.iter().enumerate().skip(1) {
            for &d in &route[..idx] {
                if let Some(dests) = table.get_mut(&o) {
                    dests.remove(&d);
                    if dests.is_empty() {
                        table.remove(&o);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_json(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn odx_loads_and_queries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(&dir, "odx.json", r#"{"1": {"5": 10}, "2": {"3": 3}}"#);
        let odx = Odx::load(&path, &[]).unwrap();
        assert_eq!(odx.get_odx(StopId(1), StopId(5)), 10);
        assert_eq!(odx.get_odx(StopId(9), StopId(9)), 0);
        assert_eq!(odx.get_dests(StopId(1)).collect::<Vec<_>>(), vec![StopId(5)]);
    }

    #[test]
    fn circular_route_exclusion_strips_earlier_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "odx.json",
            r#"{"1": {"2": 5}, "2": {"1": 7}, "3": {"1": 4}}"#,
        );
        // circular route 1 -> 2 -> 3 -> 1: stop 2 (idx 1) should drop (2,1);
        // stop 3 (idx 2) should drop (3,1) and (3,2) (but (3,2) doesn't exist).
        let circ = vec![vec![StopId(1), StopId(2), StopId(3), StopId(1)]];
        let odx = Odx::load(&path, &circ).unwrap();
        assert_eq!(odx.get_odx(StopId(1), StopId(2)), 5);
        assert_eq!(odx.get_odx(StopId(2), StopId(1)), 0);
        assert_eq!(odx.get_odx(StopId(3), StopId(1)), 0);
    }

    #[test]
    fn ds_totals_sum_odx_over_dominated_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let odx_path = write_json(&dir, "odx.json", r#"{"1": {"2": 3, "3": 4}}"#);
        let ds_path = write_json(&dir, "ds.json", r#"{"1": {"5": [[1, 2], [1, 3]]}}"#);
        let odx = Odx::load(&odx_path, &[]).unwrap();
        let ds = Ds::load(&ds_path, &odx, &[]).unwrap();
        assert_eq!(ds.get_ds_total(StopId(1), StopId(5)), Some(7));
    }
}
