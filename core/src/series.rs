//! Generated series store and export helpers

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::config::SupernodeId;
use crate::curve::Series;
use crate::error::{GenError, GenResult};

/// Series of one super node, indexed by sub node
pub type SuperNodeSeries = Vec<Series>;

/// Accumulated output of a generation run.
///
/// Entries are write-once: a super node cannot be inserted twice and stored
/// series are only handed out by shared reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GeneratedSeries {
    nodes: BTreeMap<SupernodeId, SuperNodeSeries>,
}

/// One row of an exported super node: every sub node's value at `cycle`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub values: Vec<f64>,
}

/// Summary of a single sub-series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SeriesStats {
    pub fn of(series: &[f64]) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let (min, max, sum) = series.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &v| (lo.min(v), hi.max(v), sum + v),
        );
        Some(Self {
            min,
            max,
            mean: sum / series.len() as f64,
        })
    }
}

impl GeneratedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the series of a super node
    pub fn insert(&mut self, id: SupernodeId, series: SuperNodeSeries) -> GenResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(GenError::Internal(format!(
                "super node {} was already generated",
                id
            )));
        }
        self.nodes.insert(id, series);
        Ok(())
    }

    pub fn get(&self, id: SupernodeId) -> Option<&SuperNodeSeries> {
        self.nodes.get(&id)
    }

    pub fn subnode(&self, id: SupernodeId, index: usize) -> Option<&Series> {
        self.nodes.get(&id).and_then(|s| s.get(index))
    }

    pub fn contains(&self, id: SupernodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SupernodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SupernodeId, &SuperNodeSeries)> {
        self.nodes.iter().map(|(&id, s)| (id, s))
    }

    /// One record per cycle index for a super node
    pub fn records(&self, id: SupernodeId) -> Option<Vec<CycleRecord>> {
        let subnodes = self.nodes.get(&id)?;
        let cycles = subnodes.iter().map(Vec::len).max().unwrap_or(0);
        Some(
            (0..cycles)
                .map(|cycle| CycleRecord {
                    cycle,
                    values: subnodes
                        .iter()
                        .map(|s| s.get(cycle).copied().unwrap_or(f64::NAN))
                        .collect(),
                })
                .collect(),
        )
    }

    /// Write a super node as CSV: `cycle,subnode_0,subnode_1,...`
    pub fn write_csv<W: Write>(&self, id: SupernodeId, mut w: W) -> io::Result<()> {
        let records = self.records(id).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("super node {} not generated", id))
        })?;
        let width = self.nodes.get(&id).map(Vec::len).unwrap_or(0);

        let header: Vec<String> = std::iter::once("cycle".to_string())
            .chain((0..width).map(|i| format!("subnode_{}", i)))
            .collect();
        writeln!(w, "{}", header.join(","))?;

        for record in records {
            write!(w, "{}", record.cycle)?;
            for v in record.values {
                write!(w, ",{}", v)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Write every super node into one CSV, columns named `<id>_<index>`
    pub fn write_combined_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        let columns: Vec<(SupernodeId, usize, &Series)> = self
            .nodes
            .iter()
            .flat_map(|(&id, subs)| subs.iter().enumerate().map(move |(i, s)| (id, i, s)))
            .collect();
        let cycles = columns.iter().map(|(_, _, s)| s.len()).max().unwrap_or(0);

        write!(w, "cycle")?;
        for (id, i, _) in &columns {
            write!(w, ",{}_{}", id, i)?;
        }
        writeln!(w)?;

        for cycle in 0..cycles {
            write!(w, "{}", cycle)?;
            for (_, _, s) in &columns {
                write!(w, ",{}", s.get(cycle).copied().unwrap_or(f64::NAN))?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Per sub node statistics for every stored super node
    pub fn stats(&self) -> BTreeMap<SupernodeId, Vec<SeriesStats>> {
        self.nodes
            .iter()
            .map(|(&id, subs)| (id, subs.iter().filter_map(|s| SeriesStats::of(s)).collect()))
            .collect()
    }
}
