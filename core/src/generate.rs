//! Generation orchestrator
//!
//! Resolves the order in which super nodes are produced and threads the
//! growing [`GeneratedSeries`] into every dependent node. A run is
//! all-or-nothing: the first failure aborts it and nothing is returned.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::compose::compose;
use crate::config::{Configuration, SupernodeId};
use crate::error::{GenError, GenResult};
use crate::graph::DependencyGraph;
use crate::series::GeneratedSeries;

/// Strategy used to order super-node generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolveOrder {
    /// Every independent node in id order, then every dependent node in id
    /// order. A dependent node may only read independent nodes and dependent
    /// nodes with a lower id.
    #[default]
    TwoPass,
    /// Kahn's algorithm over the input edges; supports arbitrary chain
    /// depth and rejects cycles.
    Topological,
}

impl FromStr for ResolveOrder {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-pass" | "two_pass" | "twopass" => Ok(ResolveOrder::TwoPass),
            "topological" | "topo" => Ok(ResolveOrder::Topological),
            other => Err(GenError::Parse(format!(
                "unknown order '{}', expected 'two-pass' or 'topological'",
                other
            ))),
        }
    }
}

/// Options for a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub order: ResolveOrder,
    /// Seed for the noise source; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl GenerateOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: ResolveOrder) -> Self {
        self.order = order;
        self
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Generate every super node with the default two-pass order and an
/// entropy-seeded noise source.
pub fn generate(config: &Configuration) -> GenResult<GeneratedSeries> {
    generate_with(config, &GenerateOptions::default())
}

/// Generate with explicit options
pub fn generate_with(config: &Configuration, options: &GenerateOptions) -> GenResult<GeneratedSeries> {
    let mut rng = options.rng();
    generate_with_rng(config, options.order, &mut rng)
}

/// Generate drawing noise from a caller supplied random source
pub fn generate_with_rng<R: Rng + ?Sized>(
    config: &Configuration,
    order: ResolveOrder,
    rng: &mut R,
) -> GenResult<GeneratedSeries> {
    preflight(config)?;
    config.validate()?;
    let order = resolve(config, order)?;
    info!(
        supernodes = config.supernodes.len(),
        n_cycles = config.n_cycles,
        "generating series"
    );

    let mut generated = GeneratedSeries::new();
    for id in order {
        let spec = &config.supernodes[&id];
        let series = compose(id, spec, config.n_cycles, config.noise_std, &generated, rng)?;
        debug!(supernode = id, kind = spec.kind.name(), subnodes = series.len(), "generated super node");
        generated.insert(id, series)?;
    }
    Ok(generated)
}

/// Ids in the order they will be generated
pub fn resolve(config: &Configuration, order: ResolveOrder) -> GenResult<Vec<SupernodeId>> {
    match order {
        ResolveOrder::TwoPass => {
            let (independent, dependent): (Vec<_>, Vec<_>) = config
                .supernodes
                .iter()
                .partition(|(_, spec)| !spec.kind.is_dependent());
            Ok(independent
                .into_iter()
                .chain(dependent)
                .map(|(&id, _)| id)
                .collect())
        }
        ResolveOrder::Topological => DependencyGraph::from_config(config).topological_order(),
    }
}

// Curves need two control points; check every node before producing output.
// Runs ahead of `validate` so a short control-point list is reported as such.
fn preflight(config: &Configuration) -> GenResult<()> {
    for (&id, spec) in &config.supernodes {
        if spec.control_points.len() < 2 {
            return Err(GenError::InsufficientControlPoints {
                supernode: Some(id),
                found: spec.control_points.len(),
            });
        }
    }
    Ok(())
}
