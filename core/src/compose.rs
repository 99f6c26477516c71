//! Series composer: base curves plus weighted upstream contributions

use rand::Rng;
use tracing::debug;

use crate::config::{InputEdge, NodeKind, SuperNodeSpec, SupernodeId};
use crate::curve::{synthesize, Series};
use crate::error::{GenError, GenResult};
use crate::series::{GeneratedSeries, SuperNodeSeries};

/// Base curves of a super node, one per sub node, ignoring any inputs
pub fn base<R: Rng + ?Sized>(
    id: SupernodeId,
    spec: &SuperNodeSpec,
    n_cycles: usize,
    noise_std: f64,
    rng: &mut R,
) -> GenResult<SuperNodeSeries> {
    (0..spec.n_subnodes)
        .map(|i| {
            let range = spec.boundaries.get(i).copied().ok_or_else(|| {
                GenError::InvalidConfiguration(vec![format!(
                    "super node {}: no boundary for sub node {}",
                    id, i
                )])
            })?;
            let series = synthesize(&spec.control_points, range, n_cycles, noise_std, &mut *rng)
                .map_err(|e| e.locate(id, i))?;
            debug!(supernode = id, subnode = i, "synthesized base curve");
            Ok(series)
        })
        .collect()
}

/// Base curves plus every connected upstream sub-series scaled by
/// `weight * correlation`.
///
/// Inputs are accumulated in declaration order, upstream sub nodes in index
/// order. Independent specs get their base curves only.
pub fn compose<R: Rng + ?Sized>(
    id: SupernodeId,
    spec: &SuperNodeSpec,
    n_cycles: usize,
    noise_std: f64,
    prior: &GeneratedSeries,
    rng: &mut R,
) -> GenResult<SuperNodeSeries> {
    let mut series = base(id, spec, n_cycles, noise_std, rng)?;
    if let NodeKind::Dependent { inputs } = &spec.kind {
        for (i, target) in series.iter_mut().enumerate() {
            for edge in inputs {
                accumulate(id, i, edge, prior, target)?;
            }
        }
    }
    Ok(series)
}

/// Add one edge's contribution to sub node `index` of super node `id`.
pub fn accumulate(
    id: SupernodeId,
    index: usize,
    edge: &InputEdge,
    prior: &GeneratedSeries,
    target: &mut Series,
) -> GenResult<()> {
    let upstream = prior
        .get(edge.input_supernode)
        .ok_or(GenError::UnknownUpstreamSupernode {
            supernode: id,
            upstream: edge.input_supernode,
        })?;

    let row = edge.connections.get(index).map(Vec::as_slice).unwrap_or(&[]);
    if row.len() != upstream.len() {
        return Err(GenError::ConnectionLengthMismatch {
            supernode: id,
            subnode: index,
            upstream: edge.input_supernode,
            expected: upstream.len(),
            found: row.len(),
        });
    }

    let gain = edge.gain();
    for (k, source) in row
        .iter()
        .zip(upstream)
        .enumerate()
        .filter_map(|(k, (&on, s))| on.then_some((k, s)))
    {
        if source.len() != target.len() {
            return Err(GenError::Internal(format!(
                "super node {} sub node {} has {} cycles, upstream {} sub node {} has {}",
                id,
                index,
                target.len(),
                edge.input_supernode,
                k,
                source.len()
            )));
        }
        for (t, s) in target.iter_mut().zip(source) {
            *t += s * gain;
        }
        debug!(
            supernode = id,
            subnode = index,
            upstream = edge.input_supernode,
            upstream_subnode = k,
            gain,
            "added upstream contribution"
        );
    }
    Ok(())
}
