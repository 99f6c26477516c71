//! Super-node dependency graph

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::{Configuration, SupernodeId};
use crate::error::{GenError, GenResult};

/// Address of a single sub node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubnodeRef {
    pub supernode: SupernodeId,
    pub index: usize,
}

/// Directed graph derived from the input edges of a configuration
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<SupernodeId>,
    /// upstream -> downstream
    edges: BTreeSet<(SupernodeId, SupernodeId)>,
    subnode_edges: BTreeSet<(SubnodeRef, SubnodeRef)>,
}

impl DependencyGraph {
    pub fn from_config(config: &Configuration) -> Self {
        let mut graph = Self::default();
        for (&id, spec) in &config.supernodes {
            graph.nodes.insert(id);
            for edge in spec.inputs() {
                graph.edges.insert((edge.input_supernode, id));
                for (i, row) in edge.connections.iter().enumerate() {
                    for (k, _) in row.iter().enumerate().filter(|(_, &on)| on) {
                        graph.subnode_edges.insert((
                            SubnodeRef {
                                supernode: edge.input_supernode,
                                index: k,
                            },
                            SubnodeRef { supernode: id, index: i },
                        ));
                    }
                }
            }
        }
        graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = SupernodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Super-node edges as `(upstream, downstream)`, duplicates removed
    pub fn edges(&self) -> impl Iterator<Item = (SupernodeId, SupernodeId)> + '_ {
        self.edges.iter().copied()
    }

    /// Sub-node edges as `(upstream, downstream)`, duplicates removed
    pub fn subnode_edges(&self) -> impl Iterator<Item = (SubnodeRef, SubnodeRef)> + '_ {
        self.subnode_edges.iter().copied()
    }

    pub fn upstream_of(&self, id: SupernodeId) -> Vec<SupernodeId> {
        self.edges
            .iter()
            .filter(|(_, down)| *down == id)
            .map(|(up, _)| *up)
            .collect()
    }

    /// Kahn's algorithm, always releasing the lowest ready id first.
    pub fn topological_order(&self) -> GenResult<Vec<SupernodeId>> {
        let mut in_degree: BTreeMap<SupernodeId, usize> =
            self.nodes.iter().map(|&id| (id, 0)).collect();
        let mut downstream: BTreeMap<SupernodeId, Vec<SupernodeId>> = BTreeMap::new();

        for &(up, down) in &self.edges {
            if !self.nodes.contains(&up) {
                return Err(GenError::UnknownUpstreamSupernode {
                    supernode: down,
                    upstream: up,
                });
            }
            *in_degree.entry(down).or_insert(0) += 1;
            downstream.entry(up).or_default().push(down);
        }

        let mut ready: BTreeSet<SupernodeId> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for &next in downstream.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id)
                .collect();
            return Err(GenError::CyclicDependency(stuck));
        }
        Ok(order)
    }
}
