//! Configuration model
//!
//! The YAML document produced by the configuration builder is decoded into
//! loosely typed records first, checked once, and then converted into the
//! strongly typed [`Configuration`] the engine consumes.
//!
//! ```yaml
//! n_supernodes: 2
//! n_cycles: 100
//! supernodes:
//!   0:
//!     node_type: independent
//!     n_subnodes: 1
//!     boundaries: [[0, 1]]
//!     control_points: [0.2, 0.8]
//!     n_incomming_nodes: 0
//!     inputs: []
//!   1:
//!     node_type: dependent
//!     n_subnodes: 1
//!     boundaries: [[0, 10]]
//!     control_points: [0.1, 0.5, 0.9]
//!     n_incomming_nodes: 1
//!     inputs:
//!       - input_supernode: 0
//!         correlation: 1.0
//!         weight: 0.5
//!         connections: [[1]]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GenError, GenResult};

/// Super node identifier, assigned at creation and stable for the run
pub type SupernodeId = usize;

/// Noise applied to every synthesized curve unless the document overrides it
pub const DEFAULT_NOISE_STD: f64 = 0.05;

/// Target value range of one sub node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub lower: f64,
    pub upper: f64,
}

impl Boundary {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// One incoming edge of a dependent super node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputEdge {
    pub input_supernode: SupernodeId,
    pub correlation: f64,
    pub weight: f64,
    /// `connections[i][k]` is set when upstream sub node `k` feeds sub node `i`
    pub connections: Vec<Vec<bool>>,
}

impl InputEdge {
    /// Build an edge from 0/1 flag rows as they appear in the YAML document
    pub fn from_flags(
        input_supernode: SupernodeId,
        correlation: f64,
        weight: f64,
        rows: &[&[u8]],
    ) -> Self {
        Self {
            input_supernode,
            correlation,
            weight,
            connections: rows
                .iter()
                .map(|row| row.iter().map(|&f| f == 1).collect())
                .collect(),
        }
    }

    /// Scale applied to every upstream sample this edge contributes
    pub fn gain(&self) -> f64 {
        self.weight * self.correlation
    }
}

/// Generation rule of a super node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Independent,
    Dependent { inputs: Vec<InputEdge> },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Independent => "independent",
            NodeKind::Dependent { .. } => "dependent",
        }
    }

    pub fn inputs(&self) -> &[InputEdge] {
        match self {
            NodeKind::Independent => &[],
            NodeKind::Dependent { inputs } => inputs,
        }
    }

    pub fn is_dependent(&self) -> bool {
        matches!(self, NodeKind::Dependent { .. })
    }
}

/// Declarative description of one super node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuperNodeSpec {
    pub n_subnodes: usize,
    pub boundaries: Vec<Boundary>,
    pub control_points: Vec<f64>,
    pub kind: NodeKind,
}

impl SuperNodeSpec {
    pub fn independent(control_points: Vec<f64>, boundaries: Vec<Boundary>) -> Self {
        Self {
            n_subnodes: boundaries.len(),
            boundaries,
            control_points,
            kind: NodeKind::Independent,
        }
    }

    pub fn dependent(
        control_points: Vec<f64>,
        boundaries: Vec<Boundary>,
        inputs: Vec<InputEdge>,
    ) -> Self {
        Self {
            n_subnodes: boundaries.len(),
            boundaries,
            control_points,
            kind: NodeKind::Dependent { inputs },
        }
    }

    pub fn inputs(&self) -> &[InputEdge] {
        self.kind.inputs()
    }
}

/// Validated generation configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    /// Number of samples in every series
    pub n_cycles: usize,
    /// Standard deviation of the Gaussian noise added to base curves
    pub noise_std: f64,
    pub supernodes: BTreeMap<SupernodeId, SuperNodeSpec>,
}

impl Configuration {
    pub fn new(n_cycles: usize) -> Self {
        Self {
            n_cycles,
            noise_std: DEFAULT_NOISE_STD,
            supernodes: BTreeMap::new(),
        }
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_supernode(mut self, id: SupernodeId, spec: SuperNodeSpec) -> Self {
        self.supernodes.insert(id, spec);
        self
    }

    /// Decode and validate a YAML document
    pub fn from_yaml_str(s: &str) -> GenResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(s)?;
        let violations = check(&raw);
        if !violations.is_empty() {
            return Err(GenError::InvalidConfiguration(violations));
        }
        Ok(raw.into_typed())
    }

    /// Encode back into the interchange document
    pub fn to_yaml(&self) -> GenResult<String> {
        Ok(serde_yaml::to_string(&self.to_raw())?)
    }

    /// Re-run the load-time checks, e.g. for configurations built in code
    pub fn validate(&self) -> GenResult<()> {
        let violations = check(&self.to_raw());
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GenError::InvalidConfiguration(violations))
        }
    }

    /// Number of sub nodes of a super node, if it is declared
    pub fn width(&self, id: SupernodeId) -> Option<usize> {
        self.supernodes.get(&id).map(|s| s.n_subnodes)
    }

    fn to_raw(&self) -> RawConfig {
        RawConfig {
            n_supernodes: Some(self.supernodes.len()),
            n_cycles: self.n_cycles as i64,
            noise_std: Some(self.noise_std),
            supernodes: self
                .supernodes
                .iter()
                .map(|(&id, spec)| (id, RawSuperNode::from(spec)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n_supernodes: Option<usize>,
    n_cycles: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    noise_std: Option<f64>,
    #[serde(default)]
    supernodes: BTreeMap<SupernodeId, RawSuperNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSuperNode {
    node_type: String,
    n_subnodes: i64,
    #[serde(default)]
    boundaries: Vec<Vec<f64>>,
    #[serde(default)]
    control_points: Vec<f64>,
    /// Number of leading `inputs` that take part; all of them when absent
    #[serde(default, alias = "n_incoming_nodes", skip_serializing_if = "Option::is_none")]
    n_incomming_nodes: Option<i64>,
    #[serde(default)]
    inputs: Vec<RawInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawInput {
    input_supernode: SupernodeId,
    correlation: f64,
    weight: f64,
    #[serde(default)]
    connections: Vec<Vec<u8>>,
}

impl From<&SuperNodeSpec> for RawSuperNode {
    fn from(spec: &SuperNodeSpec) -> Self {
        let inputs: Vec<RawInput> = spec
            .inputs()
            .iter()
            .map(|edge| RawInput {
                input_supernode: edge.input_supernode,
                correlation: edge.correlation,
                weight: edge.weight,
                connections: edge
                    .connections
                    .iter()
                    .map(|row| row.iter().map(|&b| b as u8).collect())
                    .collect(),
            })
            .collect();
        RawSuperNode {
            node_type: spec.kind.name().to_string(),
            n_subnodes: spec.n_subnodes as i64,
            boundaries: spec
                .boundaries
                .iter()
                .map(|b| vec![b.lower, b.upper])
                .collect(),
            control_points: spec.control_points.clone(),
            n_incomming_nodes: Some(inputs.len() as i64),
            inputs,
        }
    }
}

impl RawSuperNode {
    fn declared_incoming(&self) -> i64 {
        self.n_incomming_nodes.unwrap_or(self.inputs.len() as i64)
    }

    // Only the first `n_incomming_nodes` inputs feed the node.
    fn used_inputs(&self) -> usize {
        (self.declared_incoming().max(0) as usize).min(self.inputs.len())
    }
}

impl RawConfig {
    // Only called after `check` came back clean.
    fn into_typed(self) -> Configuration {
        let supernodes = self
            .supernodes
            .into_iter()
            .map(|(id, node)| {
                let boundaries = node
                    .boundaries
                    .iter()
                    .map(|b| Boundary::new(b[0], b[1]))
                    .collect();
                let kind = if node.node_type == "dependent" {
                    let used = node.used_inputs();
                    for (j, input) in node.inputs.iter().enumerate().skip(used) {
                        warn!(
                            supernode = id,
                            input = j,
                            upstream = input.input_supernode,
                            n_incomming_nodes = used,
                            "ignoring input beyond n_incomming_nodes"
                        );
                    }
                    NodeKind::Dependent {
                        inputs: node
                            .inputs
                            .into_iter()
                            .take(used)
                            .map(|input| InputEdge {
                                input_supernode: input.input_supernode,
                                correlation: input.correlation,
                                weight: input.weight,
                                connections: input
                                    .connections
                                    .into_iter()
                                    .map(|row| row.into_iter().map(|f| f == 1).collect())
                                    .collect(),
                            })
                            .collect(),
                    }
                } else {
                    NodeKind::Independent
                };
                let spec = SuperNodeSpec {
                    n_subnodes: node.n_subnodes as usize,
                    boundaries,
                    control_points: node.control_points,
                    kind,
                };
                (id, spec)
            })
            .collect();

        Configuration {
            n_cycles: self.n_cycles as usize,
            noise_std: self.noise_std.unwrap_or(DEFAULT_NOISE_STD),
            supernodes,
        }
    }
}

fn check(raw: &RawConfig) -> Vec<String> {
    let mut v = Vec::new();

    if raw.n_cycles <= 0 {
        v.push(format!("n_cycles must be positive, got {}", raw.n_cycles));
    }
    if let Some(n) = raw.n_supernodes {
        if n != raw.supernodes.len() {
            v.push(format!(
                "n_supernodes is {} but {} super nodes are defined",
                n,
                raw.supernodes.len()
            ));
        }
    }
    if let Some(noise) = raw.noise_std {
        if !noise.is_finite() || noise < 0.0 {
            v.push(format!("noise_std must be finite and non-negative, got {}", noise));
        }
    }
    if raw.supernodes.is_empty() {
        v.push("no super nodes defined".to_string());
    }

    for (id, node) in &raw.supernodes {
        check_supernode(*id, node, &mut v);
    }
    v
}

fn check_supernode(id: SupernodeId, node: &RawSuperNode, v: &mut Vec<String>) {
    let at = format!("super node {}", id);

    if node.n_subnodes < 1 {
        v.push(format!("{}: n_subnodes must be at least 1, got {}", at, node.n_subnodes));
    }
    if node.n_subnodes != node.boundaries.len() as i64 {
        v.push(format!(
            "{}: n_subnodes is {} but {} boundaries are given",
            at,
            node.n_subnodes,
            node.boundaries.len()
        ));
    }
    for (i, b) in node.boundaries.iter().enumerate() {
        match b.as_slice() {
            [lower, upper] if lower.is_finite() && upper.is_finite() => {
                if lower > upper {
                    v.push(format!(
                        "{}: boundary {} has lower {} above upper {}",
                        at, i, lower, upper
                    ));
                }
            }
            [_, _] => v.push(format!("{}: boundary {} is not finite", at, i)),
            other => v.push(format!(
                "{}: boundary {} must be a [lower, upper] pair, got {} values",
                at,
                i,
                other.len()
            )),
        }
    }

    if node.control_points.is_empty() {
        v.push(format!("{}: control_points must not be empty", at));
    }
    for (i, p) in node.control_points.iter().enumerate() {
        if !(0.0..=1.0).contains(p) {
            v.push(format!("{}: control point {} ({}) is outside [0, 1]", at, i, p));
        }
    }

    match node.node_type.as_str() {
        "independent" => {
            if !node.inputs.is_empty() {
                v.push(format!("{}: independent node must not declare inputs", at));
            }
        }
        "dependent" => {
            let declared = node.declared_incoming();
            if declared < 0 {
                v.push(format!("{}: n_incomming_nodes must not be negative", at));
            }
            if declared > 0 && node.inputs.is_empty() {
                v.push(format!("{}: declares {} incoming nodes but no inputs", at, declared));
            } else if (node.inputs.len() as i64) < declared {
                v.push(format!(
                    "{}: declares {} incoming nodes but only {} inputs",
                    at,
                    declared,
                    node.inputs.len()
                ));
            }
            for (j, input) in node.inputs.iter().enumerate() {
                check_input(&at, j, node.n_subnodes, input, v);
            }
        }
        other => v.push(format!(
            "{}: unknown node_type '{}', expected 'independent' or 'dependent'",
            at, other
        )),
    }
}

fn check_input(at: &str, j: usize, n_subnodes: i64, input: &RawInput, v: &mut Vec<String>) {
    if !(-1.0..=1.0).contains(&input.correlation) {
        v.push(format!(
            "{}: input {} correlation {} is outside [-1, 1]",
            at, j, input.correlation
        ));
    }
    if !(0.0..=1.0).contains(&input.weight) {
        v.push(format!("{}: input {} weight {} is outside [0, 1]", at, j, input.weight));
    }
    if input.connections.len() as i64 != n_subnodes {
        v.push(format!(
            "{}: input {} has {} connection rows, expected one per sub node ({})",
            at,
            j,
            input.connections.len(),
            n_subnodes
        ));
    }
    let bad_flag = input
        .connections
        .iter()
        .flatten()
        .any(|&f| f > 1);
    if bad_flag {
        v.push(format!("{}: input {} connections must only contain 0 or 1", at, j));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = r#"
n_supernodes: 2
n_cycles: 50
supernodes:
  0:
    node_type: independent
    n_subnodes: 2
    boundaries: [[0, 1], [10, 20]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 0
    inputs: []
  1:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[-5, 5]]
    control_points: [0.1, 0.9, 0.4]
    n_incomming_nodes: 1
    inputs:
      - input_supernode: 0
        correlation: -0.5
        weight: 0.25
        connections: [[1, 0]]
"#;

    #[test]
    fn test_load_typed_model() {
        let config = Configuration::from_yaml_str(TWO_NODES).unwrap();
        assert_eq!(config.n_cycles, 50);
        assert_eq!(config.noise_std, DEFAULT_NOISE_STD);
        assert_eq!(config.supernodes.len(), 2);

        let first = &config.supernodes[&0];
        assert_eq!(first.kind, NodeKind::Independent);
        assert_eq!(first.boundaries[1], Boundary::new(10.0, 20.0));

        let second = &config.supernodes[&1];
        let inputs = second.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].input_supernode, 0);
        assert_eq!(inputs[0].connections, vec![vec![true, false]]);
        assert_eq!(inputs[0].gain(), -0.125);
    }

    #[test]
    fn test_yaml_roundtrip_preserves_model() {
        let config = Configuration::from_yaml_str(TWO_NODES).unwrap();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("n_incomming_nodes"));
        let again = Configuration::from_yaml_str(&yaml).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_alias_and_noise_override() {
        let doc = r#"
n_cycles: 10
noise_std: 0.0
supernodes:
  0:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.0, 1.0]
    n_incoming_nodes: 0
"#;
        let config = Configuration::from_yaml_str(doc).unwrap();
        assert_eq!(config.noise_std, 0.0);
        assert!(config.supernodes[&0].kind.is_dependent());
        assert!(config.supernodes[&0].inputs().is_empty());
    }

    #[test]
    fn test_violations_are_collected() {
        let doc = r#"
n_supernodes: 3
n_cycles: 0
supernodes:
  0:
    node_type: sideways
    n_subnodes: 2
    boundaries: [[1, 0]]
    control_points: []
  1:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.5, 1.5]
    n_incomming_nodes: 1
"#;
        let err = Configuration::from_yaml_str(doc).unwrap_err();
        let GenError::InvalidConfiguration(v) = err else {
            panic!("expected InvalidConfiguration");
        };
        let all = v.join("\n");
        assert!(all.contains("n_cycles must be positive"));
        assert!(all.contains("n_supernodes is 3"));
        assert!(all.contains("unknown node_type 'sideways'"));
        assert!(all.contains("n_subnodes is 2 but 1 boundaries"));
        assert!(all.contains("lower 1 above upper 0"));
        assert!(all.contains("control_points must not be empty"));
        assert!(all.contains("outside [0, 1]"));
        assert!(all.contains("declares 1 incoming nodes but no inputs"));
    }

    #[test]
    fn test_input_ranges_checked() {
        let config = Configuration::new(10).with_supernode(
            0,
            SuperNodeSpec::dependent(
                vec![0.1, 0.9],
                vec![Boundary::default()],
                vec![InputEdge {
                    input_supernode: 1,
                    correlation: 1.5,
                    weight: -0.1,
                    connections: vec![],
                }],
            ),
        );
        let err = config.validate().unwrap_err();
        let GenError::InvalidConfiguration(v) = err else {
            panic!("expected InvalidConfiguration");
        };
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_only_declared_inputs_are_used() {
        let doc = r#"
n_cycles: 10
supernodes:
  0:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
  1:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
  2:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 1
    inputs:
      - input_supernode: 0
        correlation: 1.0
        weight: 1.0
        connections: [[1]]
      - input_supernode: 1
        correlation: 1.0
        weight: 1.0
        connections: [[1]]
"#;
        let config = Configuration::from_yaml_str(doc).unwrap();
        let inputs = config.supernodes[&2].inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].input_supernode, 0);

        // without a count every listed input takes part
        let config = Configuration::from_yaml_str(&doc.replace("    n_incomming_nodes: 1\n", "")).unwrap();
        assert_eq!(config.supernodes[&2].inputs().len(), 2);
    }

    #[test]
    fn test_independent_with_inputs_rejected() {
        let doc = r#"
n_cycles: 10
supernodes:
  0:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    inputs:
      - input_supernode: 1
        correlation: 1.0
        weight: 1.0
        connections: [[1]]
"#;
        let GenError::InvalidConfiguration(v) = Configuration::from_yaml_str(doc).unwrap_err() else {
            panic!("expected InvalidConfiguration");
        };
        assert_eq!(v, vec!["super node 0: independent node must not declare inputs".to_string()]);
    }

    #[test]
    fn test_too_few_inputs_rejected() {
        let doc = r#"
n_cycles: 10
supernodes:
  0:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 3
    inputs:
      - input_supernode: 1
        correlation: 1.0
        weight: 1.0
        connections: [[1]]
"#;
        let GenError::InvalidConfiguration(v) = Configuration::from_yaml_str(doc).unwrap_err() else {
            panic!("expected InvalidConfiguration");
        };
        assert_eq!(v, vec!["super node 0: declares 3 incoming nodes but only 1 inputs".to_string()]);
    }

    #[test]
    fn test_connection_flags_must_be_binary() {
        let doc = r#"
n_cycles: 10
supernodes:
  0:
    node_type: dependent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 1
    inputs:
      - input_supernode: 1
        correlation: 1.0
        weight: 1.0
        connections: [[0, 2]]
"#;
        let GenError::InvalidConfiguration(v) = Configuration::from_yaml_str(doc).unwrap_err() else {
            panic!("expected InvalidConfiguration");
        };
        assert_eq!(v, vec!["super node 0: input 0 connections must only contain 0 or 1".to_string()]);
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = Configuration::from_yaml_str("n_cycles: [oops").unwrap_err();
        assert!(matches!(err, GenError::Parse(_)));
    }

    #[test]
    fn test_unknown_upstream_is_not_a_load_error() {
        let config = Configuration::new(10).with_supernode(
            0,
            SuperNodeSpec::dependent(
                vec![0.1, 0.9],
                vec![Boundary::default()],
                vec![InputEdge::from_flags(9, 1.0, 1.0, &[&[1]])],
            ),
        );
        assert!(config.validate().is_ok());
    }
}
