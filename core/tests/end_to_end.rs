use approx::assert_abs_diff_eq;
use netseries_core::{
    generate, generate_with, synthesize, Boundary, Configuration, GenError, GenerateOptions,
    InputEdge, ResolveOrder, SuperNodeSpec,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const TWO_INDEPENDENT: &str = r#"
n_supernodes: 2
n_cycles: 100
supernodes:
  0:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 0
    inputs: []
  1:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
    n_incomming_nodes: 0
    inputs: []
"#;

#[test]
fn independent_nodes_fill_every_cycle() {
    let config = Configuration::from_yaml_str(TWO_INDEPENDENT).unwrap();
    let out = generate(&config).unwrap();

    assert_eq!(out.len(), 2);
    for id in [0, 1] {
        let series = out.subnode(id, 0).unwrap();
        assert_eq!(series.len(), 100);
        assert!(series.iter().all(|v| (-1e-9..=1.0 + 1e-9).contains(v)));
    }
}

#[test]
fn every_declared_subnode_gets_n_cycles_values() {
    let config = Configuration::new(37)
        .with_supernode(
            0,
            SuperNodeSpec::independent(
                vec![0.1, 0.6, 0.3],
                vec![Boundary::new(0.0, 1.0), Boundary::new(-2.0, 2.0), Boundary::new(100.0, 150.0)],
            ),
        )
        .with_supernode(
            1,
            SuperNodeSpec::dependent(
                vec![0.9, 0.2],
                vec![Boundary::new(0.0, 5.0), Boundary::new(0.0, 5.0)],
                vec![InputEdge::from_flags(0, 0.8, 0.3, &[&[1, 0, 1], &[0, 1, 0]])],
            ),
        );
    config.validate().unwrap();

    let out = generate_with(&config, &GenerateOptions::seeded(5)).unwrap();
    for (&id, spec) in &config.supernodes {
        let series = out.get(id).unwrap();
        assert_eq!(series.len(), spec.n_subnodes);
        assert!(series.iter().all(|s| s.len() == 37));
    }
}

#[test]
fn dependent_node_is_base_plus_weighted_upstream() {
    let config = Configuration::new(100)
        .with_noise(0.0)
        .with_supernode(
            0,
            SuperNodeSpec::independent(vec![0.2, 0.8], vec![Boundary::new(0.0, 1.0)]),
        )
        .with_supernode(
            1,
            SuperNodeSpec::independent(vec![0.3, 0.1, 0.9], vec![Boundary::new(0.0, 3.0)]),
        )
        .with_supernode(
            2,
            SuperNodeSpec::dependent(
                vec![0.1, 0.7, 0.4],
                vec![Boundary::new(10.0, 20.0)],
                vec![InputEdge::from_flags(0, 1.0, 0.5, &[&[1]])],
            ),
        );

    let out = generate(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let upstream = synthesize(&[0.2, 0.8], Boundary::new(0.0, 1.0), 100, 0.0, &mut rng).unwrap();
    let own = synthesize(&[0.1, 0.7, 0.4], Boundary::new(10.0, 20.0), 100, 0.0, &mut rng).unwrap();

    assert_eq!(out.subnode(0, 0).unwrap(), &upstream);
    let dependent = out.subnode(2, 0).unwrap();
    for c in 0..100 {
        assert_abs_diff_eq!(dependent[c], own[c] + 0.5 * upstream[c], epsilon = 1e-9);
    }
}

#[test]
fn empty_control_points_fail_before_output() {
    let config = Configuration::new(10)
        .with_supernode(
            0,
            SuperNodeSpec::independent(vec![0.2, 0.8], vec![Boundary::default()]),
        )
        .with_supernode(
            1,
            SuperNodeSpec::dependent(
                vec![],
                vec![Boundary::default()],
                vec![InputEdge::from_flags(0, 1.0, 1.0, &[&[1]])],
            ),
        );
    let err = generate(&config).unwrap_err();
    assert!(matches!(
        err,
        GenError::InsufficientControlPoints {
            supernode: Some(1),
            found: 0
        }
    ));
}

#[test]
fn undefined_upstream_fails() {
    let config = Configuration::new(10).with_supernode(
        0,
        SuperNodeSpec::dependent(
            vec![0.2, 0.8],
            vec![Boundary::default()],
            vec![InputEdge::from_flags(3, 1.0, 1.0, &[&[1]])],
        ),
    );
    for order in [ResolveOrder::TwoPass, ResolveOrder::Topological] {
        let err = generate_with(&config, &GenerateOptions::seeded(1).with_order(order)).unwrap_err();
        assert_eq!(
            err,
            GenError::UnknownUpstreamSupernode {
                supernode: 0,
                upstream: 3
            }
        );
    }
}

#[test]
fn connection_row_width_must_match_upstream() {
    let config = Configuration::new(10)
        .with_supernode(
            0,
            SuperNodeSpec::independent(vec![0.2, 0.8], vec![Boundary::default(); 2]),
        )
        .with_supernode(
            1,
            SuperNodeSpec::dependent(
                vec![0.2, 0.8],
                vec![Boundary::default()],
                vec![InputEdge::from_flags(0, 1.0, 1.0, &[&[1]])],
            ),
        );
    let err = generate_with(&config, &GenerateOptions::seeded(1)).unwrap_err();
    assert_eq!(
        err,
        GenError::ConnectionLengthMismatch {
            supernode: 1,
            subnode: 0,
            upstream: 0,
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn two_pass_reads_lower_dependent_ids() {
    let config = Configuration::new(20)
        .with_noise(0.0)
        .with_supernode(
            0,
            SuperNodeSpec::independent(vec![0.2, 0.8], vec![Boundary::default()]),
        )
        .with_supernode(
            1,
            SuperNodeSpec::dependent(
                vec![0.2, 0.8],
                vec![Boundary::default()],
                vec![InputEdge::from_flags(0, 1.0, 1.0, &[&[1]])],
            ),
        )
        .with_supernode(
            2,
            SuperNodeSpec::dependent(
                vec![0.8, 0.2],
                vec![Boundary::default()],
                vec![InputEdge::from_flags(1, -1.0, 0.5, &[&[1]])],
            ),
        );
    let out = generate(&config).unwrap();
    let one = out.subnode(1, 0).unwrap();
    let two = out.subnode(2, 0).unwrap();
    // all three base curves coincide with node 0's series
    let zero = out.subnode(0, 0).unwrap();
    for c in 0..20 {
        assert_abs_diff_eq!(two[c], zero[c] - 0.5 * one[c], epsilon = 1e-9);
    }
}

#[test]
fn only_leading_declared_inputs_contribute() {
    let doc = r#"
n_cycles: 30
noise_std: 0.0
supernodes:
  0:
    node_type: independent
    n_subnodes: 1
    boundaries: [[0, 1]]
    control_points: [0.2, 0.8]
  1:
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
      - input_supernode: 0
        correlation: 1.0
        weight: 1.0
        connections: [[1]]
"#;
    let config = Configuration::from_yaml_str(doc).unwrap();
    let out = generate(&config).unwrap();
    let upstream = out.subnode(0, 0).unwrap();
    let dependent = out.subnode(1, 0).unwrap();
    assert_abs_diff_eq!(upstream[29], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(dependent[29], 2.0, epsilon = 1e-9);
}

#[test]
fn in_memory_config_with_zero_cycles_is_invalid() {
    let config = Configuration::new(0).with_supernode(
        0,
        SuperNodeSpec::independent(vec![0.2, 0.8], vec![Boundary::default()]),
    );
    assert!(matches!(
        generate(&config).unwrap_err(),
        GenError::InvalidConfiguration(_)
    ));
}
