//! Generate the sample network and print a short summary of every sub node

use netseries_core::{generate_with, Configuration, DependencyGraph, GenerateOptions, GenError};

const NETWORK: &str = include_str!("configs/network.yaml");

fn main() -> Result<(), GenError> {
    println!("=== netseries demo ===\n");

    let config = Configuration::from_yaml_str(NETWORK)?;
    println!(
        "✓ Loaded {} super nodes, {} cycles each",
        config.supernodes.len(),
        config.n_cycles
    );

    let graph = DependencyGraph::from_config(&config);
    for (up, down) in graph.edges() {
        println!("  super node {} -> super node {}", up, down);
    }
    println!();

    let series = generate_with(&config, &GenerateOptions::seeded(2024))?;
    for (id, stats) in series.stats() {
        let kind = config.supernodes[&id].kind.name();
        for (i, s) in stats.iter().enumerate() {
            println!(
                "{} super node {} / sub node {}: min {:8.3}  max {:8.3}  mean {:8.3}",
                kind, id, i, s.min, s.max, s.mean
            );
        }
    }

    println!("\nFirst cycles of super node 2:");
    if let Some(records) = series.records(2) {
        for record in records.iter().take(5) {
            println!("  {:>3}: {:?}", record.cycle, record.values);
        }
    }

    println!("\n=== Demo complete ===");
    Ok(())
}
