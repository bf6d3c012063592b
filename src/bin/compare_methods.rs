//! Compare every catalog method on one triangle
//!
//! Usage: cargo run --bin compare_methods [triangle.csv]
//!
//! Loads a long-format triangle CSV when a path is given, otherwise uses a
//! built-in sample. Independent calculations share no state, so the methods
//! run in parallel.

use anyhow::{Context, Result};
use rayon::prelude::*;

use reserving_system::triangle::load_triangle;
use reserving_system::{CalculationResult, MethodCatalog, MethodParams, Triangle};

fn sample_triangle() -> Result<Triangle> {
    Ok(Triangle::new(
        vec![
            vec![1_204_000.0, 1_708_000.0, 1_902_000.0, 1_956_000.0],
            vec![1_318_000.0, 1_844_000.0, 2_050_000.0],
            vec![1_416_000.0, 2_012_000.0],
            vec![1_530_000.0],
        ],
        "USD",
        "motor",
    )?)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let triangle = match args.get(1) {
        Some(path) => load_triangle(path, "USD", "loaded")
            .with_context(|| format!("failed to load triangle from {}", path))?,
        None => sample_triangle()?,
    };

    let params = MethodParams::default()
        .with_seed(42)
        .with_expected_loss_ratio(0.85);

    let catalog = MethodCatalog::standard();
    let ids = catalog.ids();

    println!("Comparing {} methods on a {}-period triangle",
        ids.len(),
        triangle.accident_periods()
    );
    println!();

    // Each calculation owns its working copies; run them in parallel
    let results: Vec<(&str, Result<CalculationResult, _>)> = ids
        .par_iter()
        .map(|&id| (id, catalog.calculate(id, &triangle, &params)))
        .collect();

    println!(
        "{:<22} {:>16} {:>16} {:>10} {:>9}",
        "Method", "Ultimate", "Reserve", "Warnings", "ms"
    );
    println!("{}", "-".repeat(78));

    for (id, outcome) in &results {
        match outcome {
            Ok(result) => {
                println!(
                    "{:<22} {:>16.2} {:>16.2} {:>10} {:>9.1}",
                    id,
                    result.ultimate_total,
                    result.reserves,
                    result.warnings.len(),
                    result.computation_ms,
                );
            }
            Err(err) => {
                println!("{:<22} failed: {}", id, err);
            }
        }
    }

    // Spread of the successful estimates
    let ultimates: Vec<f64> = results
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok().map(|r| r.ultimate_total))
        .collect();
    if ultimates.len() >= 2 {
        let min = ultimates.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ultimates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = ultimates.iter().sum::<f64>() / ultimates.len() as f64;
        println!("{}", "-".repeat(78));
        println!(
            "Ultimate spread: min {:.2}, mean {:.2}, max {:.2} ({:.1}% range)",
            min,
            mean,
            max,
            (max - min) / mean * 100.0
        );
    }

    Ok(())
}
