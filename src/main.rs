//! Reserving System CLI
//!
//! Command-line demonstration: runs Chain Ladder and the Mack confidence
//! intervals on a sample triangle and writes the full result as JSON.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;

use reserving_system::methods::{Mack, StochasticMethod};
use reserving_system::{MethodCatalog, MethodParams, Triangle};

fn main() -> Result<()> {
    env_logger::init();

    println!("Reserving System v0.1.0");
    println!("=======================\n");

    // Sample motor triangle: four accident years, annual development
    let triangle = Triangle::new(
        vec![
            vec![1_204_000.0, 1_708_000.0, 1_902_000.0, 1_956_000.0],
            vec![1_318_000.0, 1_844_000.0, 2_050_000.0],
            vec![1_416_000.0, 2_012_000.0],
            vec![1_530_000.0],
        ],
        "USD",
        "motor",
    )?
    .with_accident_years(vec![
        "2020".into(),
        "2021".into(),
        "2022".into(),
        "2023".into(),
    ])?;

    let stats = triangle.statistics();
    println!("Triangle: {} ({})", triangle.business_line, triangle.currency);
    println!("  Accident periods:    {}", stats.accident_periods);
    println!("  Development periods: {}", stats.max_development_periods);
    println!("  Density:             {:.0}%", stats.density * 100.0);
    println!("  Paid to date:        ${:.2}", stats.total_paid);
    println!();

    let catalog = MethodCatalog::standard();
    let params = MethodParams::default().with_seed(42);

    // Chain Ladder central estimates
    let result = catalog.calculate("chain_ladder", &triangle, &params)?;

    println!("Chain Ladder results:");
    println!(
        "{:>6} {:>16} {:>16} {:>16}",
        "Year", "Paid", "Ultimate", "Reserve"
    );
    println!("{}", "-".repeat(58));
    let years = triangle.accident_years.as_deref().unwrap_or(&[]);
    let diagonal = triangle.latest_diagonal();
    for (i, ultimate) in result.ultimates.iter().enumerate() {
        println!(
            "{:>6} {:>16.2} {:>16.2} {:>16.2}",
            years.get(i).map(String::as_str).unwrap_or("?"),
            diagonal[i],
            ultimate,
            ultimate - diagonal[i],
        );
    }
    println!("{}", "-".repeat(58));
    println!(
        "{:>6} {:>16.2} {:>16.2} {:>16.2}",
        "Total", result.paid_to_date, result.ultimate_total, result.reserves
    );

    println!("\nDevelopment factors: {:?}", result.development_factors);
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }

    // Mack confidence intervals around the Chain Ladder center
    let interval = Mack::new().confidence_interval(&triangle, &params, 0.95)?;
    println!("\nMack 95% interval (total ultimate):");
    println!(
        "  [{:.2}, {:.2}] around {:.2} ({} resamples)",
        interval.total_lower,
        interval.total_upper,
        interval.central_estimates.iter().sum::<f64>(),
        interval.iterations,
    );

    // Write the rounded transport form to JSON
    let json_path = "calculation_result.json";
    let mut file = File::create(json_path).context("unable to create JSON output")?;
    let payload = serde_json::to_string_pretty(&result.rounded())?;
    file.write_all(payload.as_bytes())?;
    println!("\nFull result written to: {}", json_path);

    Ok(())
}
