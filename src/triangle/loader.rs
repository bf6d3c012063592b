//! Load triangles from long-format CSV
//!
//! Expected columns: `accident_period` (0-based row index or year label),
//! `development_period` (0-based column index), `cumulative`. Cells may
//! arrive in any order; the loader assembles rows and validates the result.

use std::collections::BTreeMap;
use std::path::Path;

use csv::Reader;

use crate::error::ReservingError;

use super::Triangle;

/// Raw CSV row in long format
#[derive(Debug, serde::Deserialize)]
struct CsvCell {
    #[serde(rename = "accident_period")]
    accident_period: String,
    #[serde(rename = "development_period")]
    development_period: usize,
    #[serde(rename = "cumulative")]
    cumulative: f64,
}

fn assemble(cells: Vec<CsvCell>, currency: &str, business_line: &str) -> Result<Triangle, ReservingError> {
    if cells.is_empty() {
        return Err(ReservingError::Load("CSV contained no triangle cells".to_string()));
    }

    // Group by accident period, preserving first-seen label order
    let mut order: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, Vec<(usize, f64)>> = BTreeMap::new();
    for cell in cells {
        if !grouped.contains_key(&cell.accident_period) {
            order.push(cell.accident_period.clone());
        }
        grouped
            .entry(cell.accident_period)
            .or_default()
            .push((cell.development_period, cell.cumulative));
    }

    let mut rows = Vec::with_capacity(order.len());
    for label in &order {
        let mut entries = grouped.remove(label).unwrap_or_default();
        entries.sort_by_key(|(j, _)| *j);

        // Development periods must be consecutive from zero
        for (expected, (j, _)) in entries.iter().enumerate() {
            if *j != expected {
                return Err(ReservingError::Load(format!(
                    "accident period {}: development periods are not consecutive from 0 (found {})",
                    label, j
                )));
            }
        }
        rows.push(entries.into_iter().map(|(_, v)| v).collect());
    }

    Triangle::new(rows, currency, business_line)?.with_accident_years(order)
}

/// Load a triangle from a long-format CSV file.
pub fn load_triangle<P: AsRef<Path>>(
    path: P,
    currency: &str,
    business_line: &str,
) -> Result<Triangle, ReservingError> {
    let mut reader = Reader::from_path(path)?;
    let cells = reader
        .deserialize()
        .collect::<Result<Vec<CsvCell>, csv::Error>>()?;
    assemble(cells, currency, business_line)
}

/// Load a triangle from any reader (e.g. a string buffer).
pub fn load_triangle_from_reader<R: std::io::Read>(
    reader: R,
    currency: &str,
    business_line: &str,
) -> Result<Triangle, ReservingError> {
    let mut csv_reader = Reader::from_reader(reader);
    let cells = csv_reader
        .deserialize()
        .collect::<Result<Vec<CsvCell>, csv::Error>>()?;
    assemble(cells, currency, business_line)
}
