//! Validated loss-triangle structure and derived statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReservingError;

/// A validated loss triangle: cumulative paid/incurred amounts by accident
/// period and development period.
///
/// Rows are ordered oldest accident period first. Construction validates the
/// triangular shape, finiteness, non-negativity, and row monotonicity; the
/// structure is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triangle {
    rows: Vec<Vec<f64>>,

    /// ISO currency code for the amounts (informational)
    pub currency: String,

    /// Business line label (e.g. "motor", "general_liability")
    pub business_line: String,

    /// Optional accident-year labels, aligned with rows
    pub accident_years: Option<Vec<String>>,

    /// Optional development-period labels (e.g. "12", "24", "36" months)
    pub development_labels: Option<Vec<String>>,

    /// Free-form metadata supplied by the caller
    pub metadata: BTreeMap<String, String>,
}

/// Summary statistics derived from a triangle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleStatistics {
    /// Number of accident periods (rows)
    pub accident_periods: usize,

    /// Maximum development width across rows
    pub max_development_periods: usize,

    /// Filled cells / possible cells in the triangular region
    pub density: f64,

    /// Sum of the latest observed cumulative value per row
    pub total_paid: f64,

    /// Naive ultimate: latest diagonal grossed up by the most recent
    /// observed last-to-ultimate growth in the oldest row
    pub naive_ultimate: f64,

    /// (row, transition) positions whose age-to-age ratio lies more than
    /// three standard deviations from that transition's mean ratio
    pub outlier_cells: Vec<(usize, usize)>,
}

impl Triangle {
    /// Construct a triangle from raw rows, validating on the way in.
    ///
    /// Returns `ReservingError::Validation` with the full violation list if
    /// the data is malformed.
    pub fn new(
        rows: Vec<Vec<f64>>,
        currency: impl Into<String>,
        business_line: impl Into<String>,
    ) -> Result<Self, ReservingError> {
        let violations = Self::check_rows(&rows);
        if !violations.is_empty() {
            return Err(ReservingError::Validation(violations));
        }
        Ok(Self {
            rows,
            currency: currency.into(),
            business_line: business_line.into(),
            accident_years: None,
            development_labels: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Attach accident-year labels (must align with row count).
    pub fn with_accident_years(mut self, years: Vec<String>) -> Result<Self, ReservingError> {
        if years.len() != self.rows.len() {
            return Err(ReservingError::Validation(vec![format!(
                "accident year labels ({}) do not match row count ({})",
                years.len(),
                self.rows.len()
            )]));
        }
        self.accident_years = Some(years);
        Ok(self)
    }

    /// Attach development-period labels.
    pub fn with_development_labels(mut self, labels: Vec<String>) -> Self {
        self.development_labels = Some(labels);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validate raw rows without constructing.
    ///
    /// Returns a list of human-readable violations, empty if the data is a
    /// well-formed triangle. Callers must check the list before proceeding.
    pub fn check_rows(rows: &[Vec<f64>]) -> Vec<String> {
        let mut violations = Vec::new();

        if rows.is_empty() {
            violations.push("triangle has no accident periods".to_string());
            return violations;
        }

        let max_len = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if max_len == 0 {
            violations.push("triangle has no development periods".to_string());
            return violations;
        }

        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                violations.push(format!("accident period {} has no observations", i));
                continue;
            }

            // Triangular shape: newer accident periods have fewer
            // observations; rows at index >= width can hold none at all
            let allowed = max_len.saturating_sub(i);
            if row.len() > allowed {
                violations.push(format!(
                    "accident period {} has {} observations, at most {} allowed for a triangle of width {}",
                    i,
                    row.len(),
                    allowed,
                    max_len
                ));
            }

            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    violations.push(format!(
                        "accident period {}, development period {}: value is not finite",
                        i, j
                    ));
                } else if value < 0.0 {
                    violations.push(format!(
                        "accident period {}, development period {}: negative value {}",
                        i, j, value
                    ));
                }
            }

            // Cumulative amounts must be non-decreasing within a row
            for j in 1..row.len() {
                if row[j].is_finite() && row[j - 1].is_finite() && row[j] < row[j - 1] {
                    violations.push(format!(
                        "accident period {}: cumulative value decreases at development period {} ({} -> {})",
                        i,
                        j,
                        row[j - 1],
                        row[j]
                    ));
                }
            }
        }

        violations
    }

    /// Raw rows, oldest accident period first.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of accident periods.
    pub fn accident_periods(&self) -> usize {
        self.rows.len()
    }

    /// Maximum development width across rows.
    pub fn max_development_periods(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Latest observed cumulative value per accident period.
    pub fn latest_diagonal(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| *r.last().unwrap_or(&0.0))
            .collect()
    }

    /// Total paid to date: sum of each row's latest observed value.
    pub fn paid_to_date(&self) -> f64 {
        self.latest_diagonal().iter().sum()
    }

    /// Successive (current, next) observation pairs for development
    /// transition `j` (from period j to j+1), one per accident period that
    /// has both values observed.
    pub fn development_pairs(&self, j: usize) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter(|r| r.len() > j + 1)
            .map(|r| (r[j], r[j + 1]))
            .collect()
    }

    /// Compute summary statistics over the triangle.
    pub fn statistics(&self) -> TriangleStatistics {
        let n = self.rows.len();
        let width = self.max_development_periods();

        // Possible cells form the triangular region: row i may hold width - i
        let possible: usize = (0..n).map(|i| width.saturating_sub(i).max(1)).sum();
        let filled: usize = self.rows.iter().map(|r| r.len()).sum();
        let density = if possible > 0 {
            filled as f64 / possible as f64
        } else {
            0.0
        };

        let total_paid = self.paid_to_date();

        // Naive ultimate: gross up the diagonal by the oldest row's observed
        // growth from its own maturity position to full development
        let naive_ultimate = self.naive_ultimate_estimate();

        TriangleStatistics {
            accident_periods: n,
            max_development_periods: width,
            density,
            total_paid,
            naive_ultimate,
            outlier_cells: self.outlier_cells(),
        }
    }

    /// Rough ultimate: apply the fully-developed oldest row's cumulative
    /// growth profile to every row's latest value. Used only as a sanity
    /// reference in statistics, not by any reserving method.
    fn naive_ultimate_estimate(&self) -> f64 {
        let width = self.max_development_periods();
        let oldest = &self.rows[0];
        if oldest.len() < width || oldest[0] <= 0.0 {
            return self.paid_to_date();
        }

        let mut total = 0.0;
        for row in &self.rows {
            let latest = *row.last().unwrap_or(&0.0);
            let maturity = row.len() - 1;
            let at_maturity = oldest[maturity.min(oldest.len() - 1)];
            let growth = if at_maturity > 0.0 {
                oldest[oldest.len() - 1] / at_maturity
            } else {
                1.0
            };
            total += latest * growth;
        }
        total
    }

    /// Flag age-to-age ratios lying beyond mean +/- 3 sigma per transition.
    fn outlier_cells(&self) -> Vec<(usize, usize)> {
        let mut flagged = Vec::new();
        let width = self.max_development_periods();
        for j in 0..width.saturating_sub(1) {
            let ratios: Vec<(usize, f64)> = self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, r)| r.len() > j + 1 && r[j] > 0.0)
                .map(|(i, r)| (i, r[j + 1] / r[j]))
                .collect();
            if ratios.len() < 3 {
                continue;
            }
            let mean = ratios.iter().map(|(_, r)| r).sum::<f64>() / ratios.len() as f64;
            let var = ratios
                .iter()
                .map(|(_, r)| (r - mean).powi(2))
                .sum::<f64>()
                / ratios.len() as f64;
            let sd = var.sqrt();
            if sd <= 0.0 {
                continue;
            }
            for (i, r) in ratios {
                if (r - mean).abs() > 3.0 * sd {
                    flagged.push((i, j));
                }
            }
        }
        flagged
    }
}
