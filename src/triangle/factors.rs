//! Development-factor derivation and triangle completion

use serde::{Deserialize, Serialize};

use super::Triangle;

/// Aggregation policy for deriving development factors from age-to-age ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorMethod {
    /// Simple average of the individual age-to-age ratios
    SimpleAverage,
    /// Volume-weighted average: sum(next) / sum(current)
    WeightedAverage,
    /// Median of the individual ratios
    Median,
}

impl Default for FactorMethod {
    fn default() -> Self {
        FactorMethod::SimpleAverage
    }
}

impl FactorMethod {
    /// Parse a parameter key (`simple_average`, `weighted_average`, `median`).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "simple_average" => Some(FactorMethod::SimpleAverage),
            "weighted_average" => Some(FactorMethod::WeightedAverage),
            "median" => Some(FactorMethod::Median),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            FactorMethod::SimpleAverage => "simple_average",
            FactorMethod::WeightedAverage => "weighted_average",
            FactorMethod::Median => "median",
        }
    }
}

/// Derive one development factor per transition (max width - 1 in total).
///
/// Transitions with no usable pair (no row observes both periods, or all
/// current values are zero) fall back to a factor of 1.0 so completion can
/// still proceed; callers surface this as a warning.
pub fn development_factors(triangle: &Triangle, method: FactorMethod) -> Vec<f64> {
    let width = triangle.max_development_periods();
    let mut factors = Vec::with_capacity(width.saturating_sub(1));

    for j in 0..width.saturating_sub(1) {
        let pairs: Vec<(f64, f64)> = triangle
            .development_pairs(j)
            .into_iter()
            .filter(|(c, _)| *c > 0.0)
            .collect();

        let factor = match method {
            FactorMethod::SimpleAverage => {
                if pairs.is_empty() {
                    1.0
                } else {
                    pairs.iter().map(|(c, n)| n / c).sum::<f64>() / pairs.len() as f64
                }
            }
            FactorMethod::WeightedAverage => {
                let denom: f64 = pairs.iter().map(|(c, _)| c).sum();
                if denom <= 0.0 {
                    1.0
                } else {
                    pairs.iter().map(|(_, n)| n).sum::<f64>() / denom
                }
            }
            FactorMethod::Median => {
                if pairs.is_empty() {
                    1.0
                } else {
                    let mut ratios: Vec<f64> = pairs.iter().map(|(c, n)| n / c).collect();
                    ratios.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let mid = ratios.len() / 2;
                    if ratios.len() % 2 == 0 {
                        (ratios[mid - 1] + ratios[mid]) / 2.0
                    } else {
                        ratios[mid]
                    }
                }
            }
        };

        factors.push(factor);
    }

    factors
}

/// Complete a triangle by iteratively applying development factors to the
/// last observed value of each row out to the full development width.
///
/// `tail_factor`, when present, extends every row by one further multiplied
/// column beyond the observed width. `ultimates`, when present, reconciles
/// each row to end exactly at the method-supplied ultimate (floored at the
/// last observed value): projected cells above the ultimate are capped, and
/// on a fully developed row only the final cell is replaced.
///
/// Returns new rows; the input triangle is never mutated.
pub fn complete_triangle(
    triangle: &Triangle,
    factors: &[f64],
    tail_factor: Option<f64>,
    ultimates: Option<&[f64]>,
) -> Vec<Vec<f64>> {
    let width = triangle.max_development_periods();
    let mut completed = Vec::with_capacity(triangle.accident_periods());

    for (i, row) in triangle.rows().iter().enumerate() {
        let mut out = row.clone();

        // Project forward from the last observed value
        let mut current = *row.last().unwrap_or(&0.0);
        for j in row.len()..width {
            let factor = factors.get(j - 1).copied().unwrap_or(1.0);
            current *= factor.max(0.0);
            current = current.max(*out.last().unwrap_or(&0.0));
            out.push(current);
        }

        if let Some(tail) = tail_factor {
            let last = *out.last().unwrap_or(&0.0);
            out.push(last * tail.max(1.0));
        }

        if let Some(ults) = ultimates {
            if let Some(&ult) = ults.get(i) {
                if row.len() < out.len() {
                    // Projected cells reconcile to the ultimate: cap any
                    // overshoot so the row ends at the reported value
                    let target = ult.max(row[row.len() - 1]);
                    for cell in &mut out[row.len()..] {
                        *cell = (*cell).min(target);
                    }
                    if let Some(last) = out.last_mut() {
                        *last = target;
                    }
                } else {
                    // Fully developed row: replace the final cell, flooring
                    // against the prior cell so the row stays non-decreasing
                    let floor = if out.len() >= 2 { out[out.len() - 2] } else { 0.0 };
                    if let Some(last) = out.last_mut() {
                        *last = ult.max(floor);
                    }
                }
            }
        }

        completed.push(out);
    }

    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_triangle() -> Triangle {
        Triangle::new(
            vec![
                vec![1000.0, 1400.0, 1650.0],
                vec![1100.0, 1600.0],
                vec![1200.0],
            ],
            "USD",
            "motor",
        )
        .unwrap()
    }

    #[test]
    fn test_simple_average_factor() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        assert_eq!(factors.len(), 2);
        // 0.5 * (1400/1000 + 1600/1100)
        let expected = 0.5 * (1.4 + 1600.0 / 1100.0);
        assert_relative_eq!(factors[0], expected, epsilon = 1e-12);
        assert_relative_eq!(factors[1], 1650.0 / 1400.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_average_factor() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::WeightedAverage);
        assert_relative_eq!(factors[0], 3000.0 / 2100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_factor() {
        let tri = Triangle::new(
            vec![
                vec![100.0, 150.0, 160.0],
                vec![100.0, 120.0],
                vec![100.0],
            ],
            "USD",
            "motor",
        )
        .unwrap();
        let factors = development_factors(&tri, FactorMethod::Median);
        // Ratios at transition 0: 1.5 and 1.2, even count -> midpoint
        assert_relative_eq!(factors[0], 1.35, epsilon = 1e-12);
    }

    #[test]
    fn test_completion_is_monotone_and_extends() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        let completed = complete_triangle(&tri, &factors, None, None);

        assert_eq!(completed.len(), 3);
        for row in &completed {
            assert_eq!(row.len(), 3);
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
        // Row 3 projects beyond its observed 1200
        assert!(completed[2][2] > 1200.0);
    }

    #[test]
    fn test_completion_round_trip_preserves_observed() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        let completed = complete_triangle(&tri, &factors, None, None);

        for (orig, comp) in tri.rows().iter().zip(&completed) {
            for (a, b) in orig.iter().zip(comp.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_tail_factor_extends_width() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        let completed = complete_triangle(&tri, &factors, Some(1.05), None);
        for row in &completed {
            assert_eq!(row.len(), 4);
            assert_relative_eq!(row[3], row[2] * 1.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ultimate_override_clamped() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        // An ultimate below the projected last cell must not pull it down
        let ults = vec![1.0, 1.0, 1.0];
        let completed = complete_triangle(&tri, &factors, None, Some(&ults));
        for row in &completed {
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
    }

    #[test]
    fn test_low_ultimate_reconciles_projected_cells() {
        let tri = sample_triangle();
        let factors = development_factors(&tri, FactorMethod::SimpleAverage);
        // Ultimates below the factor projection: each row must still end
        // exactly at its override, floored at the last observed value
        let ults = vec![1650.0, 1650.0, 1250.0];
        let completed = complete_triangle(&tri, &factors, None, Some(&ults));
        assert_relative_eq!(*completed[1].last().unwrap(), 1650.0);
        assert_relative_eq!(*completed[2].last().unwrap(), 1250.0);
        for row in &completed {
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
    }

    #[test]
    fn test_factor_key_round_trip() {
        for m in [
            FactorMethod::SimpleAverage,
            FactorMethod::WeightedAverage,
            FactorMethod::Median,
        ] {
            assert_eq!(FactorMethod::from_key(m.as_key()), Some(m));
        }
        assert_eq!(FactorMethod::from_key("bogus"), None);
    }
}
