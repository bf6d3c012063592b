//! Shared feature-engineering pipeline
//!
//! Every observed development transition (i, j) -> (i, j+1) expands into one
//! training sample: a fixed-order feature vector describing the cell's
//! temporal position, its cumulative history, and its size relative to the
//! portfolio, with the next cumulative value as the target.

use crate::triangle::Triangle;

/// Feature names, aligned with the vector produced by [`feature_vector`].
pub const FEATURE_NAMES: [&str; 14] = [
    "accident_index",
    "development_index",
    "calendar_index",
    "cumulative",
    "log_cumulative",
    "sqrt_cumulative",
    "prior_increment",
    "increment_ratio",
    "maturity_ratio",
    "volatility",
    "velocity",
    "seasonal_sin",
    "seasonal_cos",
    "relative_size",
];

/// Assumed seasonality period over development indices (quarterly pattern).
const SEASONAL_PERIOD: f64 = 4.0;

/// Engineered training samples from a triangle
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }
}

/// Anything that predicts the next cumulative value from a feature vector
pub(crate) trait CellModel {
    fn predict(&self, features: &[f64]) -> f64;
}

/// Feature vector for predicting the cell after `row[..=j]`.
///
/// `row` is the (possibly partially predicted) cumulative history of one
/// accident period, `j` the index of the last known cell, `width` the full
/// development width, and `relative_size` the row's observed latest value
/// over the portfolio mean latest.
pub fn feature_vector(
    row: &[f64],
    accident_index: usize,
    j: usize,
    width: usize,
    relative_size: f64,
) -> Vec<f64> {
    let cumulative = row[j];
    let prior_increment = if j > 0 { row[j] - row[j - 1] } else { 0.0 };
    let increment_ratio = if j > 0 && row[j - 1] > 0.0 {
        row[j] / row[j - 1]
    } else {
        1.0
    };

    // Local volatility: dispersion of the age-to-age ratios seen so far in
    // this row; velocity: mean increment per development period so far
    let ratios: Vec<f64> = (1..=j)
        .filter(|&k| row[k - 1] > 0.0)
        .map(|k| row[k] / row[k - 1])
        .collect();
    let volatility = if ratios.len() >= 2 {
        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        (ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratios.len() as f64).sqrt()
    } else {
        0.0
    };
    let velocity = if j > 0 { (row[j] - row[0]) / j as f64 } else { 0.0 };

    let phase = 2.0 * std::f64::consts::PI * (j as f64) / SEASONAL_PERIOD;

    vec![
        accident_index as f64,
        j as f64,
        (accident_index + j) as f64,
        cumulative,
        (1.0 + cumulative).ln(),
        cumulative.max(0.0).sqrt(),
        prior_increment,
        increment_ratio,
        (j + 1) as f64 / width as f64,
        volatility,
        velocity,
        phase.sin(),
        phase.cos(),
        relative_size,
    ]
}

/// Mean of the latest observed values, the portfolio scale reference.
fn portfolio_mean_latest(triangle: &Triangle) -> f64 {
    let diag = triangle.latest_diagonal();
    let mean = diag.iter().sum::<f64>() / diag.len().max(1) as f64;
    if mean > 0.0 {
        mean
    } else {
        1.0
    }
}

/// Expand every observed transition into a training sample.
pub fn build_training_set(triangle: &Triangle) -> TrainingSet {
    let width = triangle.max_development_periods();
    let scale = portfolio_mean_latest(triangle);

    let mut features = Vec::new();
    let mut targets = Vec::new();
    for (i, row) in triangle.rows().iter().enumerate() {
        let relative = row.last().unwrap_or(&0.0) / scale;
        for j in 0..row.len().saturating_sub(1) {
            features.push(feature_vector(row, i, j, width, relative));
            targets.push(row[j + 1]);
        }
    }

    TrainingSet { features, targets }
}

/// Complete a triangle with a trained model, development period by
/// development period. Already-predicted cells feed the next period's
/// features; every prediction is clamped to be non-negative and at least
/// the previous cell in its row.
pub(crate) fn complete_rows(triangle: &Triangle, model: &dyn CellModel) -> Vec<Vec<f64>> {
    let width = triangle.max_development_periods();
    let scale = portfolio_mean_latest(triangle);
    let relatives: Vec<f64> = triangle
        .rows()
        .iter()
        .map(|row| row.last().unwrap_or(&0.0) / scale)
        .collect();

    let mut rows: Vec<Vec<f64>> = triangle.rows().to_vec();
    for j in 1..width {
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() != j {
                continue;
            }
            let x = feature_vector(row, i, j - 1, width, relatives[i]);
            let prev = row[j - 1];
            let predicted = model.predict(&x);
            row.push(predicted.max(prev).max(0.0));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_triangle() -> Triangle {
        Triangle::new(
            vec![
                vec![1000.0, 1400.0, 1650.0, 1700.0],
                vec![1100.0, 1600.0, 1800.0],
                vec![1200.0, 1750.0],
                vec![1300.0],
            ],
            "USD",
            "motor",
        )
        .unwrap()
    }

    #[test]
    fn test_training_set_size() {
        let set = build_training_set(&sample_triangle());
        // Transitions: 3 + 2 + 1 + 0 = 6
        assert_eq!(set.len(), 6);
        assert_eq!(set.features[0].len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_targets_are_next_values() {
        let set = build_training_set(&sample_triangle());
        assert_relative_eq!(set.targets[0], 1400.0);
        assert_relative_eq!(set.targets[1], 1650.0);
        assert_relative_eq!(set.targets[2], 1700.0);
        assert_relative_eq!(set.targets[3], 1600.0);
    }

    #[test]
    fn test_feature_vector_contents() {
        let row = [1000.0, 1400.0];
        let x = feature_vector(&row, 1, 1, 4, 0.9);
        assert_relative_eq!(x[0], 1.0); // accident index
        assert_relative_eq!(x[1], 1.0); // development index
        assert_relative_eq!(x[2], 2.0); // calendar index
        assert_relative_eq!(x[3], 1400.0);
        assert_relative_eq!(x[6], 400.0); // prior increment
        assert_relative_eq!(x[7], 1.4); // increment ratio
        assert_relative_eq!(x[8], 0.5); // maturity ratio
        assert_relative_eq!(x[13], 0.9);
    }

    #[test]
    fn test_first_cell_features_default() {
        let row = [1000.0];
        let x = feature_vector(&row, 0, 0, 4, 1.0);
        assert_relative_eq!(x[6], 0.0); // no prior increment
        assert_relative_eq!(x[7], 1.0); // neutral ratio
        assert_relative_eq!(x[10], 0.0); // no velocity yet
    }

    struct ConstantModel(f64);
    impl CellModel for ConstantModel {
        fn predict(&self, _: &[f64]) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_completion_clamps_monotone() {
        let tri = sample_triangle();
        // A model predicting a tiny constant must still yield monotone rows
        let completed = complete_rows(&tri, &ConstantModel(1.0));
        for row in &completed {
            assert_eq!(row.len(), 4);
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
    }

    #[test]
    fn test_completion_preserves_observed() {
        let tri = sample_triangle();
        let completed = complete_rows(&tri, &ConstantModel(5000.0));
        for (orig, comp) in tri.rows().iter().zip(&completed) {
            for (a, b) in orig.iter().zip(comp.iter()) {
                assert_relative_eq!(a, b);
            }
        }
        // Unobserved cells take the (larger) predicted value
        assert_relative_eq!(completed[3][1], 5000.0);
    }
}
