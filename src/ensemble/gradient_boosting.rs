//! Gradient-boosted regression trees
//!
//! A sequence of shallow trees, each fit to the residual left by the scaled
//! sum of all prior trees. Prediction = base + sum(learning_rate * tree(x)).

use std::time::Instant;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::ReservingError;
use crate::methods::{
    CalculationResult, EnsembleMethod, MethodCategory, MethodDescription, MethodParams,
    ReservingMethod,
};
use crate::triangle::Triangle;

use super::features::{build_training_set, complete_rows, CellModel, TrainingSet};
use super::tree::{RegressionTree, TreeConfig};
use super::{
    ensemble_warnings, normalized_importance, training_rmse, validate_ensemble_common,
};

/// Gradient-boosted tree reserving method
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientBoosting;

impl GradientBoosting {
    pub fn new() -> Self {
        GradientBoosting
    }
}

/// Trained boosted ensemble, transient per calculation
struct BoostedModel {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl CellModel for BoostedModel {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut out = self.base;
        for tree in &self.trees {
            out += self.learning_rate * tree.predict(features);
        }
        out
    }
}

fn train(set: &TrainingSet, params: &MethodParams, rng: &mut ChaCha20Rng) -> BoostedModel {
    let base = set.targets.iter().sum::<f64>() / set.len().max(1) as f64;
    let config = TreeConfig {
        max_depth: params.max_depth,
        min_samples_split: params.min_samples_split,
        feature_subset: None,
        threshold_candidates: 8,
    };
    let indices: Vec<usize> = (0..set.len()).collect();

    let mut residuals: Vec<f64> = set.targets.iter().map(|t| t - base).collect();
    let mut trees = Vec::with_capacity(params.n_estimators);
    for _ in 0..params.n_estimators {
        let tree = RegressionTree::fit(&set.features, &residuals, &indices, &config, rng);
        for (i, x) in set.features.iter().enumerate() {
            residuals[i] -= params.learning_rate * tree.predict(x);
        }
        trees.push(tree);
    }

    BoostedModel {
        base,
        learning_rate: params.learning_rate,
        trees,
    }
}

/// Split-gain importance summed over the boosted series.
fn raw_importance(model: &BoostedModel, n_features: usize) -> Vec<f64> {
    let mut raw = vec![0.0; n_features];
    for tree in &model.trees {
        for (i, g) in tree.gain_importance.iter().enumerate() {
            raw[i] += g;
        }
    }
    raw
}

impl ReservingMethod for GradientBoosting {
    fn id(&self) -> &'static str {
        "gradient_boosting"
    }

    fn name(&self) -> &'static str {
        "Gradient Boosting"
    }

    fn category(&self) -> MethodCategory {
        MethodCategory::EnsembleLearned
    }

    fn validate(&self, triangle: &Triangle, params: &MethodParams) -> Vec<String> {
        validate_ensemble_common(triangle, params)
    }

    fn calculate(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<CalculationResult, ReservingError> {
        let violations = self.validate(triangle, params);
        if !violations.is_empty() {
            return Err(ReservingError::Validation(violations));
        }
        let start = Instant::now();

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let set = build_training_set(triangle);
        let model = train(&set, params, &mut rng);
        debug!(
            "gradient boosting: {} trees on {} samples (seed {})",
            model.trees.len(),
            set.len(),
            seed
        );

        let completed = complete_rows(triangle, &model);
        let ultimates: Vec<f64> = completed
            .iter()
            .map(|row| *row.last().unwrap_or(&0.0))
            .collect();

        let mut result = CalculationResult::new(
            self.id(),
            ultimates,
            triangle.paid_to_date(),
            completed,
            Vec::new(),
        );

        let rmse = training_rmse(&model, &set);
        result.diagnostics.insert("train_rmse".to_string(), rmse);
        result
            .diagnostics
            .insert("n_trees".to_string(), model.trees.len() as f64);
        result
            .diagnostics
            .insert("n_samples".to_string(), set.len() as f64);
        result.warnings = ensemble_warnings(triangle, &set, rmse);

        let importance = normalized_importance(&raw_importance(&model, set.feature_count()));
        result.metadata.insert(
            "feature_importance".to_string(),
            serde_json::json!(importance),
        );
        result
            .metadata
            .insert("seed".to_string(), serde_json::json!(seed));

        result.computation_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    fn describe(&self) -> MethodDescription {
        MethodDescription {
            advantages: vec![
                "Captures non-linear development patterns".to_string(),
                "Feature importance explains what drives predictions".to_string(),
            ],
            limitations: vec![
                "Needs more data than classical methods to be credible".to_string(),
                "Prone to overfitting small triangles".to_string(),
            ],
            use_cases: vec![
                "Dense triangles with irregular development".to_string(),
                "Cross-checking classical projections".to_string(),
            ],
            assumptions: vec![
                "Engineered features capture the development dynamics".to_string(),
            ],
        }
    }
}

impl EnsembleMethod for GradientBoosting {
    fn feature_importance(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<Vec<(String, f64)>, ReservingError> {
        let violations = self.validate(triangle, params);
        if !violations.is_empty() {
            return Err(ReservingError::Validation(violations));
        }
        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let set = build_training_set(triangle);
        let model = train(&set, params, &mut rng);
        Ok(normalized_importance(&raw_importance(
            &model,
            set.feature_count(),
        )))
    }
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

    fn seeded_params() -> MethodParams {
        MethodParams::default().with_seed(42)
    }

    #[test]
    fn test_completed_rows_monotone() {
        let tri = sample_triangle();
        let result = GradientBoosting::new()
            .calculate(&tri, &seeded_params())
            .unwrap();
        for row in &result.completed_triangle {
            assert_eq!(row.len(), 4);
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
    }

    #[test]
    fn test_ultimates_respect_observed() {
        let tri = sample_triangle();
        let result = GradientBoosting::new()
            .calculate(&tri, &seeded_params())
            .unwrap();
        for (ult, row) in result.ultimates.iter().zip(tri.rows()) {
            assert!(*ult >= *row.last().unwrap());
        }
        assert_relative_eq!(
            result.reserves,
            result.ultimate_total - result.paid_to_date
        );
    }

    #[test]
    fn test_seeded_runs_identical() {
        let tri = sample_triangle();
        let params = seeded_params();
        let a = GradientBoosting::new().calculate(&tri, &params).unwrap();
        let b = GradientBoosting::new().calculate(&tri, &params).unwrap();
        assert_eq!(a.ultimates, b.ultimates);
    }

    #[test]
    fn test_feature_importance_normalized() {
        let tri = sample_triangle();
        let importance = GradientBoosting::new()
            .feature_importance(&tri, &seeded_params())
            .unwrap();
        assert!(!importance.is_empty());
        let total: f64 = importance.iter().map(|(_, w)| w).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        // Sorted descending
        for pair in importance.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_small_triangle_refused() {
        let tri = Triangle::new(vec![vec![100.0, 150.0], vec![120.0]], "USD", "motor").unwrap();
        assert!(GradientBoosting::new()
            .calculate(&tri, &seeded_params())
            .is_err());
    }
}
