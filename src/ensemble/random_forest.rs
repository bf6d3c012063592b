//! Random forest regression
//!
//! Bootstrap-resampled tree ensemble with a random feature subset per split
//! (square root of the feature count by default). Prediction is the mean
//! over trees; rows left out of a tree's bootstrap sample ("out-of-bag")
//! give an internal performance estimate without a held-out set.

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

/// Random forest reserving method
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomForest;

impl RandomForest {
    pub fn new() -> Self {
        RandomForest
    }
}

/// Trained forest plus its out-of-bag error, transient per calculation
struct ForestModel {
    trees: Vec<RegressionTree>,
    oob_rmse: Option<f64>,
}

impl CellModel for ForestModel {
    fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }
}

fn train(set: &TrainingSet, params: &MethodParams, rng: &mut ChaCha20Rng) -> ForestModel {
    let n = set.len();
    let subset = (set.feature_count() as f64).sqrt().round().max(1.0) as usize;
    let config = TreeConfig {
        max_depth: params.max_depth.max(4),
        min_samples_split: params.min_samples_split.min(n.max(2)),
        feature_subset: Some(subset),
        threshold_candidates: 8,
    };

    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut oob_sum = vec![0.0; n];
    let mut oob_count = vec![0usize; n];

    for _ in 0..params.n_estimators {
        // Bootstrap sample with replacement
        let mut in_bag = vec![false; n];
        let indices: Vec<usize> = (0..n)
            .map(|_| {
                let i = rng.random_range(0..n);
                in_bag[i] = true;
                i
            })
            .collect();

        let tree = RegressionTree::fit(&set.features, &set.targets, &indices, &config, rng);

        for (i, bagged) in in_bag.iter().enumerate() {
            if !bagged {
                oob_sum[i] += tree.predict(&set.features[i]);
                oob_count[i] += 1;
            }
        }
        trees.push(tree);
    }

    let mut sse = 0.0;
    let mut covered = 0usize;
    for i in 0..n {
        if oob_count[i] > 0 {
            let pred = oob_sum[i] / oob_count[i] as f64;
            sse += (pred - set.targets[i]).powi(2);
            covered += 1;
        }
    }
    let oob_rmse = if covered > 0 {
        Some((sse / covered as f64).sqrt())
    } else {
        None
    };

    ForestModel { trees, oob_rmse }
}

/// Accumulated split frequency per feature across the forest.
fn raw_importance(model: &ForestModel, n_features: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_features];
    for tree in &model.trees {
        tree.split_counts(&mut counts);
    }
    counts
}

impl ReservingMethod for RandomForest {
    fn id(&self) -> &'static str {
        "random_forest"
    }

    fn name(&self) -> &'static str {
        "Random Forest"
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
            "random forest: {} trees on {} samples, oob rmse {:?} (seed {})",
            model.trees.len(),
            set.len(),
            model.oob_rmse,
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
        if let Some(oob) = model.oob_rmse {
            result.diagnostics.insert("oob_rmse".to_string(), oob);
        }
        result
            .diagnostics
            .insert("n_trees".to_string(), model.trees.len() as f64);
        result
            .diagnostics
            .insert("n_samples".to_string(), set.len() as f64);
        result.warnings = ensemble_warnings(triangle, &set, rmse);
        if model.oob_rmse.is_none() {
            result
                .warnings
                .push("no out-of-bag rows were available; oob_rmse omitted".to_string());
        }

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
                "Robust to noise through bagging".to_string(),
                "Out-of-bag error gives a built-in validation estimate".to_string(),
            ],
            limitations: vec![
                "Averaging flattens extreme development".to_string(),
                "Small triangles leave little bootstrap diversity".to_string(),
            ],
            use_cases: vec![
                "Noisy triangles where single-model variance is a concern".to_string(),
            ],
            assumptions: vec![
                "Engineered features capture the development dynamics".to_string(),
            ],
        }
    }
}

impl EnsembleMethod for RandomForest {
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
