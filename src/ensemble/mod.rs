//! Ensemble regression engine for triangle completion
//!
//! Treats triangle completion as a supervised-learning problem: every
//! observed development transition becomes a training sample (engineered
//! features -> next cumulative value), a learner is trained on those
//! samples, and missing cells are predicted development period by
//! development period, feeding predictions back into the next period's
//! features under monotonicity and non-negativity clamps.
//!
//! Three interchangeable learners share the pipeline: gradient-boosted
//! trees, a random forest, and a small feed-forward network. Trained models
//! are transient: owned by a single calculation, discarded with its result.

mod features;
mod tree;
mod gradient_boosting;
mod random_forest;
mod neural;

pub use features::{FEATURE_NAMES, TrainingSet, build_training_set};
pub use tree::{RegressionTree, TreeConfig, TreeNode};
pub use gradient_boosting::GradientBoosting;
pub use random_forest::RandomForest;
pub use neural::NeuralNetwork;

pub(crate) use features::CellModel;

use crate::methods::MethodParams;
use crate::triangle::Triangle;

/// Validation shared by all three ensemble learners.
pub(crate) fn validate_ensemble_common(
    triangle: &Triangle,
    params: &MethodParams,
) -> Vec<String> {
    let mut violations = Triangle::check_rows(triangle.rows());

    if triangle.max_development_periods() < 2 {
        violations.push("ensemble methods require at least 2 development periods".to_string());
    }
    if triangle.accident_periods() < 3 {
        violations.push(format!(
            "ensemble methods require at least 3 accident periods, got {}",
            triangle.accident_periods()
        ));
    }

    // Each observed transition is one training sample; learners need a
    // minimal dataset to produce anything beyond the mean
    let samples: usize = triangle
        .rows()
        .iter()
        .map(|r| r.len().saturating_sub(1))
        .sum();
    if samples < 4 {
        violations.push(format!(
            "ensemble methods require at least 4 observed development transitions, got {}",
            samples
        ));
    }

    if params.n_estimators == 0 || params.n_estimators > 1000 {
        violations.push(format!(
            "n_estimators must be in [1, 1000], got {}",
            params.n_estimators
        ));
    }
    if params.max_depth == 0 || params.max_depth > 12 {
        violations.push(format!(
            "max_depth must be in [1, 12], got {}",
            params.max_depth
        ));
    }
    if !(params.learning_rate > 0.0 && params.learning_rate <= 1.0) {
        violations.push(format!(
            "learning_rate must be in (0, 1], got {}",
            params.learning_rate
        ));
    }

    violations
}

/// Root-mean-square error of a model over a training set.
pub(crate) fn training_rmse(model: &dyn CellModel, set: &TrainingSet) -> f64 {
    if set.targets.is_empty() {
        return 0.0;
    }
    let sse: f64 = set
        .features
        .iter()
        .zip(&set.targets)
        .map(|(x, y)| (model.predict(x) - y).powi(2))
        .sum();
    (sse / set.targets.len() as f64).sqrt()
}

/// Non-fatal quality signals shared by the ensemble learners.
pub(crate) fn ensemble_warnings(
    triangle: &Triangle,
    set: &TrainingSet,
    train_rmse: f64,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let density = triangle.statistics().density;
    if density < 0.6 {
        warnings.push(format!(
            "triangle density {:.0}% is below 60%; sparse data reduces reliability",
            density * 100.0
        ));
    }

    if set.len() < 8 {
        warnings.push(format!(
            "only {} training samples; ensemble estimates carry high variance",
            set.len()
        ));
    }

    // A near-perfect fit on a small sample is an overfitting indicator, not
    // a success signal
    let target_mean = set.targets.iter().sum::<f64>() / set.len().max(1) as f64;
    if set.len() < 12 && target_mean > 0.0 && train_rmse < 0.001 * target_mean {
        warnings.push(
            "training error is near zero on a small sample; the model may be overfit".to_string(),
        );
    }

    warnings
}

/// Normalize raw importance mass to sum to 1 and rank descending by weight.
pub(crate) fn normalized_importance(raw: &[f64]) -> Vec<(String, f64)> {
    let total: f64 = raw.iter().sum();
    let mut pairs: Vec<(String, f64)> = FEATURE_NAMES
        .iter()
        .zip(raw)
        .map(|(name, &w)| {
            let weight = if total > 0.0 { w / total } else { 0.0 };
            (name.to_string(), weight)
        })
        .collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    pairs
}
