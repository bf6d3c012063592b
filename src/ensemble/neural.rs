//! Feed-forward network regression
//!
//! A small fully-connected network: ReLU hidden layers, linear output,
//! trained by per-sample gradient descent on standardized inputs and target.
//! Optional dropout is applied to hidden activations during training only,
//! and an early-stopping rule halts training when the held-out validation
//! loss stops improving for a patience window.

use std::time::Instant;

use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ReservingError;
use crate::methods::{
    CalculationResult, EnsembleMethod, MethodCategory, MethodDescription, MethodParams,
    ReservingMethod,
};
use crate::triangle::Triangle;

use super::features::{build_training_set, complete_rows, CellModel, TrainingSet};
use super::{
    ensemble_warnings, normalized_importance, training_rmse, validate_ensemble_common,
};

/// Per-sample updates diverge at tree-boosting learning rates; cap the rate
/// used for the network regardless of the shared parameter.
const MAX_NET_LEARNING_RATE: f64 = 0.05;

/// Epochs without validation improvement before training halts.
const PATIENCE: usize = 20;

/// Gradient clip bound per component, guards against blow-ups on tiny sets.
const GRAD_CLIP: f64 = 5.0;

/// Feed-forward network reserving method
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralNetwork;

impl NeuralNetwork {
    pub fn new() -> Self {
        NeuralNetwork
    }
}

/// Trained network with its standardization constants
struct NetworkModel {
    /// weights[layer][neuron][input]
    weights: Vec<Vec<Vec<f64>>>,
    biases: Vec<Vec<f64>>,
    x_mean: Vec<f64>,
    x_std: Vec<f64>,
    y_mean: f64,
    y_std: f64,
    epochs_run: usize,
    val_rmse: f64,
}

impl NetworkModel {
    fn standardize(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.x_mean.iter().zip(&self.x_std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Forward pass returning the activation of every layer (input first).
    fn forward(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = vec![input.to_vec()];
        let last = self.weights.len() - 1;
        for (l, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let prev = activations.last().expect("at least the input layer");
            let mut out = Vec::with_capacity(w.len());
            for (neuron, bias) in w.iter().zip(b) {
                let z: f64 = neuron.iter().zip(prev).map(|(wi, a)| wi * a).sum::<f64>() + bias;
                // Hidden layers are rectified, the output layer is linear
                out.push(if l < last { z.max(0.0) } else { z });
            }
            activations.push(out);
        }
        activations
    }
}

impl CellModel for NetworkModel {
    fn predict(&self, features: &[f64]) -> f64 {
        let x = self.standardize(features);
        let activations = self.forward(&x);
        let out = activations.last().and_then(|o| o.first()).copied().unwrap_or(0.0);
        out * self.y_std + self.y_mean
    }
}

fn init_layers(
    sizes: &[usize],
    rng: &mut ChaCha20Rng,
) -> (Vec<Vec<Vec<f64>>>, Vec<Vec<f64>>) {
    let mut weights = Vec::new();
    let mut biases = Vec::new();
    for pair in sizes.windows(2) {
        let (fan_in, fan_out) = (pair[0], pair[1]);
        let init = Normal::new(0.0, (2.0 / fan_in as f64).sqrt())
            .expect("positive std dev");
        weights.push(
            (0..fan_out)
                .map(|_| (0..fan_in).map(|_| init.sample(rng)).collect())
                .collect(),
        );
        biases.push(vec![0.0; fan_out]);
    }
    (weights, biases)
}

fn train(set: &TrainingSet, params: &MethodParams, rng: &mut ChaCha20Rng) -> NetworkModel {
    let n = set.len();
    let n_features = set.feature_count();

    // Standardization constants from the full training set
    let mut x_mean = vec![0.0; n_features];
    let mut x_std = vec![0.0; n_features];
    for x in &set.features {
        for (k, v) in x.iter().enumerate() {
            x_mean[k] += v;
        }
    }
    for m in &mut x_mean {
        *m /= n as f64;
    }
    for x in &set.features {
        for (k, v) in x.iter().enumerate() {
            x_std[k] += (v - x_mean[k]).powi(2);
        }
    }
    for s in &mut x_std {
        *s = (*s / n as f64).sqrt().max(1e-9);
    }
    let y_mean = set.targets.iter().sum::<f64>() / n as f64;
    let y_std = (set.targets.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64)
        .sqrt()
        .max(1e-9);

    let mut sizes = vec![n_features];
    sizes.extend(params.hidden_layers.iter().copied().filter(|&h| h > 0));
    sizes.push(1);
    let (weights, biases) = init_layers(&sizes, rng);

    let mut model = NetworkModel {
        weights,
        biases,
        x_mean,
        x_std,
        y_mean,
        y_std,
        epochs_run: 0,
        val_rmse: 0.0,
    };

    // Standardized copies of the data
    let xs: Vec<Vec<f64>> = set.features.iter().map(|x| model.standardize(x)).collect();
    let ys: Vec<f64> = set.targets.iter().map(|y| (y - y_mean) / y_std).collect();

    // Held-out validation split for early stopping
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let n_val = (n / 10).max(1);
    let (val_idx, train_idx) = order.split_at(n_val);

    let lr = params.learning_rate.min(MAX_NET_LEARNING_RATE);
    let last_layer = model.weights.len() - 1;

    let mut best_weights = model.weights.clone();
    let mut best_biases = model.biases.clone();
    let mut best_val = f64::INFINITY;
    let mut stale = 0usize;

    let mut epoch_order = train_idx.to_vec();
    for epoch in 0..params.epochs {
        epoch_order.shuffle(rng);
        for &i in &epoch_order {
            // Forward pass, tracking dropout masks on hidden layers
            let mut activations = vec![xs[i].clone()];
            let mut masks: Vec<Vec<f64>> = Vec::with_capacity(last_layer);
            for l in 0..model.weights.len() {
                let prev = activations.last().expect("input layer present").clone();
                let mut out = Vec::with_capacity(model.weights[l].len());
                for (neuron, bias) in model.weights[l].iter().zip(&model.biases[l]) {
                    let z: f64 =
                        neuron.iter().zip(&prev).map(|(w, a)| w * a).sum::<f64>() + bias;
                    out.push(if l < last_layer { z.max(0.0) } else { z });
                }
                if l < last_layer && params.dropout > 0.0 {
                    // Inverted dropout: scale the kept units so inference
                    // needs no adjustment
                    let keep = 1.0 - params.dropout;
                    let mask: Vec<f64> = out
                        .iter()
                        .map(|_| {
                            if rng.random::<f64>() < keep {
                                1.0 / keep
                            } else {
                                0.0
                            }
                        })
                        .collect();
                    for (o, m) in out.iter_mut().zip(&mask) {
                        *o *= m;
                    }
                    masks.push(mask);
                } else if l < last_layer {
                    masks.push(vec![1.0; out.len()]);
                }
                activations.push(out);
            }

            // Backward pass: squared-error loss, delta = prediction - target
            let pred = activations[last_layer + 1][0];
            let mut delta = vec![(pred - ys[i]).clamp(-GRAD_CLIP, GRAD_CLIP)];

            for l in (0..model.weights.len()).rev() {
                let prev_act = activations[l].clone();
                // Propagate before the weight update so gradients use the
                // forward-pass weights
                let mut next_delta = vec![0.0; prev_act.len()];
                for (j, d) in delta.iter().enumerate() {
                    for (k, w) in model.weights[l][j].iter().enumerate() {
                        next_delta[k] += d * w;
                    }
                }
                if l > 0 {
                    for (k, nd) in next_delta.iter_mut().enumerate() {
                        // ReLU gate and dropout mask of the previous layer
                        if activations[l][k] <= 0.0 {
                            *nd = 0.0;
                        } else {
                            *nd *= masks[l - 1][k];
                        }
                        *nd = nd.clamp(-GRAD_CLIP, GRAD_CLIP);
                    }
                }

                for (j, d) in delta.iter().enumerate() {
                    for (k, w) in model.weights[l][j].iter_mut().enumerate() {
                        *w -= lr * d * prev_act[k];
                    }
                    model.biases[l][j] -= lr * d;
                }
                delta = next_delta;
            }
        }

        // Early stopping on the held-out split
        let val_loss: f64 = val_idx
            .iter()
            .map(|&i| {
                let out = model.forward(&xs[i]);
                (out.last().and_then(|o| o.first()).copied().unwrap_or(0.0) - ys[i]).powi(2)
            })
            .sum::<f64>()
            / val_idx.len() as f64;

        model.epochs_run = epoch + 1;
        if val_loss + 1e-12 < best_val {
            best_val = val_loss;
            best_weights = model.weights.clone();
            best_biases = model.biases.clone();
            stale = 0;
        } else {
            stale += 1;
            if stale >= PATIENCE {
                break;
            }
        }
    }

    model.weights = best_weights;
    model.biases = best_biases;
    model.val_rmse = best_val.sqrt() * y_std;
    model
}

/// Input-weight magnitude per feature, summed over the first layer.
fn raw_importance(model: &NetworkModel, n_features: usize) -> Vec<f64> {
    let mut raw = vec![0.0; n_features];
    if let Some(first) = model.weights.first() {
        for neuron in first {
            for (k, w) in neuron.iter().enumerate() {
                raw[k] += w.abs();
            }
        }
    }
    raw
}

impl ReservingMethod for NeuralNetwork {
    fn id(&self) -> &'static str {
        "neural_network"
    }

    fn name(&self) -> &'static str {
        "Feed-Forward Network"
    }

    fn category(&self) -> MethodCategory {
        MethodCategory::EnsembleLearned
    }

    fn validate(&self, triangle: &Triangle, params: &MethodParams) -> Vec<String> {
        let mut violations = validate_ensemble_common(triangle, params);
        if params.hidden_layers.is_empty() || params.hidden_layers.iter().any(|&h| h == 0) {
            violations.push("hidden_layers must be non-empty with positive sizes".to_string());
        }
        if params.hidden_layers.iter().any(|&h| h > 256) {
            violations.push("hidden layer sizes above 256 are not supported".to_string());
        }
        if !(0.0..1.0).contains(&params.dropout) {
            violations.push(format!("dropout must be in [0, 1), got {}", params.dropout));
        }
        if params.epochs == 0 {
            violations.push("epochs must be at least 1".to_string());
        }
        violations
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
            "network: layers {:?}, {} epochs run, val rmse {:.4} (seed {})",
            params.hidden_layers, model.epochs_run, model.val_rmse, seed
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
            .insert("validation_rmse".to_string(), model.val_rmse);
        result
            .diagnostics
            .insert("epochs_run".to_string(), model.epochs_run as f64);
        result
            .diagnostics
            .insert("n_samples".to_string(), set.len() as f64);
        result.warnings = ensemble_warnings(triangle, &set, rmse);
        if model.epochs_run < params.epochs {
            result.warnings.push(format!(
                "early stopping halted training after {} of {} epochs",
                model.epochs_run, params.epochs
            ));
        }

        let importance = normalized_importance(&raw_importance(&model, set.feature_count()));
        result.metadata.insert(
            "feature_importance".to_string(),
            serde_json::json!(importance),
        );
        result
            .metadata
            .insert("seed".to_string(), serde_json::json!(seed));
        result.metadata.insert(
            "hidden_layers".to_string(),
            serde_json::json!(params.hidden_layers),
        );

        result.computation_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    fn describe(&self) -> MethodDescription {
        MethodDescription {
            advantages: vec![
                "Learns smooth non-linear development surfaces".to_string(),
                "Early stopping limits overfitting automatically".to_string(),
            ],
            limitations: vec![
                "Loss triangles rarely provide enough samples for deep models".to_string(),
                "Less interpretable than tree ensembles".to_string(),
            ],
            use_cases: vec![
                "Large, dense triangles; benchmarking against tree methods".to_string(),
            ],
            assumptions: vec![
                "Engineered features capture the development dynamics".to_string(),
                "The validation split is representative".to_string(),
            ],
        }
    }
}

impl EnsembleMethod for NeuralNetwork {
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
        let mut params = MethodParams::default().with_seed(42);
        params.epochs = 100;
        params
    }

    #[test]
    fn test_monotone_completion_and_invariants() {
        let tri = sample_triangle();
        let result = NeuralNetwork::new().calculate(&tri, &seeded_params()).unwrap();
        for row in &result.completed_triangle {
            assert_eq!(row.len(), 4);
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
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
        let a = NeuralNetwork::new().calculate(&tri, &params).unwrap();
        let b = NeuralNetwork::new().calculate(&tri, &params).unwrap();
        assert_eq!(a.ultimates, b.ultimates);
    }

    #[test]
    fn test_predictions_are_finite() {
        let tri = sample_triangle();
        let result = NeuralNetwork::new().calculate(&tri, &seeded_params()).unwrap();
        for row in &result.completed_triangle {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_empty_hidden_layers_refused() {
        let tri = sample_triangle();
        let mut params = seeded_params();
        params.hidden_layers = vec![];
        assert!(NeuralNetwork::new().calculate(&tri, &params).is_err());
    }

    #[test]
    fn test_dropout_range_enforced() {
        let tri = sample_triangle();
        let mut params = seeded_params();
        params.dropout = 1.0;
        assert!(NeuralNetwork::new().calculate(&tri, &params).is_err());
    }

    #[test]
    fn test_dropout_training_still_monotone() {
        let tri = sample_triangle();
        let mut params = seeded_params();
        params.dropout = 0.2;
        let result = NeuralNetwork::new().calculate(&tri, &params).unwrap();
        for row in &result.completed_triangle {
            for j in 1..row.len() {
                assert!(row[j] >= row[j - 1]);
            }
        }
    }

    #[test]
    fn test_importance_covers_all_features() {
        let tri = sample_triangle();
        let importance = NeuralNetwork::new()
            .feature_importance(&tri, &seeded_params())
            .unwrap();
        assert_eq!(importance.len(), super::super::FEATURE_NAMES.len());
        let total: f64 = importance.iter().map(|(_, w)| w).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }
}
