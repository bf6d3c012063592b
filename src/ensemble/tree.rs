//! Arena-allocated binary regression tree
//!
//! Nodes live in a flat `Vec` with index-based child references, which keeps
//! ownership simple and makes importance traversal trivial. Shared by the
//! gradient-boosting and random-forest learners; the forest enables the
//! per-split random feature subset.

use rand::seq::index::sample;
use rand_chacha::ChaCha20Rng;

/// One node: either a leaf carrying a value or a split with child indices
#[derive(Debug, Clone)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Tree induction settings
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Random feature subset size per split; None considers every feature
    pub feature_subset: Option<usize>,
    /// Number of quantile-sampled threshold candidates per feature
    pub threshold_candidates: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 4,
            feature_subset: None,
            threshold_candidates: 8,
        }
    }
}

/// A fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    root: usize,
    /// Variance reduction accumulated per feature during induction
    pub gain_importance: Vec<f64>,
}

impl RegressionTree {
    /// Fit a tree on the rows selected by `indices`, minimizing weighted
    /// child variance at each split over quantile-sampled thresholds.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        config: &TreeConfig,
        rng: &mut ChaCha20Rng,
    ) -> Self {
        let n_features = features.first().map(|x| x.len()).unwrap_or(0);
        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
            gain_importance: vec![0.0; n_features],
        };
        let mut owned = indices.to_vec();
        tree.root = tree.build(features, targets, &mut owned, 0, config, rng);
        tree
    }

    /// Predict by walking from the root to a leaf.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = self.root;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Count split occurrences per feature (forest-style importance).
    pub fn split_counts(&self, counts: &mut [f64]) {
        for node in &self.nodes {
            if let TreeNode::Split { feature, .. } = node {
                if let Some(c) = counts.get_mut(*feature) {
                    *c += 1.0;
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &mut Vec<usize>,
        depth: usize,
        config: &TreeConfig,
        rng: &mut ChaCha20Rng,
    ) -> usize {
        let mean = mean_of(targets, indices);

        if depth >= config.max_depth || indices.len() < config.min_samples_split {
            self.nodes.push(TreeNode::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        let Some((feature, threshold, gain)) =
            best_split(features, targets, indices, config, rng)
        else {
            self.nodes.push(TreeNode::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.gain_importance[feature] += gain;

        let (mut left_idx, mut right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| features[i][feature] <= threshold);

        let left = self.build(features, targets, &mut left_idx, depth + 1, config, rng);
        let right = self.build(features, targets, &mut right_idx, depth + 1, config, rng);

        self.nodes.push(TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        });
        self.nodes.len() - 1
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn sse_of(targets: &[f64], indices: &[usize]) -> f64 {
    let mean = mean_of(targets, indices);
    indices.iter().map(|&i| (targets[i] - mean).powi(2)).sum()
}

/// Best (feature, threshold) over the candidate set, or None when no split
/// improves on the parent. Gain is the sum-of-squares reduction.
fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    config: &TreeConfig,
    rng: &mut ChaCha20Rng,
) -> Option<(usize, f64, f64)> {
    let n_features = features.first()?.len();
    let parent_sse = sse_of(targets, indices);

    let candidate_features: Vec<usize> = match config.feature_subset {
        Some(k) if k < n_features => sample(rng, n_features, k).into_iter().collect(),
        _ => (0..n_features).collect(),
    };

    let mut best: Option<(usize, f64, f64)> = None;
    for &feature in &candidate_features {
        let mut values: Vec<f64> = indices.iter().map(|&i| features[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }

        // Quantile-sampled thresholds between observed values
        let k = config.threshold_candidates.max(1);
        for t in 1..=k {
            let q = t as f64 / (k + 1) as f64;
            let pos = q * (values.len() - 1) as f64;
            let lo = pos.floor() as usize;
            let threshold = if lo + 1 < values.len() {
                (values[lo] + values[lo + 1]) / 2.0
            } else {
                values[lo]
            };

            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| features[i][feature] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let child_sse = sse_of(targets, &left) + sse_of(targets, &right);
            let gain = parent_sse - child_sse;
            if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, threshold, gain));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 10 when x0 < 5, else 20; x1 is noise-free but irrelevant
        let features: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, (i % 3) as f64])
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 10.0 } else { 20.0 }).collect();
        (features, targets)
    }

    #[test]
    fn test_learns_step_function() {
        let (features, targets) = step_data();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let config = TreeConfig {
            max_depth: 2,
            min_samples_split: 2,
            ..Default::default()
        };
        let tree = RegressionTree::fit(&features, &targets, &indices, &config, &mut rng);

        assert_relative_eq!(tree.predict(&[2.0, 0.0]), 10.0);
        assert_relative_eq!(tree.predict(&[8.0, 0.0]), 20.0);
    }

    #[test]
    fn test_importance_lands_on_informative_feature() {
        let (features, targets) = step_data();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let tree = RegressionTree::fit(
            &features,
            &targets,
            &indices,
            &TreeConfig::default(),
            &mut rng,
        );
        assert!(tree.gain_importance[0] > tree.gain_importance[1]);
    }

    #[test]
    fn test_depth_zero_is_single_leaf() {
        let (features, targets) = step_data();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let config = TreeConfig {
            max_depth: 0,
            ..Default::default()
        };
        let tree = RegressionTree::fit(&features, &targets, &indices, &config, &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_relative_eq!(tree.predict(&[0.0, 0.0]), 15.0);
    }

    #[test]
    fn test_constant_targets_make_leaf() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let targets = vec![5.0; 4];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let tree = RegressionTree::fit(
            &features,
            &targets,
            &indices,
            &TreeConfig::default(),
            &mut rng,
        );
        // No split has positive gain
        assert_eq!(tree.node_count(), 1);
        assert_relative_eq!(tree.predict(&[2.5]), 5.0);
    }

    #[test]
    fn test_split_counts() {
        let (features, targets) = step_data();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let tree = RegressionTree::fit(
            &features,
            &targets,
            &indices,
            &TreeConfig::default(),
            &mut rng,
        );
        let mut counts = vec![0.0; 2];
        tree.split_counts(&mut counts);
        assert!(counts[0] >= 1.0);
    }
}
