//! Core types shared by all reserving methods

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::triangle::FactorMethod;

/// Parameters recognized by the reserving methods.
///
/// One struct covers all methods; each method reads the fields it recognizes
/// and validates the ranges it cares about. `Default` gives the documented
/// defaults so callers only set what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodParams {
    /// Aggregation policy for development factors
    pub factor_method: FactorMethod,

    /// Optional tail factor (> 1) projecting beyond the observed window
    pub tail_factor: Option<f64>,

    /// A-priori expected loss ratio, required by BF and ELR; valid in (0, 2]
    pub expected_loss_ratio: Option<f64>,

    /// Earned premium per accident period; estimated from paid when absent
    pub premiums: Option<Vec<f64>>,

    /// Per-accident-period loss ratios (ELR); overrides `expected_loss_ratio`
    pub loss_ratios_by_period: Option<Vec<f64>>,

    /// Annual trend/inflation rate compounded by calendar distance (ELR)
    pub trend_rate: f64,

    /// Confidence level for stochastic intervals; valid in [0.8, 0.99]
    pub confidence_level: f64,

    /// Bootstrap resample count (Mack)
    pub bootstrap_iterations: usize,

    /// Mack variance weight exponent: w = C^(2 - alpha), default 1
    pub alpha: f64,

    /// Include process variance in the Mack prediction error
    pub include_process_variance: bool,

    /// Include parameter (estimation) variance in the Mack prediction error
    pub include_parameter_variance: bool,

    /// Number of trees (boosting, forest)
    pub n_estimators: usize,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Boosting learning rate
    pub learning_rate: f64,

    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,

    /// Hidden layer sizes for the feed-forward network
    pub hidden_layers: Vec<usize>,

    /// Maximum training epochs for the network
    pub epochs: usize,

    /// Dropout probability during network training (0 disables)
    pub dropout: f64,

    /// Seed for all randomized components; None draws from entropy
    pub seed: Option<u64>,
}

impl Default for MethodParams {
    fn default() -> Self {
        Self {
            factor_method: FactorMethod::SimpleAverage,
            tail_factor: None,
            expected_loss_ratio: None,
            premiums: None,
            loss_ratios_by_period: None,
            trend_rate: 0.0,
            confidence_level: 0.95,
            bootstrap_iterations: 1000,
            alpha: 1.0,
            include_process_variance: true,
            include_parameter_variance: true,
            n_estimators: 50,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_split: 4,
            hidden_layers: vec![16, 8],
            epochs: 300,
            dropout: 0.0,
            seed: None,
        }
    }
}

impl MethodParams {
    /// Set the seed (builder style).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the a-priori expected loss ratio.
    pub fn with_expected_loss_ratio(mut self, ratio: f64) -> Self {
        self.expected_loss_ratio = Some(ratio);
        self
    }

    /// Set the per-period premiums.
    pub fn with_premiums(mut self, premiums: Vec<f64>) -> Self {
        self.premiums = Some(premiums);
        self
    }
}

/// Behavioral category a method belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodCategory {
    /// Repeatable closed-form projection
    Deterministic,
    /// Carries uncertainty quantification (confidence intervals)
    Stochastic,
    /// Learned from engineered features (feature importance available)
    EnsembleLearned,
}

/// Qualitative description of a method for catalog consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescription {
    pub advantages: Vec<String>,
    pub limitations: Vec<String>,
    pub use_cases: Vec<String>,
    pub assumptions: Vec<String>,
}

/// Confidence interval bounds around a central estimate, one entry per
/// accident period plus the aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Confidence level the bounds were computed at
    pub level: f64,

    /// Lower bound per accident period
    pub lower_bounds: Vec<f64>,

    /// Upper bound per accident period
    pub upper_bounds: Vec<f64>,

    /// Central (Chain Ladder) estimate per accident period
    pub central_estimates: Vec<f64>,

    /// Aggregate (total ultimate) bounds
    pub total_lower: f64,
    pub total_upper: f64,

    /// Resamples used
    pub iterations: usize,

    /// Seed driving the resampling stream (drawn from entropy when the
    /// caller supplied none); replaying with this seed reproduces the bounds
    pub seed: u64,
}

/// Result of one reserving calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Stable identifier of the method that produced this result
    pub method_id: String,

    /// Ultimate claim amount per accident period, aligned with triangle rows
    pub ultimates: Vec<f64>,

    /// Sum of the per-period ultimates
    pub ultimate_total: f64,

    /// Sum of the latest observed cumulative values
    pub paid_to_date: f64,

    /// ultimate_total - paid_to_date, exactly
    pub reserves: f64,

    /// Completed triangle (observed cells preserved, missing cells projected)
    pub completed_triangle: Vec<Vec<f64>>,

    /// Development factors used; empty for methods that do not use them
    pub development_factors: Vec<f64>,

    /// Named numeric diagnostics, method-specific
    pub diagnostics: BTreeMap<String, f64>,

    /// Non-fatal quality signals accumulated during calculation
    pub warnings: Vec<String>,

    /// Inputs and intermediate statistics for audit
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Wall-clock computation time in milliseconds
    pub computation_ms: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CalculationResult {
    /// Assemble a result, deriving the total/reserve fields so the
    /// `reserves == ultimate_total - paid_to_date` invariant holds exactly.
    pub fn new(
        method_id: &str,
        ultimates: Vec<f64>,
        paid_to_date: f64,
        completed_triangle: Vec<Vec<f64>>,
        development_factors: Vec<f64>,
    ) -> Self {
        let ultimate_total: f64 = ultimates.iter().sum();
        Self {
            method_id: method_id.to_string(),
            ultimates,
            ultimate_total,
            paid_to_date,
            reserves: ultimate_total - paid_to_date,
            completed_triangle,
            development_factors,
            diagnostics: BTreeMap::new(),
            warnings: Vec::new(),
            metadata: BTreeMap::new(),
            computation_ms: 0.0,
            created_at: Utc::now(),
        }
    }

    /// Transport form: monetary fields rounded to 2 decimals, factors and
    /// ratio diagnostics to 4. Returns a new result; self is unchanged.
    pub fn rounded(&self) -> Self {
        let money = |v: f64| (v * 100.0).round() / 100.0;
        let ratio = |v: f64| (v * 10_000.0).round() / 10_000.0;

        let mut out = self.clone();
        out.ultimates = self.ultimates.iter().map(|&v| money(v)).collect();
        out.ultimate_total = money(self.ultimate_total);
        out.paid_to_date = money(self.paid_to_date);
        out.reserves = money(self.reserves);
        out.completed_triangle = self
            .completed_triangle
            .iter()
            .map(|row| row.iter().map(|&v| money(v)).collect())
            .collect();
        out.development_factors = self.development_factors.iter().map(|&v| ratio(v)).collect();
        out.diagnostics = self
            .diagnostics
            .iter()
            .map(|(k, &v)| (k.clone(), ratio(v)))
            .collect();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_result_reserve_invariant() {
        let result = CalculationResult::new(
            "chain_ladder",
            vec![1650.0, 1885.7, 2202.3],
            4450.0,
            vec![],
            vec![],
        );
        assert_relative_eq!(
            result.reserves,
            result.ultimate_total - result.paid_to_date
        );
        assert_relative_eq!(
            result.ultimate_total,
            result.ultimates.iter().sum::<f64>()
        );
    }

    #[test]
    fn test_rounding_rules() {
        let mut result = CalculationResult::new(
            "chain_ladder",
            vec![1234.56789],
            1000.123456,
            vec![vec![1.23456, 2.34567]],
            vec![1.234567],
        );
        result.diagnostics.insert("fit_rmse".into(), 0.123456789);
        let rounded = result.rounded();
        assert_relative_eq!(rounded.ultimates[0], 1234.57);
        assert_relative_eq!(rounded.paid_to_date, 1000.12);
        assert_relative_eq!(rounded.development_factors[0], 1.2346);
        assert_relative_eq!(rounded.diagnostics["fit_rmse"], 0.1235);
        assert_relative_eq!(rounded.completed_triangle[0][1], 2.35);
    }

    #[test]
    fn test_result_serializes() {
        let result = CalculationResult::new("elr", vec![750000.0], 0.0, vec![], vec![]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"method_id\":\"elr\""));
    }

    #[test]
    fn test_default_params() {
        let params = MethodParams::default();
        assert_relative_eq!(params.confidence_level, 0.95);
        assert_eq!(params.bootstrap_iterations, 1000);
        assert!(params.seed.is_none());
    }
}
