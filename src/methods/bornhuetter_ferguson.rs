//! Bornhuetter-Ferguson reserving method
//!
//! Blends observed development with an a-priori expectation: ultimate =
//! paid-to-date + premium x a-priori loss ratio x (1 - expected payment
//! ratio at the current maturity). The payment ratio comes from the Chain
//! Ladder development pattern.

use std::time::Instant;

use log::debug;

use crate::error::ReservingError;
use crate::triangle::{complete_triangle, development_factors, Triangle};

use super::chain_ladder::quality_warnings;
use super::types::{CalculationResult, MethodCategory, MethodDescription, MethodParams};
use super::{ensure_valid, ReservingMethod};

/// Division guard on the payment-ratio denominator. Intent is to avoid a
/// zero denominator when a row is entirely undeveloped; the constant itself
/// is not calibrated.
const PAYMENT_RATIO_EPS: f64 = 1e-6;

/// Floor applied to premiums estimated from observed paid amounts.
pub(crate) const MIN_ESTIMATED_PREMIUM: f64 = 1_000.0;

/// Deterministic Bornhuetter-Ferguson
#[derive(Debug, Clone, Copy, Default)]
pub struct BornhuetterFerguson;

impl BornhuetterFerguson {
    pub fn new() -> Self {
        BornhuetterFerguson
    }
}

/// Expected cumulative payment ratio at each maturity: 1 / product of the
/// remaining development factors, capped at 1.0. Index k gives the ratio
/// after k+1 observed development periods.
pub(crate) fn payment_ratios(factors: &[f64], width: usize) -> Vec<f64> {
    let mut ratios = Vec::with_capacity(width);
    for maturity in 0..width {
        let remaining: f64 = factors[maturity.min(factors.len())..].iter().product();
        let pct = if remaining > 0.0 { 1.0 / remaining } else { 1.0 };
        ratios.push(pct.min(1.0));
    }
    ratios
}

/// Premiums per accident period: caller-supplied, or estimated as observed
/// paid grossed up by the a-priori ratio and the payment pattern, floored.
pub(crate) fn resolve_premiums(
    triangle: &Triangle,
    params: &MethodParams,
    elr: f64,
    ratios: &[f64],
) -> (Vec<f64>, bool) {
    if let Some(premiums) = &params.premiums {
        return (premiums.clone(), false);
    }
    let estimated = triangle
        .rows()
        .iter()
        .map(|row| {
            let paid = *row.last().unwrap_or(&0.0);
            let pct = ratios
                .get(row.len().saturating_sub(1))
                .copied()
                .unwrap_or(1.0)
                .max(PAYMENT_RATIO_EPS);
            (paid / (elr * pct)).max(MIN_ESTIMATED_PREMIUM)
        })
        .collect();
    (estimated, true)
}

impl ReservingMethod for BornhuetterFerguson {
    fn id(&self) -> &'static str {
        "bornhuetter_ferguson"
    }

    fn name(&self) -> &'static str {
        "Bornhuetter-Ferguson"
    }

    fn category(&self) -> MethodCategory {
        MethodCategory::Deterministic
    }

    fn validate(&self, triangle: &Triangle, params: &MethodParams) -> Vec<String> {
        let mut violations = Triangle::check_rows(triangle.rows());

        if triangle.max_development_periods() < 2 {
            violations.push(
                "bornhuetter-ferguson requires at least 2 development periods".to_string(),
            );
        }

        match params.expected_loss_ratio {
            None => violations.push("expected_loss_ratio is required".to_string()),
            Some(elr) if !(elr > 0.0 && elr <= 2.0) => {
                violations.push(format!(
                    "expected_loss_ratio must be in (0, 2], got {}",
                    elr
                ));
            }
            _ => {}
        }

        if let Some(premiums) = &params.premiums {
            if premiums.len() != triangle.accident_periods() {
                violations.push(format!(
                    "premiums ({}) do not match accident periods ({})",
                    premiums.len(),
                    triangle.accident_periods()
                ));
            }
            if premiums.iter().any(|&p| p <= 0.0 || !p.is_finite()) {
                violations.push("premiums must be positive and finite".to_string());
            }
        }

        violations
    }

    fn calculate(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<CalculationResult, ReservingError> {
        ensure_valid(self, triangle, params)?;
        let start = Instant::now();

        let elr = params.expected_loss_ratio.unwrap_or(0.0);
        let factors = development_factors(triangle, params.factor_method);
        let ratios = payment_ratios(&factors, triangle.max_development_periods());
        let (premiums, estimated) = resolve_premiums(triangle, params, elr, &ratios);

        let mut warnings = quality_warnings(triangle, &factors);
        if estimated {
            warnings.push(
                "premiums were estimated from observed paid amounts; supply premiums for a credible a-priori".to_string(),
            );
        }

        let mut ultimates = Vec::with_capacity(triangle.accident_periods());
        for (i, row) in triangle.rows().iter().enumerate() {
            let paid = *row.last().unwrap_or(&0.0);
            let pct = ratios[row.len() - 1];
            let apriori = premiums[i] * elr;

            // When paid already exceeds the a-priori expectation at this
            // maturity, the a-priori is no longer credible; fall back to a
            // pure development projection of the observed paid
            let ultimate = if paid > apriori * pct {
                paid / pct.max(PAYMENT_RATIO_EPS)
            } else {
                paid + apriori * (1.0 - pct)
            };
            ultimates.push(ultimate.max(paid));
        }
        debug!("bf ultimates: {:?}", ultimates);

        let completed = complete_triangle(triangle, &factors, None, Some(&ultimates));

        let mut result = CalculationResult::new(
            self.id(),
            ultimates,
            triangle.paid_to_date(),
            completed,
            factors,
        );
        result.warnings = warnings;

        // Average weight effectively given to observed experience
        let mean_pct = triangle
            .rows()
            .iter()
            .map(|row| ratios[row.len() - 1])
            .sum::<f64>()
            / triangle.accident_periods() as f64;
        result
            .diagnostics
            .insert("experience_weight".to_string(), mean_pct);
        result
            .diagnostics
            .insert("expected_loss_ratio".to_string(), elr);

        result.metadata.insert(
            "premiums_estimated".to_string(),
            serde_json::json!(estimated),
        );
        result
            .metadata
            .insert("premiums".to_string(), serde_json::json!(premiums));

        result.computation_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    fn describe(&self) -> MethodDescription {
        MethodDescription {
            advantages: vec![
                "Stable for immature accident periods".to_string(),
                "Blends a-priori expectation with observed development".to_string(),
            ],
            limitations: vec![
                "Quality depends on the a-priori loss ratio and premiums".to_string(),
                "Slow to recognize genuine deviations from the a-priori".to_string(),
            ],
            use_cases: vec![
                "New lines or recent accident years with little development".to_string(),
            ],
            assumptions: vec![
                "The a-priori loss ratio is an unbiased prior estimate".to_string(),
                "The development pattern is stable".to_string(),
            ],
        }
    }
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

    fn params_with_premiums() -> MethodParams {
        MethodParams::default()
            .with_expected_loss_ratio(0.8)
            .with_premiums(vec![2500.0, 2600.0, 2800.0])
    }

    #[test]
    fn test_requires_loss_ratio() {
        let tri = sample_triangle();
        let violations =
            BornhuetterFerguson::new().validate(&tri, &MethodParams::default());
        assert!(violations.iter().any(|v| v.contains("expected_loss_ratio")));
        assert!(BornhuetterFerguson::new()
            .calculate(&tri, &MethodParams::default())
            .is_err());
    }

    #[test]
    fn test_loss_ratio_range() {
        let tri = sample_triangle();
        let params = MethodParams::default().with_expected_loss_ratio(2.5);
        assert!(!BornhuetterFerguson::new().validate(&tri, &params).is_empty());
    }

    #[test]
    fn test_payment_ratios_monotone_to_one() {
        let factors = vec![1.5, 1.2];
        let ratios = payment_ratios(&factors, 3);
        assert_eq!(ratios.len(), 3);
        assert!(ratios[0] < ratios[1] && ratios[1] < ratios[2]);
        assert_relative_eq!(ratios[2], 1.0);
        assert_relative_eq!(ratios[0], 1.0 / 1.8, epsilon = 1e-12);
    }

    #[test]
    fn test_fully_developed_row_keeps_paid() {
        let tri = sample_triangle();
        let result = BornhuetterFerguson::new()
            .calculate(&tri, &params_with_premiums())
            .unwrap();
        // Row 0 is fully developed: payment ratio 1.0, ultimate = paid
        assert_relative_eq!(result.ultimates[0], 1650.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ultimates_never_undercut_paid() {
        let tri = sample_triangle();
        let result = BornhuetterFerguson::new()
            .calculate(&tri, &params_with_premiums())
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
    fn test_reconciliation_when_paid_exceeds_apriori() {
        // Tiny premium makes the a-priori expectation far below observed
        // paid; BF must switch to developing the observed amount
        let tri = sample_triangle();
        let params = MethodParams::default()
            .with_expected_loss_ratio(0.1)
            .with_premiums(vec![100.0, 100.0, 100.0]);
        let result = BornhuetterFerguson::new().calculate(&tri, &params).unwrap();
        for (ult, row) in result.ultimates.iter().zip(tri.rows()) {
            assert!(*ult >= *row.last().unwrap());
        }
        // Immature rows develop beyond paid rather than collapsing to
        // paid + a tiny a-priori reserve
        assert!(result.ultimates[2] > 1200.0);
    }

    #[test]
    fn test_completed_rows_end_at_ultimates() {
        let tri = sample_triangle();
        let result = BornhuetterFerguson::new()
            .calculate(&tri, &params_with_premiums())
            .unwrap();
        for (row, ult) in result.completed_triangle.iter().zip(&result.ultimates) {
            assert_relative_eq!(*row.last().unwrap(), *ult, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_estimated_premiums_warn() {
        let tri = sample_triangle();
        let params = MethodParams::default().with_expected_loss_ratio(0.8);
        let result = BornhuetterFerguson::new().calculate(&tri, &params).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("estimated")));
        assert_eq!(result.metadata["premiums_estimated"], serde_json::json!(true));
    }

    #[test]
    fn test_premium_length_mismatch_refused() {
        let tri = sample_triangle();
        let params = MethodParams::default()
            .with_expected_loss_ratio(0.8)
            .with_premiums(vec![2500.0]);
        assert!(BornhuetterFerguson::new().calculate(&tri, &params).is_err());
    }
}
