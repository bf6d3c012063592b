//! Expected Loss Ratio reserving method
//!
//! Ignores observed development entirely: ultimate = premium x loss ratio,
//! optionally per accident period and trended by calendar distance from the
//! most recent period. Used when development data is too thin to be
//! credible (new lines, very immature periods).

use std::time::Instant;

use log::debug;

use crate::error::ReservingError;
use crate::triangle::{complete_triangle, Triangle};

use super::bornhuetter_ferguson::MIN_ESTIMATED_PREMIUM;
use super::types::{CalculationResult, MethodCategory, MethodDescription, MethodParams};
use super::{ensure_valid, ReservingMethod};

/// Deterministic Expected Loss Ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedLossRatio;

impl ExpectedLossRatio {
    pub fn new() -> Self {
        ExpectedLossRatio
    }
}

impl ReservingMethod for ExpectedLossRatio {
    fn id(&self) -> &'static str {
        "expected_loss_ratio"
    }

    fn name(&self) -> &'static str {
        "Expected Loss Ratio"
    }

    fn category(&self) -> MethodCategory {
        MethodCategory::Deterministic
    }

    fn validate(&self, triangle: &Triangle, params: &MethodParams) -> Vec<String> {
        let mut violations = Triangle::check_rows(triangle.rows());

        let has_per_period = params.loss_ratios_by_period.is_some();
        match params.expected_loss_ratio {
            None if !has_per_period => {
                violations.push(
                    "expected_loss_ratio (or loss_ratios_by_period) is required".to_string(),
                );
            }
            Some(elr) if !(elr > 0.0 && elr <= 2.0) => {
                violations.push(format!(
                    "expected_loss_ratio must be in (0, 2], got {}",
                    elr
                ));
            }
            _ => {}
        }

        if let Some(ratios) = &params.loss_ratios_by_period {
            if ratios.len() != triangle.accident_periods() {
                violations.push(format!(
                    "loss_ratios_by_period ({}) do not match accident periods ({})",
                    ratios.len(),
                    triangle.accident_periods()
                ));
            }
            if ratios.iter().any(|&r| !(r > 0.0 && r <= 2.0)) {
                violations.push("per-period loss ratios must be in (0, 2]".to_string());
            }
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

        if params.trend_rate <= -1.0 || !params.trend_rate.is_finite() {
            violations.push(format!(
                "trend_rate must be a finite rate greater than -1, got {}",
                params.trend_rate
            ));
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

        let n = triangle.accident_periods();
        let base_elr = params.expected_loss_ratio.unwrap_or(0.0);

        // Effective ratio per accident period: the per-period override (or
        // the base ratio), de-trended by calendar distance from the most
        // recent period, which carries the base ratio unchanged
        let effective: Vec<f64> = (0..n)
            .map(|i| {
                let ratio = params
                    .loss_ratios_by_period
                    .as_ref()
                    .and_then(|r| r.get(i).copied())
                    .unwrap_or(base_elr);
                let distance = (n - 1 - i) as i32;
                ratio / (1.0 + params.trend_rate).powi(distance)
            })
            .collect();

        // Premiums: supplied, or grossed up from paid at the effective ratio
        let (premiums, estimated) = match &params.premiums {
            Some(p) => (p.clone(), false),
            None => {
                let est = triangle
                    .rows()
                    .iter()
                    .zip(&effective)
                    .map(|(row, ratio)| {
                        (row.last().unwrap_or(&0.0) / ratio.max(1e-6))
                            .max(MIN_ESTIMATED_PREMIUM)
                    })
                    .collect();
                (est, true)
            }
        };

        let mut warnings = Vec::new();
        if estimated {
            warnings.push(
                "premiums were estimated from observed paid amounts; supply premiums for a credible a-priori".to_string(),
            );
        }

        let mut ultimates = Vec::with_capacity(n);
        for (i, row) in triangle.rows().iter().enumerate() {
            let trended = effective[i];
            let paid = *row.last().unwrap_or(&0.0);
            let ultimate = (premiums[i] * trended).max(paid);
            if premiums[i] * trended < paid {
                warnings.push(format!(
                    "accident period {}: a-priori ultimate {:.2} below observed paid {:.2}; floored at paid",
                    i,
                    premiums[i] * trended,
                    paid
                ));
            }
            ultimates.push(ultimate);
        }
        debug!("elr ultimates: {:?}", ultimates);

        // No development pattern: carry observed cells flat, then pin the
        // final cell at the a-priori ultimate
        let completed = complete_triangle(triangle, &[], None, Some(&ultimates));

        let mut result = CalculationResult::new(
            self.id(),
            ultimates,
            triangle.paid_to_date(),
            completed,
            Vec::new(),
        );
        result.warnings = warnings;
        result
            .diagnostics
            .insert("expected_loss_ratio".to_string(), base_elr);
        result
            .diagnostics
            .insert("trend_rate".to_string(), params.trend_rate);
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
                "Usable with no credible development history".to_string(),
                "Completely stable: immune to early development noise".to_string(),
            ],
            limitations: vec![
                "Ignores all observed development".to_string(),
                "Entirely dependent on premium and ratio assumptions".to_string(),
            ],
            use_cases: vec![
                "Brand-new business lines".to_string(),
                "Most recent accident periods with near-zero maturity".to_string(),
            ],
            assumptions: vec![
                "The expected loss ratio reflects the true underlying cost".to_string(),
                "Premiums are a sound exposure measure".to_string(),
            ],
        }
    }
}
