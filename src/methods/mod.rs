//! Reserving method contract and implementations
//!
//! Every reserving method implements [`ReservingMethod`]: validate the input,
//! calculate a [`CalculationResult`], and describe itself for catalog
//! consumers. Two capability traits layer on top:
//!
//! - [`StochasticMethod`]: additionally produces bootstrap confidence
//!   intervals around the central estimate
//! - [`EnsembleMethod`]: additionally reports a feature-importance ranking
//!
//! Methods hold no mutable state: every `calculate` call is independent,
//! side-effect-free on shared state, and timed locally. Trained ensemble
//! models are transient, owned by the invocation, and discarded with it.

mod types;
mod registry;
mod chain_ladder;
mod bornhuetter_ferguson;
mod expected_loss_ratio;
mod mack;

pub use types::{
    MethodParams, MethodCategory, MethodDescription, ConfidenceInterval, CalculationResult,
};
pub use registry::{MethodCatalog, CatalogEntry};
pub use chain_ladder::ChainLadder;
pub use bornhuetter_ferguson::BornhuetterFerguson;
pub use expected_loss_ratio::ExpectedLossRatio;
pub use mack::Mack;

use crate::error::ReservingError;
use crate::triangle::Triangle;

/// Base contract every reserving method implements
pub trait ReservingMethod: Send + Sync {
    /// Stable identifier used for catalog dispatch (e.g. "chain_ladder")
    fn id(&self) -> &'static str;

    /// Human-readable display name
    fn name(&self) -> &'static str;

    /// Behavioral category
    fn category(&self) -> MethodCategory;

    /// Check the triangle and parameters against this method's requirements.
    ///
    /// Returns a list of human-readable violations, empty when the input is
    /// acceptable. `calculate` refuses to run while violations exist.
    fn validate(&self, triangle: &Triangle, params: &MethodParams) -> Vec<String>;

    /// Run the calculation. Fails with `ReservingError::Validation` if
    /// called despite outstanding violations; any input that passes
    /// validation always yields a usable result (numerical degeneracies are
    /// handled with documented fallbacks, never propagated as errors).
    fn calculate(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<CalculationResult, ReservingError>;

    /// Qualitative description for catalog consumers.
    fn describe(&self) -> MethodDescription;
}

/// Capability: uncertainty quantification via resampling
pub trait StochasticMethod: ReservingMethod {
    /// One bootstrap resample: perturbed ultimates per accident period drawn
    /// from `rng`, or `None` when the resample degenerates numerically.
    /// `confidence_interval` drives this hook to build its empirical sample;
    /// callers can drive it directly for custom aggregation.
    fn resample(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
        rng: &mut dyn rand::RngCore,
    ) -> Option<Vec<f64>>;

    /// Bootstrap confidence interval around the central estimate at the
    /// given level. Models are transient per invocation, so the triangle and
    /// parameters are passed in rather than read from trained state.
    fn confidence_interval(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
        level: f64,
    ) -> Result<ConfidenceInterval, ReservingError>;
}

/// Capability: explainability via feature importance
pub trait EnsembleMethod: ReservingMethod {
    /// Feature-importance ranking (name, weight), highest first. Weights
    /// are normalized to sum to 1 when any split/weight mass exists.
    fn feature_importance(
        &self,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<Vec<(String, f64)>, ReservingError>;
}

/// Shared guard: run `validate` and refuse calculation on violations.
pub(crate) fn ensure_valid(
    method: &dyn ReservingMethod,
    triangle: &Triangle,
    params: &MethodParams,
) -> Result<(), ReservingError> {
    let violations = method.validate(triangle, params);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ReservingError::Validation(violations))
    }
}
