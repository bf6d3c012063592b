//! Reserving System - Claims reserving engine for loss-triangle development
//!
//! This library provides:
//! - A validated, immutable loss-triangle model with derived statistics
//! - Deterministic reserving methods (Chain Ladder, Bornhuetter-Ferguson, Expected Loss Ratio)
//! - The Mack stochastic method (variance estimation, bootstrap confidence intervals)
//! - Ensemble regression methods for triangle completion (gradient boosting,
//!   random forest, feed-forward network)
//! - A method catalog for identifier-based dispatch

pub mod error;
pub mod triangle;
pub mod methods;
pub mod ensemble;

// Re-export commonly used types
pub use error::ReservingError;
pub use triangle::{Triangle, TriangleStatistics, FactorMethod};
pub use methods::{
    ReservingMethod, StochasticMethod, EnsembleMethod, MethodCategory,
    MethodParams, CalculationResult, ConfidenceInterval, MethodDescription,
    MethodCatalog,
};
pub use ensemble::{GradientBoosting, RandomForest, NeuralNetwork};
