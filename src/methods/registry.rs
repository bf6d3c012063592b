//! Method catalog
//!
//! An explicit catalog object mapping stable identifiers to method
//! factories. Constructed once at process start and passed by reference to
//! callers; there is no global mutable state.

use log::info;

use crate::ensemble::{GradientBoosting, NeuralNetwork, RandomForest};
use crate::error::ReservingError;
use crate::triangle::Triangle;

use super::types::{CalculationResult, MethodCategory, MethodParams};
use super::{BornhuetterFerguson, ChainLadder, ExpectedLossRatio, Mack, ReservingMethod};

type MethodFactory = fn() -> Box<dyn ReservingMethod>;

/// One catalog entry: identity plus a factory for fresh method instances
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: MethodCategory,
    factory: MethodFactory,
}

impl CatalogEntry {
    pub fn instantiate(&self) -> Box<dyn ReservingMethod> {
        (self.factory)()
    }
}

/// Catalog of available reserving methods
pub struct MethodCatalog {
    entries: Vec<CatalogEntry>,
}

impl MethodCatalog {
    /// Empty catalog; use [`MethodCatalog::standard`] for the full set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Catalog with every built-in method registered.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register("chain_ladder", "Chain Ladder", MethodCategory::Deterministic, || {
            Box::new(ChainLadder::new())
        });
        catalog.register(
            "bornhuetter_ferguson",
            "Bornhuetter-Ferguson",
            MethodCategory::Deterministic,
            || Box::new(BornhuetterFerguson::new()),
        );
        catalog.register(
            "expected_loss_ratio",
            "Expected Loss Ratio",
            MethodCategory::Deterministic,
            || Box::new(ExpectedLossRatio::new()),
        );
        catalog.register("mack", "Mack Chain Ladder", MethodCategory::Stochastic, || {
            Box::new(Mack::new())
        });
        catalog.register(
            "gradient_boosting",
            "Gradient Boosting",
            MethodCategory::EnsembleLearned,
            || Box::new(GradientBoosting::new()),
        );
        catalog.register(
            "random_forest",
            "Random Forest",
            MethodCategory::EnsembleLearned,
            || Box::new(RandomForest::new()),
        );
        catalog.register(
            "neural_network",
            "Feed-Forward Network",
            MethodCategory::EnsembleLearned,
            || Box::new(NeuralNetwork::new()),
        );
        info!("method catalog initialized with {} methods", catalog.len());
        catalog
    }

    /// Register a method factory under a stable identifier. A repeated id
    /// replaces the earlier registration.
    pub fn register(
        &mut self,
        id: &'static str,
        name: &'static str,
        category: MethodCategory,
        factory: MethodFactory,
    ) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(CatalogEntry {
            id,
            name,
            category,
            factory,
        });
    }

    /// Instantiate the method registered under `id`.
    pub fn get(&self, id: &str) -> Option<Box<dyn ReservingMethod>> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.instantiate())
    }

    /// All registered identifiers, in registration order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Entries in a given category.
    pub fn by_category(&self, category: MethodCategory) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatch convenience: look up `id` and run its calculation.
    pub fn calculate(
        &self,
        id: &str,
        triangle: &Triangle,
        params: &MethodParams,
    ) -> Result<CalculationResult, ReservingError> {
        let method = self
            .get(id)
            .ok_or_else(|| ReservingError::UnknownMethod(id.to_string()))?;
        method.calculate(triangle, params)
    }
}

impl Default for MethodCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_contents() {
        let catalog = MethodCatalog::standard();
        assert_eq!(catalog.len(), 7);
        for id in [
            "chain_ladder",
            "bornhuetter_ferguson",
            "expected_loss_ratio",
            "mack",
            "gradient_boosting",
            "random_forest",
            "neural_network",
        ] {
            let method = catalog.get(id).unwrap_or_else(|| panic!("missing {}", id));
            assert_eq!(method.id(), id);
        }
    }

    #[test]
    fn test_unknown_id() {
        let catalog = MethodCatalog::standard();
        assert!(catalog.get("crystal_ball").is_none());
        let tri = Triangle::new(vec![vec![100.0, 150.0], vec![120.0]], "USD", "motor").unwrap();
        let err = catalog
            .calculate("crystal_ball", &tri, &MethodParams::default())
            .unwrap_err();
        assert!(matches!(err, ReservingError::UnknownMethod(_)));
    }

    #[test]
    fn test_categories() {
        let catalog = MethodCatalog::standard();
        assert_eq!(catalog.by_category(MethodCategory::Deterministic).len(), 3);
        assert_eq!(catalog.by_category(MethodCategory::Stochastic).len(), 1);
        assert_eq!(
            catalog.by_category(MethodCategory::EnsembleLearned).len(),
            3
        );
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut catalog = MethodCatalog::standard();
        let before = catalog.len();
        catalog.register(
            "chain_ladder",
            "Chain Ladder",
            MethodCategory::Deterministic,
            || Box::new(ChainLadder::new()),
        );
        assert_eq!(catalog.len(), before);
    }

    #[test]
    fn test_dispatch_calculates() {
        let catalog = MethodCatalog::standard();
        let tri = Triangle::new(
            vec![
                vec![1000.0, 1400.0, 1650.0],
                vec![1100.0, 1600.0],
                vec![1200.0],
            ],
            "USD",
            "motor",
        )
        .unwrap();
        let result = catalog
            .calculate("chain_ladder", &tri, &MethodParams::default())
            .unwrap();
        assert_eq!(result.method_id, "chain_ladder");
    }

    #[test]
    fn test_descriptions_available() {
        let catalog = MethodCatalog::standard();
        for id in catalog.ids() {
            let method = catalog.get(id).unwrap();
            let desc = method.describe();
            assert!(!desc.advantages.is_empty());
            assert!(!desc.assumptions.is_empty());
        }
    }
}
