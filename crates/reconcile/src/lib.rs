pub mod aggregate;
pub mod budget;
pub mod config;
pub mod normalizer;
pub mod pipeline;
pub mod projection;
pub(crate) mod util;

pub use aggregate::{
    AggregateOptions, AggregationOutput, AggregationResult, OutlierPolicy, SurfacedTransaction,
    TransactionAggregator,
};
pub use budget::{BudgetStatus, BudgetTracker, CategoryBudget, HealthBand, HealthBands};
pub use config::{ConfigError, EngineConfig};
pub use normalizer::{normalize_category, CategoryNormalizer, MatchRule, Resolution};
pub use pipeline::{CategoryReport, ReconcileError, Reconciler, ReconciliationReport, TotalReport};
pub use projection::{ProjectionEngine, ProjectionResult, ProjectionStatus, ProjectionThresholds};

pub mod reconcile {
    use crate::*;
    use kakeibo_core::{CategoryNode, Money, PeriodError};

    pub fn normalize(label: &str, canonical: &[&str]) -> String {
        normalize_category(label, canonical)
    }

    pub fn project(
        month: &str,
        total_spent: Money,
        total_budget: Money,
        current_day: u32,
    ) -> Result<ProjectionResult, PeriodError> {
        ProjectionEngine::default().project_str(month, total_spent, total_budget, current_day)
    }

    pub fn track(spent: Money, budgeted: Money) -> BudgetStatus {
        BudgetTracker::default().track(spent, budgeted)
    }

    pub fn create_reconciler(
        config_toml: &str,
        tree: &[CategoryNode],
    ) -> Result<Reconciler, ReconcileError> {
        Reconciler::from_parts(config_toml, tree)
    }
}
