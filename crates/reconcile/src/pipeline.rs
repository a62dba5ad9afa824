use chrono::NaiveDate;
use kakeibo_core::{
    BudgetAllocation, CategoryHierarchy, CategoryNode, CurrencyCode, DateRange, ExchangeRateTable,
    HierarchyError, Money, Month, PeriodError, Side, Transaction,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::aggregate::{AggregationResult, TransactionAggregator};
use crate::budget::{allocated, BudgetStatus, BudgetTracker, CategoryBudget};
use crate::config::{ConfigError, EngineConfig};
use crate::projection::{day_of_month, ProjectionEngine, ProjectionResult};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: String,
    pub aggregation: AggregationResult,
    pub budget: BudgetStatus,
    pub projection: ProjectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalReport {
    pub budget: BudgetStatus,
    pub projection: ProjectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub month: Month,
    pub as_of: NaiveDate,
    pub reporting_currency: CurrencyCode,
    /// In request order: hierarchy expense parents, then any allocated
    /// categories the hierarchy does not know.
    pub categories: Vec<CategoryReport>,
    pub total: TotalReport,
    pub unresolved_labels: Vec<String>,
    /// Every currency that passed through unconverted, across categories.
    pub missing_rates: Vec<CurrencyCode>,
}

/// Runs aggregation, budget tracking and projection for one month.
pub struct Reconciler {
    config: EngineConfig,
    hierarchy: CategoryHierarchy,
}

impl Reconciler {
    pub fn new(config: EngineConfig, hierarchy: CategoryHierarchy) -> Self {
        Self { config, hierarchy }
    }

    pub fn from_parts(config_toml: &str, tree: &[CategoryNode]) -> Result<Self, ReconcileError> {
        let config = EngineConfig::from_toml(config_toml)?;
        let hierarchy = CategoryHierarchy::from_tree(tree)?;
        Ok(Self::new(config, hierarchy))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &CategoryHierarchy {
        &self.hierarchy
    }

    /// Parents a pass reports on.
    pub fn requested_categories(&self, allocations: &[BudgetAllocation]) -> Vec<String> {
        let mut requested: Vec<String> = self
            .hierarchy
            .parents(Side::Expense)
            .into_iter()
            .map(str::to_string)
            .collect();
        for allocation in allocations {
            if !requested.contains(&allocation.category) {
                requested.push(allocation.category.clone());
            }
        }
        requested
    }

    pub fn reconcile(
        &self,
        month: Month,
        as_of: NaiveDate,
        transactions: &[Transaction],
        rates: &ExchangeRateTable,
        allocations: &[BudgetAllocation],
    ) -> ReconciliationReport {
        let requested = self.requested_categories(allocations);
        let aggregator = TransactionAggregator::with_policy(
            &self.hierarchy,
            self.config.outlier.clone(),
            self.config.aggregate_options(),
        );
        // Spend is month-to-date: nothing dated after `as_of` counts, and an
        // `as_of` before the month sees no spend at all.
        let (window, candidates) =
            match DateRange::new(month.first_day(), as_of.min(month.last_day())) {
                Ok(window) => (window, transactions),
                Err(_) => (month.date_range(), &[][..]),
            };
        let output =
            aggregator.aggregate_detailed(&requested, window, candidates, rates, allocations);

        let tracker = BudgetTracker::new(self.config.bands.clone());
        let projector = ProjectionEngine::new(self.config.projection.clone());
        let current_day = day_of_month(month, as_of);

        let mut by_category = output.by_category;
        let mut missing_rates = BTreeSet::new();
        let mut budgets = Vec::with_capacity(requested.len());
        let mut categories = Vec::with_capacity(requested.len());

        for category in &requested {
            let Some(aggregation) = by_category.remove(category) else {
                continue;
            };
            let budgeted = allocated(category, allocations);
            let budget = tracker.track(aggregation.total_spent, budgeted);
            let projection = projector.project(month, aggregation.total_spent, budgeted, current_day);
            missing_rates.extend(aggregation.missing_rates.iter().cloned());
            budgets.push(CategoryBudget {
                category: category.clone(),
                status: budget.clone(),
            });
            categories.push(CategoryReport {
                category: category.clone(),
                aggregation,
                budget,
                projection,
            });
        }

        let total_budget = tracker.track_total(&budgets);
        let total_projection =
            projector.project(month, total_budget.spent, total_budget.budgeted, current_day);

        let over: Vec<&str> = categories
            .iter()
            .filter(|c| c.budget.is_over_budget)
            .map(|c| c.category.as_str())
            .collect();
        tracing::info!(
            "Reconciled {month} as of {as_of}: spent {} of {} across {} categories",
            total_budget.spent,
            total_budget.budgeted,
            categories.len()
        );
        if !over.is_empty() {
            tracing::info!("Over budget in {month}: {}", over.join(", "));
        }

        ReconciliationReport {
            month,
            as_of,
            reporting_currency: rates.reporting().clone(),
            categories,
            total: TotalReport {
                budget: total_budget,
                projection: total_projection,
            },
            unresolved_labels: output.unresolved_labels,
            missing_rates: missing_rates.into_iter().collect(),
        }
    }

    /// Same as [`reconcile`](Self::reconcile) with the month given as `YYYY-MM`.
    pub fn reconcile_str(
        &self,
        month: &str,
        as_of: NaiveDate,
        transactions: &[Transaction],
        rates: &ExchangeRateTable,
        allocations: &[BudgetAllocation],
    ) -> Result<ReconciliationReport, ReconcileError> {
        let month: Month = month.parse()?;
        Ok(self.reconcile(month, as_of, transactions, rates, allocations))
    }
}

impl ReconciliationReport {
    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == name)
    }

    pub fn total_spent(&self) -> Money {
        self.total.budget.spent
    }
}
