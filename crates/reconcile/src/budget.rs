use kakeibo_core::{BudgetAllocation, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::aggregate::AggregationResult;

/// Spent-percent cut-offs for the health bands, each inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthBands {
    pub caution_percent: Decimal,
    pub warning_percent: Decimal,
    pub over_percent: Decimal,
}

impl Default for HealthBands {
    fn default() -> Self {
        Self {
            caution_percent: Decimal::from(50),
            warning_percent: Decimal::from(80),
            over_percent: Decimal::from(100),
        }
    }
}

impl HealthBands {
    pub fn classify(&self, spent_percent: Decimal) -> HealthBand {
        if spent_percent >= self.over_percent {
            HealthBand::Over
        } else if spent_percent >= self.warning_percent {
            HealthBand::Warning
        } else if spent_percent >= self.caution_percent {
            HealthBand::Caution
        } else {
            HealthBand::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Caution,
    Warning,
    Over,
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthBand::Healthy => write!(f, "healthy"),
            HealthBand::Caution => write!(f, "caution"),
            HealthBand::Warning => write!(f, "warning"),
            HealthBand::Over => write!(f, "over"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub spent: Money,
    pub budgeted: Money,
    pub remaining: Money,
    pub is_over_budget: bool,
    /// `spent / budgeted × 100`, or 0 when nothing is budgeted.
    pub spent_percent: Decimal,
    pub band: HealthBand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub category: String,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetTracker {
    bands: HealthBands,
}

impl BudgetTracker {
    pub fn new(bands: HealthBands) -> Self {
        Self { bands }
    }

    pub fn track(&self, spent: Money, budgeted: Money) -> BudgetStatus {
        let spent_percent = if budgeted.is_positive() {
            spent
                .ratio(budgeted)
                .map_or(Decimal::ZERO, |r| r * Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };
        let is_over_budget = spent > budgeted;

        // With nothing budgeted the percent is pinned at 0, but any spend is
        // still over budget.
        let band = if !budgeted.is_positive() && is_over_budget {
            HealthBand::Over
        } else {
            self.bands.classify(spent_percent)
        };

        BudgetStatus {
            spent,
            budgeted,
            remaining: budgeted - spent,
            is_over_budget,
            spent_percent,
            band,
        }
    }

    /// One entry per aggregated category, in category order. A category with
    /// no allocation is tracked against a zero budget; duplicate allocations
    /// for one category are summed.
    pub fn track_categories(
        &self,
        aggregations: &BTreeMap<String, AggregationResult>,
        allocations: &[BudgetAllocation],
    ) -> Vec<CategoryBudget> {
        aggregations
            .values()
            .map(|agg| CategoryBudget {
                category: agg.category.clone(),
                status: self.track(agg.total_spent, allocated(&agg.category, allocations)),
            })
            .collect()
    }

    /// Status over the sums of the given category statuses.
    pub fn track_total(&self, categories: &[CategoryBudget]) -> BudgetStatus {
        let spent = categories.iter().map(|c| c.status.spent).sum();
        let budgeted = categories.iter().map(|c| c.status.budgeted).sum();
        self.track(spent, budgeted)
    }
}

pub(crate) fn allocated(category: &str, allocations: &[BudgetAllocation]) -> Money {
    allocations
        .iter()
        .filter(|a| a.category == category)
        .map(|a| a.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yen(n: i64) -> Money {
        Money::from_major(n)
    }

    #[test]
    fn remaining_and_percent() {
        let status = BudgetTracker::default().track(yen(30_000), yen(40_000));
        assert_eq!(status.remaining, yen(10_000));
        assert!(!status.is_over_budget);
        assert_eq!(status.spent_percent, Decimal::from(75));
        assert_eq!(status.band, HealthBand::Caution);
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        let tracker = BudgetTracker::default();
        assert_eq!(tracker.track(yen(49), yen(100)).band, HealthBand::Healthy);
        assert_eq!(tracker.track(yen(50), yen(100)).band, HealthBand::Caution);
        assert_eq!(tracker.track(yen(80), yen(100)).band, HealthBand::Warning);
        assert_eq!(tracker.track(yen(100), yen(100)).band, HealthBand::Over);
    }

    #[test]
    fn exactly_on_budget_is_not_over_budget() {
        let status = BudgetTracker::default().track(yen(100), yen(100));
        assert!(!status.is_over_budget);
        assert_eq!(status.remaining, Money::zero());
    }

    #[test]
    fn overspend_goes_negative() {
        let status = BudgetTracker::default().track(yen(120), yen(100));
        assert!(status.is_over_budget);
        assert_eq!(status.remaining, yen(-20));
        assert_eq!(status.spent_percent, Decimal::from(120));
    }

    #[test]
    fn zero_budget_is_guarded() {
        let tracker = BudgetTracker::default();
        let idle = tracker.track(Money::zero(), Money::zero());
        assert_eq!(idle.spent_percent, Decimal::ZERO);
        assert_eq!(idle.band, HealthBand::Healthy);
        assert!(!idle.is_over_budget);

        let spent = tracker.track(yen(500), Money::zero());
        assert_eq!(spent.spent_percent, Decimal::ZERO);
        assert!(spent.is_over_budget);
        assert_eq!(spent.band, HealthBand::Over);
    }

    #[test]
    fn custom_bands() {
        let tracker = BudgetTracker::new(HealthBands {
            caution_percent: Decimal::from(30),
            warning_percent: Decimal::from(60),
            over_percent: Decimal::from(90),
        });
        assert_eq!(tracker.track(yen(95), yen(100)).band, HealthBand::Over);
        assert_eq!(tracker.track(yen(35), yen(100)).band, HealthBand::Caution);
    }

    #[test]
    fn allocations_are_summed_per_category() {
        let allocations = [
            BudgetAllocation::new("Food", yen(20_000)),
            BudgetAllocation::new("Food", yen(5_000)),
            BudgetAllocation::new("Rent", yen(80_000)),
        ];
        assert_eq!(allocated("Food", &allocations), yen(25_000));
        assert_eq!(allocated("Travel", &allocations), Money::zero());
    }

    #[test]
    fn band_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&HealthBand::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(HealthBand::Over.to_string(), "over");
    }
}
