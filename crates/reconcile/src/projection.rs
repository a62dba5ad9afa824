//! Month-end spend projection.
//!
//! Linear extrapolation: the average daily spend so far is assumed to hold
//! for the rest of the month. No seasonality or day-of-week weighting.

use chrono::{Datelike, NaiveDate};
use kakeibo_core::{Money, Month, PeriodError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Projected-percent cut-offs, each exclusive: a projection must exceed a
/// threshold to reach that status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionThresholds {
    pub warning_percent: Decimal,
    pub danger_percent: Decimal,
}

impl Default for ProjectionThresholds {
    fn default() -> Self {
        Self {
            warning_percent: Decimal::from(90),
            danger_percent: Decimal::from(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionStatus {
    Good,
    Warning,
    Danger,
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionStatus::Good => write!(f, "good"),
            ProjectionStatus::Warning => write!(f, "warning"),
            ProjectionStatus::Danger => write!(f, "danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub month: Month,
    pub total_days: u32,
    /// Never below 1.
    pub days_elapsed: u32,
    pub days_remaining: u32,
    /// Burn rate: spend per elapsed day.
    pub daily_rate: Money,
    /// What can still be spent per remaining day without exceeding the
    /// budget. Negative once the budget is already blown; 0 on the last day.
    pub safe_daily_rate: Money,
    pub projected_total: Money,
    pub projected_percent: Decimal,
    /// Positive when the projection exceeds the budget.
    pub over_under_amount: Money,
    pub status: ProjectionStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectionEngine {
    thresholds: ProjectionThresholds,
}

impl ProjectionEngine {
    pub fn new(thresholds: ProjectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn project(
        &self,
        month: Month,
        total_spent: Money,
        total_budget: Money,
        current_day: u32,
    ) -> ProjectionResult {
        let total_days = month.days();
        let days_elapsed = current_day.max(1);
        let days_remaining = total_days.saturating_sub(current_day);

        let daily_rate = total_spent / Decimal::from(days_elapsed);
        let safe_daily_rate = if days_remaining > 0 {
            (total_budget - total_spent) / Decimal::from(days_remaining)
        } else {
            Money::zero()
        };
        let projected_total = total_spent + daily_rate * Decimal::from(days_remaining);
        let projected_percent = if total_budget.is_positive() {
            projected_total
                .ratio(total_budget)
                .map_or(Decimal::ZERO, |r| r * Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };

        ProjectionResult {
            month,
            total_days,
            days_elapsed,
            days_remaining,
            daily_rate,
            safe_daily_rate,
            projected_total,
            projected_percent,
            over_under_amount: projected_total - total_budget,
            status: self.classify(projected_percent),
        }
    }

    /// Same as [`project`](Self::project) with the month given as `YYYY-MM`.
    pub fn project_str(
        &self,
        month: &str,
        total_spent: Money,
        total_budget: Money,
        current_day: u32,
    ) -> Result<ProjectionResult, PeriodError> {
        let month: Month = month.parse()?;
        Ok(self.project(month, total_spent, total_budget, current_day))
    }

    /// Projects as seen on `today`, which may fall outside `month`.
    pub fn project_as_of(
        &self,
        month: Month,
        total_spent: Money,
        total_budget: Money,
        today: NaiveDate,
    ) -> ProjectionResult {
        self.project(month, total_spent, total_budget, day_of_month(month, today))
    }

    pub fn classify(&self, projected_percent: Decimal) -> ProjectionStatus {
        if projected_percent > self.thresholds.danger_percent {
            ProjectionStatus::Danger
        } else if projected_percent > self.thresholds.warning_percent {
            ProjectionStatus::Warning
        } else {
            ProjectionStatus::Good
        }
    }
}

/// Current day within `month` as of `today`: the day of month inside it, the
/// last day once it is over, 0 before it starts.
pub fn day_of_month(month: Month, today: NaiveDate) -> u32 {
    let range = month.date_range();
    if today < range.start {
        0
    } else if today > range.end {
        month.days()
    } else {
        today.day()
    }
}
