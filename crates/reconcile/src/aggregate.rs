use kakeibo_core::{
    BudgetAllocation, CategoryHierarchy, ConversionOutcome, CurrencyCode, DateRange,
    ExchangeRateTable, Money, Side, Transaction, TransactionType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::budget::allocated;
use crate::normalizer::CategoryNormalizer;

/// When a surfaced transaction counts as an outlier.
///
/// A transaction is flagged when its converted magnitude exceeds
/// `max(budgeted × budget_share, average × average_multiple)` and also
/// exceeds the absolute floor for the reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    pub budget_share: Decimal,
    pub average_multiple: Decimal,
    /// Absolute floors keyed by the currency they are expressed in.
    pub floors: BTreeMap<CurrencyCode, Decimal>,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        let mut floors = BTreeMap::new();
        if let Ok(jpy) = CurrencyCode::new("JPY") {
            floors.insert(jpy, Decimal::from(5000));
        }
        Self {
            budget_share: Decimal::new(25, 2),
            average_multiple: Decimal::from(2),
            floors,
        }
    }
}

impl OutlierPolicy {
    /// The absolute floor in the reporting currency of `rates`.
    ///
    /// Uses the floor configured for the reporting currency when there is
    /// one; otherwise converts the first configured floor that has a rate;
    /// otherwise takes the first configured floor's number as-is.
    pub fn floor_for(&self, rates: &ExchangeRateTable) -> Money {
        let reporting = rates.reporting();
        if let Some(&floor) = self.floors.get(reporting) {
            return Money::new(floor);
        }
        for (currency, &floor) in &self.floors {
            if let Some(rate) = rates.rate_for(currency) {
                return (Money::new(floor) * rate).round_to(reporting.minor_exponent());
            }
        }
        match self.floors.iter().next() {
            Some((currency, &floor)) => {
                tracing::warn!(
                    "No outlier floor for {reporting} and no rate from {currency}; using {floor} unconverted"
                );
                Money::new(floor)
            }
            None => Money::zero(),
        }
    }

    pub fn relative_threshold(&self, budgeted: Money, average: Money) -> Money {
        (budgeted * self.budget_share).max(average * self.average_multiple)
    }

    pub fn is_outlier(&self, magnitude: Money, budgeted: Money, average: Money, floor: Money) -> bool {
        magnitude > self.relative_threshold(budgeted, average) && magnitude > floor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// How many of the largest transactions to surface per category.
    pub top_n: usize,
    /// Which side is aggregated; income is aggregated separately.
    pub kind: TransactionType,
    /// Run labels that are not literal category names through the
    /// normalizer before giving up on them.
    pub normalize_labels: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_n: 3,
            kind: TransactionType::Expense,
            normalize_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacedTransaction {
    pub transaction: Transaction,
    /// Unsigned amount in the reporting currency.
    pub converted: Money,
    pub is_outlier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub category: String,
    /// Largest transactions by converted magnitude, descending.
    pub top: Vec<SurfacedTransaction>,
    /// Sum over every matching transaction, not only `top`.
    pub total_spent: Money,
    pub transaction_count: usize,
    pub average: Money,
    /// Currencies that had no rate and passed through unconverted.
    pub missing_rates: Vec<CurrencyCode>,
}

impl AggregationResult {
    fn empty(category: &str) -> Self {
        Self {
            category: category.to_string(),
            top: Vec::new(),
            total_spent: Money::zero(),
            transaction_count: 0,
            average: Money::zero(),
            missing_rates: Vec::new(),
        }
    }

    pub fn outliers(&self) -> impl Iterator<Item = &SurfacedTransaction> {
        self.top.iter().filter(|t| t.is_outlier)
    }
}

/// Aggregation plus the labels that could not be placed under any parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationOutput {
    pub by_category: BTreeMap<String, AggregationResult>,
    /// Distinct labels, in first-seen order, of eligible transactions that
    /// resolved to no parent at all.
    pub unresolved_labels: Vec<String>,
}

#[derive(Default)]
struct Bucket<'t> {
    entries: Vec<(&'t Transaction, Money)>,
    total: Money,
    missing: BTreeSet<CurrencyCode>,
}

/// Groups transactions under requested parent categories and totals them in
/// the reporting currency.
pub struct TransactionAggregator<'h> {
    hierarchy: &'h CategoryHierarchy,
    policy: OutlierPolicy,
    options: AggregateOptions,
}

impl<'h> TransactionAggregator<'h> {
    pub fn new(hierarchy: &'h CategoryHierarchy) -> Self {
        Self::with_policy(hierarchy, OutlierPolicy::default(), AggregateOptions::default())
    }

    pub fn with_policy(
        hierarchy: &'h CategoryHierarchy,
        policy: OutlierPolicy,
        options: AggregateOptions,
    ) -> Self {
        Self {
            hierarchy,
            policy,
            options,
        }
    }

    /// One entry per requested parent, empty when nothing matched.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        parents: &[S],
        window: DateRange,
        transactions: &[Transaction],
        rates: &ExchangeRateTable,
        budgets: &[BudgetAllocation],
    ) -> BTreeMap<String, AggregationResult> {
        self.aggregate_detailed(parents, window, transactions, rates, budgets)
            .by_category
    }

    pub fn aggregate_detailed<S: AsRef<str>>(
        &self,
        parents: &[S],
        window: DateRange,
        transactions: &[Transaction],
        rates: &ExchangeRateTable,
        budgets: &[BudgetAllocation],
    ) -> AggregationOutput {
        let requested: HashSet<&str> = parents.iter().map(|p| p.as_ref()).collect();
        let normalizer = self.options.normalize_labels.then(|| {
            CategoryNormalizer::new(
                self.hierarchy
                    .flat_names(Side::Both)
                    .into_iter()
                    .chain(parents.iter().map(|p| p.as_ref())),
            )
        });

        let mut buckets: HashMap<&str, Bucket> = HashMap::new();
        let mut unresolved_labels: Vec<String> = Vec::new();
        let mut eligible = 0usize;

        for tx in transactions {
            if !tx.is_reportable() || tx.kind != self.options.kind || !window.contains(tx.date) {
                continue;
            }
            eligible += 1;

            let Some(parent) = self.resolve_parent(&tx.category, &requested, normalizer.as_ref())
            else {
                if !unresolved_labels.contains(&tx.category) {
                    unresolved_labels.push(tx.category.clone());
                }
                continue;
            };
            let Some(&parent) = requested.get(parent.as_str()) else {
                continue;
            };

            let conversion = tx.converted_magnitude(rates);
            let bucket = buckets.entry(parent).or_default();
            if conversion.outcome == ConversionOutcome::MissingRate {
                bucket.missing.insert(tx.currency.clone());
            }
            bucket.total += conversion.amount;
            bucket.entries.push((tx, conversion.amount));
        }

        let floor = self.policy.floor_for(rates);
        let mut by_category: BTreeMap<String, AggregationResult> = BTreeMap::new();
        for parent in parents {
            let parent = parent.as_ref();
            if by_category.contains_key(parent) {
                continue;
            }
            let result = match buckets.remove(parent) {
                Some(bucket) => self.summarize(parent, bucket, allocated(parent, budgets), floor),
                None => AggregationResult::empty(parent),
            };
            by_category.insert(parent.to_string(), result);
        }

        tracing::debug!(
            "Aggregated {eligible} {} transactions into {} categories; {} labels unresolved",
            self.options.kind,
            by_category.len(),
            unresolved_labels.len()
        );

        AggregationOutput {
            by_category,
            unresolved_labels,
        }
    }

    /// Literal requested parent, then hierarchy membership, then (when
    /// enabled) the normalized label through the same two checks.
    fn resolve_parent(
        &self,
        label: &str,
        requested: &HashSet<&str>,
        normalizer: Option<&CategoryNormalizer>,
    ) -> Option<String> {
        let literal = |name: &str| -> Option<String> {
            if requested.contains(name) {
                return Some(name.to_string());
            }
            self.hierarchy.parent_of(name).map(str::to_string)
        };

        if let Some(parent) = literal(label) {
            return Some(parent);
        }
        let resolution = normalizer?.resolve(label);
        if !resolution.is_resolved() {
            return None;
        }
        literal(&resolution.name)
    }

    fn summarize(&self, category: &str, mut bucket: Bucket<'_>, budgeted: Money, floor: Money) -> AggregationResult {
        let count = bucket.entries.len();
        let average = if count > 0 {
            bucket.total / Decimal::from(count)
        } else {
            Money::zero()
        };

        // Stable: equal magnitudes keep input order.
        bucket.entries.sort_by(|a, b| b.1.cmp(&a.1));

        let top = bucket
            .entries
            .iter()
            .take(self.options.top_n)
            .map(|&(tx, converted)| SurfacedTransaction {
                transaction: tx.clone(),
                converted,
                is_outlier: self.policy.is_outlier(converted, budgeted, average, floor),
            })
            .collect();

        AggregationResult {
            category: category.to_string(),
            top,
            total_spent: bucket.total,
            transaction_count: count,
            average,
            missing_rates: bucket.missing.into_iter().collect(),
        }
    }
}
