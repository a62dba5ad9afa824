use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::currency::{Conversion, CurrencyCode, ExchangeRateTable};
use super::money::Money;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

/// A transaction as held by the transaction store.
///
/// `category` is whatever label the transaction was recorded with and is not
/// guaranteed to be canonical. `amount_minor` is signed and expressed in
/// minor units of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub category: String,
    pub amount_minor: i64,
    pub currency: CurrencyCode,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub is_adjustment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn expense(
        id: &str,
        category: &str,
        amount_minor: i64,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Self {
        Transaction {
            id: id.to_string(),
            category: category.to_string(),
            amount_minor,
            currency,
            date,
            kind: TransactionType::Expense,
            is_transfer: false,
            is_adjustment: false,
            description: None,
        }
    }

    /// Transfers and adjustments move money without being spend or income.
    pub fn is_reportable(&self) -> bool {
        !self.is_transfer && !self.is_adjustment
    }

    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount_minor, self.currency.minor_exponent())
    }

    /// Unsigned size of the transaction in the reporting currency of `rates`.
    pub fn converted_magnitude(&self, rates: &ExchangeRateTable) -> Conversion {
        let conversion = rates.convert_minor(self.amount_minor, &self.currency);
        Conversion {
            amount: conversion.amount.abs(),
            ..conversion
        }
    }
}

/// Budgeted spend for one canonical parent category over a period, in
/// reporting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub category: String,
    pub amount: Money,
}

impl BudgetAllocation {
    pub fn new(category: &str, amount: Money) -> Self {
        BudgetAllocation {
            category: category.to_string(),
            amount,
        }
    }
}
