//! Conversion of amounts into a single reporting currency.
//!
//! Rates are expressed as reporting-currency units per one unit of the
//! source currency. The reporting currency always converts at 1. A currency
//! with no rate in the table passes through unconverted: the amount is
//! treated as if it were already in reporting units. The fallback is
//! reported through [`ConversionOutcome::MissingRate`] and a `warn` event.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),
    #[error("Invalid exchange rate for {currency}: {rate}")]
    InvalidRate { currency: CurrencyCode, rate: Decimal },
}

/// An ISO 4217 alphabetic code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

/// Currencies whose minor unit is not the usual hundredth.
const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "UYI", "VND",
    "VUV", "XAF", "XOF", "XPF",
];
const THREE_DECIMAL: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, RateError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RateError::InvalidCurrency(code.to_string()));
        }
        Ok(CurrencyCode(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in one minor unit (JPY 0, USD 2, KWD 3).
    pub fn minor_exponent(&self) -> u32 {
        if ZERO_DECIMAL.contains(&self.0.as_str()) {
            0
        } else if THREE_DECIMAL.contains(&self.0.as_str()) {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// How an amount reached the reporting currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ConversionOutcome {
    /// Source was already the reporting currency.
    Identity,
    Converted { rate: Decimal },
    /// No rate on file; the amount passed through unconverted.
    MissingRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: Money,
    pub outcome: ConversionOutcome,
}

/// Snapshot of exchange rates into one reporting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRateTable")]
pub struct ExchangeRateTable {
    reporting: CurrencyCode,
    rates: BTreeMap<CurrencyCode, Decimal>,
}

#[derive(Deserialize)]
struct RawRateTable {
    reporting: CurrencyCode,
    #[serde(default)]
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl TryFrom<RawRateTable> for ExchangeRateTable {
    type Error = RateError;
    fn try_from(raw: RawRateTable) -> Result<Self, Self::Error> {
        raw.rates
            .into_iter()
            .try_fold(ExchangeRateTable::new(raw.reporting), |table, (code, rate)| {
                table.with_rate(code, rate)
            })
    }
}

impl ExchangeRateTable {
    pub fn new(reporting: CurrencyCode) -> Self {
        ExchangeRateTable {
            reporting,
            rates: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a rate. Rates must be strictly positive. A rate
    /// for the reporting currency itself is accepted but ignored, since the
    /// reporting currency always converts at 1.
    pub fn with_rate(mut self, currency: CurrencyCode, rate: Decimal) -> Result<Self, RateError> {
        if rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate { currency, rate });
        }
        if currency != self.reporting {
            self.rates.insert(currency, rate);
        }
        Ok(self)
    }

    pub fn reporting(&self) -> &CurrencyCode {
        &self.reporting
    }

    pub fn rate_for(&self, currency: &CurrencyCode) -> Option<Decimal> {
        if *currency == self.reporting {
            Some(Decimal::ONE)
        } else {
            self.rates.get(currency).copied()
        }
    }

    /// Converts a major-unit amount. The result keeps full precision.
    pub fn convert(&self, amount: Money, from: &CurrencyCode) -> Conversion {
        if *from == self.reporting {
            return Conversion {
                amount,
                outcome: ConversionOutcome::Identity,
            };
        }
        match self.rates.get(from) {
            Some(&rate) => Conversion {
                amount: amount * rate,
                outcome: ConversionOutcome::Converted { rate },
            },
            None => {
                tracing::warn!(
                    "No exchange rate {from}->{}; passing amount through unconverted",
                    self.reporting
                );
                Conversion {
                    amount,
                    outcome: ConversionOutcome::MissingRate,
                }
            }
        }
    }

    /// Converts an integer minor-unit amount in `from` into reporting
    /// currency, rounded to the reporting currency's minor unit.
    ///
    /// On the pass-through path the major-unit value is kept as-is (so
    /// 1999 cents becomes 19.99 reporting units) rather than reinterpreting
    /// the raw minor-unit integer.
    pub fn convert_minor(&self, minor: i64, from: &CurrencyCode) -> Conversion {
        let major = Money::from_minor(minor, from.minor_exponent());
        let conversion = self.convert(major, from);
        Conversion {
            amount: conversion.amount.round_to(self.reporting.minor_exponent()),
            ..conversion
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    fn jpy_table() -> ExchangeRateTable {
        ExchangeRateTable::new(code("JPY"))
            .with_rate(code("USD"), Decimal::new(150, 0))
            .unwrap()
            .with_rate(code("EUR"), Decimal::new(1625, 1))
            .unwrap()
    }

    #[test]
    fn currency_code_is_normalised() {
        assert_eq!(code(" usd ").as_str(), "USD");
        assert!(CurrencyCode::new("US").is_err());
        assert!(CurrencyCode::new("U$D").is_err());
        assert!(CurrencyCode::new("").is_err());
    }

    #[test]
    fn minor_exponents() {
        assert_eq!(code("JPY").minor_exponent(), 0);
        assert_eq!(code("USD").minor_exponent(), 2);
        assert_eq!(code("KWD").minor_exponent(), 3);
    }

    #[test]
    fn reporting_currency_is_identity() {
        let table = jpy_table();
        for amount in [0i64, 1, -1, 5000, 123_456_789] {
            let c = table.convert(Money::from_major(amount), &code("JPY"));
            assert_eq!(c.amount, Money::from_major(amount));
            assert_eq!(c.outcome, ConversionOutcome::Identity);
        }
        assert_eq!(table.rate_for(&code("JPY")), Some(Decimal::ONE));
    }

    #[test]
    fn converts_with_rate() {
        let table = jpy_table();
        let c = table.convert_minor(1999, &code("USD"));
        assert_eq!(c.amount, Money::from_major(2999)); // 19.99 * 150 = 2998.5, rounded
        assert_eq!(c.outcome, ConversionOutcome::Converted { rate: Decimal::new(150, 0) });
    }

    #[test]
    fn missing_rate_passes_through() {
        let table = jpy_table();
        let c = table.convert_minor(2500, &code("GBP"));
        // 25.00 GBP treated as 25 JPY, rounded to whole yen.
        assert_eq!(c.amount, Money::from_major(25));
        assert_eq!(c.outcome, ConversionOutcome::MissingRate);
    }

    #[test]
    fn into_two_decimal_reporting_currency() {
        let table = ExchangeRateTable::new(code("USD"))
            .with_rate(code("JPY"), Decimal::new(667, 5))
            .unwrap();
        let c = table.convert_minor(10_000, &code("JPY"));
        assert_eq!(c.amount, Money::from_minor(6670, 2));
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        let table = ExchangeRateTable::new(code("JPY"));
        assert!(matches!(
            table.clone().with_rate(code("USD"), Decimal::ZERO),
            Err(RateError::InvalidRate { .. })
        ));
        assert!(table.with_rate(code("USD"), Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn rate_for_reporting_currency_is_ignored() {
        let table = ExchangeRateTable::new(code("JPY"))
            .with_rate(code("JPY"), Decimal::new(2, 0))
            .unwrap();
        let c = table.convert(Money::from_major(100), &code("JPY"));
        assert_eq!(c.amount, Money::from_major(100));
    }

    #[test]
    fn deserializes_from_toml() {
        let table: ExchangeRateTable = toml::from_str(
            r#"
            reporting = "jpy"

            [rates]
            USD = "150"
            EUR = "162.5"
            "#,
        )
        .unwrap();
        assert_eq!(table.reporting().as_str(), "JPY");
        assert_eq!(table.rate_for(&code("EUR")), Some(Decimal::new(1625, 1)));
        assert_eq!(table, jpy_table());
    }

    #[test]
    fn rejects_bad_rates_when_deserializing() {
        let result: Result<ExchangeRateTable, _> =
            serde_json::from_str(r#"{"reporting":"JPY","rates":{"USD":"0"}}"#);
        assert!(result.is_err());
    }
}
