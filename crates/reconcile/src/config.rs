use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{AggregateOptions, OutlierPolicy};
use crate::budget::HealthBands;
use crate::projection::ProjectionThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid engine config: {0}")]
    Invalid(String),
}

/// Tunables for a reconciliation pass. Every field has a default, so an
/// empty TOML document is a valid config.
///
/// ```toml
/// top_n = 5
/// normalize_labels = true
///
/// [outlier]
/// budget_share = "0.25"
/// average_multiple = "2"
///
/// [outlier.floors]
/// JPY = "5000"
/// USD = "40"
///
/// [bands]
/// caution_percent = "50"
/// warning_percent = "80"
/// over_percent = "100"
///
/// [projection]
/// warning_percent = "90"
/// danger_percent = "100"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub top_n: usize,
    pub normalize_labels: bool,
    pub outlier: OutlierPolicy,
    pub bands: HealthBands,
    pub projection: ProjectionThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = AggregateOptions::default();
        Self {
            top_n: options.top_n,
            normalize_labels: options.normalize_labels,
            outlier: OutlierPolicy::default(),
            bands: HealthBands::default(),
            projection: ProjectionThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".to_string()));
        }
        if self.outlier.budget_share < Decimal::ZERO || self.outlier.average_multiple < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "outlier multipliers must not be negative".to_string(),
            ));
        }
        if let Some((currency, floor)) = self.outlier.floors.iter().find(|(_, f)| **f < Decimal::ZERO) {
            return Err(ConfigError::Invalid(format!(
                "outlier floor for {currency} is negative: {floor}"
            )));
        }
        let b = &self.bands;
        if !(b.caution_percent <= b.warning_percent && b.warning_percent <= b.over_percent) {
            return Err(ConfigError::Invalid(
                "health bands must be ordered caution <= warning <= over".to_string(),
            ));
        }
        if self.projection.warning_percent > self.projection.danger_percent {
            return Err(ConfigError::Invalid(
                "projection warning threshold exceeds danger threshold".to_string(),
            ));
        }
        Ok(())
    }

    /// Aggregation options for the expense side.
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            top_n: self.top_n,
            normalize_labels: self.normalize_labels,
            ..AggregateOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakeibo_core::CurrencyCode;

    #[test]
    fn empty_document_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.top_n, 3);
        assert!(config.normalize_labels);
        assert_eq!(config.outlier.budget_share, Decimal::new(25, 2));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            top_n = 5

            [outlier.floors]
            USD = "40"

            [projection]
            warning_percent = "85"
            "#,
        )
        .unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(
            config.outlier.floors.get(&CurrencyCode::new("USD").unwrap()),
            Some(&Decimal::from(40))
        );
        // Replacing the floors table drops the built-in JPY floor.
        assert_eq!(config.outlier.floors.len(), 1);
        assert_eq!(config.outlier.average_multiple, Decimal::from(2));
        assert_eq!(config.projection.warning_percent, Decimal::from(85));
        assert_eq!(config.projection.danger_percent, Decimal::from(100));
        assert_eq!(config.bands, HealthBands::default());
    }

    #[test]
    fn integer_values_are_accepted() {
        let config = EngineConfig::from_toml("[bands]\ncaution_percent = 40\n").unwrap();
        assert_eq!(config.bands.caution_percent, Decimal::from(40));
    }

    #[test]
    fn rejects_zero_top_n() {
        assert!(matches!(
            EngineConfig::from_toml("top_n = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unordered_bands() {
        let result = EngineConfig::from_toml("[bands]\nwarning_percent = \"120\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_floor() {
        let result = EngineConfig::from_toml("[outlier.floors]\nJPY = \"-1\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_currency_and_syntax() {
        assert!(matches!(
            EngineConfig::from_toml("[outlier.floors]\nYEN5 = \"1\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("top_n = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn aggregate_options_follow_config() {
        let config = EngineConfig::from_toml("top_n = 7\nnormalize_labels = false\n").unwrap();
        let options = config.aggregate_options();
        assert_eq!(options.top_n, 7);
        assert!(!options.normalize_labels);
    }
}
