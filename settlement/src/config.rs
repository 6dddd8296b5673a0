//! Configuration for settlement engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Split configuration
    pub split: SplitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            split: SplitConfig::default(),
        }
    }
}

/// Split configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Every per-person amount is rounded up to a multiple of this
    #[serde(with = "rust_decimal::serde::str")]
    pub rounding_unit: Decimal,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            rounding_unit: Decimal::from(1000),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(unit) = std::env::var("SETTLEMENT_ROUNDING_UNIT") {
            config.split.rounding_unit = unit
                .parse()
                .map_err(|e| crate::Error::Config(format!("SETTLEMENT_ROUNDING_UNIT: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject a non-positive rounding unit
    pub fn validate(&self) -> crate::Result<()> {
        if self.split.rounding_unit <= Decimal::ZERO {
            return Err(crate::Error::Config(format!(
                "rounding unit must be positive, got {}",
                self.split.rounding_unit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_unit() {
        let config = Config::default();
        assert_eq!(config.split.rounding_unit, Decimal::from(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlement.toml");
        std::fs::write(
            &path,
            "service_name = \"s\"\nservice_version = \"1\"\n[split]\nrounding_unit = \"500\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.split.rounding_unit, Decimal::from(500));
    }

    #[test]
    fn test_zero_unit_rejected() {
        let mut config = Config::default();
        config.split.rounding_unit = Decimal::ZERO;
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }
}
