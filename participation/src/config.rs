//! Configuration for the participation engine

use serde::{Deserialize, Serialize};

/// Participation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Rules applied when polls and choices are created
    pub rules: PollRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "participation-engine".to_string(),
            rules: PollRules::default(),
        }
    }
}

/// Poll creation rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRules {
    /// Minimum venue choices at creation
    pub min_venue_choices: usize,

    /// Minimum date choices at creation
    pub min_date_choices: usize,

    /// Longest accepted title or choice label (characters)
    pub max_label_len: usize,
}

impl Default for PollRules {
    fn default() -> Self {
        Self {
            min_venue_choices: 2,
            min_date_choices: 1,
            max_label_len: 120,
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

        if let Ok(min) = std::env::var("PARTICIPATION_MIN_VENUES") {
            config.rules.min_venue_choices = min
                .parse()
                .map_err(|e| crate::Error::Config(format!("PARTICIPATION_MIN_VENUES: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject rules that would admit polls without a real choice
    pub fn validate(&self) -> crate::Result<()> {
        let rules = &self.rules;
        if rules.min_venue_choices < 2 {
            return Err(crate::Error::Config(format!(
                "min_venue_choices must be at least 2, got {}",
                rules.min_venue_choices
            )));
        }
        if rules.min_date_choices < 1 {
            return Err(crate::Error::Config(
                "min_date_choices must be at least 1".to_string(),
            ));
        }
        if rules.max_label_len == 0 {
            return Err(crate::Error::Config(
                "max_label_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
