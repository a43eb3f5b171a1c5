//! Platform connection settings

use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::slips::fees::{default_rate, DEFAULT_INTEREST_RATE, DEFAULT_LATE_FEE_RATE};
use crate::types::*;
use crate::utils::validation::validate_rate;

fn default_directory_table() -> String {
    "profiles".to_string()
}

fn default_interest_rate() -> BigDecimal {
    default_rate(DEFAULT_INTEREST_RATE)
}

fn default_late_fee_rate() -> BigDecimal {
    default_rate(DEFAULT_LATE_FEE_RATE)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformConfig {
    /// Root URL of the hosted platform, without the `/rest/v1` suffix
    pub base_url: String,
    pub api_key: String,
    /// Operator session token; the api key is sent as bearer when absent
    #[serde(default)]
    pub access_token: Option<String>,
    /// Table holding the user directory
    #[serde(default = "default_directory_table")]
    pub directory_table: String,
    #[serde(default = "default_interest_rate")]
    pub default_interest_rate: BigDecimal,
    #[serde(default = "default_late_fee_rate")]
    pub default_late_fee_rate: BigDecimal,
}

impl PlatformConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            directory_table: default_directory_table(),
            default_interest_rate: default_interest_rate(),
            default_late_fee_rate: default_late_fee_rate(),
        }
    }

    /// Read settings from `BURSAR_*` environment variables
    pub fn from_env() -> FinanceResult<Self> {
        let base_url = env::var("BURSAR_PLATFORM_URL")
            .map_err(|_| FinanceError::Config("BURSAR_PLATFORM_URL is not set".to_string()))?;
        let api_key = env::var("BURSAR_API_KEY")
            .map_err(|_| FinanceError::Config("BURSAR_API_KEY is not set".to_string()))?;

        let mut config = Self::new(base_url, api_key);
        config.access_token = env::var("BURSAR_ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
        if let Ok(table) = env::var("BURSAR_DIRECTORY_TABLE") {
            config.directory_table = table;
        }
        if let Ok(rate) = env::var("BURSAR_INTEREST_RATE") {
            config.default_interest_rate = parse_rate("BURSAR_INTEREST_RATE", &rate)?;
        }
        if let Ok(rate) = env::var("BURSAR_LATE_FEE_RATE") {
            config.default_late_fee_rate = parse_rate("BURSAR_LATE_FEE_RATE", &rate)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a TOML document
    pub fn from_toml_str(text: &str) -> FinanceResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| FinanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FinanceResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(FinanceError::Config("base_url cannot be empty".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(FinanceError::Config("api_key cannot be empty".to_string()));
        }
        if self.directory_table.trim().is_empty() {
            return Err(FinanceError::Config(
                "directory_table cannot be empty".to_string(),
            ));
        }
        validate_rate("default_interest_rate", &self.default_interest_rate)
            .and_then(|_| validate_rate("default_late_fee_rate", &self.default_late_fee_rate))
            .map_err(|e| FinanceError::Config(e.to_string()))
    }

    /// Bearer credential sent with every request
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

fn parse_rate(name: &str, value: &str) -> FinanceResult<BigDecimal> {
    BigDecimal::from_str(value.trim())
        .map_err(|e| FinanceError::Config(format!("{} is not a decimal: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_defaults() {
        let config = PlatformConfig::from_toml_str(
            r#"
            base_url = "https://school.example.com"
            api_key = "anon-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.directory_table, "profiles");
        assert_eq!(config.default_interest_rate, "0.02".parse::<BigDecimal>().unwrap());
        assert_eq!(config.default_late_fee_rate, "0.05".parse::<BigDecimal>().unwrap());
        assert_eq!(config.bearer(), "anon-key");
    }

    #[test]
    fn test_toml_overrides() {
        let config = PlatformConfig::from_toml_str(
            r#"
            base_url = "https://school.example.com"
            api_key = "anon-key"
            access_token = "session"
            directory_table = "users"
            default_interest_rate = "0.01"
            "#,
        )
        .unwrap();

        assert_eq!(config.directory_table, "users");
        assert_eq!(config.default_interest_rate, "0.01".parse::<BigDecimal>().unwrap());
        assert_eq!(config.bearer(), "session");
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            PlatformConfig::from_toml_str("base_url = \"\"\napi_key = \"k\""),
            Err(FinanceError::Config(_))
        ));
        assert!(matches!(
            PlatformConfig::from_toml_str("api_key = \"k\""),
            Err(FinanceError::Config(_))
        ));

        let mut config = PlatformConfig::new("https://x", "k");
        config.default_late_fee_rate = BigDecimal::from(-1);
        assert!(config.validate().is_err());
    }
}
