//! Application settings loaded from config.toml
//!
//! Settings hold the business constants that are configuration rather than
//! algorithm: the shipping surcharge, the order transition policy, the display
//! currency and the categories seeded on first run. Every section is optional.

use crate::core::pricing::ShippingPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Currency symbol used when formatting amounts
    pub currency: Currency,
    /// Shipping surcharge rules applied at cart and checkout
    pub shipping: ShippingPolicy,
    /// Order lifecycle options
    pub orders: OrderSettings,
    /// Categories to create when missing
    pub categories: Vec<CategoryConfig>,
}

/// Display currency symbol, e.g. `Rs`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Currency(pub String);

impl Default for Currency {
    fn default() -> Self {
        Self("Rs".to_string())
    }
}

/// Order lifecycle options.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OrderSettings {
    /// When set, artisans may only advance orders one step at a time
    pub strict_transitions: bool,
}

/// Configuration for a single seeded category
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Unique category name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A shipping amount is negative
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses settings from TOML text and validates them.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.shipping.flat_fee_cents < 0 || config.shipping.free_shipping_threshold_cents < 0 {
        return Err(Error::Config {
            message: "Shipping amounts cannot be negative".to_string(),
        });
    }

    Ok(config)
}

/// Loads settings from `ARTMART_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: the defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("ARTMART_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    if !Path::new(&path).exists() {
        tracing::info!("No config file at {path}, using default settings");
        return Ok(AppConfig::default());
    }

    tracing::debug!("Loading configuration from {path}");
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            currency = "USD"

            [shipping]
            free_shipping_threshold_cents = 7500
            flat_fee_cents = 450

            [orders]
            strict_transitions = true

            [[categories]]
            name = "Pottery"
            description = "Hand-thrown ceramics"

            [[categories]]
            name = "Textiles"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.currency, Currency("USD".to_string()));
        assert_eq!(config.shipping.free_shipping_threshold_cents, 7500);
        assert_eq!(config.shipping.flat_fee_cents, 450);
        assert!(config.orders.strict_transitions);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].name, "Pottery");
        assert_eq!(config.categories[1].description, "");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.currency.0, "Rs");
        assert_eq!(config.shipping.free_shipping_threshold_cents, 5000);
        assert_eq!(config.shipping.flat_fee_cents, 599);
        assert!(!config.orders.strict_transitions);
    }

    #[test]
    fn test_negative_fee_rejected() {
        let result = parse_config("[shipping]\nflat_fee_cents = -1\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = parse_config("[shipping\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("/nonexistent/artmart/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
