//! Configuration module for the order service.
//!
//! Loads the service configuration from TOML, resolving `${VAR}` and
//! `${VAR:-default}` environment references before parsing, and validates
//! the result so misconfiguration is reported at startup.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["menu.toml", "users.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use cafe_types::MenuItem;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the order service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this shop instance.
	pub shop: ShopConfig,
	/// Storage backends.
	pub storage: StorageConfig,
	/// Identity resolvers.
	pub identity: IdentityConfig,
	/// Order workflow settings.
	#[serde(default)]
	pub orders: OrdersConfig,
	/// Menu items seeded into the catalog at startup.
	#[serde(default)]
	pub menu: MenuConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
	/// Unique identifier for this shop instance.
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	/// Currency code shown alongside prices.
	#[serde(default = "default_currency")]
	pub currency: String,
}

fn default_currency() -> String {
	"IDR".to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the identity resolver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of identity implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Order workflow settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
	/// When true a cart line without a quantity is ordered once; when false
	/// such a line is rejected as an invalid request.
	#[serde(default = "default_missing_quantity")]
	pub default_missing_quantity: bool,
	/// Maximum number of cart lines in one order.
	#[serde(default = "default_max_items_per_order")]
	pub max_items_per_order: usize,
	/// Maximum length of the free-text notes, in characters.
	#[serde(default = "default_max_notes_length")]
	pub max_notes_length: usize,
}

impl Default for OrdersConfig {
	fn default() -> Self {
		Self {
			default_missing_quantity: default_missing_quantity(),
			max_items_per_order: default_max_items_per_order(),
			max_notes_length: default_max_notes_length(),
		}
	}
}

fn default_missing_quantity() -> bool {
	true
}

fn default_max_items_per_order() -> usize {
	50
}

fn default_max_notes_length() -> usize {
	500
}

/// Catalog seed data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MenuConfig {
	#[serde(default)]
	pub items: Vec<MenuItem>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration; permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	64 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with the default
/// in `${VAR_NAME:-default}` when the variable is unset. Inputs over 1MB are
/// rejected before the regex runs.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration.
	///
	/// Checks the shop id, that the primary storage and identity
	/// implementations are configured, the order limits, and the catalog
	/// seed (non-negative prices, unique ids).
	fn validate(&self) -> Result<(), ConfigError> {
		if self.shop.id.trim().is_empty() {
			return Err(ConfigError::Validation("Shop ID cannot be empty".into()));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary(
			"identity",
			&self.identity.primary,
			&self.identity.implementations,
		)?;

		if self.orders.max_items_per_order == 0 {
			return Err(ConfigError::Validation(
				"orders.max_items_per_order must be at least 1".into(),
			));
		}
		if self.orders.max_items_per_order > 1000 {
			return Err(ConfigError::Validation(
				"orders.max_items_per_order cannot exceed 1000".into(),
			));
		}

		let mut seen = HashSet::new();
		for item in &self.menu.items {
			item.check().map_err(ConfigError::Validation)?;
			if !seen.insert(item.id) {
				return Err(ConfigError::Validation(format!(
					"Duplicate menu item id {}",
					item.id
				)));
			}
		}

		if let Some(api) = &self.api {
			if api.enabled && api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be greater than 0".into(),
				));
			}
			if api.enabled && api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"api.max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a configuration from a TOML string.
///
/// Environment variables are resolved first and the configuration is
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;

	const BASE: &str = r#"
[shop]
id = "corner-cafe"

[storage]
primary = "memory"
[storage.implementations.memory]

[identity]
primary = "static"
[identity.implementations.static]
users = []
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("CAFE_TEST_HOST", "localhost");
		std::env::set_var("CAFE_TEST_PORT", "8080");

		let input = "host = \"${CAFE_TEST_HOST}:${CAFE_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:8080\"");

		std::env::remove_var("CAFE_TEST_HOST");
		std::env::remove_var("CAFE_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${CAFE_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${CAFE_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("CAFE_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.shop.id, "corner-cafe");
		assert_eq!(config.shop.currency, "IDR");
		assert!(config.orders.default_missing_quantity);
		assert_eq!(config.orders.max_items_per_order, 50);
		assert!(config.menu.items.is_empty());
		assert!(config.api.is_none());
	}

	#[test]
	fn test_menu_seed_parsed() {
		let config_str = format!(
			r#"{}
[[menu.items]]
id = 1
name = "Nasi Goreng"
price = 12000
category = "MAIN_COURSE"

[[menu.items]]
id = 2
name = "Kopi Susu"
price = 18000.50
category = "COFFEE"
is_available = false
"#,
			BASE
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.menu.items.len(), 2);
		assert_eq!(config.menu.items[0].price, Decimal::new(12000, 0));
		assert!(!config.menu.items[1].is_available);
	}

	#[test]
	fn test_negative_menu_price_rejected() {
		let config_str = format!(
			r#"{}
[[menu.items]]
id = 1
name = "Refund Latte"
price = -5
category = "COFFEE"
"#,
			BASE
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("negative price"), "got: {}", err);
	}

	#[test]
	fn test_duplicate_menu_ids_rejected() {
		let config_str = format!(
			r#"{}
[[menu.items]]
id = 3
name = "Brownie"
price = 9000
category = "DESSERT"

[[menu.items]]
id = 3
name = "Cheesecake"
price = 15000
category = "DESSERT"
"#,
			BASE
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Duplicate menu item id 3"));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = BASE.replace("primary = \"memory\"", "primary = \"postgres\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'postgres' not found"));
	}

	#[test]
	fn test_zero_items_per_order_rejected() {
		let config_str = format!("{}\n[orders]\nmax_items_per_order = 0\n", BASE);
		assert!(Config::from_str(&config_str).is_err());
	}
}
