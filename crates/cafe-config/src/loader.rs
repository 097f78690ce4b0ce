//! Multi-file configuration loading.
//!
//! A configuration file may pull in others with `include`. Included files
//! are merged section by section; a top-level section may only be defined
//! once across the whole set.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a root configuration file together with its includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against
	base_path: PathBuf,
	/// Canonical paths already read, for cycle detection
	visited: HashSet<PathBuf>,
	/// Section name to the file that defined it
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads, merges and validates the configuration rooted at `config_path`.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let root_path = self.resolve_path(config_path)?;
		let root_content = self.read_resolved(&root_path).await?;
		let root: toml::Value = toml::from_str(&root_content)?;

		let includes = parse_includes(&root)?;
		if includes.is_empty() {
			tracing::debug!(path = %root_path.display(), "Loaded configuration");
			return root_content.parse();
		}

		let merged = self.merge_includes(root, &root_path, includes).await?;
		let merged_str = toml::to_string(&merged)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize merged config: {}", e)))?;
		tracing::debug!(
			path = %root_path.display(),
			files = self.visited.len(),
			"Loaded configuration with includes"
		);
		merged_str.parse()
	}

	/// Reads a file once and substitutes environment variables.
	async fn read_resolved(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	async fn merge_includes(
		&mut self,
		mut root: toml::Value,
		root_path: &Path,
		includes: Vec<PathBuf>,
	) -> Result<toml::Value, ConfigError> {
		let root_table = root
			.as_table_mut()
			.ok_or_else(|| ConfigError::Validation("Configuration root must be a table".into()))?;
		root_table.remove("include");
		for key in root_table.keys() {
			self.section_sources
				.insert(key.clone(), root_path.to_path_buf());
		}

		for include in includes {
			let path = self.resolve_path(&include)?;
			let content = self.read_resolved(&path).await?;
			let included: toml::Value = toml::from_str(&content)?;
			let Some(table) = included.as_table() else {
				continue;
			};

			for (key, value) in table {
				if let Some(source) = self.section_sources.get(key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}. \
						Each top-level section must be unique across all configuration files.",
						key,
						source.display(),
						path.display()
					)));
				}
				self.section_sources.insert(key.clone(), path.clone());
				root_table.insert(key.clone(), value.clone());
			}
		}

		Ok(root)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Reads `include`, which may be a single path or an array of paths.
fn parse_includes(root: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match root.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(paths)) => paths
			.iter()
			.map(|p| {
				p.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
