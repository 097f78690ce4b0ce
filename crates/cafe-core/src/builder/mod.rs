//! Builder for constructing the engine from configuration.
//!
//! Each pluggable component is created through a factory looked up by the
//! implementation name used in the configuration, so the binary decides
//! which implementations are compiled in.

use crate::CafeEngine;
use cafe_config::Config;
use cafe_identity::{IdentityError, IdentityInterface, IdentityService};
use cafe_order::{OrderBuilder, OrderPolicy, OrderTracker, StorageCatalog};
use cafe_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
	#[error("Menu seeding failed: {0}")]
	Seed(String),
}

/// Factory functions for every pluggable component, keyed by name.
pub struct CafeFactories<SF, IF> {
	pub storage_factories: HashMap<String, SF>,
	pub identity_factories: HashMap<String, IF>,
}

/// Builder for constructing a [`CafeEngine`] with pluggable implementations.
pub struct CafeBuilder {
	config: Config,
}

impl CafeBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates the configured implementations, seeds the menu and wires the
	/// order workflow.
	pub async fn build<SF, IF>(
		self,
		factories: CafeFactories<SF, IF>,
	) -> Result<CafeEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		IF: Fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError>,
	{
		let storage_backend = create_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let identity_backend = create_primary(
			"identity",
			&self.config.identity.primary,
			&self.config.identity.implementations,
			&factories.identity_factories,
		)?;
		let identity = Arc::new(IdentityService::new(identity_backend));

		let catalog = Arc::new(StorageCatalog::new(storage.clone()));
		let seeded = catalog
			.seed(&self.config.menu.items)
			.await
			.map_err(|e| BuilderError::Seed(e.to_string()))?;
		tracing::info!(
			component = "catalog",
			configured = self.config.menu.items.len(),
			inserted = seeded,
			"Menu seeded"
		);

		let policy = OrderPolicy {
			default_missing_quantity: self.config.orders.default_missing_quantity,
			max_items_per_order: self.config.orders.max_items_per_order,
			max_notes_length: self.config.orders.max_notes_length,
		};
		let orders = OrderBuilder::new(storage.clone(), catalog.clone(), identity.clone(), policy);
		let tracker = OrderTracker::new(storage.clone(), catalog.clone(), identity.clone());

		Ok(CafeEngine::new(
			self.config,
			storage,
			identity,
			catalog,
			orders,
			tracker,
		))
	}
}

/// Instantiates the primary implementation of one component.
///
/// Every configured implementation with a registered factory is created so
/// that configuration mistakes in secondary entries surface at startup.
fn create_primary<F, T, E>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
	T: ?Sized,
	E: std::fmt::Display,
{
	let mut created = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(
				component,
				implementation = %name,
				"No factory registered, skipping"
			);
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				created.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if created.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	created.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
