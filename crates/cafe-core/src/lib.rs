//! Core engine for the coffee-shop order service.
//!
//! The [`CafeEngine`] owns the configured storage, identity and menu catalog
//! and hands out the order builder and tracker that operate on them. It is
//! assembled from configuration by [`CafeBuilder`].

pub mod builder;

pub use builder::{BuilderError, CafeBuilder, CafeFactories};

use cafe_config::Config;
use cafe_identity::IdentityService;
use cafe_order::{OrderBuilder, OrderTracker, StorageCatalog};
use cafe_storage::StorageService;
use cafe_types::{Credentials, Identity};
use std::sync::Arc;

/// Assembled service components.
///
/// Cheap to share behind an `Arc`; every component is internally
/// synchronized and holds no per-request state.
pub struct CafeEngine {
	config: Config,
	storage: Arc<StorageService>,
	identity: Arc<IdentityService>,
	catalog: Arc<StorageCatalog>,
	orders: OrderBuilder,
	tracker: OrderTracker,
}

impl CafeEngine {
	pub(crate) fn new(
		config: Config,
		storage: Arc<StorageService>,
		identity: Arc<IdentityService>,
		catalog: Arc<StorageCatalog>,
		orders: OrderBuilder,
		tracker: OrderTracker,
	) -> Self {
		Self {
			config,
			storage,
			identity,
			catalog,
			orders,
			tracker,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn catalog(&self) -> &Arc<StorageCatalog> {
		&self.catalog
	}

	pub fn order_builder(&self) -> &OrderBuilder {
		&self.orders
	}

	pub fn order_tracker(&self) -> &OrderTracker {
		&self.tracker
	}

	/// Resolves request credentials to the caller's identity, if any.
	pub async fn authenticate(&self, credentials: &Credentials) -> Option<Identity> {
		self.identity.authenticate(credentials).await
	}
}
