//! Menu catalog lookups.
//!
//! The builder resolves every item of a cart through a single
//! [`MenuCatalog::find_by_ids`] call, so a catalog backed by a remote store
//! pays one round trip per checkout.

use async_trait::async_trait;
use cafe_storage::{StorageError, StorageService};
use cafe_types::{MenuItem, StorageKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("Catalog storage error: {0}")]
	Storage(String),
	#[error("Invalid menu item: {0}")]
	InvalidItem(String),
}

impl From<StorageError> for CatalogError {
	fn from(err: StorageError) -> Self {
		CatalogError::Storage(err.to_string())
	}
}

/// Read access to the menu.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuCatalog: Send + Sync {
	/// Looks up several items at once. Ids with no menu entry are simply
	/// absent from the returned map.
	async fn find_by_ids(&self, ids: &[u64]) -> Result<HashMap<u64, MenuItem>, CatalogError>;

	async fn get(&self, id: u64) -> Result<Option<MenuItem>, CatalogError>;

	/// All items ordered by id.
	async fn list(&self) -> Result<Vec<MenuItem>, CatalogError>;
}

/// Catalog stored in the `menu_items` namespace.
pub struct StorageCatalog {
	storage: Arc<StorageService>,
}

impl StorageCatalog {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Inserts the given items, leaving ids that already exist untouched.
	///
	/// Returns the number of items inserted.
	pub async fn seed(&self, items: &[MenuItem]) -> Result<usize, CatalogError> {
		let mut inserted = 0;
		for item in items {
			item.check().map_err(CatalogError::InvalidItem)?;
			let id = item.id.to_string();
			if self
				.storage
				.exists(StorageKey::MenuItems.as_str(), &id)
				.await?
			{
				tracing::debug!(menu_item_id = item.id, "Menu item already present, skipping");
				continue;
			}
			self.storage
				.store(StorageKey::MenuItems.as_str(), &id, item)
				.await?;
			inserted += 1;
		}
		Ok(inserted)
	}
}

#[async_trait]
impl MenuCatalog for StorageCatalog {
	async fn find_by_ids(&self, ids: &[u64]) -> Result<HashMap<u64, MenuItem>, CatalogError> {
		let unique: HashSet<u64> = ids.iter().copied().collect();
		let mut found = HashMap::with_capacity(unique.len());
		for id in unique {
			if let Some(item) = self.get(id).await? {
				found.insert(id, item);
			}
		}
		Ok(found)
	}

	async fn get(&self, id: u64) -> Result<Option<MenuItem>, CatalogError> {
		match self
			.storage
			.retrieve::<MenuItem>(StorageKey::MenuItems.as_str(), &id.to_string())
			.await
		{
			Ok(item) => Ok(Some(item)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn list(&self) -> Result<Vec<MenuItem>, CatalogError> {
		let mut items: Vec<MenuItem> = self
			.storage
			.retrieve_all(StorageKey::MenuItems.as_str(), "")
			.await?;
		items.sort_by_key(|item| item.id);
		Ok(items)
	}
}
