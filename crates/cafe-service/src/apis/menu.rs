//! Read-only menu endpoints.

use cafe_core::CafeEngine;
use cafe_order::MenuCatalog;
use cafe_types::{APIError, MenuCategory, MenuItem};
use serde::Deserialize;

/// Query parameters of `GET /api/menu`.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
	pub category: Option<String>,
	/// Only list items that can currently be ordered.
	#[serde(default)]
	pub available: Option<bool>,
}

fn catalog_error(e: cafe_order::CatalogError) -> APIError {
	tracing::warn!(error = %e, "Catalog lookup failed");
	APIError::InternalServerError {
		error_type: "CATALOG_ERROR".to_string(),
		message: "Failed to read the menu".to_string(),
	}
}

pub async fn list_menu(engine: &CafeEngine, query: MenuQuery) -> Result<Vec<MenuItem>, APIError> {
	let category = query
		.category
		.as_deref()
		.map(|c| c.to_ascii_uppercase().parse::<MenuCategory>())
		.transpose()
		.map_err(|e| APIError::bad_request("INVALID_CATEGORY", e))?;

	let items = engine.catalog().list().await.map_err(catalog_error)?;
	Ok(items
		.into_iter()
		.filter(|item| category.is_none_or(|c| item.category == c))
		.filter(|item| query.available.is_none_or(|a| item.is_available == a))
		.collect())
}

pub async fn get_menu_item(engine: &CafeEngine, id: u64) -> Result<MenuItem, APIError> {
	engine
		.catalog()
		.get(id)
		.await
		.map_err(catalog_error)?
		.ok_or_else(|| APIError::NotFound {
			error_type: "MENU_ITEM_NOT_FOUND".to_string(),
			message: format!("Menu item not found: {}", id),
		})
}
