//! Order workflow for the coffee-shop service.
//!
//! Two components live here. The [`OrderBuilder`] turns a submitted cart into
//! a priced order and persists it together with its line items in one atomic
//! batch. The [`OrderTracker`] serves existing orders and enforces who may
//! read or change them and which status transitions are legal.
//!
//! Both depend on a [`MenuCatalog`] for prices and menu summaries, on the
//! identity service for user profiles, and on the storage service.

use thiserror::Error;

pub mod access;
pub mod builder;
pub mod catalog;
pub mod tracker;

pub use access::{can_access_order, is_admin};
pub use builder::OrderBuilder;
pub use catalog::{CatalogError, MenuCatalog, StorageCatalog};
pub use tracker::{is_valid_transition, OrderTracker};

/// Errors returned by the order workflow.
///
/// Every variant maps to a stable machine-readable code via
/// [`OrderError::code`].
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Authentication required")]
	Unauthorized,
	#[error("Access to this order is not allowed")]
	Forbidden,
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Menu item not found: {0}")]
	ItemNotFound(u64),
	#[error("Invalid order status: {0}")]
	InvalidStatus(String),
	#[error("Cannot change order status from {from} to {to}")]
	InvalidTransition {
		from: cafe_types::OrderStatus,
		to: cafe_types::OrderStatus,
	},
	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl OrderError {
	pub fn code(&self) -> &'static str {
		match self {
			OrderError::InvalidRequest(_) => "INVALID_REQUEST",
			OrderError::Unauthorized => "UNAUTHORIZED",
			OrderError::Forbidden => "FORBIDDEN",
			OrderError::NotFound(_) => "ORDER_NOT_FOUND",
			OrderError::ItemNotFound(_) => "ITEM_NOT_FOUND",
			OrderError::InvalidStatus(_) => "INVALID_STATUS",
			OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
			OrderError::Persistence(_) => "PERSISTENCE_ERROR",
		}
	}
}

impl From<CatalogError> for OrderError {
	fn from(err: CatalogError) -> Self {
		OrderError::Persistence(err.to_string())
	}
}

/// Checkout limits and defaults.
#[derive(Debug, Clone)]
pub struct OrderPolicy {
	/// Order a cart line once when its quantity is omitted.
	pub default_missing_quantity: bool,
	pub max_items_per_order: usize,
	/// Maximum notes length in characters.
	pub max_notes_length: usize,
}

impl Default for OrderPolicy {
	fn default() -> Self {
		Self {
			default_missing_quantity: true,
			max_items_per_order: 50,
			max_notes_length: 500,
		}
	}
}
