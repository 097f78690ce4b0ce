//! Order creation.
//!
//! Checkout resolves the cart against the catalog, prices every line from
//! the catalog, and writes the order header, its line items and the per-user
//! index entry as one storage batch.

use crate::{MenuCatalog, OrderError, OrderPolicy};
use cafe_identity::IdentityService;
use cafe_storage::{StorageBatch, StorageService};
use cafe_types::{
	items_total, CartLine, CreateOrderRequest, Identity, MenuItem, Order, OrderItem,
	OrderItemView, OrderResponse, OrderStatus, StorageKey,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct OrderBuilder {
	storage: Arc<StorageService>,
	catalog: Arc<dyn MenuCatalog>,
	identity: Arc<IdentityService>,
	policy: OrderPolicy,
}

impl OrderBuilder {
	pub fn new(
		storage: Arc<StorageService>,
		catalog: Arc<dyn MenuCatalog>,
		identity: Arc<IdentityService>,
		policy: OrderPolicy,
	) -> Self {
		Self {
			storage,
			catalog,
			identity,
			policy,
		}
	}

	/// Places an order for the authenticated caller.
	///
	/// Client-side prices are never consulted. Nothing is written unless every
	/// line resolves to an available menu item.
	pub async fn create_order(
		&self,
		identity: Option<&Identity>,
		request: CreateOrderRequest,
	) -> Result<OrderResponse, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		self.check_request(&request)?;

		let quantities = request
			.items
			.iter()
			.map(|line| self.resolve_quantity(line))
			.collect::<Result<Vec<u32>, _>>()?;

		let ids: Vec<u64> = request.items.iter().map(|line| line.menu_item_id).collect();
		let menu = self.catalog.find_by_ids(&ids).await?;
		let menu_items = resolve_menu_items(&ids, &menu)?;

		let order_id = Uuid::new_v4().to_string();
		let items: Vec<OrderItem> = menu_items
			.iter()
			.zip(quantities)
			.enumerate()
			.map(|(line, (menu_item, quantity))| OrderItem {
				order_id: order_id.clone(),
				line: line as u32,
				menu_item_id: menu_item.id,
				quantity,
				price: menu_item.price,
			})
			.collect();

		let now = Utc::now();
		let order = Order {
			id: order_id.clone(),
			user_id: identity.user_id,
			total_price: items_total(&items),
			status: OrderStatus::Pending,
			notes: request.notes.filter(|n| !n.trim().is_empty()),
			payment_method: request.payment_method.filter(|p| !p.trim().is_empty()),
			created_at: now,
			updated_at: now,
		};

		self.persist(&order, &items).await?;

		tracing::info!(
			order_id = %order.id,
			user_id = order.user_id,
			items = items.len(),
			total = %order.total_price,
			"Order created"
		);

		let items = items
			.into_iter()
			.zip(menu_items)
			.map(|(item, menu_item)| OrderItemView {
				item,
				menu_item: Some(menu_item.summary()),
			})
			.collect();
		let user = self.identity.user_summary(order.user_id).await;

		Ok(OrderResponse { order, items, user })
	}

	fn check_request(&self, request: &CreateOrderRequest) -> Result<(), OrderError> {
		request
			.validate()
			.map_err(|e| OrderError::InvalidRequest(e.to_string()))?;

		if request.items.len() > self.policy.max_items_per_order {
			return Err(OrderError::InvalidRequest(format!(
				"Order cannot contain more than {} items",
				self.policy.max_items_per_order
			)));
		}
		if let Some(notes) = &request.notes {
			if notes.chars().count() > self.policy.max_notes_length {
				return Err(OrderError::InvalidRequest(format!(
					"Notes cannot exceed {} characters",
					self.policy.max_notes_length
				)));
			}
		}
		Ok(())
	}

	fn resolve_quantity(&self, line: &CartLine) -> Result<u32, OrderError> {
		match line.quantity {
			Some(quantity) if quantity < 1 => Err(OrderError::InvalidRequest(format!(
				"Quantity for menu item {} must be a positive integer",
				line.menu_item_id
			))),
			Some(quantity) => u32::try_from(quantity).map_err(|_| {
				OrderError::InvalidRequest(format!(
					"Quantity for menu item {} is too large",
					line.menu_item_id
				))
			}),
			None if self.policy.default_missing_quantity => Ok(1),
			None => Err(OrderError::InvalidRequest(format!(
				"Quantity for menu item {} is required",
				line.menu_item_id
			))),
		}
	}

	async fn persist(&self, order: &Order, items: &[OrderItem]) -> Result<(), OrderError> {
		let mut batch = StorageBatch::new();
		let to_persistence = |e: cafe_storage::StorageError| OrderError::Persistence(e.to_string());

		batch
			.store(StorageKey::Orders.as_str(), &order.id, order)
			.map_err(to_persistence)?;
		for item in items {
			batch
				.store(
					StorageKey::OrderItems.as_str(),
					&format!("{}:{}", order.id, item.line),
					item,
				)
				.map_err(to_persistence)?;
		}
		batch
			.store(
				StorageKey::OrdersByUser.as_str(),
				&format!("{}:{}", order.user_id, order.id),
				&order.id,
			)
			.map_err(to_persistence)?;

		self.storage.commit(batch).await.map_err(|e| {
			tracing::warn!(order_id = %order.id, error = %e, "Failed to persist order");
			to_persistence(e)
		})
	}
}

/// Maps each cart id to its menu entry, in cart order.
///
/// The first unknown id fails the whole cart; unavailable items are rejected
/// only once every id is known to exist.
fn resolve_menu_items(
	ids: &[u64],
	menu: &HashMap<u64, MenuItem>,
) -> Result<Vec<MenuItem>, OrderError> {
	let items = ids
		.iter()
		.map(|id| menu.get(id).cloned().ok_or(OrderError::ItemNotFound(*id)))
		.collect::<Result<Vec<_>, _>>()?;

	if let Some(item) = items.iter().find(|item| !item.is_available) {
		return Err(OrderError::InvalidRequest(format!(
			"Menu item {} ({}) is currently unavailable",
			item.id, item.name
		)));
	}
	Ok(items)
}
