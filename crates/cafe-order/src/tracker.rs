//! Order status tracking.
//!
//! Serves stored orders to their owners and to administrators, and moves
//! orders through their lifecycle: PENDING -> PROCESSING -> COMPLETED, with
//! CANCELLED reachable from either non-terminal status.

use crate::{can_access_order, is_admin, MenuCatalog, OrderError};
use cafe_identity::IdentityService;
use cafe_storage::{StorageBatch, StorageError, StorageService, Versioned};
use cafe_types::{
	DeleteOrderResponse, Identity, Order, OrderItem, OrderItemView, OrderResponse, OrderStatus,
	StatsResponse, StorageKey,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Reads of an order a single status update may make before giving up on
/// concurrent writers.
const TRANSITION_ATTEMPTS: usize = 3;

/// Checks if a status transition is legal.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	// Each status maps to its allowed next statuses
	static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			OrderStatus::Pending,
			HashSet::from([OrderStatus::Processing, OrderStatus::Cancelled]),
		);
		m.insert(
			OrderStatus::Processing,
			HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
		);
		m.insert(OrderStatus::Completed, HashSet::new()); // terminal
		m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

pub struct OrderTracker {
	storage: Arc<StorageService>,
	catalog: Arc<dyn MenuCatalog>,
	identity: Arc<IdentityService>,
}

impl OrderTracker {
	pub fn new(
		storage: Arc<StorageService>,
		catalog: Arc<dyn MenuCatalog>,
		identity: Arc<IdentityService>,
	) -> Self {
		Self {
			storage,
			catalog,
			identity,
		}
	}

	/// Returns one order with its items and owner summary.
	pub async fn get_order(
		&self,
		identity: Option<&Identity>,
		order_id: &str,
	) -> Result<OrderResponse, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		let order = self.load_order(order_id).await?;
		if !can_access_order(identity, order.user_id) {
			tracing::debug!(
				order_id,
				user_id = identity.user_id,
				"Order read denied"
			);
			return Err(OrderError::Forbidden);
		}

		let user = self.identity.user_summary(order.user_id).await;
		self.with_items(order, user).await
	}

	/// Returns every order of `user_id`, newest first.
	pub async fn list_user_orders(
		&self,
		identity: Option<&Identity>,
		user_id: u64,
	) -> Result<Vec<OrderResponse>, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		if !can_access_order(identity, user_id) {
			return Err(OrderError::Forbidden);
		}

		let index_ids = self
			.storage
			.list_ids(StorageKey::OrdersByUser.as_str(), &format!("{}:", user_id))
			.await
			.map_err(persistence)?;

		let mut orders = Vec::with_capacity(index_ids.len());
		for index_id in index_ids {
			let Some((_, order_id)) = index_id.split_once(':') else {
				continue;
			};
			match self.load_order(order_id).await {
				Ok(order) => orders.push(order),
				// Deleted after the index was listed
				Err(OrderError::NotFound(_)) => continue,
				Err(e) => return Err(e),
			}
		}
		orders.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| a.id.cmp(&b.id))
		});

		let user = self.identity.user_summary(user_id).await;
		let mut responses = Vec::with_capacity(orders.len());
		for order in orders {
			responses.push(self.with_items(order, user.clone()).await?);
		}
		Ok(responses)
	}

	/// Moves an order to `status`. Administrators only.
	///
	/// Only the status and the updated timestamp change. The write only lands
	/// if the order is byte-for-byte what was checked: an order deleted in the
	/// meantime is `NotFound`, and one changed in the meantime is read and
	/// checked again.
	pub async fn transition_status(
		&self,
		identity: Option<&Identity>,
		order_id: &str,
		status: &str,
	) -> Result<OrderResponse, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		if !is_admin(identity) {
			return Err(OrderError::Forbidden);
		}
		let target: OrderStatus = status
			.parse()
			.map_err(|_| OrderError::InvalidStatus(status.to_string()))?;

		for attempt in 1..=TRANSITION_ATTEMPTS {
			let Versioned {
				value: mut order,
				raw,
			} = self
				.storage
				.retrieve_versioned::<Order>(StorageKey::Orders.as_str(), order_id)
				.await
				.map_err(|e| not_found_or_persistence(e, order_id))?;
			if !is_valid_transition(order.status, target) {
				tracing::debug!(
					order_id,
					from = %order.status,
					to = %target,
					"Rejected status transition"
				);
				return Err(OrderError::InvalidTransition {
					from: order.status,
					to: target,
				});
			}

			let from = order.status;
			order.status = target;
			order.updated_at = Utc::now();

			// Written only over the exact bytes just checked
			let mut batch = StorageBatch::new();
			batch
				.store_if_unchanged(StorageKey::Orders.as_str(), order_id, raw, &order)
				.map_err(persistence)?;
			match self.storage.commit(batch).await {
				Ok(()) => {
					tracing::info!(
						order_id,
						from = %from,
						to = %target,
						admin_id = identity.user_id,
						"Order status updated"
					);
					let user = self.identity.user_summary(order.user_id).await;
					return self.with_items(order, user).await;
				},
				Err(StorageError::Conflict(_)) => {
					tracing::debug!(order_id, attempt, "Order changed during transition, retrying");
				},
				Err(e) => return Err(not_found_or_persistence(e, order_id)),
			}
		}

		Err(OrderError::Persistence(format!(
			"Order {} kept changing during the status update",
			order_id
		)))
	}

	/// Removes an order with its items and index entry. Administrators only.
	pub async fn delete_order(
		&self,
		identity: Option<&Identity>,
		order_id: &str,
	) -> Result<DeleteOrderResponse, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		if !is_admin(identity) {
			return Err(OrderError::Forbidden);
		}

		let order = self.load_order(order_id).await?;
		let item_ids = self
			.storage
			.list_ids(StorageKey::OrderItems.as_str(), &format!("{}:", order.id))
			.await
			.map_err(persistence)?;

		let mut batch = StorageBatch::new();
		for item_id in &item_ids {
			batch.remove(StorageKey::OrderItems.as_str(), item_id);
		}
		batch
			.remove(
				StorageKey::OrdersByUser.as_str(),
				&format!("{}:{}", order.user_id, order.id),
			)
			.remove(StorageKey::Orders.as_str(), &order.id);
		self.storage.commit(batch).await.map_err(persistence)?;

		tracing::info!(
			order_id = %order.id,
			items = item_ids.len(),
			admin_id = identity.user_id,
			"Order deleted"
		);

		Ok(DeleteOrderResponse {
			id: order.id,
			message: "Order deleted successfully".to_string(),
		})
	}

	/// Aggregate figures for the admin dashboard. Administrators only.
	///
	/// Revenue counts every order that was not cancelled.
	pub async fn stats(&self, identity: Option<&Identity>) -> Result<StatsResponse, OrderError> {
		let identity = identity.ok_or(OrderError::Unauthorized)?;
		if !is_admin(identity) {
			return Err(OrderError::Forbidden);
		}

		let orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str(), "")
			.await
			.map_err(persistence)?;
		let menu_items = self.catalog.list().await?;
		let total_customers = self.identity.customer_count().await.map_err(|e| {
			tracing::warn!(error = %e, "Customer count unavailable");
			OrderError::Persistence(e.to_string())
		})?;

		let mut orders_by_status: BTreeMap<String, usize> = OrderStatus::all()
			.map(|status| (status.as_str().to_string(), 0))
			.collect();
		let mut total_revenue = Decimal::ZERO;
		for order in &orders {
			*orders_by_status
				.entry(order.status.as_str().to_string())
				.or_default() += 1;
			if order.status != OrderStatus::Cancelled {
				total_revenue += order.total_price;
			}
		}

		Ok(StatsResponse {
			total_orders: orders.len(),
			total_revenue,
			total_menu_items: menu_items.len(),
			total_customers,
			orders_by_status,
		})
	}

	async fn load_order(&self, order_id: &str) -> Result<Order, OrderError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| not_found_or_persistence(e, order_id))
	}

	/// Loads the order's items and attaches current menu summaries.
	async fn with_items(
		&self,
		order: Order,
		user: Option<cafe_types::UserSummary>,
	) -> Result<OrderResponse, OrderError> {
		let mut items: Vec<OrderItem> = self
			.storage
			.retrieve_all(StorageKey::OrderItems.as_str(), &format!("{}:", order.id))
			.await
			.map_err(persistence)?;
		items.sort_by_key(|item| item.line);

		let ids: Vec<u64> = items.iter().map(|item| item.menu_item_id).collect();
		let menu = if ids.is_empty() {
			HashMap::new()
		} else {
			self.catalog.find_by_ids(&ids).await?
		};

		let items = items
			.into_iter()
			.map(|item| {
				let menu_item = menu.get(&item.menu_item_id).map(|m| m.summary());
				OrderItemView { item, menu_item }
			})
			.collect();

		Ok(OrderResponse { order, items, user })
	}
}

fn persistence(err: StorageError) -> OrderError {
	OrderError::Persistence(err.to_string())
}

fn not_found_or_persistence(err: StorageError, order_id: &str) -> OrderError {
	match err {
		StorageError::NotFound => OrderError::NotFound(order_id.to_string()),
		other => persistence(other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::StorageCatalog;
	use crate::test_support::{identity_service, menu, storage};
	use crate::{OrderBuilder, OrderPolicy};
	use async_trait::async_trait;
	use cafe_storage::implementations::memory::MemoryStorage;
	use cafe_storage::{StorageInterface, WriteOp};
	use cafe_types::{CartLine, ConfigSchema, CreateOrderRequest, MenuItem};
	use chrono::Duration;
	use std::sync::Mutex;

	/// Applies a queued batch of writes from "another request" right before
	/// the next conditional batch reaches the store.
	struct Interleaving {
		inner: MemoryStorage,
		pending: Arc<Mutex<Option<Vec<WriteOp>>>>,
	}

	#[async_trait]
	impl StorageInterface for Interleaving {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			self.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}

		async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
			self.inner.list_keys(prefix).await
		}

		async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
			let conditional = ops
				.iter()
				.any(|op| matches!(op, WriteOp::SetIfUnchanged { .. }));
			let interleaved = if conditional {
				self.pending.lock().unwrap().take()
			} else {
				None
			};
			if let Some(other) = interleaved {
				self.inner.apply(other).await?;
			}
			self.inner.apply(ops).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}
	}

	fn interleaving_storage() -> (Arc<StorageService>, Arc<Mutex<Option<Vec<WriteOp>>>>) {
		let pending = Arc::new(Mutex::new(None));
		let backend = Interleaving {
			inner: MemoryStorage::new(),
			pending: pending.clone(),
		};
		(Arc::new(StorageService::new(Box::new(backend))), pending)
	}

	struct Shop {
		storage: Arc<StorageService>,
		builder: OrderBuilder,
		tracker: OrderTracker,
	}

	async fn shop() -> Shop {
		shop_on(storage()).await
	}

	async fn shop_on(storage: Arc<StorageService>) -> Shop {
		let catalog = Arc::new(StorageCatalog::new(storage.clone()));
		catalog.seed(&menu()).await.unwrap();
		let identity = identity_service();
		Shop {
			builder: OrderBuilder::new(
				storage.clone(),
				catalog.clone(),
				identity.clone(),
				OrderPolicy::default(),
			),
			tracker: OrderTracker::new(storage.clone(), catalog, identity),
			storage,
		}
	}

	async fn place(shop: &Shop, user_id: u64, lines: Vec<CartLine>) -> Order {
		shop.builder
			.create_order(
				Some(&Identity::customer(user_id)),
				CreateOrderRequest {
					items: lines,
					notes: None,
					payment_method: Some("CASH".into()),
				},
			)
			.await
			.unwrap()
			.order
	}

	async fn set_status(shop: &Shop, order_id: &str, status: OrderStatus) {
		let mut order: Order = shop
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.unwrap();
		order.status = status;
		shop.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.unwrap();
	}

	#[test]
	fn test_transition_table() {
		use OrderStatus::*;
		let allowed = [
			(Pending, Processing),
			(Pending, Cancelled),
			(Processing, Completed),
			(Processing, Cancelled),
		];
		for from in OrderStatus::all() {
			for to in OrderStatus::all() {
				assert_eq!(
					is_valid_transition(from, to),
					allowed.contains(&(from, to)),
					"{} -> {}",
					from,
					to
				);
			}
		}
	}

	#[tokio::test]
	async fn test_owner_and_admin_can_read() {
		let shop = shop().await;
		let order = place(&shop, 1, vec![CartLine::new(1, 2), CartLine::new(2, 1)]).await;

		let own = shop
			.tracker
			.get_order(Some(&Identity::customer(1)), &order.id)
			.await
			.unwrap();
		assert_eq!(own.items.len(), 2);
		assert_eq!(own.items[0].item.line, 0);
		assert_eq!(
			own.items[0].menu_item.as_ref().map(|m| m.name.as_str()),
			Some("Nasi Goreng")
		);
		assert_eq!(own.user.as_ref().map(|u| u.id), Some(1));

		assert!(shop
			.tracker
			.get_order(Some(&Identity::admin(9)), &order.id)
			.await
			.is_ok());
		assert_eq!(
			shop.tracker
				.get_order(Some(&Identity::customer(2)), &order.id)
				.await
				.unwrap_err(),
			OrderError::Forbidden
		);
		assert_eq!(
			shop.tracker.get_order(None, &order.id).await.unwrap_err(),
			OrderError::Unauthorized
		);
	}

	#[tokio::test]
	async fn test_unknown_order() {
		let shop = shop().await;
		let err = shop
			.tracker
			.get_order(Some(&Identity::admin(9)), "3f1c9a52-0000-4000-8000-000000000000")
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_list_user_orders_newest_first() {
		let shop = shop().await;
		let first = place(&shop, 1, vec![CartLine::new(1, 1)]).await;
		let second = place(&shop, 1, vec![CartLine::new(2, 1)]).await;
		place(&shop, 2, vec![CartLine::new(3, 1)]).await;

		// Pin timestamps so ordering does not depend on clock resolution
		let mut older: Order = shop
			.storage
			.retrieve(StorageKey::Orders.as_str(), &first.id)
			.await
			.unwrap();
		older.created_at = second.created_at - Duration::minutes(5);
		shop.storage
			.update(StorageKey::Orders.as_str(), &first.id, &older)
			.await
			.unwrap();

		let orders = shop
			.tracker
			.list_user_orders(Some(&Identity::customer(1)), 1)
			.await
			.unwrap();
		let ids: Vec<&str> = orders.iter().map(|o| o.order.id.as_str()).collect();
		assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

		assert_eq!(
			shop.tracker
				.list_user_orders(Some(&Identity::customer(2)), 1)
				.await
				.unwrap_err(),
			OrderError::Forbidden
		);
		assert_eq!(
			shop.tracker
				.list_user_orders(Some(&Identity::admin(9)), 1)
				.await
				.unwrap()
				.len(),
			2
		);
		assert!(shop
			.tracker
			.list_user_orders(Some(&Identity::customer(3)), 3)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_status_lifecycle() {
		let shop = shop().await;
		let admin = Identity::admin(9);
		let order = place(&shop, 1, vec![CartLine::new(1, 1)]).await;

		let processing = shop
			.tracker
			.transition_status(Some(&admin), &order.id, "PROCESSING")
			.await
			.unwrap();
		assert_eq!(processing.order.status, OrderStatus::Processing);
		assert_eq!(processing.order.total_price, order.total_price);
		assert_eq!(processing.order.created_at, order.created_at);
		assert!(processing.order.updated_at >= order.updated_at);

		let completed = shop
			.tracker
			.transition_status(Some(&admin), &order.id, "COMPLETED")
			.await
			.unwrap();
		assert_eq!(completed.order.status, OrderStatus::Completed);

		let err = shop
			.tracker
			.transition_status(Some(&admin), &order.id, "CANCELLED")
			.await
			.unwrap_err();
		assert_eq!(
			err,
			OrderError::InvalidTransition {
				from: OrderStatus::Completed,
				to: OrderStatus::Cancelled,
			}
		);
	}

	#[tokio::test]
	async fn test_cancelled_order_cannot_resume() {
		let shop = shop().await;
		let order = place(&shop, 1, vec![CartLine::new(2, 1)]).await;
		set_status(&shop, &order.id, OrderStatus::Cancelled).await;

		let err = shop
			.tracker
			.transition_status(Some(&Identity::admin(9)), &order.id, "PROCESSING")
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::InvalidTransition { .. }));

		let stored: Order = shop
			.storage
			.retrieve(StorageKey::Orders.as_str(), &order.id)
			.await
			.unwrap();
		assert_eq!(stored.status, OrderStatus::Cancelled);
		assert_eq!(stored.updated_at, order.updated_at);
	}

	#[tokio::test]
	async fn test_transition_racing_delete_does_not_restore_order() {
		let (storage, pending) = interleaving_storage();
		let shop = shop_on(storage).await;
		let order = place(&shop, 1, vec![CartLine::new(1, 2)]).await;

		*pending.lock().unwrap() = Some(vec![
			WriteOp::Delete {
				key: format!("order_items:{}:0", order.id),
			},
			WriteOp::Delete {
				key: format!("orders_by_user:1:{}", order.id),
			},
			WriteOp::Delete {
				key: format!("orders:{}", order.id),
			},
		]);

		let result = shop
			.tracker
			.transition_status(Some(&Identity::admin(9)), &order.id, "PROCESSING")
			.await;
		assert!(matches!(result, Err(OrderError::NotFound(_))));
		assert!(!shop
			.storage
			.exists(StorageKey::Orders.as_str(), &order.id)
			.await
			.unwrap());
		assert!(shop
			.storage
			.list_ids(StorageKey::OrderItems.as_str(), "")
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_racing_transitions_recheck_terminal_status() {
		let (storage, pending) = interleaving_storage();
		let shop = shop_on(storage).await;
		let admin = Identity::admin(9);
		let order = place(&shop, 1, vec![CartLine::new(3, 1)]).await;
		shop.tracker
			.transition_status(Some(&admin), &order.id, "PROCESSING")
			.await
			.unwrap();

		// Another admin cancels between our read and our write
		let mut cancelled: Order = shop
			.storage
			.retrieve(StorageKey::Orders.as_str(), &order.id)
			.await
			.unwrap();
		cancelled.status = OrderStatus::Cancelled;
		*pending.lock().unwrap() = Some(vec![WriteOp::Set {
			key: format!("orders:{}", order.id),
			value: serde_json::to_vec(&cancelled).unwrap(),
		}]);

		let err = shop
			.tracker
			.transition_status(Some(&admin), &order.id, "COMPLETED")
			.await
			.unwrap_err();
		assert_eq!(
			err,
			OrderError::InvalidTransition {
				from: OrderStatus::Cancelled,
				to: OrderStatus::Completed,
			}
		);
		let stored: Order = shop
			.storage
			.retrieve(StorageKey::Orders.as_str(), &order.id)
			.await
			.unwrap();
		assert_eq!(stored.status, OrderStatus::Cancelled);
	}

	#[tokio::test]
	async fn test_transition_checks() {
		let shop = shop().await;
		let order = place(&shop, 1, vec![CartLine::new(1, 1)]).await;

		assert_eq!(
			shop.tracker
				.transition_status(Some(&Identity::customer(1)), &order.id, "CANCELLED")
				.await
				.unwrap_err(),
			OrderError::Forbidden
		);
		assert_eq!(
			shop.tracker
				.transition_status(Some(&Identity::admin(9)), &order.id, "SHIPPED")
				.await
				.unwrap_err(),
			OrderError::InvalidStatus("SHIPPED".into())
		);
		assert!(matches!(
			shop.tracker
				.transition_status(Some(&Identity::admin(9)), "missing", "PROCESSING")
				.await,
			Err(OrderError::NotFound(_))
		));
		assert_eq!(
			shop.tracker
				.transition_status(None, &order.id, "PROCESSING")
				.await
				.unwrap_err(),
			OrderError::Unauthorized
		);
	}

	#[tokio::test]
	async fn test_delete_removes_everything() {
		let shop = shop().await;
		let order = place(&shop, 1, vec![CartLine::new(1, 1), CartLine::new(3, 4)]).await;
		let admin = Identity::admin(9);

		assert_eq!(
			shop.tracker
				.delete_order(Some(&Identity::customer(1)), &order.id)
				.await
				.unwrap_err(),
			OrderError::Forbidden
		);

		let response = shop
			.tracker
			.delete_order(Some(&admin), &order.id)
			.await
			.unwrap();
		assert_eq!(response.id, order.id);

		for namespace in [
			StorageKey::Orders,
			StorageKey::OrderItems,
			StorageKey::OrdersByUser,
		] {
			assert!(shop
				.storage
				.list_ids(namespace.as_str(), "")
				.await
				.unwrap()
				.is_empty());
		}
		assert!(matches!(
			shop.tracker.delete_order(Some(&admin), &order.id).await,
			Err(OrderError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_price_snapshot_survives_menu_change() {
		let shop = shop().await;
		let order = place(&shop, 1, vec![CartLine::new(2, 2)]).await;

		let mut latte: MenuItem = shop
			.storage
			.retrieve(StorageKey::MenuItems.as_str(), "2")
			.await
			.unwrap();
		latte.price = Decimal::new(25000, 0);
		shop.storage
			.update(StorageKey::MenuItems.as_str(), "2", &latte)
			.await
			.unwrap();

		let response = shop
			.tracker
			.get_order(Some(&Identity::customer(1)), &order.id)
			.await
			.unwrap();
		assert_eq!(response.order.total_price, Decimal::new(36000, 0));
		assert_eq!(response.items[0].item.price, Decimal::new(18000, 0));
		assert_eq!(
			response.items[0].menu_item.as_ref().map(|m| m.price),
			Some(Decimal::new(25000, 0))
		);
	}

	#[tokio::test]
	async fn test_stats() {
		let shop = shop().await;
		let admin = Identity::admin(9);
		let kept = place(&shop, 1, vec![CartLine::new(1, 2), CartLine::new(2, 1)]).await;
		let cancelled = place(&shop, 2, vec![CartLine::new(3, 1)]).await;
		set_status(&shop, &cancelled.id, OrderStatus::Cancelled).await;

		let stats = shop.tracker.stats(Some(&admin)).await.unwrap();
		assert_eq!(stats.total_orders, 2);
		assert_eq!(stats.total_revenue, kept.total_price);
		assert_eq!(stats.total_menu_items, 3);
		assert_eq!(stats.total_customers, 2);
		assert_eq!(stats.orders_by_status["PENDING"], 1);
		assert_eq!(stats.orders_by_status["CANCELLED"], 1);
		assert_eq!(stats.orders_by_status["COMPLETED"], 0);

		assert_eq!(
			shop.tracker
				.stats(Some(&Identity::customer(1)))
				.await
				.unwrap_err(),
			OrderError::Forbidden
		);
	}
}
