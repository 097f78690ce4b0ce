//! Order processing types.
//!
//! An [`Order`] is the header row written at checkout. Its line items are
//! stored as separate [`OrderItem`] records that carry the catalog price at
//! the moment of ordering, so later menu price changes never alter history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	Pending,
	Processing,
	Completed,
	Cancelled,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Processing => "PROCESSING",
			OrderStatus::Completed => "COMPLETED",
			OrderStatus::Cancelled => "CANCELLED",
		}
	}

	/// Terminal statuses accept no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Processing,
			Self::Completed,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a string is not one of the four order statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown order status '{}'", self.0)
	}
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"PENDING" => Ok(Self::Pending),
			"PROCESSING" => Ok(Self::Processing),
			"COMPLETED" => Ok(Self::Completed),
			"CANCELLED" => Ok(Self::Cancelled),
			other => Err(UnknownStatus(other.to_string())),
		}
	}
}

/// Persisted order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier (UUID v4).
	pub id: String,
	/// Owning user.
	pub user_id: u64,
	/// Sum of quantity × snapshot price over the order's items.
	pub total_price: Decimal,
	pub status: OrderStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_method: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	pub order_id: String,
	/// Position of the line within the order, starting at 0.
	pub line: u32,
	pub menu_item_id: u64,
	pub quantity: u32,
	/// Catalog price at the time the order was placed.
	pub price: Decimal,
}

impl OrderItem {
	pub fn subtotal(&self) -> Decimal {
		self.price * Decimal::from(self.quantity)
	}
}

/// Sums the line subtotals of a set of order items.
pub fn items_total<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Decimal {
	items.into_iter().map(OrderItem::subtotal).sum()
}
