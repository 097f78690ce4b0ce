//! Storage namespaces for the order service.

use std::str::FromStr;

/// Storage namespaces for the different record collections.
///
/// Keys are formed as `<namespace>:<id>`; composite ids use further `:`
/// separators (for example `order_items:<order_id>:<line>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Menu catalog entries keyed by menu item id
	MenuItems,
	/// Order headers keyed by order id
	Orders,
	/// Order lines keyed by `<order_id>:<line>`
	OrderItems,
	/// Secondary index keyed by `<user_id>:<order_id>`
	OrdersByUser,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::MenuItems => "menu_items",
			StorageKey::Orders => "orders",
			StorageKey::OrderItems => "order_items",
			StorageKey::OrdersByUser => "orders_by_user",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::MenuItems,
			Self::Orders,
			Self::OrderItems,
			Self::OrdersByUser,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"menu_items" => Ok(Self::MenuItems),
			"orders" => Ok(Self::Orders),
			"order_items" => Ok(Self::OrderItems),
			"orders_by_user" => Ok(Self::OrdersByUser),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
