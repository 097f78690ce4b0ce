//! Menu catalog types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Fixed set of menu categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuCategory {
	#[serde(alias = "MAINCOURSE")]
	MainCourse,
	Coffee,
	#[serde(alias = "NONCOFFEE")]
	NonCoffee,
	Snack,
	Dessert,
}

impl MenuCategory {
	pub fn as_str(&self) -> &'static str {
		match self {
			MenuCategory::MainCourse => "MAIN_COURSE",
			MenuCategory::Coffee => "COFFEE",
			MenuCategory::NonCoffee => "NON_COFFEE",
			MenuCategory::Snack => "SNACK",
			MenuCategory::Dessert => "DESSERT",
		}
	}
}

impl fmt::Display for MenuCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MenuCategory {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"MAIN_COURSE" | "MAINCOURSE" => Ok(Self::MainCourse),
			"COFFEE" => Ok(Self::Coffee),
			"NON_COFFEE" | "NONCOFFEE" => Ok(Self::NonCoffee),
			"SNACK" => Ok(Self::Snack),
			"DESSERT" => Ok(Self::Dessert),
			other => Err(format!("Unknown menu category: {}", other)),
		}
	}
}

/// A purchasable item on the menu.
///
/// Prices are never negative; the catalog rejects items that violate this
/// when they are seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
	pub id: u64,
	#[validate(custom(function = "validate_name"))]
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	#[validate(custom(function = "validate_price"))]
	pub price: Decimal,
	pub category: MenuCategory,
	#[serde(default, alias = "image_url")]
	pub image_url: Option<String>,
	#[serde(default = "default_available", alias = "is_available")]
	pub is_available: bool,
}

fn default_available() -> bool {
	true
}

fn validate_name(name: &str) -> Result<(), validator::ValidationError> {
	if name.trim().is_empty() {
		return Err(validator::ValidationError::new("blank_name")
			.with_message("name must not be blank".into()));
	}
	Ok(())
}

fn validate_price(price: &Decimal) -> Result<(), validator::ValidationError> {
	if *price < Decimal::ZERO {
		return Err(validator::ValidationError::new("negative_price")
			.with_message("negative price is not allowed".into()));
	}
	Ok(())
}

impl MenuItem {
	/// Runs the derived validation and names the item in the error.
	pub fn check(&self) -> Result<(), String> {
		Validate::validate(self).map_err(|e| format!("Menu item {} is invalid: {}", self.id, e))
	}

	pub fn summary(&self) -> MenuItemSummary {
		MenuItemSummary {
			id: self.id,
			name: self.name.clone(),
			price: self.price,
			category: self.category,
			image_url: self.image_url.clone(),
		}
	}
}

/// Compact view of a menu item attached to order line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSummary {
	pub id: u64,
	pub name: String,
	pub price: Decimal,
	pub category: MenuCategory,
	pub image_url: Option<String>,
}
