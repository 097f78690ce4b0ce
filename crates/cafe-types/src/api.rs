//! API types for the order service HTTP API.
//!
//! This module defines the request and response bodies of the order, menu
//! and statistics endpoints, plus the structured error type every handler
//! returns.

use crate::{MenuItemSummary, Order, OrderItem, UserSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

/// Checkout request: the client's cart plus order metadata.
///
/// Prices are deliberately absent; totals are computed from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
	#[serde(default)]
	#[validate(
		length(min = 1, message = "Order must contain at least one item"),
		nested
	)]
	pub items: Vec<CartLine>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default, alias = "payment_method")]
	pub payment_method: Option<String>,
}

/// One cart entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLine {
	#[serde(rename = "menuItemId", alias = "id", alias = "menu_item_id")]
	pub menu_item_id: u64,
	/// Requested quantity; `None` when the client omitted it.
	#[serde(default, alias = "qty")]
	#[validate(range(min = 1, message = "Quantity must be a positive integer"))]
	pub quantity: Option<i64>,
}

impl CartLine {
	pub fn new(menu_item_id: u64, quantity: i64) -> Self {
		Self {
			menu_item_id,
			quantity: Some(quantity),
		}
	}
}

/// Admin request to move an order to another status.
///
/// The status stays a raw string so unknown values are reported as an
/// invalid status rather than a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
	pub status: String,
}

/// Order line enriched with the current menu entry, if it still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
	#[serde(flatten)]
	pub item: OrderItem,
	pub menu_item: Option<MenuItemSummary>,
}

/// Full order as returned by the order endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
	#[serde(flatten)]
	pub order: Order,
	pub items: Vec<OrderItemView>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<UserSummary>,
}

/// Confirmation returned after an order is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOrderResponse {
	pub id: String,
	pub message: String,
}

/// Admin dashboard figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
	pub total_orders: usize,
	/// Sum of totals over orders that were not cancelled.
	pub total_revenue: Decimal,
	pub total_menu_items: usize,
	/// Users with the CUSTOMER role.
	pub total_customers: usize,
	pub orders_by_status: BTreeMap<String, usize>,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error code
	pub error: String,
	/// Human-readable description
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Missing or unknown credentials (401)
	Unauthorized { message: String },
	/// Authenticated but lacking rights (403)
	Forbidden { message: String },
	/// Entity does not exist (404)
	NotFound { error_type: String, message: String },
	/// Request conflicts with the current resource state (409)
	Conflict { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: impl Into<String>, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.into(),
			message: message.into(),
			details: None,
		}
	}

	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			} => (error_type.as_str(), message, details.clone()),
			APIError::Unauthorized { message } => ("UNAUTHORIZED", message, None),
			APIError::Forbidden { message } => ("FORBIDDEN", message, None),
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type.as_str(), message, None),
		};

		ErrorResponse {
			error: error.to_string(),
			message: message.clone(),
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
			APIError::Forbidden { message } => write!(f, "Forbidden: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
