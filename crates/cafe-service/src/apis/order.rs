//! Order endpoints.
//!
//! Thin adapters between HTTP and the order workflow: they validate path
//! parameters, call the builder or tracker, and translate workflow errors
//! into API errors.

use cafe_core::CafeEngine;
use cafe_order::OrderError;
use cafe_types::{
	APIError, CreateOrderRequest, DeleteOrderResponse, Identity, OrderResponse,
	UpdateOrderStatusRequest,
};
use uuid::Uuid;

/// Converts a workflow error into its HTTP form.
pub fn to_api_error(err: OrderError) -> APIError {
	let error_type = err.code().to_string();
	match err {
		OrderError::InvalidRequest(_)
		| OrderError::ItemNotFound(_)
		| OrderError::InvalidStatus(_) => APIError::BadRequest {
			error_type,
			message: err.to_string(),
			details: None,
		},
		OrderError::Unauthorized => APIError::Unauthorized {
			message: err.to_string(),
		},
		OrderError::Forbidden => APIError::Forbidden {
			message: err.to_string(),
		},
		OrderError::NotFound(_) => APIError::NotFound {
			error_type,
			message: err.to_string(),
		},
		OrderError::InvalidTransition { .. } => APIError::Conflict {
			error_type,
			message: err.to_string(),
		},
		OrderError::Persistence(_) => APIError::InternalServerError {
			error_type,
			message: "Failed to process order".to_string(),
		},
	}
}

/// Order ids are UUIDs; anything else cannot name an order.
fn validate_order_id(id: &str) -> Result<(), APIError> {
	Uuid::parse_str(id).map(|_| ()).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_ORDER_ID".to_string(),
		message: format!("Invalid order ID format: {}", e),
		details: None,
	})
}

pub async fn create_order(
	engine: &CafeEngine,
	caller: Option<&Identity>,
	request: CreateOrderRequest,
) -> Result<OrderResponse, APIError> {
	engine
		.order_builder()
		.create_order(caller, request)
		.await
		.map_err(to_api_error)
}

pub async fn get_order(
	engine: &CafeEngine,
	caller: Option<&Identity>,
	id: &str,
) -> Result<OrderResponse, APIError> {
	validate_order_id(id)?;
	engine
		.order_tracker()
		.get_order(caller, id)
		.await
		.map_err(to_api_error)
}

pub async fn list_user_orders(
	engine: &CafeEngine,
	caller: Option<&Identity>,
	user_id: u64,
) -> Result<Vec<OrderResponse>, APIError> {
	engine
		.order_tracker()
		.list_user_orders(caller, user_id)
		.await
		.map_err(to_api_error)
}

pub async fn update_order_status(
	engine: &CafeEngine,
	caller: Option<&Identity>,
	id: &str,
	request: UpdateOrderStatusRequest,
) -> Result<OrderResponse, APIError> {
	validate_order_id(id)?;
	engine
		.order_tracker()
		.transition_status(caller, id, &request.status)
		.await
		.map_err(to_api_error)
}

pub async fn delete_order(
	engine: &CafeEngine,
	caller: Option<&Identity>,
	id: &str,
) -> Result<DeleteOrderResponse, APIError> {
	validate_order_id(id)?;
	engine
		.order_tracker()
		.delete_order(caller, id)
		.await
		.map_err(to_api_error)
}
