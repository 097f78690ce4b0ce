//! HTTP server for the order service API.
//!
//! Routes live under `/api`, with an unauthenticated `/health` probe at the
//! root. Every handler resolves the caller from the session token and
//! returns either JSON or a structured [`APIError`].

use crate::apis::menu::MenuQuery;
use crate::auth::Caller;
use axum::{
	extract::{
		rejection::{JsonRejection, PathRejection},
		Path, Query, State,
	},
	http::{HeaderValue, StatusCode},
	response::{IntoResponse, Json},
	routing::get,
	Router,
};
use cafe_config::ApiConfig;
use cafe_core::CafeEngine;
use cafe_types::{
	APIError, CreateOrderRequest, DeleteOrderResponse, MenuItem, OrderResponse, StatsResponse,
	UpdateOrderStatusRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	limit::RequestBodyLimitLayer,
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<CafeEngine>,
}

/// Builds the application router with its middleware stack.
pub fn router(api_config: &ApiConfig, engine: Arc<CafeEngine>) -> Router {
	let api = Router::new()
		.route("/orders", axum::routing::post(handle_create_order))
		.route(
			"/orders/{id}",
			get(handle_get_order)
				.put(handle_update_order_status)
				.delete(handle_delete_order),
		)
		.route("/orders/user/{user_id}", get(handle_list_user_orders))
		.route("/menu", get(handle_list_menu))
		.route("/menu/{id}", get(handle_get_menu_item))
		.route("/admin/stats", get(handle_stats));

	Router::new()
		.route("/health", get(handle_health))
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(RequestBodyLimitLayer::new(api_config.max_request_size))
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config))
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				))),
		)
		.with_state(AppState { engine })
}

fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let Some(cors) = &api_config.cors else {
		return CorsLayer::permissive();
	};
	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();
	CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

/// Starts the HTTP server and serves until the process is stopped.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<CafeEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

fn invalid_body(rejection: JsonRejection) -> APIError {
	APIError::bad_request("INVALID_REQUEST", rejection.body_text())
}

fn invalid_path(rejection: PathRejection) -> APIError {
	APIError::bad_request("INVALID_REQUEST", rejection.body_text())
}

/// Logs a failed request and passes the error through.
fn log_failure(operation: &str, err: APIError) -> APIError {
	if err.status_code() >= 500 {
		tracing::error!(operation, error = %err, "Request failed");
	} else {
		tracing::warn!(operation, error = %err, "Request failed");
	}
	err
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
	Json(json!({
		"status": "ok",
		"shop": state.engine.config().shop.id,
	}))
}

/// Handles POST /api/orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	caller: Caller,
	body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	crate::apis::order::create_order(&state.engine, caller.identity(), request)
		.await
		.map(|order| (StatusCode::CREATED, Json(order)))
		.map_err(|e| log_failure("create_order", e))
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	caller: Caller,
) -> Result<Json<OrderResponse>, APIError> {
	crate::apis::order::get_order(&state.engine, caller.identity(), &id)
		.await
		.map(Json)
		.map_err(|e| log_failure("get_order", e))
}

/// Handles GET /api/orders/user/{user_id} requests.
async fn handle_list_user_orders(
	State(state): State<AppState>,
	caller: Caller,
	user_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Vec<OrderResponse>>, APIError> {
	let Path(user_id) = user_id.map_err(invalid_path)?;
	crate::apis::order::list_user_orders(&state.engine, caller.identity(), user_id)
		.await
		.map(Json)
		.map_err(|e| log_failure("list_user_orders", e))
}

/// Handles PUT /api/orders/{id} requests.
async fn handle_update_order_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	caller: Caller,
	body: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	crate::apis::order::update_order_status(&state.engine, caller.identity(), &id, request)
		.await
		.map(Json)
		.map_err(|e| log_failure("update_order_status", e))
}

/// Handles DELETE /api/orders/{id} requests.
async fn handle_delete_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	caller: Caller,
) -> Result<Json<DeleteOrderResponse>, APIError> {
	crate::apis::order::delete_order(&state.engine, caller.identity(), &id)
		.await
		.map(Json)
		.map_err(|e| log_failure("delete_order", e))
}

/// Handles GET /api/menu requests.
async fn handle_list_menu(
	State(state): State<AppState>,
	Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItem>>, APIError> {
	crate::apis::menu::list_menu(&state.engine, query)
		.await
		.map(Json)
		.map_err(|e| log_failure("list_menu", e))
}

/// Handles GET /api/menu/{id} requests.
async fn handle_get_menu_item(
	State(state): State<AppState>,
	id: Result<Path<u64>, PathRejection>,
) -> Result<Json<MenuItem>, APIError> {
	let Path(id) = id.map_err(invalid_path)?;
	crate::apis::menu::get_menu_item(&state.engine, id)
		.await
		.map(Json)
		.map_err(|e| log_failure("get_menu_item", e))
}

/// Handles GET /api/admin/stats requests.
async fn handle_stats(
	State(state): State<AppState>,
	caller: Caller,
) -> Result<Json<StatsResponse>, APIError> {
	crate::apis::stats::get_stats(&state.engine, caller.identity())
		.await
		.map(Json)
		.map_err(|e| log_failure("stats", e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Method, Request};
	use cafe_config::Config;
	use cafe_core::{CafeBuilder, CafeFactories};
	use rust_decimal::Decimal;
	use serde_json::Value;
	use tower::ServiceExt;

	const CONFIG: &str = r#"
[shop]
id = "corner-cafe"

[storage]
primary = "memory"
[storage.implementations.memory]

[identity]
primary = "static"

[[identity.implementations.static.users]]
id = 1
name = "Budi"
email = "budi@cafe.test"
role = "CUSTOMER"
token = "budi-session"

[[identity.implementations.static.users]]
id = 2
name = "Ani"
email = "ani@cafe.test"
role = "CUSTOMER"
token = "ani-session"

[[identity.implementations.static.users]]
id = 9
name = "Sari"
email = "sari@cafe.test"
role = "ADMIN"
token = "sari-session"

[[menu.items]]
id = 1
name = "Nasi Goreng"
price = 12000
category = "MAIN_COURSE"

[[menu.items]]
id = 2
name = "Kopi Susu"
price = 18000
category = "COFFEE"

[[menu.items]]
id = 3
name = "Matcha Latte"
price = 22000
category = "NON_COFFEE"
is_available = false

[api]
enabled = true
"#;

	async fn app() -> Router {
		let config: Config = CONFIG.parse().unwrap();
		let api_config = config.api.clone().unwrap();
		let factories = CafeFactories {
			storage_factories: cafe_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			identity_factories: cafe_identity::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		};
		let engine = CafeBuilder::new(config).build(factories).await.unwrap();
		router(&api_config, Arc::new(engine))
	}

	async fn send(
		app: &Router,
		method: Method,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let request = match body {
			Some(body) => request
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => request.body(Body::empty()).unwrap(),
		};

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	async fn place_order(app: &Router, token: &str) -> String {
		let (status, body) = send(
			app,
			Method::POST,
			"/api/orders",
			Some(token),
			Some(json!({
				"items": [{"id": 1, "qty": 2}, {"menuItemId": 2, "quantity": 1}],
				"paymentMethod": "QRIS"
			})),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED, "{}", body);
		body["id"].as_str().unwrap().to_string()
	}

	#[tokio::test]
	async fn test_health() {
		let app = app().await;
		let (status, body) = send(&app, Method::GET, "/health", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["shop"], "corner-cafe");
	}

	#[tokio::test]
	async fn test_create_order() {
		let app = app().await;
		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders",
			Some("budi-session"),
			Some(json!({
				"items": [{"id": 1, "qty": 2}, {"id": 2, "qty": 1, "price": 1}],
				"notes": "less ice"
			})),
		)
		.await;

		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(body["status"], "PENDING");
		assert_eq!(body["userId"], 1);
		assert_eq!(
			body["totalPrice"].as_str().unwrap().parse::<Decimal>().unwrap(),
			Decimal::new(42000, 0)
		);
		assert_eq!(body["items"].as_array().unwrap().len(), 2);
		assert_eq!(body["items"][0]["quantity"], 2);
		assert_eq!(body["items"][0]["menuItem"]["name"], "Nasi Goreng");
		assert_eq!(body["user"]["email"], "budi@cafe.test");
	}

	#[tokio::test]
	async fn test_create_order_errors() {
		let app = app().await;
		let cart = json!({"items": [{"id": 1, "qty": 1}]});

		let (status, body) =
			send(&app, Method::POST, "/api/orders", None, Some(cart.clone())).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "UNAUTHORIZED");

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders",
			Some("budi-session"),
			Some(json!({"items": []})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders",
			Some("budi-session"),
			Some(json!({"items": [{"id": 99999, "qty": 1}]})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "ITEM_NOT_FOUND");

		let (status, _) = send(
			&app,
			Method::POST,
			"/api/orders",
			Some("budi-session"),
			Some(json!({"items": [{"id": 3, "qty": 1}]})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/orders",
			Some("budi-session"),
			Some(json!({"items": "latte"})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");
	}

	#[tokio::test]
	async fn test_read_authorization() {
		let app = app().await;
		let id = place_order(&app, "budi-session").await;
		let uri = format!("/api/orders/{}", id);

		let (status, body) = send(&app, Method::GET, &uri, Some("budi-session"), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["user"]["name"], "Budi");

		let (status, _) = send(&app, Method::GET, &uri, Some("sari-session"), None).await;
		assert_eq!(status, StatusCode::OK);

		let (status, body) = send(&app, Method::GET, &uri, Some("ani-session"), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(body["error"], "FORBIDDEN");

		let (status, _) = send(&app, Method::GET, &uri, None, None).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);

		let (status, body) =
			send(&app, Method::GET, "/api/orders/42", Some("budi-session"), None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ORDER_ID");

		let (status, _) = send(
			&app,
			Method::GET,
			"/api/orders/550e8400-e29b-41d4-a716-446655440000",
			Some("budi-session"),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_list_user_orders() {
		let app = app().await;
		place_order(&app, "budi-session").await;
		place_order(&app, "budi-session").await;
		place_order(&app, "ani-session").await;

		let (status, body) =
			send(&app, Method::GET, "/api/orders/user/1", Some("budi-session"), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body.as_array().unwrap().len(), 2);

		let (status, _) =
			send(&app, Method::GET, "/api/orders/user/1", Some("ani-session"), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = send(
			&app,
			Method::GET,
			"/api/orders/user/budi",
			Some("budi-session"),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");
	}

	#[tokio::test]
	async fn test_status_updates() {
		let app = app().await;
		let id = place_order(&app, "budi-session").await;
		let uri = format!("/api/orders/{}", id);

		let (status, _) = send(
			&app,
			Method::PUT,
			&uri,
			Some("budi-session"),
			Some(json!({"status": "PROCESSING"})),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = send(
			&app,
			Method::PUT,
			&uri,
			Some("sari-session"),
			Some(json!({"status": "DELIVERED"})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_STATUS");

		let (status, body) = send(
			&app,
			Method::PUT,
			&uri,
			Some("sari-session"),
			Some(json!({"status": "CANCELLED"})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "CANCELLED");

		let (status, body) = send(
			&app,
			Method::PUT,
			&uri,
			Some("sari-session"),
			Some(json!({"status": "PROCESSING"})),
		)
		.await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "INVALID_TRANSITION");

		let (_, body) = send(&app, Method::GET, &uri, Some("budi-session"), None).await;
		assert_eq!(body["status"], "CANCELLED");
	}

	#[tokio::test]
	async fn test_delete_order() {
		let app = app().await;
		let id = place_order(&app, "budi-session").await;
		let uri = format!("/api/orders/{}", id);

		let (status, _) = send(&app, Method::DELETE, &uri, Some("budi-session"), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = send(&app, Method::DELETE, &uri, Some("sari-session"), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["id"], id.as_str());

		let (status, _) = send(&app, Method::GET, &uri, Some("sari-session"), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		let (status, _) = send(&app, Method::DELETE, &uri, Some("sari-session"), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_menu_endpoints() {
		let app = app().await;

		let (status, body) = send(&app, Method::GET, "/api/menu", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body.as_array().unwrap().len(), 3);

		let (_, body) = send(&app, Method::GET, "/api/menu?category=coffee", None, None).await;
		assert_eq!(body.as_array().unwrap().len(), 1);
		assert_eq!(body[0]["name"], "Kopi Susu");

		let (_, body) = send(&app, Method::GET, "/api/menu?available=true", None, None).await;
		assert_eq!(body.as_array().unwrap().len(), 2);

		let (status, body) = send(&app, Method::GET, "/api/menu?category=TEA", None, None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_CATEGORY");

		let (status, body) = send(&app, Method::GET, "/api/menu/3", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["isAvailable"], false);

		let (status, _) = send(&app, Method::GET, "/api/menu/404", None, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_admin_stats() {
		let app = app().await;
		place_order(&app, "budi-session").await;
		place_order(&app, "ani-session").await;

		let (status, _) =
			send(&app, Method::GET, "/api/admin/stats", Some("budi-session"), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) =
			send(&app, Method::GET, "/api/admin/stats", Some("sari-session"), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["totalOrders"], 2);
		assert_eq!(body["totalMenuItems"], 3);
		assert_eq!(body["totalCustomers"], 2);
		assert_eq!(body["ordersByStatus"]["PENDING"], 2);
		assert_eq!(
			body["totalRevenue"].as_str().unwrap().parse::<Decimal>().unwrap(),
			Decimal::new(84000, 0)
		);
	}
}
