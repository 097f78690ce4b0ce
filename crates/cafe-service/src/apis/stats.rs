//! Admin dashboard statistics.

use super::order::to_api_error;
use cafe_core::CafeEngine;
use cafe_types::{APIError, Identity, StatsResponse};

pub async fn get_stats(
	engine: &CafeEngine,
	caller: Option<&Identity>,
) -> Result<StatsResponse, APIError> {
	engine
		.order_tracker()
		.stats(caller)
		.await
		.map_err(to_api_error)
}
