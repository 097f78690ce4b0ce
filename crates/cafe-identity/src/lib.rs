//! Identity module for the order service.
//!
//! Turns the credentials carried by a request into an authenticated
//! [`Identity`] and looks up the public profile shown on orders.
//! Implementations are selected from configuration by name.

use async_trait::async_trait;
use cafe_types::{ConfigSchema, Credentials, Identity, ImplementationRegistry, UserSummary};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod static_tokens;
}

/// Errors that can occur while resolving identities.
#[derive(Debug, Error)]
pub enum IdentityError {
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Error raised by the identity backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the interface for identity implementations.
#[async_trait]
pub trait IdentityInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves credentials to an identity.
	///
	/// Returns `Ok(None)` for missing or unknown credentials; errors are
	/// reserved for backend failures.
	async fn resolve(&self, credentials: &Credentials) -> Result<Option<Identity>, IdentityError>;

	/// Looks up the public profile of a user.
	async fn user_summary(&self, user_id: u64) -> Result<Option<UserSummary>, IdentityError>;

	/// Number of known users with the CUSTOMER role.
	async fn customer_count(&self) -> Result<usize, IdentityError>;
}

/// Type alias for identity factory functions.
pub type IdentityFactory = fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError>;

/// Registry trait for identity implementations.
pub trait IdentityRegistry: ImplementationRegistry<Factory = IdentityFactory> {}

/// Get all registered identity implementations.
pub fn get_all_implementations() -> Vec<(&'static str, IdentityFactory)> {
	use implementations::static_tokens;

	vec![(static_tokens::Registry::NAME, static_tokens::Registry::factory())]
}

/// Service wrapping the configured identity implementation.
pub struct IdentityService {
	implementation: Box<dyn IdentityInterface>,
}

impl IdentityService {
	pub fn new(implementation: Box<dyn IdentityInterface>) -> Self {
		Self { implementation }
	}

	/// Resolves credentials, treating backend failures as anonymous.
	///
	/// A request whose identity cannot be determined is never granted
	/// access, so failures are logged and reported as `None`.
	pub async fn authenticate(&self, credentials: &Credentials) -> Option<Identity> {
		if credentials.token.is_none() {
			return None;
		}
		match self.implementation.resolve(credentials).await {
			Ok(identity) => identity,
			Err(e) => {
				tracing::warn!(error = %e, "Identity resolution failed");
				None
			},
		}
	}

	/// Number of registered customers.
	pub async fn customer_count(&self) -> Result<usize, IdentityError> {
		self.implementation.customer_count().await
	}

	/// Looks up a user's public profile. Failures are logged and yield `None`.
	pub async fn user_summary(&self, user_id: u64) -> Option<UserSummary> {
		match self.implementation.user_summary(user_id).await {
			Ok(summary) => summary,
			Err(e) => {
				tracing::warn!(user_id, error = %e, "User lookup failed");
				None
			},
		}
	}
}
