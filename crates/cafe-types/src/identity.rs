//! Caller identity types.

use crate::SecretString;
use serde::{Deserialize, Serialize};

/// Role granted to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	Customer,
	Admin,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub user_id: u64,
	pub role: Role,
}

impl Identity {
	pub fn customer(user_id: u64) -> Self {
		Self {
			user_id,
			role: Role::Customer,
		}
	}

	pub fn admin(user_id: u64) -> Self {
		Self {
			user_id,
			role: Role::Admin,
		}
	}
}

/// Public profile attached to order responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
	pub id: u64,
	pub name: String,
	pub email: String,
}

/// Raw credentials extracted from a request.
///
/// Carries the session token only; it is resolved to an [`Identity`] by the
/// configured identity implementation.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
	pub token: Option<SecretString>,
}

impl Credentials {
	pub fn anonymous() -> Self {
		Self { token: None }
	}

	pub fn bearer(token: impl Into<String>) -> Self {
		Self {
			token: Some(SecretString::new(token.into())),
		}
	}
}
