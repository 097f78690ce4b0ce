//! Identity backed by a fixed list of users declared in configuration.
//!
//! Each user carries an opaque session token. A request presenting that
//! token is authenticated as the user, with the user's role.

use crate::{IdentityError, IdentityFactory, IdentityInterface, IdentityRegistry};
use async_trait::async_trait;
use cafe_types::{
	ConfigSchema, Credentials, Field, FieldType, Identity, ImplementationRegistry, Role,
	Schema, SecretString, UserSummary, ValidationError,
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
struct StaticUser {
	id: u64,
	name: String,
	email: String,
	role: Role,
	token: SecretString,
}

#[derive(Debug, Deserialize)]
struct StaticIdentityConfig {
	#[serde(default)]
	users: Vec<StaticUser>,
}

/// Token-to-user lookup over configured users.
pub struct StaticIdentity {
	users: HashMap<u64, StaticUser>,
	/// Session token to user id
	tokens: HashMap<SecretString, u64>,
}

impl StaticIdentity {
	fn new(users: Vec<StaticUser>) -> Result<Self, IdentityError> {
		let mut tokens = HashMap::with_capacity(users.len());
		let mut by_id = HashMap::with_capacity(users.len());
		for user in users {
			if tokens.contains_key(&user.token) {
				return Err(IdentityError::Configuration(format!(
					"User {} reuses another user's token",
					user.id
				)));
			}
			if by_id.contains_key(&user.id) {
				return Err(IdentityError::Configuration(format!(
					"Duplicate user id {}",
					user.id
				)));
			}
			tokens.insert(user.token.clone(), user.id);
			by_id.insert(user.id, user);
		}
		Ok(Self {
			users: by_id,
			tokens,
		})
	}
}

#[async_trait]
impl IdentityInterface for StaticIdentity {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticIdentitySchema)
	}

	async fn resolve(&self, credentials: &Credentials) -> Result<Option<Identity>, IdentityError> {
		let Some(token) = &credentials.token else {
			return Ok(None);
		};
		if token.is_empty() {
			return Ok(None);
		}
		Ok(self
			.tokens
			.get(token)
			.and_then(|id| self.users.get(id))
			.map(|user| Identity {
				user_id: user.id,
				role: user.role,
			}))
	}

	async fn user_summary(&self, user_id: u64) -> Result<Option<UserSummary>, IdentityError> {
		Ok(self.users.get(&user_id).map(|user| UserSummary {
			id: user.id,
			name: user.name.clone(),
			email: user.email.clone(),
		}))
	}

	async fn customer_count(&self) -> Result<usize, IdentityError> {
		Ok(self
			.users
			.values()
			.filter(|user| user.role == Role::Customer)
			.count())
	}
}

/// Configuration schema for StaticIdentity.
pub struct StaticIdentitySchema;

impl StaticIdentitySchema {
	fn user_schema() -> Schema {
		Schema::new(
			vec![
				Field::new(
					"id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("name", FieldType::String),
				Field::new("email", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(email) if email.contains('@') => Ok(()),
						_ => Err("email must contain '@'".to_string()),
					}
				}),
				Field::new("role", FieldType::String).with_validator(|v| match v.as_str() {
					Some("CUSTOMER") | Some("ADMIN") => Ok(()),
					_ => Err("role must be CUSTOMER or ADMIN".to_string()),
				}),
				Field::new("token", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(token) if token.len() >= 8 => Ok(()),
						_ => Err("token must be at least 8 characters".to_string()),
					}
				}),
			],
			vec![],
		)
	}
}

impl ConfigSchema for StaticIdentitySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"users",
				FieldType::Array(Box::new(FieldType::Table(Self::user_schema()))),
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create the static identity from configuration.
///
/// Configuration:
/// - `users`: array of `{ id, name, email, role, token }` tables
pub fn create_identity(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	StaticIdentitySchema
		.validate(config)
		.map_err(|e| IdentityError::Configuration(e.to_string()))?;

	let parsed: StaticIdentityConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| IdentityError::Configuration(e.to_string()))?;

	tracing::debug!(users = parsed.users.len(), "Loaded static identities");
	Ok(Box::new(StaticIdentity::new(parsed.users)?))
}

/// Registry for the static identity implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = IdentityFactory;

	fn factory() -> Self::Factory {
		create_identity
	}
}

impl IdentityRegistry for Registry {}
