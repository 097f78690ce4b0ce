//! Storage module for the order service.
//!
//! This module provides the persistence abstraction the order workflow writes
//! through: a low-level key/value backend trait with an all-or-nothing batch
//! primitive, and a typed JSON service on top of it. Backends are selected
//! from configuration by name.

use async_trait::async_trait;
use cafe_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// A conditional write found a value other than the one it expected.
	#[error("Conflicting write to {0}")]
	Conflict(String),
}

/// A single mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
	Set {
		key: String,
		value: Vec<u8>,
	},
	Delete {
		key: String,
	},
	/// Replaces the value only if it still holds `expected`.
	///
	/// A missing key fails the batch with `NotFound`, different contents with
	/// `Conflict`. Either way nothing in the batch is applied.
	SetIfUnchanged {
		key: String,
		expected: Vec<u8>,
		value: Vec<u8>,
	},
}

impl WriteOp {
	pub fn key(&self) -> &str {
		match self {
			WriteOp::Set { key, .. }
			| WriteOp::Delete { key }
			| WriteOp::SetIfUnchanged { key, .. } => key,
		}
	}

	/// The bytes this op writes, if it writes any.
	pub fn value(&self) -> Option<&[u8]> {
		match self {
			WriteOp::Set { value, .. } | WriteOp::SetIfUnchanged { value, .. } => Some(value),
			WriteOp::Delete { .. } => None,
		}
	}

	/// Checks the precondition of a conditional op against the current value.
	pub fn check(&self, current: Option<&[u8]>) -> Result<(), StorageError> {
		let WriteOp::SetIfUnchanged { key, expected, .. } = self else {
			return Ok(());
		};
		match current {
			None => Err(StorageError::NotFound),
			Some(current) if current != expected.as_slice() => {
				Err(StorageError::Conflict(key.clone()))
			},
			Some(_) => Ok(()),
		}
	}
}

/// Trait defining the low-level interface for storage backends.
///
/// Every backend must support prefix listing (used for secondary indexes)
/// and [`StorageInterface::apply`], which either performs every operation of
/// a batch or none of them.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key. Missing keys are not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns every stored key starting with `prefix`, in ascending order.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Applies a batch of writes as a single all-or-nothing unit.
	async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn make_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// A set of writes committed together through [`StorageService::commit`].
#[derive(Debug, Default)]
pub struct StorageBatch {
	ops: Vec<WriteOp>,
}

impl StorageBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a serialized value for storage.
	pub fn store<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<&mut Self, StorageError> {
		self.ops.push(WriteOp::Set {
			key: make_key(namespace, id),
			value: to_bytes(data)?,
		});
		Ok(self)
	}

	/// Queues a write that only succeeds if the stored bytes are still `expected`.
	pub fn store_if_unchanged<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		expected: Vec<u8>,
		data: &T,
	) -> Result<&mut Self, StorageError> {
		self.ops.push(WriteOp::SetIfUnchanged {
			key: make_key(namespace, id),
			expected,
			value: to_bytes(data)?,
		});
		Ok(self)
	}

	/// Queues a removal.
	pub fn remove(&mut self, namespace: &str, id: &str) -> &mut Self {
		self.ops.push(WriteOp::Delete {
			key: make_key(namespace, id),
		});
		self
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	pub fn ops(&self) -> &[WriteOp] {
		&self.ops
	}
}

/// A decoded value together with the exact bytes it was read from.
///
/// The bytes serve as the expected value of a later conditional write.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
	pub value: T,
	pub raw: Vec<u8>,
}

/// High-level storage service that provides typed operations.
///
/// Values are serialized as JSON. Keys are formed as `<namespace>:<id>`.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(&make_key(namespace, id), to_bytes(data)?)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&make_key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value along with the raw bytes it was decoded from.
	pub async fn retrieve_versioned<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Versioned<T>, StorageError> {
		let raw = self.backend.get_bytes(&make_key(namespace, id)).await?;
		let value =
			serde_json::from_slice(&raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
		Ok(Versioned { value, raw })
	}

	/// Updates an existing value; fails with `NotFound` if the key is absent.
	///
	/// The write is conditional on the value read just before it, so a
	/// concurrent removal is never undone. A concurrent change surfaces as
	/// `Conflict`.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = make_key(namespace, id);
		let expected = self.backend.get_bytes(&key).await?;
		self.backend
			.apply(vec![WriteOp::SetIfUnchanged {
				key,
				expected,
				value: to_bytes(data)?,
			}])
			.await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&make_key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&make_key(namespace, id)).await
	}

	/// Lists the ids in `namespace` whose id starts with `id_prefix`.
	///
	/// The returned ids have the namespace stripped.
	pub async fn list_ids(
		&self,
		namespace: &str,
		id_prefix: &str,
	) -> Result<Vec<String>, StorageError> {
		let namespace_prefix = format!("{}:", namespace);
		let keys = self
			.backend
			.list_keys(&format!("{}{}", namespace_prefix, id_prefix))
			.await?;
		Ok(keys
			.into_iter()
			.filter_map(|k| k.strip_prefix(&namespace_prefix).map(str::to_string))
			.collect())
	}

	/// Retrieves every value in `namespace` whose id starts with `id_prefix`.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id_prefix: &str,
	) -> Result<Vec<T>, StorageError> {
		let mut values = Vec::new();
		for id in self.list_ids(namespace, id_prefix).await? {
			match self.retrieve(namespace, &id).await {
				Ok(value) => values.push(value),
				// Removed between listing and reading
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(values)
	}

	/// Commits a batch atomically. Empty batches are a no-op.
	pub async fn commit(&self, batch: StorageBatch) -> Result<(), StorageError> {
		if batch.is_empty() {
			return Ok(());
		}
		tracing::debug!(operations = batch.len(), "Committing storage batch");
		self.backend.apply(batch.ops).await
	}
}
