//! File-based storage backend.
//!
//! Each key is one JSON file below `storage_path`. Single writes go through a
//! temp file and a rename. Batches are staged to temp files first, then
//! committed one rename at a time under an exclusive directory lock. Before
//! the first rename the previous contents of every key are written to a
//! journal. A failed step rolls back from memory; a process that dies
//! mid-batch is rolled back from the journal when the storage is next
//! created. Readers in the same process never observe a batch in progress.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry, WriteOp};
use async_trait::async_trait;
use cafe_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

const DATA_EXTENSION: &str = "json";
const STAGED_EXTENSION: &str = "tmp";
const LOCK_FILE: &str = ".lock";
const JOURNAL_FILE: &str = "batch.journal";

fn backend_err(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// Escapes a key into a filesystem-safe file stem.
///
/// `%`, `/` and `:` are percent-encoded so the mapping can be reversed when
/// listing keys.
fn encode_key(key: &str) -> String {
	let mut out = String::with_capacity(key.len());
	for c in key.chars() {
		match c {
			'%' => out.push_str("%25"),
			'/' => out.push_str("%2F"),
			':' => out.push_str("%3A"),
			'\\' => out.push_str("%5C"),
			other => out.push(other),
		}
	}
	out
}

fn decode_key(stem: &str) -> String {
	stem.replace("%3A", ":")
		.replace("%2F", "/")
		.replace("%5C", "\\")
		.replace("%25", "%")
}

/// Holds the cross-process directory lock until dropped.
struct DirLock(std::fs::File);

impl DirLock {
	fn acquire(base_path: &Path) -> std::io::Result<Self> {
		std::fs::create_dir_all(base_path)?;
		let file = std::fs::OpenOptions::new()
			.create(true)
			.truncate(false)
			.write(true)
			.open(base_path.join(LOCK_FILE))?;
		FileExt::lock_exclusive(&file)?;
		Ok(Self(file))
	}
}

impl Drop for DirLock {
	fn drop(&mut self) {
		if let Err(e) = FileExt::unlock(&self.0) {
			tracing::warn!("Failed to release storage lock: {}", e);
		}
	}
}

/// Value of a key before a batch touched it.
///
/// The journal written before a batch commits is the list of these entries.
#[derive(Debug, Serialize, Deserialize)]
struct Undo {
	key: String,
	previous: Option<Vec<u8>>,
}

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
	/// Readers share, writers exclude; the lock file covers other processes.
	lock: RwLock<()>,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			lock: RwLock::new(()),
		}
	}

	fn get_file_path(&self, key: &str) -> PathBuf {
		data_path(&self.base_path, key)
	}

	async fn lock_dir(&self) -> Result<DirLock, StorageError> {
		let base_path = self.base_path.clone();
		tokio::task::spawn_blocking(move || DirLock::acquire(&base_path))
			.await
			.map_err(backend_err)?
			.map_err(backend_err)
	}

	async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(backend_err(e)),
		}
	}

	async fn remove_if_present(path: &Path) -> std::io::Result<()> {
		match fs::remove_file(path).await {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
			_ => Ok(()),
		}
	}

	async fn write_atomic(path: &Path, value: &[u8]) -> std::io::Result<()> {
		let temp_path = path.with_extension(STAGED_EXTENSION);
		fs::write(&temp_path, value).await?;
		fs::rename(&temp_path, path).await
	}

	/// Reads the current value of every key in the batch and checks the
	/// conditional ops against it.
	async fn capture(&self, ops: &[WriteOp]) -> Result<Vec<Undo>, StorageError> {
		let mut undo = Vec::with_capacity(ops.len());
		for op in ops {
			let previous = Self::read_optional(&self.get_file_path(op.key())).await?;
			op.check(previous.as_deref())?;
			undo.push(Undo {
				key: op.key().to_string(),
				previous,
			});
		}
		Ok(undo)
	}

	/// Stages every write of the batch to its temp file.
	async fn stage(&self, ops: &[WriteOp]) -> Result<Vec<PathBuf>, StorageError> {
		let mut staged = Vec::new();
		for op in ops {
			if let Some(value) = op.value() {
				let temp_path = self.get_file_path(op.key()).with_extension(STAGED_EXTENSION);
				if let Err(e) = fs::write(&temp_path, value).await {
					Self::discard(&staged).await;
					return Err(backend_err(e));
				}
				staged.push(temp_path);
			}
		}
		Ok(staged)
	}

	/// Captures previous values, stages the new ones and records the journal.
	///
	/// Once this returns, the batch can be committed step by step; an
	/// interrupted commit is rolled back from the journal on the next start.
	async fn prepare(&self, ops: &[WriteOp]) -> Result<Vec<Undo>, StorageError> {
		let undo = self.capture(ops).await?;
		let staged = self.stage(ops).await?;
		let journal = serde_json::to_vec(&undo)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		if let Err(e) = Self::write_atomic(&self.base_path.join(JOURNAL_FILE), &journal).await {
			Self::discard(&staged).await;
			return Err(backend_err(e));
		}
		Ok(undo)
	}

	async fn discard(staged: &[PathBuf]) {
		for path in staged {
			if let Err(e) = Self::remove_if_present(path).await {
				tracing::warn!("Failed to remove staged file {:?}: {}", path, e);
			}
		}
	}

	async fn rollback(&self, undo: &[Undo]) {
		for step in undo.iter().rev() {
			let path = self.get_file_path(&step.key);
			let restored = match &step.previous {
				Some(previous) => Self::write_atomic(&path, previous).await,
				None => Self::remove_if_present(&path).await,
			};
			if let Err(e) = restored {
				tracing::error!("Failed to roll back {:?}: {}", path, e);
			}
		}
	}

	async fn commit_steps(&self, ops: &[WriteOp], undo: &[Undo]) -> Result<(), StorageError> {
		for (applied, op) in ops.iter().enumerate() {
			let path = self.get_file_path(op.key());
			let result = match op {
				WriteOp::Set { .. } | WriteOp::SetIfUnchanged { .. } => {
					fs::rename(path.with_extension(STAGED_EXTENSION), &path).await
				},
				WriteOp::Delete { .. } => Self::remove_if_present(&path).await,
			};

			if let Err(e) = result {
				tracing::error!(
					key = %op.key(),
					applied,
					"Storage batch failed, rolling back: {}",
					e
				);
				self.rollback(&undo[..applied]).await;
				let staged: Vec<PathBuf> = ops
					.iter()
					.filter(|op| op.value().is_some())
					.map(|op| self.get_file_path(op.key()).with_extension(STAGED_EXTENSION))
					.collect();
				Self::discard(&staged).await;
				self.clear_journal().await?;
				return Err(backend_err(e));
			}
		}
		Ok(())
	}

	async fn clear_journal(&self) -> Result<(), StorageError> {
		Self::remove_if_present(&self.base_path.join(JOURNAL_FILE))
			.await
			.map_err(backend_err)
	}

	/// Rolls back a batch that was interrupted between its journal being
	/// written and being cleared, and removes stray staged files.
	///
	/// Returns the number of keys restored.
	pub fn recover(base_path: &Path) -> Result<usize, StorageError> {
		if !base_path.exists() {
			return Ok(0);
		}
		let _dir_lock = DirLock::acquire(base_path).map_err(backend_err)?;

		let journal_path = base_path.join(JOURNAL_FILE);
		let restored = match std::fs::read(&journal_path) {
			Ok(data) => {
				let undo: Vec<Undo> = serde_json::from_slice(&data)
					.map_err(|e| StorageError::Serialization(e.to_string()))?;
				for step in undo.iter().rev() {
					let path = data_path(base_path, &step.key);
					match &step.previous {
						Some(previous) => {
							let temp_path = path.with_extension(STAGED_EXTENSION);
							std::fs::write(&temp_path, previous).map_err(backend_err)?;
							std::fs::rename(&temp_path, &path).map_err(backend_err)?;
						},
						None => remove_if_present_sync(&path).map_err(backend_err)?,
					}
				}
				undo.len()
			},
			Err(e) if e.kind() == ErrorKind::NotFound => 0,
			Err(e) => return Err(backend_err(e)),
		};

		for entry in std::fs::read_dir(base_path).map_err(backend_err)? {
			let path = entry.map_err(backend_err)?.path();
			if path.extension() == Some(std::ffi::OsStr::new(STAGED_EXTENSION)) {
				remove_if_present_sync(&path).map_err(backend_err)?;
			}
		}
		remove_if_present_sync(&journal_path).map_err(backend_err)?;

		if restored > 0 {
			tracing::warn!(
				path = %base_path.display(),
				keys = restored,
				"Rolled back interrupted storage batch"
			);
		}
		Ok(restored)
	}
}

fn data_path(base_path: &Path, key: &str) -> PathBuf {
	base_path.join(format!("{}.{}", encode_key(key), DATA_EXTENSION))
}

fn remove_if_present_sync(path: &Path) -> std::io::Result<()> {
	match std::fs::remove_file(path) {
		Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
		_ => Ok(()),
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let _guard = self.lock.read().await;
		Self::read_optional(&self.get_file_path(key))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.lock.write().await;
		let _dir_lock = self.lock_dir().await?;
		Self::write_atomic(&self.get_file_path(key), &value)
			.await
			.map_err(backend_err)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.lock.write().await;
		let _dir_lock = self.lock_dir().await?;
		Self::remove_if_present(&self.get_file_path(key))
			.await
			.map_err(backend_err)
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let _guard = self.lock.read().await;
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(backend_err)
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let _guard = self.lock.read().await;
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend_err(e)),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend_err)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(DATA_EXTENSION)) {
				continue;
			}
			let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
				tracing::debug!("Skipping file with non UTF-8 name: {:?}", path);
				continue;
			};
			let key = decode_key(stem);
			if key.starts_with(prefix) {
				keys.push(key);
			}
		}
		keys.sort();
		Ok(keys)
	}

	async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
		let _guard = self.lock.write().await;
		let _dir_lock = self.lock_dir().await?;

		let undo = self.prepare(&ops).await?;
		self.commit_steps(&ops, &undo).await?;
		self.clear_journal().await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if s.trim().is_empty() => Err("storage_path cannot be empty".into()),
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = PathBuf::from(
		config
			.get("storage_path")
			.and_then(|v| v.as_str())
			.unwrap_or("./data/storage"),
	);
	FileStorage::recover(&storage_path)?;

	Ok(Box::new(FileStorage::new(storage_path)))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
