//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable implementation module (storage, identity) exposes a
/// `Registry` struct implementing this trait, declaring the name it is
/// configured under and the factory that builds it.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. `"memory"` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type for this implementation family.
	type Factory;

	fn factory() -> Self::Factory;
}
