//! Common types module for the coffee-shop order service.
//!
//! This module defines the data types shared by every service crate: menu
//! items, orders and their line items, caller identities, the HTTP request
//! and response shapes, and the configuration validation helpers used by the
//! pluggable implementations.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Caller identity and user summary types.
pub mod identity;
/// Menu catalog types.
pub mod menu;
/// Order, order item and order status types.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secret string wrapper for credentials.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use identity::*;
pub use menu::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use validation::*;
