//! Main entry point for the coffee-shop order service.
//!
//! Loads the configuration, builds the engine with the compiled-in storage
//! and identity implementations, and serves the HTTP API.

use cafe_config::Config;
use cafe_core::{CafeBuilder, CafeEngine, CafeFactories};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod auth;
mod server;

use cafe_identity::implementations::static_tokens::create_identity as create_static_identity;
use cafe_storage::implementations::file::create_storage as create_file_storage;
use cafe_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the order service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "CAFE_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG wins over --log-level
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.shop.id);

	let engine = Arc::new(build_engine(config.clone()).await?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, engine) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
		None => {
			tracing::warn!("API server disabled in configuration, nothing to serve");
		},
	}

	tracing::info!("Stopped order service");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the engine with every compiled-in implementation registered.
async fn build_engine(config: Config) -> Result<CafeEngine, Box<dyn std::error::Error>> {
	let builder = CafeBuilder::new(config);

	let storage_factories = create_factory_map!(
		cafe_storage::StorageInterface,
		cafe_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let identity_factories = create_factory_map!(
		cafe_identity::IdentityInterface,
		cafe_identity::IdentityError,
		"static" => create_static_identity,
	);

	let factories = CafeFactories {
		storage_factories,
		identity_factories,
	};

	Ok(builder.build(factories).await?)
}
