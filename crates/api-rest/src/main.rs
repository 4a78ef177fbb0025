//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the ASL simulator's REST API on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server
//! (with OpenAPI/Swagger UI). The workspace's main `asl-run` binary is the
//! normal entry point.

use api_rest::{router, AppState};
use asl_core::{constants, AslService, CoreConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the standalone REST API server.
///
/// # Environment Variables
/// - `ASL_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `ASL_DATA_DIR`: Directory for the persisted store (default: "/asl_data")
/// - `ASL_PHARMACY_NAME`: Display name of the simulated pharmacy
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the store cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("ASL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = PathBuf::from(
        std::env::var("ASL_DATA_DIR").unwrap_or_else(|_| constants::DEFAULT_DATA_DIR.into()),
    );
    let pharmacy_name = std::env::var("ASL_PHARMACY_NAME")
        .unwrap_or_else(|_| constants::DEFAULT_PHARMACY_NAME.into());

    tracing::info!("-- Starting ASL REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::new(data_dir.clone(), pharmacy_name)?);
    let store = Arc::new(Store::open(&data_dir)?);
    let state = AppState {
        service: AslService::new(cfg, store),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
