//! Main entry point for the ASL simulator.
//!
//! Starts the REST server over the persisted store. Configuration is
//! resolved from the environment once at startup and handed to the core as
//! an immutable `CoreConfig`.

use api_rest::{router, AppState};
use asl_core::{constants, AslService, CoreConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the ASL simulator server.
///
/// # Environment Variables
/// - `ASL_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ASL_DATA_DIR`: Directory for the persisted store (default: "/asl_data")
/// - `ASL_PHARMACY_NAME`: Display name of the simulated pharmacy
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("asl=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ASL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = PathBuf::from(
        std::env::var("ASL_DATA_DIR").unwrap_or_else(|_| constants::DEFAULT_DATA_DIR.into()),
    );
    let pharmacy_name = std::env::var("ASL_PHARMACY_NAME")
        .unwrap_or_else(|_| constants::DEFAULT_PHARMACY_NAME.into());

    tracing::info!("++ Starting ASL simulator REST on {}", rest_addr);

    let cfg = Arc::new(CoreConfig::new(data_dir.clone(), pharmacy_name)?);
    let store = Arc::new(Store::open(&data_dir)?);
    let state = AppState {
        service: AslService::new(cfg, store),
    };

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
