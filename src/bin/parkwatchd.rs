//! parkwatchd - parking occupancy daemon
//!
//! This daemon:
//! 1. Loads the service config and the areas file
//! 2. Opens the status database
//! 3. Registers the configured detector (if any) and fixes the occupancy mode
//! 4. Serves the HTTP API until Ctrl-C

use anyhow::{anyhow, Context, Result};
use std::sync::{mpsc, Arc};

use parkwatch::{
    api::{ApiConfig, ApiServer},
    config::ServiceConfig,
    load_areas, BackendRegistry, ParkingService, SqliteStatusStore, StatusStore,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::load()?;
    let areas = load_areas(&config.areas_path)
        .with_context(|| format!("loading areas from {}", config.areas_path.display()))?;
    let store: Arc<dyn StatusStore> = Arc::new(
        SqliteStatusStore::open(&config.db_path)
            .with_context(|| format!("opening database {}", config.db_path))?,
    );
    let registry = build_registry(&config)?;

    let service = ParkingService::new(
        areas,
        store,
        registry,
        Box::new(config.capture_provider()),
        config.service_options()?,
    )?;
    let service = Arc::new(service);

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, service.clone()).spawn()?;
    log::info!(
        "parkwatchd running. {} area(s), database {}, api {}",
        service.areas().len(),
        config.db_path,
        api_handle.addr
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!("parkwatchd waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}

#[cfg(feature = "backend-tract")]
fn build_registry(config: &ServiceConfig) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    if let Some(model_path) = &config.detector.model_path {
        let backend = parkwatch::detect::TractBackend::new(
            model_path,
            config.detector.input_width,
            config.detector.input_height,
            config.detector.labels.clone(),
        )?;
        registry.register(backend);
        log::info!("loaded detector model {}", model_path.display());
    }
    Ok(registry)
}

#[cfg(not(feature = "backend-tract"))]
fn build_registry(config: &ServiceConfig) -> Result<BackendRegistry> {
    if let Some(model_path) = &config.detector.model_path {
        log::warn!(
            "model {} configured but this build lacks the backend-tract feature; ignoring",
            model_path.display()
        );
    }
    Ok(BackendRegistry::new())
}
