// main.rs
mod color;
mod commands;
mod config;
mod devices;
mod docs;
mod drivers;
mod error;
mod events;
mod handlers;
mod lamp;
mod metrics;
mod models;
mod utils;

use axum::{Router, routing::get};
use commands::CommandDispatcher;
use crate::config::DriverKind;
use devices::{Device, SmartLamp};
use drivers::{NoopDriver, OutputDriver, PigpioDriver};
use events::Bus;
use handlers::*;
use models::AppState;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = config::Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)?;
        info!("Metrics exported on port {}", settings.metrics.port);
    }

    let driver: Box<dyn OutputDriver> = match settings.driver.kind {
        DriverKind::Noop => Box::new(NoopDriver::new()),
        DriverKind::Pigpio => Box::new(
            PigpioDriver::connect(
                &settings.driver.host,
                settings.driver.port,
                settings.driver.pins,
            )
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to pigpio daemon: {}", e))?,
        ),
    };

    let mut lamp = SmartLamp::new(driver, settings.calibration);
    if let Err(e) = lamp.sync().await {
        error!("Failed to drive initial state: {}", e);
    }
    info!("{}", lamp.state());

    let topics = settings.bus.topics();
    let (bus, inbound) = Bus::new(settings.bus.queue_capacity);
    let (latest_tx, latest_rx) = watch::channel(lamp.get_status());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = CommandDispatcher::new(bus.clone(), topics.clone(), latest_tx);
    let lamp_task = tokio::spawn(dispatcher.run(lamp, inbound, shutdown_rx.clone()));

    let state = Arc::new(AppState::new(
        bus,
        topics,
        latest_rx,
        settings.server.max_connections,
    ));

    let app = Router::new()
        .route("/ws", get(handle_ws_upgrade))
        .route("/state", get(get_state))
        .route("/api-doc/openapi.json", get(docs::openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind address: {}", e))?;

    tracing::info!("Server started on {}", settings.server.address);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
        let _ = shutdown_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(utils::wait_for_shutdown(shutdown_rx))
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    let mut lamp = lamp_task
        .await
        .map_err(|e| anyhow::anyhow!("Command loop failed: {}", e))?;
    lamp.shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to release output driver: {}", e))?;

    Ok(())
}
