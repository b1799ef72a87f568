// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::batch_executor::BatchExecutor;
use crate::application::chart_service::ChartService;
use crate::application::query_planner::QueryPlanner;
use crate::infrastructure::config::{load_influx_config, load_sensors_config, load_service_config};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::sensor_catalog::ConfiguredSensorCatalog;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{build_chart, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let influx_config = load_influx_config()?;
    let service_config = load_service_config()?;
    let sensors_config = load_sensors_config()?;

    // Create collaborators (infrastructure layer)
    let store = Arc::new(InfluxRepository::new(influx_config.influx)?);
    let catalog = ConfiguredSensorCatalog::new(sensors_config);
    if catalog.is_empty() {
        tracing::warn!("Sensor catalog is empty; every chart request will fail with unknown_sensor");
    } else {
        tracing::info!("Loaded {} sensors from catalog", catalog.len());
    }

    // Create the chart engine (application layer)
    let engine = &service_config.engine;
    let executor = BatchExecutor::new(store)
        .with_strategy(engine.execution_strategy())
        .with_query_timeout(engine.query_timeout());
    let chart_service = ChartService::new(QueryPlanner::new(Arc::new(catalog)), executor);

    let state = Arc::new(AppState { chart_service });

    // Build router (presentation layer)
    // Compression is applied by the response builders, not a tower layer
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/charts", post(build_chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = service_config.server.bind.parse()?;
    tracing::info!("Starting sensor-charts service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
