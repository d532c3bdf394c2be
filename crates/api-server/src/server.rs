//! API server: HTTP REST endpoints plus the Prometheus metrics listener.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use venture_core::config::AppConfig;
use venture_recommender::RecommendationService;

/// Build the REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Ranking and feedback
        .route("/v1/score", post(rest::handle_score))
        .route("/v1/update", post(rest::handle_update))
        .route("/v1/feedback", post(rest::handle_feedback))
        .route("/v1/baseline", post(rest::handle_baseline))
        // Model state
        .route("/v1/investors/:investor_id/model", get(rest::handle_explain))
        .route("/v1/investors/:investor_id/reset", post(rest::handle_reset))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    service: Arc<RecommendationService>,
}

impl ApiServer {
    pub fn new(config: AppConfig, service: Arc<RecommendationService>) -> Self {
        Self { config, service }
    }

    /// Start the HTTP REST server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let ready = Arc::new(AtomicBool::new(false));
        let state = AppState {
            service: self.service.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
            ready: ready.clone(),
        };
        let app = router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        ready.store(true, Ordering::Release);
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
