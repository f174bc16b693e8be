//! HTTP Server and Scrape Handling
//!
//! This module implements the Prometheus exporter HTTP server. Unlike a
//! background polling loop, every request on the metrics path triggers one
//! scrape cycle against Domoticz, so exposed values are never older than the
//! scrape that returned them.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with a link to the metrics path
//! - `GET {metrics_path}` - Prometheus metrics in text format (default `/metrics`)
//! - `POST {push_path}` - Webhook receiver for Domoticz pushes (default `/domoticz`)
//! - `GET /health` - 200 if the last scrape completed, 503 otherwise
//!
//! # Error Handling
//!
//! A failed scrape still answers 200 with whatever samples were recorded, and
//! sets `domoticz_up` to 0. Scrapes are serialized so concurrent requests
//! cannot interleave their reset and record steps.

use crate::collectors::{self, CollectionContext, CollectionStatus};
use crate::config::{Config, HEALTH_PATH};
use crate::domoticz::{DomoticzClient, MetricEnvelope};
use crate::error::ExporterError;
use crate::metrics::MetricsCollector;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: MetricsCollector,
    client: Arc<DomoticzClient>,
    scrape_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Validates the configuration and builds the Domoticz client
    ///
    /// Any error here is a startup configuration error.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let client = DomoticzClient::new(&config.domoticz)?;
        info!(
            "Setup Domoticz exporter using devices: {}",
            config.domoticz.device_ids.join(",")
        );

        Ok(Self {
            config: Arc::new(config),
            metrics: MetricsCollector::new()?,
            client: Arc::new(client),
            scrape_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Runs one scrape cycle and updates `domoticz_up`
    pub async fn scrape(&self) -> CollectionStatus {
        let _guard = self.scrape_lock.lock().await;
        self.run_cycle().await
    }

    /// Runs one scrape cycle and renders the registry before another cycle can start
    pub async fn scrape_and_render(&self) -> anyhow::Result<String> {
        let _guard = self.scrape_lock.lock().await;
        self.run_cycle().await;
        self.metrics.render()
    }

    async fn run_cycle(&self) -> CollectionStatus {
        self.metrics.reset_devices();

        let ctx = CollectionContext {
            client: &self.client,
            metrics: &self.metrics,
            config: &self.config.scrape,
            device_ids: &self.config.domoticz.device_ids,
        };

        let status = match collectors::collect_device_metrics(&ctx).await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to collect metrics: {}", e);
                CollectionStatus::Failed
            }
        };

        match status {
            CollectionStatus::Success => self.metrics.up.set(1.0),
            CollectionStatus::Failed => self.metrics.up.set(0.0),
        }
        status
    }
}

/// Builds the exporter router for an already validated state
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.metrics_path.clone();
    let push_path = state.config.server.push_path.clone();

    Router::new()
        .route("/", get(root_handler))
        .route(&metrics_path, get(metrics_handler))
        .route(&push_path, post(push_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let metrics_path = config.server.metrics_path.clone();

    let state = AppState::new(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}{}", addr, metrics_path);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Domoticz Exporter</title></head>
<body>
<h1>Domoticz Exporter</h1>
<p><a href="{}">Metrics</a></p>
</body>
</html>"#,
        state.config.server.metrics_path
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.scrape_and_render().await {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Receives a pushed Domoticz event
///
/// The payload is decoded and logged only; no exported metric changes.
pub async fn push_handler(body: Bytes) -> StatusCode {
    debug!("Receive Domoticz push");

    match serde_json::from_slice::<MetricEnvelope>(&body) {
        Ok(envelope) => {
            let idx = envelope.idx().unwrap_or_else(|| "-".to_string());
            let name = envelope.name().unwrap_or_else(|| "-".to_string());
            debug!(
                idx = %idx,
                name = %name,
                fields = envelope.fields.len(),
                "Domoticz metric received"
            );
            StatusCode::OK
        }
        Err(e) => {
            warn!("Error decoding Domoticz push request: {}", e);
            StatusCode::BAD_REQUEST
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let up_value = state.metrics.up.get();

    if up_value > 0.0 {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Domoticz unreachable")
    }
}
