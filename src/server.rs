//! # Webhook Server
//!
//! An `axum` server exposing the webhook endpoint, a liveness probe and the
//! Prometheus scrape endpoint on a single listener. It stops accepting
//! connections when the shutdown channel fires and drains in-flight requests.

use crate::notification::manager::NotificationManager;
use crate::webhook::{process_webhook, WebhookResponse};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<NotificationManager>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub prom_handle: Option<PrometheusHandle>,
}

/// Builds the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(receive_webhook))
        .route("/webhook", post(receive_webhook))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> WebhookResponse {
    process_webhook(&body, &state.manager).await
}

async fn health() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prom_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics are disabled".to_string()),
    }
}

/// The webhook server, bound but not yet running.
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl WebhookServer {
    /// Creates a new `WebhookServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `state` - Shared state handed to every handler.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router: router(state),
            shutdown_rx,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until a shutdown signal is received.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_rx;
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Webhook server listening");
        }

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                // A dropped sender also means shutdown.
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                trace!("Webhook server received shutdown signal.");
            })
            .await;

        if let Err(e) = result {
            error!("Webhook server error: {}", e);
        }
        trace!("Webhook server task finished.");
    }
}
