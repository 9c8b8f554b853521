//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the decision handler
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::decision::decision_handler;
use crate::lifecycle::startup::Gateway;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active gateway, replaced wholesale on reload.
    pub gateway: Arc<ArcSwap<Gateway>>,
}

/// HTTP server for the decision service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(gateway: Arc<ArcSwap<Gateway>>) -> Self {
        let state = AppState { gateway };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(decision_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
