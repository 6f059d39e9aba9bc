//! HTTP front end: the assistant (or a test harness) posts raw directives to `/`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::dispatch::Dispatcher;
use crate::error::Result;

pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", post(handle_directive))
        .route("/health", get(health))
        .with_state(dispatcher)
}

async fn handle_directive(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(directive): Json<Value>,
) -> Json<Value> {
    Json(dispatcher.handle(&directive).await)
}

async fn health(State(dispatcher): State<Arc<Dispatcher>>) -> (StatusCode, Json<Value>) {
    let healthy = dispatcher.is_healthy().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({ "healthy": healthy, "hub": dispatcher.hub().base_url() })),
    )
}

pub async fn serve(dispatcher: Arc<Dispatcher>, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening for directives");

    axum::serve(listener, create_router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
