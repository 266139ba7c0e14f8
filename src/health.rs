//! Liveness endpoint
//!
//! Hosting platforms poll `GET /` to check the process is up.

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tracing::{error, info};

pub const LIVENESS_BODY: &str = "Bot is running...";

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

pub fn router() -> Router {
    Router::new().route("/", get(liveness))
}

/// Serve the liveness endpoint on `port` in the background
///
/// Bind or serve failures are logged; the bot keeps running without it.
pub fn spawn(port: u16) {
    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind liveness endpoint on {addr}: {e}");
                return;
            }
        };

        info!("Server is running on port {port}");
        if let Err(e) = axum::serve(listener, router()).await {
            error!("Liveness endpoint stopped: {e}");
        }
    });
}
