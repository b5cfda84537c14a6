//! Quizly · AI Quiz Backend
//!
//! - Axum HTTP API (quiz generation, daily levels, currentQuiz hand-off)
//! - WebSocket play loop with a server-side countdown
//! - Optional Gemini integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   BIND_ADDR        : IP to bind (default 127.0.0.1; single local user)
//!   GEMINI_API_KEY   : enables quiz generation if present
//!   GEMINI_BASE_URL  : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL     : default "gemini-2.0-flash"
//!   QUIZ_CONFIG_PATH : path to TOML config (prompts + limits)
//!   QUIZ_STORE_PATH  : JSON file for the local cache (in-memory if unset)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod clock;
mod config;
mod domain;
mod error;
mod gemini;
mod generator;
mod levels;
mod logic;
mod orchestrator;
mod play;
mod protocol;
mod routes;
mod state;
mod storage;
mod telemetry;
mod util;

#[cfg(test)]
mod testing;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: config, local cache, Gemini client, orchestrator.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  let ip: IpAddr = std::env::var("BIND_ADDR")
    .ok()
    .and_then(|a| a.parse().ok())
    .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
  let port = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .unwrap_or(3000);
  let addr = SocketAddr::new(ip, port);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizly_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quizly_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "quizly_backend", error = %e, "Could not listen for ctrl-c; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "quizly_backend", "Shutdown signal received");
}
