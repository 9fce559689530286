//! LingoLeap · TOEFL Practice Backend
//!
//! - Axum HTTP API with JWT bearer auth (access + refresh pair)
//! - SQLite store for users and practice topics
//! - Reading tests and speaking prompts generated by Gemini on Vertex AI
//! - Spoken answers transcribed by AssemblyAI, then evaluated by the model
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables (also read from a `.env` file):
//!   PORT                       : u16 (default 3000)
//!   DATABASE_PATH              : SQLite file (default "lingoleap.db")
//!   JWT_SECRET                 : token signing secret; random per process if unset
//!   ACCESS_TOKEN_TTL_SECS      : default 300
//!   REFRESH_TOKEN_TTL_SECS     : default 86400
//!   GCP_PROJECT_ID             : Vertex AI project
//!   GCP_ACCESS_TOKEN           : OAuth bearer token for Vertex AI
//!   ASSEMBLYAI_API_KEY         : enables speech transcription
//!   HTTP_TIMEOUT_SECS          : outbound request timeout (default 120)
//!   TRANSCRIPTION_TIMEOUT_SECS : polling deadline per transcript (default 300)
//!   MAX_AUDIO_BYTES            : upload cap for speaking submissions
//!   LINGOLEAP_CONFIG_PATH      : path to TOML config (prompts + optional topic bank)
//!   LOG_LEVEL                  : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT                 : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod db;
mod error;
mod auth;
mod protocol;
mod sanitize;
mod scoring;
mod clients;
mod state;
mod logic;
mod routes;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env()?;

  // Shared state: database, token keys, prompts, model and transcription clients.
  let state = Arc::new(AppState::new(&config)?);

  // Build the HTTP router with routes, auth, CORS and tracing layers.
  let app = build_router(state);

  let listener = TcpListener::bind(config.bind_address).await?;
  info!(target: "lingoleap_backend", addr = %config.bind_address, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
