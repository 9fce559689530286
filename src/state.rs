//! Application state shared by every handler.
//!
//! This module owns:
//!   - the SQLite credential/topic store
//!   - token signing keys
//!   - the prompt templates (from TOML or defaults)
//!   - the model and transcription clients, as trait objects

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::TokenKeys;
use crate::clients::{AssemblyAi, ContentGenerator, Transcriber, VertexGemini};
use crate::config::{load_content_config, AppConfig, Prompts};
use crate::db::Database;

pub struct AppState {
    pub db: Database,
    pub tokens: TokenKeys,
    pub prompts: Prompts,
    pub generator: Arc<dyn ContentGenerator>,
    pub transcriber: Arc<dyn Transcriber>,
    pub max_audio_bytes: usize,
}

impl AppState {
    /// Build state from config: load the content file, open and seed the
    /// database, construct the external clients.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let content = config
            .content_config_path
            .as_deref()
            .and_then(load_content_config);
        let prompts = content.as_ref().map(|c| c.prompts.clone()).unwrap_or_default();

        let db = Database::open(&config.database_path)?;
        db.seed_topics(content.as_ref())?;
        info!(
            target: "lingoleap_backend",
            reading_tasks = db.count_reading_tasks()?,
            speaking_tasks = db.count_speaking_tasks()?,
            "Startup topic inventory"
        );

        let gemini = VertexGemini::new(&config.vertex, config.http_timeout)?;
        if gemini.is_configured() {
            info!(
                target: "lingoleap_backend",
                model = crate::clients::gemini::GEMINI_MODEL,
                region = crate::clients::gemini::VERTEX_REGION,
                "Vertex AI generation enabled."
            );
        } else {
            warn!(target: "lingoleap_backend", "GCP_PROJECT_ID/GCP_ACCESS_TOKEN not set; generation requests will fail.");
        }

        let assemblyai = AssemblyAi::new(&config.assemblyai, config.http_timeout)?;
        if assemblyai.is_configured() {
            info!(target: "lingoleap_backend", "AssemblyAI transcription enabled.");
        } else {
            warn!(target: "lingoleap_backend", "ASSEMBLYAI_API_KEY not set; speaking submissions will fail.");
        }

        let tokens = TokenKeys::new(
            config.jwt_secret.as_deref(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        Ok(Self {
            db,
            tokens,
            prompts,
            generator: Arc::new(gemini),
            transcriber: Arc::new(assemblyai),
            max_audio_bytes: config.max_audio_bytes,
        })
    }
}
