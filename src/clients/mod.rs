//! Clients for the two external services, behind small traits so handlers can
//! be exercised without the network.
//!
//! - `ContentGenerator`: one prompt in, raw model text out (Vertex AI Gemini).
//! - `Transcriber`: audio bytes in, finished transcript out (AssemblyAI).

use async_trait::async_trait;
use serde::Deserialize;

pub mod assemblyai;
pub mod gemini;

pub use assemblyai::{AssemblyAi, Transcript, TranscriptStatus};
pub use gemini::VertexGemini;

pub const USER_AGENT: &str = "lingoleap-backend/0.1";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  #[error("{0} is not configured")]
  NotConfigured(&'static str),
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("{service} HTTP {status}: {message}")]
  Status {
    service: &'static str,
    status: u16,
    message: String,
  },
  #[error("unexpected response: {0}")]
  Malformed(String),
  #[error("timed out waiting for {0}")]
  Timeout(&'static str),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
  /// Send a single user prompt and return the model's text reply.
  async fn generate(&self, prompt: &str) -> Result<String, ClientError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
  /// Transcribe an audio file. Returns once the service has reached a final
  /// status; a service-side failure comes back as `TranscriptStatus::Error`,
  /// not as `Err`.
  async fn transcribe(&self, audio: Vec<u8>) -> Result<Transcript, ClientError>;
}

/// Try to extract a clean error message from a JSON error body. Google APIs
/// use `{"error": {"message": ...}}`, AssemblyAI uses `{"error": "..."}`.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum EWrap {
    Nested { error: EObj },
    Flat { error: String },
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  match serde_json::from_str::<EWrap>(body) {
    Ok(EWrap::Nested { error }) => Some(error.message),
    Ok(EWrap::Flat { error }) => Some(error),
    Err(_) => None,
  }
}

/// Turn a non-2xx response into `ClientError::Status`, keeping the service's
/// own message when it sent one.
pub(crate) async fn status_error(service: &'static str, res: reqwest::Response) -> ClientError {
  let status = res.status().as_u16();
  let body = res.text().await.unwrap_or_default();
  let message = extract_error_message(&body).unwrap_or(body);
  ClientError::Status { service, status, message }
}
