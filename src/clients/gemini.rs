//! Minimal Vertex AI Gemini client.
//!
//! We only call `generateContent` with a single user turn and return the
//! concatenated text of the first candidate. Model and region are pinned.
//! Calls are instrumented and log latency and token usage, not contents.
//!
//! NOTE: We never log the access token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{status_error, ClientError, ContentGenerator};
use crate::config::VertexConfig;

pub const GEMINI_MODEL: &str = "gemini-1.5-flash-001";
pub const VERTEX_REGION: &str = "us-central1";

#[derive(Clone)]
pub struct VertexGemini {
  client: reqwest::Client,
  project_id: Option<String>,
  access_token: Option<String>,
}

impl VertexGemini {
  pub fn new(cfg: &VertexConfig, timeout: Duration) -> Result<Self, ClientError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      project_id: cfg.project_id.clone(),
      access_token: cfg.access_token.clone(),
    })
  }

  pub fn is_configured(&self) -> bool {
    self.project_id.is_some() && self.access_token.is_some()
  }

  fn endpoint(project_id: &str) -> String {
    format!(
      "https://{VERTEX_REGION}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{VERTEX_REGION}/publishers/google/models/{GEMINI_MODEL}:generateContent"
    )
  }
}

#[async_trait]
impl ContentGenerator for VertexGemini {
  #[instrument(target = "generation", level = "info", skip(self, prompt), fields(model = GEMINI_MODEL, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, ClientError> {
    let project_id = self.project_id.as_deref().ok_or(ClientError::NotConfigured("GCP_PROJECT_ID"))?;
    let access_token = self.access_token.as_deref().ok_or(ClientError::NotConfigured("GCP_ACCESS_TOKEN"))?;

    let req = GenerateContentRequest {
      contents: vec![Content {
        role: "user".into(),
        parts: vec![PartReq { text: prompt.to_string() }],
      }],
    };

    let start = Instant::now();
    let res = self
      .client
      .post(Self::endpoint(project_id))
      .header(USER_AGENT, super::USER_AGENT)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", access_token))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let err = status_error("Vertex AI", res).await;
      error!(target: "generation", elapsed = ?start.elapsed(), error = %err, "Gemini call failed");
      return Err(err);
    }

    let body: GenerateContentResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        target: "generation",
        prompt_tokens = ?usage.prompt_token_count,
        completion_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }

    let text = body.first_text()?;
    info!(target: "generation", elapsed = ?start.elapsed(), reply_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<Content>,
}
#[derive(Serialize)]
struct Content {
  role: String,
  parts: Vec<PartReq>,
}
#[derive(Serialize)]
struct PartReq {
  text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  prompt_feedback: Option<PromptFeedback>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)]
  content: Option<CandidateContent>,
  #[serde(default)]
  finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<PartResp>,
}
#[derive(Deserialize)]
struct PartResp {
  #[serde(default)]
  text: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)]
  block_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)]
  prompt_token_count: Option<u32>,
  #[serde(default)]
  candidates_token_count: Option<u32>,
  #[serde(default)]
  total_token_count: Option<u32>,
}

impl GenerateContentResponse {
  /// Concatenated text parts of the first candidate. A blocked prompt or a
  /// candidate without text is reported as a malformed response.
  fn first_text(&self) -> Result<String, ClientError> {
    if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
      return Err(ClientError::Malformed(format!("prompt blocked: {reason}")));
    }
    let candidate = self
      .candidates
      .first()
      .ok_or_else(|| ClientError::Malformed("no candidates in model response".into()))?;
    let text: String = candidate
      .content
      .iter()
      .flat_map(|c| c.parts.iter())
      .filter_map(|p| p.text.as_deref())
      .collect();
    if text.trim().is_empty() {
      let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
      return Err(ClientError::Malformed(format!("model returned no text (finish reason: {reason})")));
    }
    Ok(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(body: &str) -> GenerateContentResponse {
    serde_json::from_str(body).expect("valid response json")
  }

  #[test]
  fn endpoint_pins_model_and_region() {
    let cfg = VertexConfig { project_id: Some("demo".into()), access_token: Some("t".into()) };
    let client = VertexGemini::new(&cfg, Duration::from_secs(5)).unwrap();
    assert!(client.is_configured());
    assert_eq!(
      VertexGemini::endpoint("demo"),
      "https://us-central1-aiplatform.googleapis.com/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-1.5-flash-001:generateContent"
    );
  }

  #[test]
  fn joins_text_parts_of_first_candidate() {
    let body = parse(
      r#"{
        "candidates": [
          {"content": {"role": "model", "parts": [{"text": "```json\n{\"topic\":"}, {"text": " \"x\"}\n```"}]},
           "finishReason": "STOP"},
          {"content": {"parts": [{"text": "ignored"}]}}
        ],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
      }"#,
    );
    assert_eq!(body.first_text().unwrap(), "```json\n{\"topic\": \"x\"}\n```");
    assert_eq!(body.usage_metadata.as_ref().and_then(|u| u.total_token_count), Some(15));
  }

  #[test]
  fn blocked_or_empty_responses_are_errors() {
    let blocked = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
    assert!(matches!(blocked.first_text(), Err(ClientError::Malformed(m)) if m.contains("SAFETY")));

    let empty = parse(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#);
    assert!(matches!(empty.first_text(), Err(ClientError::Malformed(m)) if m.contains("MAX_TOKENS")));

    let none = parse(r#"{}"#);
    assert!(none.first_text().is_err());
  }

  #[tokio::test]
  async fn missing_project_fails_before_any_request() {
    let client = VertexGemini::new(&VertexConfig::default(), Duration::from_secs(5)).unwrap();
    assert!(!client.is_configured());
    let err = client.generate("hello").await.unwrap_err();
    assert!(matches!(err, ClientError::NotConfigured("GCP_PROJECT_ID")));
  }
}
