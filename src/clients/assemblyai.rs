//! AssemblyAI v2 transcription client: upload, create transcript, poll.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{status_error, ClientError, Transcriber};
use crate::config::AssemblyAiConfig;

const BASE_URL: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(3);
const SERVICE: &str = "AssemblyAI";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
  Queued,
  Processing,
  Completed,
  Error,
  #[serde(other)]
  Unknown,
}

impl TranscriptStatus {
  pub fn is_final(self) -> bool {
    matches!(self, TranscriptStatus::Completed | TranscriptStatus::Error)
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Transcript {
  pub id: String,
  pub status: TranscriptStatus,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub error: Option<String>,
}

#[derive(Clone)]
pub struct AssemblyAi {
  client: reqwest::Client,
  api_key: Option<String>,
  polling_deadline: Duration,
}

impl AssemblyAi {
  pub fn new(cfg: &AssemblyAiConfig, timeout: Duration) -> Result<Self, ClientError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      polling_deadline: cfg.polling_deadline,
    })
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }

  async fn upload(&self, api_key: &str, audio: Vec<u8>) -> Result<String, ClientError> {
    #[derive(Deserialize)]
    struct UploadResponse {
      upload_url: String,
    }

    let res = self
      .client
      .post(format!("{BASE_URL}/upload"))
      .header(USER_AGENT, super::USER_AGENT)
      .header(AUTHORIZATION, api_key)
      .header(CONTENT_TYPE, "application/octet-stream")
      .body(audio)
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(status_error(SERVICE, res).await);
    }
    let body: UploadResponse = res.json().await?;
    Ok(body.upload_url)
  }

  async fn create(&self, api_key: &str, audio_url: &str) -> Result<Transcript, ClientError> {
    #[derive(Serialize)]
    struct CreateRequest<'a> {
      audio_url: &'a str,
    }

    let res = self
      .client
      .post(format!("{BASE_URL}/transcript"))
      .header(USER_AGENT, super::USER_AGENT)
      .header(AUTHORIZATION, api_key)
      .json(&CreateRequest { audio_url })
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(status_error(SERVICE, res).await);
    }
    Ok(res.json().await?)
  }

  async fn fetch(&self, api_key: &str, id: &str) -> Result<Transcript, ClientError> {
    let res = self
      .client
      .get(format!("{BASE_URL}/transcript/{id}"))
      .header(USER_AGENT, super::USER_AGENT)
      .header(AUTHORIZATION, api_key)
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(status_error(SERVICE, res).await);
    }
    Ok(res.json().await?)
  }
}

#[async_trait]
impl Transcriber for AssemblyAi {
  #[instrument(target = "transcription", level = "info", skip(self, audio), fields(audio_bytes = audio.len()))]
  async fn transcribe(&self, audio: Vec<u8>) -> Result<Transcript, ClientError> {
    let api_key = self.api_key.as_deref().ok_or(ClientError::NotConfigured("ASSEMBLYAI_API_KEY"))?;
    let start = Instant::now();

    let audio_url = self.upload(api_key, audio).await?;
    debug!(target: "transcription", elapsed = ?start.elapsed(), "Audio uploaded");

    let mut transcript = self.create(api_key, &audio_url).await?;
    info!(target: "transcription", transcript_id = %transcript.id, status = ?transcript.status, "Transcript created");

    while !transcript.status.is_final() {
      if start.elapsed() >= self.polling_deadline {
        warn!(target: "transcription", transcript_id = %transcript.id, elapsed = ?start.elapsed(), "Transcription polling deadline reached");
        return Err(ClientError::Timeout("transcript"));
      }
      tokio::time::sleep(POLL_INTERVAL).await;
      transcript = self.fetch(api_key, &transcript.id).await?;
      debug!(target: "transcription", transcript_id = %transcript.id, status = ?transcript.status, "Polled transcript");
    }

    info!(
      target: "transcription",
      transcript_id = %transcript.id,
      status = ?transcript.status,
      text_len = transcript.text.as_deref().map(str::len).unwrap_or(0),
      elapsed = ?start.elapsed(),
      "Transcription finished"
    );
    Ok(transcript)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_transcript_statuses() {
    let done: Transcript =
      serde_json::from_str(r#"{"id": "t1", "status": "completed", "text": "I think cities are better.", "words": []}"#).unwrap();
    assert_eq!(done.status, TranscriptStatus::Completed);
    assert!(done.status.is_final());
    assert_eq!(done.text.as_deref(), Some("I think cities are better."));

    let failed: Transcript =
      serde_json::from_str(r#"{"id": "t2", "status": "error", "text": null, "error": "File does not appear to contain audio."}"#).unwrap();
    assert_eq!(failed.status, TranscriptStatus::Error);
    assert_eq!(failed.error.as_deref(), Some("File does not appear to contain audio."));

    let queued: Transcript = serde_json::from_str(r#"{"id": "t3", "status": "queued"}"#).unwrap();
    assert!(!queued.status.is_final());

    let odd: Transcript = serde_json::from_str(r#"{"id": "t4", "status": "throttled"}"#).unwrap();
    assert_eq!(odd.status, TranscriptStatus::Unknown);
    assert!(!odd.status.is_final());
  }

  #[tokio::test]
  async fn missing_api_key_fails_before_any_request() {
    let cfg = AssemblyAiConfig { api_key: None, polling_deadline: Duration::from_secs(1) };
    let client = AssemblyAi::new(&cfg, Duration::from_secs(5)).unwrap();
    assert!(!client.is_configured());
    let err = client.transcribe(vec![1, 2, 3]).await.unwrap_err();
    assert!(matches!(err, ClientError::NotConfigured("ASSEMBLYAI_API_KEY")));
  }
}
