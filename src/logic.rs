//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Generating a reading test for a stored topic
//!   - Generating a speaking prompt for a stored theme
//!   - Scoring a reading submission against its answer key
//!   - Transcribing and evaluating a spoken answer

use tracing::{error, info, instrument, warn};

use crate::clients::{ClientError, TranscriptStatus};
use crate::domain::{GeneratedObject, SpeakingEvaluation};
use crate::error::{ApiError, ApiResult};
use crate::protocol::{ReadingScoreOut, ReadingSubmissionIn};
use crate::sanitize::parse_model_object;
use crate::scoring::{overall_score_or_na, score_reading};
use crate::state::AppState;
use crate::util::{fill_template, trunc_for_log};

fn generation_failed(e: ClientError) -> ApiError {
  error!(target: "generation", error = %e, "Model call failed");
  ApiError::Generation(format!("Failed to generate task: {e}"))
}

/// The reply is returned exactly as the model wrote it; question and option
/// counts are not checked.
#[instrument(level = "info", skip(state))]
pub async fn generate_reading_test(state: &AppState, task_id: i64) -> ApiResult<GeneratedObject> {
  let task = state
    .db
    .get_reading_task(task_id)?
    .ok_or_else(|| ApiError::NotFound("Task topic not found".into()))?;

  let prompt = fill_template(&state.prompts.reading_generation, &[("topic", task.title.as_str())]);
  let raw = state.generator.generate(&prompt).await.map_err(generation_failed)?;

  let test = parse_model_object(&raw).map_err(|e| {
    warn!(target: "generation", %task_id, reply = %trunc_for_log(&raw, 200), "Reading test reply did not parse");
    e
  })?;
  let questions = test.get("questions").and_then(|q| q.as_array()).map_or(0, Vec::len);
  info!(target: "generation", %task_id, questions, "Reading test generated");
  Ok(test)
}

#[instrument(level = "info", skip(state))]
pub async fn generate_speaking_prompt(state: &AppState, task_id: i64) -> ApiResult<GeneratedObject> {
  let task = state
    .db
    .get_speaking_task(task_id)?
    .ok_or_else(|| ApiError::NotFound("Task theme not found".into()))?;

  let prompt = fill_template(&state.prompts.speaking_generation, &[("theme", task.topic_theme.as_str())]);
  let raw = state.generator.generate(&prompt).await.map_err(generation_failed)?;

  let out = parse_model_object(&raw).map_err(|e| {
    warn!(target: "generation", %task_id, reply = %trunc_for_log(&raw, 200), "Speaking prompt reply did not parse");
    e
  })?;
  info!(target: "generation", %task_id, has_topic = out.contains_key("topic"), "Speaking prompt generated");
  Ok(out)
}

/// Stateless: the answer key comes from the caller, exactly as it was handed
/// out with the generated test.
#[instrument(level = "info", skip(body), fields(answered = body.user_answers.len(), total = body.correct_answers.len()))]
pub fn score_reading_submission(body: &ReadingSubmissionIn) -> ReadingScoreOut {
  let out = score_reading(&body.user_answers, &body.correct_answers);
  info!(score = out.score, total = out.total, "Reading submission scored");
  out
}

#[instrument(level = "info", skip(state, audio), fields(audio_bytes = audio.len()))]
pub async fn evaluate_speaking(state: &AppState, task_id: i64, audio: Vec<u8>) -> ApiResult<SpeakingEvaluation> {
  if audio.is_empty() {
    return Err(ApiError::Validation("No audio file provided.".into()));
  }

  let task = state
    .db
    .get_speaking_task(task_id)?
    .ok_or_else(|| ApiError::NotFound("Task not found".into()))?;

  let transcript = state.transcriber.transcribe(audio).await.map_err(|e| {
    ApiError::Internal(anyhow::Error::new(e).context("transcription request failed"))
  })?;

  if transcript.status == TranscriptStatus::Error {
    let message = transcript.error.unwrap_or_else(|| "Transcription failed.".into());
    warn!(target: "transcription", transcript_id = %transcript.id, %message, "Transcription reported an error");
    return Err(ApiError::Transcription(message));
  }
  let text = match transcript.text {
    Some(t) if !t.trim().is_empty() => t,
    _ => return Err(ApiError::Transcription("Could not transcribe audio.".into())),
  };

  let prompt = fill_template(
    &state.prompts.speaking_evaluation,
    &[("theme", task.topic_theme.as_str()), ("transcript", text.as_str())],
  );
  let feedback = state.generator.generate(&prompt).await.map_err(|e| {
    error!(target: "generation", error = %e, "Speaking evaluation call failed");
    ApiError::Generation(format!("Failed to evaluate response: {e}"))
  })?;

  let score = overall_score_or_na(&feedback);
  info!(target: "generation", %task_id, %score, transcript_len = text.len(), "Speaking response evaluated");
  Ok(SpeakingEvaluation { feedback, score, transcript: text })
}
