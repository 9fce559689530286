//! HTTP endpoint handlers. These are thin wrappers that forward to auth and
//! core logic; every failure leaves as an `ApiError`.

use std::sync::Arc;

use axum::{
  extract::{
    multipart::{MultipartError, MultipartRejection},
    rejection::{JsonRejection, PathRejection},
    Multipart, Path, State,
  },
  http::StatusCode,
  response::IntoResponse,
  Extension, Json,
};
use tracing::{debug, info, instrument};

use crate::auth::{self, Claims};
use crate::domain::{GeneratedObject, ReadingTask, SpeakingEvaluation, SpeakingTask};
use crate::error::{ApiError, ApiResult};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

const AUDIO_FIELD: &str = "audio";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

// --- Auth ---

pub async fn http_register(
  State(state): State<Arc<AppState>>,
  body: Result<Json<RegisterIn>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
  let Json(body) = body?;
  let user = auth::register_user(&state, body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

pub async fn http_login(
  State(state): State<Arc<AppState>>,
  body: Result<Json<LoginIn>, JsonRejection>,
) -> ApiResult<Json<LoginOut>> {
  let Json(body) = body?;
  Ok(Json(auth::login_user(&state, body).await?))
}

pub async fn http_refresh(
  State(state): State<Arc<AppState>>,
  body: Result<Json<RefreshIn>, JsonRejection>,
) -> ApiResult<Json<RefreshOut>> {
  let Json(body) = body?;
  Ok(Json(auth::refresh_access(&state, body).await?))
}

// --- Topics ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_reading_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ReadingTask>>> {
  let tasks = state.db.list_reading_tasks()?;
  debug!(count = tasks.len(), "Reading topics listed");
  Ok(Json(tasks))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_speaking_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<SpeakingTask>>> {
  let tasks = state.db.list_speaking_tasks()?;
  debug!(count = tasks.len(), "Speaking topics listed");
  Ok(Json(tasks))
}

// --- Generation ---

#[instrument(level = "info", skip_all, fields(user = %claims.username))]
pub async fn http_generate_reading(
  State(state): State<Arc<AppState>>,
  Extension(claims): Extension<Claims>,
  path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<GeneratedObject>> {
  let Path(task_id) = path?;
  Ok(Json(generate_reading_test(&state, task_id).await?))
}

#[instrument(level = "info", skip_all, fields(user = %claims.username))]
pub async fn http_generate_speaking(
  State(state): State<Arc<AppState>>,
  Extension(claims): Extension<Claims>,
  path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<GeneratedObject>> {
  let Path(task_id) = path?;
  Ok(Json(generate_speaking_prompt(&state, task_id).await?))
}

// --- Submissions ---

#[instrument(level = "info", skip_all, fields(user = %claims.username))]
pub async fn http_submit_reading(
  Extension(claims): Extension<Claims>,
  body: Result<Json<ReadingSubmissionIn>, JsonRejection>,
) -> ApiResult<Json<ReadingScoreOut>> {
  let Json(body) = body?;
  Ok(Json(score_reading_submission(&body)))
}

/// Multipart upload with an `audio` part. A missing or empty part, or a body
/// that is not multipart at all, is reported as "no audio" before anything
/// external is called. Bodies over the upload cap are rejected with 413.
#[instrument(level = "info", skip_all, fields(user = %claims.username))]
pub async fn http_submit_speaking(
  State(state): State<Arc<AppState>>,
  Extension(claims): Extension<Claims>,
  path: Result<Path<i64>, PathRejection>,
  multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SpeakingEvaluation>> {
  let Path(task_id) = path?;
  let audio = match multipart {
    Ok(mut m) => read_audio_field(&mut m, state.max_audio_bytes).await?,
    Err(rejection) => {
      info!(error = %rejection, "Speaking submission without a multipart body");
      Vec::new()
    }
  };
  Ok(Json(evaluate_speaking(&state, task_id, audio).await?))
}

async fn read_audio_field(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<Vec<u8>> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| upload_error(e, max_bytes))?
  {
    if field.name() == Some(AUDIO_FIELD) {
      let bytes = field.bytes().await.map_err(|e| upload_error(e, max_bytes))?;
      return Ok(bytes.to_vec());
    }
  }
  Ok(Vec::new())
}

fn upload_error(e: MultipartError, max_bytes: usize) -> ApiError {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    ApiError::PayloadTooLarge(format!("Audio upload exceeds the {max_bytes}-byte limit."))
  } else {
    ApiError::Validation(format!("Could not read audio upload: {}", e.body_text()))
  }
}
