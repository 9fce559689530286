//! Domain models: users, stored task topics, and the ephemeral content the
//! model generates for them.

use serde::{Deserialize, Serialize};

/// Stored user record. `password_hash` is a PHC string (Argon2id).
#[derive(Clone, Debug)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub password_hash: String,
}

/// Reading topic; `title` is what the passage is written about.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingTask {
  pub id: i64,
  pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeakingTask {
  pub id: i64,
  pub topic_theme: String,
}

/// Generated content (a reading test or a speaking prompt) exactly as the
/// model produced it. Never persisted: the client keeps the reading test and
/// sends the answer key back on submission.
pub type GeneratedObject = serde_json::Map<String, serde_json::Value>;

/// Outcome of transcribing and grading one spoken answer.
#[derive(Clone, Debug, Serialize)]
pub struct SpeakingEvaluation {
  pub feedback: String,
  pub score: String,
  pub transcript: String,
}
