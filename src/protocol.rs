//! Public request/response structs for the HTTP API (serde ready).
//! Field names follow what the frontend sends and expects, including the
//! camelCase answer maps on reading submission.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

//
// Auth
//

#[derive(Deserialize)]
pub struct RegisterIn {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Public representation of a user.
#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginIn {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOut {
    pub refresh: String,
    pub access: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
}

#[derive(Deserialize)]
pub struct RefreshIn {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshOut {
    pub access: String,
}

//
// Reading submission
//

/// Answer values are compared as raw JSON values, so `"A"` and `"A"` match but
/// `"A"` and `null` do not. Missing maps default to empty.
#[derive(Debug, Default, Deserialize)]
pub struct ReadingSubmissionIn {
    #[serde(default, rename = "userAnswers")]
    pub user_answers: HashMap<String, serde_json::Value>,
    #[serde(default, rename = "correctAnswers")]
    pub correct_answers: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReadingScoreOut {
    pub score: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
