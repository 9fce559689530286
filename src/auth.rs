//! Credentials and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Sessions are a pair of HS256
//! JWTs: a short-lived access token (required by the auth middleware) and a
//! longer-lived refresh token (accepted only by the refresh endpoint).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::protocol::{LoginIn, LoginOut, LoginUser, RefreshIn, RefreshOut, RegisterIn, UserOut};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid Credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing material and lifetimes, built once from `AppConfig`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    /// Use the configured secret, or a random per-process one when absent
    /// (tokens then stop validating after a restart).
    pub fn new(secret: Option<&str>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let secret = match secret {
            Some(s) => s.to_string(),
            None => {
                warn!(target: "auth", "JWT_SECRET not set; using a random secret for this process");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(64)
                    .map(char::from)
                    .collect()
            }
        };
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, user_id: i64, username: &str, token_type: TokenType) -> anyhow::Result<String> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let now = chrono::Utc::now();
        let ttl = chrono::Duration::from_std(ttl).context("token lifetime out of range")?;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).context("failed to sign token")
    }

    /// Validate signature, expiry and token type.
    pub fn verify(&self, token: &str, expected: TokenType) -> ApiResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| ApiError::Authentication(format!("Token is invalid or expired: {e}")))?;
        if data.claims.token_type != expected {
            return Err(ApiError::Authentication("Token has wrong type".into()));
        }
        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| anyhow::anyhow!("stored password hash is malformed: {e}"))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Field rules for registration. Returns the first problem found.
pub fn validate_registration(req: &RegisterIn) -> ApiResult<()> {
    let username = req.username.as_str();
    if username.is_empty() || username.chars().count() > 150 {
        return Err(ApiError::Validation("Username must be between 1 and 150 characters.".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ApiError::Validation(
            "Username may contain only letters, digits and @/./+/-/_ characters.".into(),
        ));
    }

    let password = req.password.as_str();
    if password.chars().count() < 8 {
        return Err(ApiError::Validation("Password must contain at least 8 characters.".into()));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("Password cannot be entirely numeric.".into()));
    }
    if password.eq_ignore_ascii_case(username) {
        return Err(ApiError::Validation("Password is too similar to the username.".into()));
    }

    if !is_plausible_email(&req.email) {
        return Err(ApiError::Validation("Enter a valid email address.".into()));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[instrument(level = "info", skip(state, req), fields(username = %req.username))]
pub async fn register_user(state: &AppState, req: RegisterIn) -> ApiResult<UserOut> {
    validate_registration(&req)?;

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Validation("A user with that username already exists.".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(&req.username, req.email.trim(), &password_hash)?
        .ok_or_else(|| ApiError::Validation("A user with that username already exists.".into()))?;

    info!(target: "auth", user_id = user.id, "User registered");
    Ok(UserOut { id: user.id, username: user.username, email: user.email })
}

#[instrument(level = "info", skip(state, req), fields(username = %req.username))]
pub async fn login_user(state: &AppState, req: LoginIn) -> ApiResult<LoginOut> {
    let Some(user) = state.db.get_user_by_username(&req.username)? else {
        info!(target: "auth", "Login rejected: unknown user");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.into()));
    };
    if !verify_password(&req.password, &user.password_hash)? {
        info!(target: "auth", user_id = user.id, "Login rejected: password mismatch");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.into()));
    }

    let refresh = state.tokens.issue(user.id, &user.username, TokenType::Refresh)?;
    let access = state.tokens.issue(user.id, &user.username, TokenType::Access)?;
    info!(target: "auth", user_id = user.id, "Login succeeded");
    Ok(LoginOut {
        refresh,
        access,
        user: LoginUser { id: user.id, username: user.username },
    })
}

#[instrument(level = "info", skip_all)]
pub async fn refresh_access(state: &AppState, req: RefreshIn) -> ApiResult<RefreshOut> {
    let claims = state.tokens.verify(&req.refresh, TokenType::Refresh)?;
    let user = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or_else(|| ApiError::Authentication("User no longer exists".into()))?;
    let access = state.tokens.issue(user.id, &user.username, TokenType::Access)?;
    Ok(RefreshOut { access })
}

/// Extract and validate the access token from the Authorization header; the
/// claims are stored in request extensions for handlers that need them.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Authentication("Authentication credentials were not provided.".into()))?;

    let claims = state.tokens.verify(token.trim(), TokenType::Access)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(Some("test-secret"), Duration::from_secs(300), Duration::from_secs(3600))
    }

    fn register(username: &str, password: &str, email: &str) -> RegisterIn {
        RegisterIn { username: username.into(), password: password.into(), email: email.into() }
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn access_token_verifies_as_access_only() {
        let keys = keys();
        let token = keys.issue(7, "alice", TokenType::Access).unwrap();
        let claims = keys.verify(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert!(matches!(keys.verify(&token, TokenType::Refresh), Err(ApiError::Authentication(_))));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenKeys::new(Some("another-secret"), Duration::from_secs(300), Duration::from_secs(300));
        let token = other.issue(1, "mallory", TokenType::Access).unwrap();
        assert!(matches!(keys().verify(&token, TokenType::Access), Err(ApiError::Authentication(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            username: "alice".into(),
            token_type: TokenType::Access,
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = keys.sign(&claims).unwrap();
        assert!(matches!(keys.verify(&token, TokenType::Access), Err(ApiError::Authentication(_))));
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&register("alice", "s3cure-pass", "alice@example.com")).is_ok());
        assert!(validate_registration(&register("", "s3cure-pass", "alice@example.com")).is_err());
        assert!(validate_registration(&register("al ice", "s3cure-pass", "alice@example.com")).is_err());
        assert!(validate_registration(&register("alice", "short", "alice@example.com")).is_err());
        assert!(validate_registration(&register("alice", "12345678", "alice@example.com")).is_err());
        assert!(validate_registration(&register("alice123", "ALICE123", "alice@example.com")).is_err());
        assert!(validate_registration(&register("alice", "s3cure-pass", "alice.example.com")).is_err());
        assert!(validate_registration(&register("alice", "s3cure-pass", "alice@localhost")).is_err());
        assert!(validate_registration(&register("alice", "s3cure-pass", "a@b@example.com")).is_err());
    }
}
