//! Configuration: process settings from the environment (`AppConfig`) and the
//! optional TOML content file with prompt overrides and a topic bank
//! (`ContentConfig`).
//!
//! Everything is read once at startup and handed to the pieces that need it;
//! no module reads the environment at request time.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for environment variable {0}: {1}")]
  InvalidValue(String, String),
}

/// Credentials and project settings for the Vertex AI Gemini client.
#[derive(Clone, Debug, Default)]
pub struct VertexConfig {
  pub project_id: Option<String>,
  pub access_token: Option<String>,
}

/// Credentials for the AssemblyAI transcription client.
#[derive(Clone, Debug, Default)]
pub struct AssemblyAiConfig {
  pub api_key: Option<String>,
  pub polling_deadline: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub bind_address: SocketAddr,
  pub database_path: PathBuf,
  /// `None` means "generate a random one for this process".
  pub jwt_secret: Option<String>,
  pub access_token_ttl: Duration,
  pub refresh_token_ttl: Duration,
  pub vertex: VertexConfig,
  pub assemblyai: AssemblyAiConfig,
  pub http_timeout: Duration,
  pub max_audio_bytes: usize,
  pub content_config_path: Option<PathBuf>,
}

impl AppConfig {
  /// Load `.env` (if any) and read the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build the configuration from an arbitrary key lookup. Empty values count
  /// as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port: u16 = parse_or(&get, "PORT", 3000)?;
    let bind_address = SocketAddr::from(([0, 0, 0, 0], port));

    let database_path = get("DATABASE_PATH")
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from("lingoleap.db"));

    let access_token_ttl = Duration::from_secs(parse_or(&get, "ACCESS_TOKEN_TTL_SECS", 300)?);
    let refresh_token_ttl = Duration::from_secs(parse_or(&get, "REFRESH_TOKEN_TTL_SECS", 86_400)?);
    let http_timeout = Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 120)?);
    let polling_deadline = Duration::from_secs(parse_or(&get, "TRANSCRIPTION_TIMEOUT_SECS", 300)?);
    let max_audio_bytes: usize = parse_or(&get, "MAX_AUDIO_BYTES", 25 * 1024 * 1024)?;

    Ok(Self {
      bind_address,
      database_path,
      jwt_secret: get("JWT_SECRET"),
      access_token_ttl,
      refresh_token_ttl,
      vertex: VertexConfig {
        project_id: get("GCP_PROJECT_ID"),
        access_token: get("GCP_ACCESS_TOKEN"),
      },
      assemblyai: AssemblyAiConfig {
        api_key: get("ASSEMBLYAI_API_KEY"),
        polling_deadline,
      },
      http_timeout,
      max_audio_bytes,
      content_config_path: get("LINGOLEAP_CONFIG_PATH").map(PathBuf::from),
    })
  }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
  G: Fn(&str) -> Option<String>,
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match get(key) {
    None => Ok(default),
    Some(raw) => raw
      .parse::<T>()
      .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("'{raw}': {e}"))),
  }
}

/// Optional TOML content file: prompt overrides plus a topic bank used to seed
/// empty topic tables.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub reading_tasks: Vec<ReadingTaskCfg>,
  #[serde(default)]
  pub speaking_tasks: Vec<SpeakingTaskCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReadingTaskCfg {
  pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpeakingTaskCfg {
  pub topic_theme: String,
}

/// Prompt templates sent to the model. `{topic}`, `{theme}` and `{transcript}`
/// are substituted with `fill_template`; other braces are passed through.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub reading_generation: String,
  pub speaking_generation: String,
  pub speaking_evaluation: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      reading_generation: DEFAULT_READING_GENERATION.into(),
      speaking_generation: DEFAULT_SPEAKING_GENERATION.into(),
      speaking_evaluation: DEFAULT_SPEAKING_EVALUATION.into(),
    }
  }
}

const DEFAULT_READING_GENERATION: &str = r#"You are a content creator for the TOEFL exam. Your task is to generate a complete reading test based on a given topic.

Topic: "{topic}"

Instructions:
1. Generate a 500-600 word academic passage about the topic. The passage should be well-structured with clear paragraphs and suitable for a university-level reading test.
2. Based ONLY on the passage you just generated, create 10 multiple-choice questions that test reading comprehension, vocabulary in context, and inference.
3. For each question, provide four options labeled "A", "B", "C", and "D".
4. One option must be clearly the correct answer based on the passage. The other three should be plausible but incorrect distractors.
5. Return the entire output as a single, valid JSON object. Do not include any text or markdown formatting before or after the JSON object.

The JSON object must have the following structure:
{
  "title": "{topic}",
  "passage": "The full text of the generated passage...",
  "questions": [
    {
      "id": 1,
      "question_text": "The first question text...",
      "options": {
        "A": "Option A text...",
        "B": "Option B text...",
        "C": "Option C text...",
        "D": "Option D text..."
      },
      "correct_answer_key": "C"
    },
    ... (9 more question objects)
  ]
}"#;

const DEFAULT_SPEAKING_GENERATION: &str = r#"You are a TOEFL content creator. Based on the theme '{theme}', generate a single, specific speaking prompt suitable for a TOEFL Independent Speaking task.
The prompt should ask the user to state an opinion, describe something, or compare two things, and require them to use personal examples.
Return the output as a single JSON object with the key "topic". Example: {"topic": "Your generated question here."}"#;

const DEFAULT_SPEAKING_EVALUATION: &str = r#"You are a TOEFL speaking evaluator. Assess the following spoken response using the TOEFL Independent Speaking rubric.

The speaking theme was: "{theme}"
The user's transcribed response is: "{transcript}"

Evaluate three areas and give each a score from 0 to 4 with one or two sentences of justification:
- Delivery (clarity, pace, fluency as reflected in the transcript)
- Language Use (grammar and vocabulary range and accuracy)
- Topic Development (relevance, organization, use of personal examples)

Then give two concrete suggestions for improvement.

Finish with a single line in exactly this form, with no other text on that line:
Overall Score: <score>/4"#;

/// Attempt to load `ContentConfig` from the given path. On any IO/parse error
/// the error is logged and `None` is returned so the server still starts with
/// defaults.
pub fn load_content_config(path: &std::path::Path) -> Option<ContentConfig> {
  let shown = path.display().to_string();
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<ContentConfig>(&s) {
      Ok(cfg) => {
        info!(
          target: "lingoleap_backend",
          path = %shown,
          reading_tasks = cfg.reading_tasks.len(),
          speaking_tasks = cfg.speaking_tasks.len(),
          "Loaded content config (TOML)"
        );
        Some(cfg)
      }
      Err(e) => {
        error!(target: "lingoleap_backend", path = %shown, error = %e, "Failed to parse TOML content config");
        None
      }
    },
    Err(e) => {
      error!(target: "lingoleap_backend", path = %shown, error = %e, "Failed to read TOML content config");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn defaults_when_environment_is_empty() {
    let cfg = AppConfig::from_lookup(lookup(&[])).expect("defaults should load");
    assert_eq!(cfg.bind_address.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.database_path, PathBuf::from("lingoleap.db"));
    assert_eq!(cfg.access_token_ttl, Duration::from_secs(300));
    assert_eq!(cfg.refresh_token_ttl, Duration::from_secs(86_400));
    assert_eq!(cfg.max_audio_bytes, 25 * 1024 * 1024);
    assert!(cfg.jwt_secret.is_none());
    assert!(cfg.vertex.project_id.is_none());
    assert!(cfg.assemblyai.api_key.is_none());
    assert!(cfg.content_config_path.is_none());
  }

  #[test]
  fn reads_credentials_and_overrides() {
    let cfg = AppConfig::from_lookup(lookup(&[
      ("PORT", "8080"),
      ("GCP_PROJECT_ID", "lingoleap-prod"),
      ("GCP_ACCESS_TOKEN", "ya29.token"),
      ("ASSEMBLYAI_API_KEY", "aai-key"),
      ("JWT_SECRET", "s3cret"),
      ("TRANSCRIPTION_TIMEOUT_SECS", "60"),
      ("LINGOLEAP_CONFIG_PATH", "/etc/lingoleap.toml"),
    ]))
    .expect("config should load");

    assert_eq!(cfg.bind_address.port(), 8080);
    assert_eq!(cfg.vertex.project_id.as_deref(), Some("lingoleap-prod"));
    assert_eq!(cfg.vertex.access_token.as_deref(), Some("ya29.token"));
    assert_eq!(cfg.assemblyai.api_key.as_deref(), Some("aai-key"));
    assert_eq!(cfg.assemblyai.polling_deadline, Duration::from_secs(60));
    assert_eq!(cfg.jwt_secret.as_deref(), Some("s3cret"));
    assert_eq!(cfg.content_config_path, Some(PathBuf::from("/etc/lingoleap.toml")));
  }

  #[test]
  fn blank_values_count_as_unset() {
    let cfg = AppConfig::from_lookup(lookup(&[("GCP_PROJECT_ID", "  "), ("PORT", "")])).unwrap();
    assert!(cfg.vertex.project_id.is_none());
    assert_eq!(cfg.bind_address.port(), 3000);
  }

  #[test]
  fn invalid_number_is_reported_with_its_variable() {
    let err = AppConfig::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap_err();
    match err {
      ConfigError::InvalidValue(var, _) => assert_eq!(var, "PORT"),
    }
  }

  #[test]
  fn content_config_parses_topics_and_partial_prompts() {
    let raw = r#"
      [prompts]
      speaking_generation = "Theme: {theme}. Reply with {\"topic\": \"...\"}"

      [[reading_tasks]]
      title = "The Water Cycle"

      [[speaking_tasks]]
      topic_theme = "Technology"
    "#;
    let cfg: ContentConfig = toml::from_str(raw).expect("valid toml");
    assert_eq!(cfg.reading_tasks.len(), 1);
    assert_eq!(cfg.reading_tasks[0].title, "The Water Cycle");
    assert_eq!(cfg.speaking_tasks[0].topic_theme, "Technology");
    assert!(cfg.prompts.speaking_generation.starts_with("Theme: {theme}"));
    assert_eq!(cfg.prompts.reading_generation, Prompts::default().reading_generation);
  }

  #[test]
  fn default_prompts_carry_their_placeholders() {
    let p = Prompts::default();
    assert!(p.reading_generation.contains("{topic}"));
    assert!(p.speaking_generation.contains("{theme}"));
    assert!(p.speaking_evaluation.contains("{theme}"));
    assert!(p.speaking_evaluation.contains("{transcript}"));
    assert!(p.speaking_evaluation.contains("Overall Score:"));
  }

  #[test]
  fn content_config_loads_from_disk_or_falls_back() {
    let dir = std::env::temp_dir().join(format!("lingoleap-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let good = dir.join("content.toml");
    std::fs::write(&good, "[[speaking_tasks]]\ntopic_theme = \"Travel\"\n").unwrap();
    let cfg = load_content_config(&good).expect("file parses");
    assert_eq!(cfg.speaking_tasks[0].topic_theme, "Travel");
    assert!(cfg.reading_tasks.is_empty());

    let broken = dir.join("broken.toml");
    std::fs::write(&broken, "[[reading_tasks]\ntitle = ").unwrap();
    assert!(load_content_config(&broken).is_none());
    assert!(load_content_config(&dir.join("missing.toml")).is_none());

    std::fs::remove_dir_all(&dir).ok();
  }
}
