//! Pure scoring helpers: reading answer-key matching and speaking score
//! extraction from evaluator feedback.

use std::collections::HashMap;
use std::hash::Hash;

use crate::protocol::ReadingScoreOut;

/// Shown when the evaluator's feedback carries no usable score line.
pub const SCORE_NOT_AVAILABLE: &str = "N/A";

const SCORE_MARKER: &str = "Overall Score:";

/// Count answers that match the key. Only keys of `correct` are considered;
/// extra keys in `user` are ignored, so `score <= total` always holds.
pub fn score_reading<K, V>(user: &HashMap<K, V>, correct: &HashMap<K, V>) -> ReadingScoreOut
where
  K: Eq + Hash,
  V: PartialEq,
{
  let score = correct
    .iter()
    .filter(|(qid, key)| user.get(*qid) == Some(*key))
    .count();
  ReadingScoreOut { score, total: correct.len() }
}

/// Find the first line containing `Overall Score:` and return the value
/// before the `/`, e.g. `"Overall Score: 3/4"` -> `Some("3")`.
pub fn extract_overall_score(feedback: &str) -> Option<&str> {
  let line = feedback.lines().find(|l| l.contains(SCORE_MARKER))?;
  let after_colon = line.split(':').nth(1)?.trim();
  let value = after_colon.split('/').next()?.trim();
  if value.is_empty() { None } else { Some(value) }
}

pub fn overall_score_or_na(feedback: &str) -> String {
  extract_overall_score(feedback)
    .unwrap_or(SCORE_NOT_AVAILABLE)
    .to_string()
}
