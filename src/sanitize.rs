//! Cleanup of model replies before structural parsing.
//!
//! Models asked for "only JSON" still like to wrap it in a markdown fence
//! (```` ```json ... ``` ````). We trim, drop one opening fence (with its
//! optional language tag) and one closing fence, and parse what remains.
//! The parsed object is handed back as-is; only "is it a JSON object" is checked.

use serde_json::Value;

use crate::domain::GeneratedObject;
use crate::error::ApiError;

const FENCE: &str = "```";

/// Strip surrounding whitespace and at most one leading and one trailing
/// code-fence marker.
pub fn strip_code_fences(raw: &str) -> &str {
  let mut s = raw.trim();

  if let Some(rest) = s.strip_prefix(FENCE) {
    // Drop the language tag ("json", "JSON", ...) that follows the opening fence.
    let tag_len = rest
      .find(|c: char| !c.is_ascii_alphanumeric())
      .unwrap_or(rest.len());
    s = &rest[tag_len..];
  }
  if let Some(rest) = s.trim_end().strip_suffix(FENCE) {
    s = rest;
  }

  s.trim()
}

/// Sanitize and parse a model reply into a JSON object. Malformed JSON, or
/// JSON that is not an object, is a generation failure.
pub fn parse_model_object(raw: &str) -> Result<GeneratedObject, ApiError> {
  let cleaned = strip_code_fences(raw);
  match serde_json::from_str::<Value>(cleaned) {
    Ok(Value::Object(obj)) => Ok(obj),
    Ok(other) => Err(ApiError::Generation(format!(
      "Failed to generate task: model returned {} instead of a JSON object",
      json_kind(&other)
    ))),
    Err(e) => Err(ApiError::Generation(format!(
      "Failed to generate task: model returned malformed JSON ({e})"
    ))),
  }
}

fn json_kind(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_json_fence() {
    let raw = "  ```json\n{\"topic\": \"Describe a teacher.\"}\n```  \n";
    assert_eq!(strip_code_fences(raw), "{\"topic\": \"Describe a teacher.\"}");
  }

  #[test]
  fn strips_bare_fence_and_leaves_plain_json_alone() {
    assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
    assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
  }

  #[test]
  fn strips_only_one_fence_on_each_side() {
    assert_eq!(strip_code_fences("``````json\n{}\n``````"), "```json\n{}\n```");
  }

  #[test]
  fn parses_fenced_speaking_prompt() {
    let p = parse_model_object("```json\n{\"topic\": \"Do you prefer studying alone or in groups?\"}\n```").unwrap();
    assert_eq!(p["topic"], "Do you prefer studying alone or in groups?");
  }

  #[test]
  fn keeps_reading_test_exactly_as_generated() {
    let raw = r#"```json
{
  "title": "Glaciers",
  "passage": "Glaciers form when snow accumulates...",
  "difficulty": "hard",
  "questions": [
    {"id": 1, "question_text": "What forms glaciers?",
     "options": ["Rain", "Snow", "Wind"],
     "correct_answer_key": "B",
     "explanation": "Paragraph 1 says snow compacts."}
  ]
}
```"#;
    let test = parse_model_object(raw).unwrap();
    assert_eq!(test["difficulty"], "hard");
    assert_eq!(test["questions"][0]["explanation"], "Paragraph 1 says snow compacts.");
    assert_eq!(test["questions"][0]["options"][1], "Snow");
    let keys: Vec<&str> = test.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["title", "passage", "difficulty", "questions"]);
  }

  #[test]
  fn malformed_json_is_a_generation_error() {
    let err = parse_model_object("```json\n{\"topic\": \n```").unwrap_err();
    assert!(matches!(err, ApiError::Generation(_)));

    let err = parse_model_object("Sure! Here is your prompt.").unwrap_err();
    assert!(matches!(err, ApiError::Generation(_)));
  }

  #[test]
  fn non_object_reply_is_a_generation_error() {
    let err = parse_model_object("```json\n[{\"topic\": \"x\"}]\n```").unwrap_err();
    assert!(matches!(err, ApiError::Generation(ref m) if m.contains("an array")));
  }
}
