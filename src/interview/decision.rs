//! Decoding the oracle's free-text reply into a turn decision
//!
//! Replies are best-effort JSON: the object may be wrapped in prose or a code
//! fence. Only the span from the first `{` to the last `}` is decoded.

use crate::error::{InterviewError, Result};
use serde::{Deserialize, Serialize};

/// What the interviewer does next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Decision {
    Ask { skill: String, question: String },
    Stop,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Decision::Stop)
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    action: Option<String>,
    skill: Option<String>,
    question: Option<String>,
}

/// The substring from the first `{` to the last `}`, if there is one.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn parse_error(reason: impl Into<String>, raw: &str) -> InterviewError {
    InterviewError::DecisionParse {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

fn required(field: Option<String>, name: &str, raw: &str) -> Result<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| parse_error(format!("'ask' decision is missing '{}'", name), raw))
}

/// Parse an oracle reply into a [`Decision`].
pub fn parse_decision(raw: &str) -> Result<Decision> {
    let object = extract_json_object(raw).ok_or_else(|| parse_error("no JSON object found", raw))?;

    let decoded: RawDecision = serde_json::from_str(object)
        .map_err(|e| parse_error(format!("invalid JSON: {}", e), raw))?;

    let action = decoded
        .action
        .map(|a| a.trim().to_lowercase())
        .ok_or_else(|| parse_error("missing 'action'", raw))?;

    match action.as_str() {
        "ask" => Ok(Decision::Ask {
            skill: required(decoded.skill, "skill", raw)?,
            question: required(decoded.question, "question", raw)?,
        }),
        "stop" => Ok(Decision::Stop),
        other => Err(parse_error(format!("unknown action '{}'", other), raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASK: &str = r#"{"action":"ask","skill":"SQL","question":"Describe a SQL project."}"#;

    fn sql_decision() -> Decision {
        Decision::Ask {
            skill: "SQL".to_string(),
            question: "Describe a SQL project.".to_string(),
        }
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(parse_decision(ASK).unwrap(), sql_decision());
        assert_eq!(parse_decision(r#"{"action": "stop"}"#).unwrap(), Decision::Stop);
    }

    #[test]
    fn test_fenced_and_wrapped_objects() {
        let samples = [
            format!("```json\n{}\n```", ASK),
            format!("```\n{}\n```", ASK),
            format!("Sure! Here is the next question:\n{}\nGood luck.", ASK),
            format!("  \n{}  ", ASK),
        ];
        for sample in &samples {
            assert_eq!(parse_decision(sample).unwrap(), sql_decision(), "sample: {}", sample);
        }
    }

    #[test]
    fn test_action_is_case_insensitive() {
        let raw = r#"{"action": " STOP ", "skill": "", "question": ""}"#;
        assert_eq!(parse_decision(raw).unwrap(), Decision::Stop);
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("a {\"x\": 1} b"), Some("{\"x\": 1}"));
        assert_eq!(extract_json_object("{outer {inner}}"), Some("{outer {inner}}"));
        assert_eq!(extract_json_object("no braces here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object("only {"), None);
        assert_eq!(extract_json_object("{}"), Some("{}"));
    }

    #[test]
    fn test_malformed_replies_are_parse_errors() {
        let samples = [
            "I think the candidate is ready.",
            "",
            "{action: ask}",
            r#"{"action":"ask","skill":"SQL"}"#,
            r#"{"action":"ask","question":"Why?"}"#,
            r#"{"action":"ask","skill":"  ","question":"Why?"}"#,
            r#"{"skill":"SQL","question":"Why?"}"#,
            r#"{"action":"maybe"}"#,
            r#"{"action":"ask","skill":"SQL","question":"Q1"} and {"action":"stop"}"#,
            r#"["action","stop"]"#,
        ];
        for sample in samples {
            let err = parse_decision(sample).unwrap_err();
            assert!(
                matches!(err, InterviewError::DecisionParse { ref raw, .. } if raw == sample),
                "sample should fail: {}",
                sample
            );
        }
    }

    #[test]
    fn test_decision_serializes_with_action_tag() {
        let json = serde_json::to_string(&sql_decision()).unwrap();
        assert!(json.contains("\"action\":\"ask\""));
        assert_eq!(serde_json::to_string(&Decision::Stop).unwrap(), r#"{"action":"stop"}"#);
    }
}
