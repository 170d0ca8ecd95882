//! Judgment-reply normalization.
//!
//! Sources return anything from clean JSON objects to prose with a JSON
//! block buried in the middle. Replies that cannot be validated are
//! rejected; the caller must drop them from the vote set rather than
//! count a defaulted record.

use serde_json::Value;
use tracing::debug;

use crate::types::{JudgmentRecord, Likelihood, ParseError, RawJudgment, RecommendedAction};

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Normalize one raw reply into a [`JudgmentRecord`], or reject it.
pub fn parse_judgment(raw: &RawJudgment, provider: &str) -> Result<JudgmentRecord, ParseError> {
    match raw {
        RawJudgment::Structured(value) => {
            if has_decision_field(value) {
                return Ok(record_from_value(provider, value));
            }
            // Structured but unrecognized: fall back to scanning its text
            // form for an embedded decision object.
            parse_text(&value.to_string(), provider)
        }
        RawJudgment::FreeText(text) => parse_text(text, provider),
    }
}

fn parse_text(text: &str, provider: &str) -> Result<JudgmentRecord, ParseError> {
    let block = extract_json_block(text).ok_or(ParseError::NoJsonFound)?;
    let value: Value = serde_json::from_str(block)?;

    if !has_decision_field(&value) {
        return Err(ParseError::MissingDecisionField);
    }

    debug!(provider, "parsed embedded judgment block");
    Ok(record_from_value(provider, &value))
}

fn has_decision_field(value: &Value) -> bool {
    value.get("manipulation_likelihood").is_some() || value.get("action").is_some()
}

/// First balanced `{...}` substring, honoring string literals and escape
/// sequences so braces inside quoted text do not confuse the scan.
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn record_from_value(provider: &str, value: &Value) -> JudgmentRecord {
    JudgmentRecord {
        provider: provider.to_string(),
        manipulation_likelihood: parse_likelihood(value.get("manipulation_likelihood")),
        confidence: parse_confidence(value.get("confidence")),
        reasoning: string_field(value, "reasoning")
            .or_else(|| string_field(value, "analysis"))
            .unwrap_or_default(),
        key_concerns: string_list(value.get("key_concerns")),
        recommended_action: parse_action(value.get("recommended_action")),
        risk_factors: string_list(value.get("risk_factors")),
        action: string_field(value, "action"),
    }
}

fn parse_likelihood(value: Option<&Value>) -> Likelihood {
    match value.and_then(Value::as_str).map(str::to_ascii_lowercase).as_deref() {
        Some("high") => Likelihood::High,
        Some("medium") => Likelihood::Medium,
        Some("none") => Likelihood::None,
        // Unknown or absent defaults to low, matching the neutral posture
        // used for the other optional fields.
        _ => Likelihood::Low,
    }
}

fn parse_action(value: Option<&Value>) -> RecommendedAction {
    match value.and_then(Value::as_str).map(str::to_ascii_uppercase).as_deref() {
        Some("AVOID") => RecommendedAction::Avoid,
        Some("CAUTION") => RecommendedAction::Caution,
        Some("SAFE") => RecommendedAction::Safe,
        // MONITOR is the deliberately neutral default so a partial reply
        // cannot bias the vote toward any side.
        _ => RecommendedAction::Monitor,
    }
}

fn parse_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_block_with_surrounding_prose() {
        let raw = RawJudgment::FreeText(
            "blah blah {\"action\":\"BUY\",\"confidence\":0.8} trailing text".into(),
        );
        let record = parse_judgment(&raw, "grok").unwrap();
        assert_eq!(record.action.as_deref(), Some("BUY"));
        assert!((record.confidence - 0.8).abs() < 1e-9);
        assert_eq!(record.manipulation_likelihood, Likelihood::Low);
        assert_eq!(record.recommended_action, RecommendedAction::Monitor);
        assert!(record.key_concerns.is_empty());
    }

    #[test]
    fn test_no_json_is_a_rejection_not_a_panic() {
        let raw = RawJudgment::FreeText("no json here".into());
        assert!(matches!(
            parse_judgment(&raw, "grok"),
            Err(ParseError::NoJsonFound)
        ));
    }

    #[test]
    fn test_missing_decision_field_is_rejected() {
        let raw = RawJudgment::FreeText("{\"confidence\": 0.9, \"reasoning\": \"hmm\"}".into());
        assert!(matches!(
            parse_judgment(&raw, "gemini"),
            Err(ParseError::MissingDecisionField)
        ));
    }

    #[test]
    fn test_structured_reply_maps_directly() {
        let raw = RawJudgment::Structured(json!({
            "manipulation_likelihood": "high",
            "confidence": 0.85,
            "reasoning": "closing ramp plus short squeeze",
            "key_concerns": ["closing concentration", "short surge"],
            "recommended_action": "AVOID",
            "risk_factors": ["illiquidity"]
        }));
        let record = parse_judgment(&raw, "claude").unwrap();
        assert_eq!(record.provider, "claude");
        assert_eq!(record.manipulation_likelihood, Likelihood::High);
        assert_eq!(record.recommended_action, RecommendedAction::Avoid);
        assert_eq!(record.key_concerns.len(), 2);
        assert_eq!(record.risk_factors, vec!["illiquidity".to_string()]);
    }

    #[test]
    fn test_confidence_normalization() {
        let parse = |confidence: serde_json::Value| {
            let raw = RawJudgment::Structured(json!({
                "manipulation_likelihood": "low",
                "confidence": confidence
            }));
            parse_judgment(&raw, "mistral").unwrap().confidence
        };

        assert!((parse(json!("0.7")) - 0.7).abs() < 1e-9);
        assert_eq!(parse(json!("not a number")), DEFAULT_CONFIDENCE);
        assert_eq!(parse(json!(null)), DEFAULT_CONFIDENCE);
        // Out-of-range values clamp instead of poisoning the weights.
        assert_eq!(parse(json!(3.5)), 1.0);
        assert_eq!(parse(json!(-0.4)), 0.0);
    }

    #[test]
    fn test_unrecognized_likelihood_string_defaults_to_low() {
        let raw = RawJudgment::Structured(json!({
            "manipulation_likelihood": "extreme",
            "confidence": 0.9
        }));
        let record = parse_judgment(&raw, "gemini").unwrap();
        assert_eq!(record.manipulation_likelihood, Likelihood::Low);
        // The decision field being present (if unrecognized) still counts
        // as a vote; only its value falls back.
        assert!((record.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_extraction() {
        let raw = RawJudgment::FreeText(
            "note {\"action\":\"SELL\",\"reasoning\":\"odd {pattern} in tape\"} done".into(),
        );
        let record = parse_judgment(&raw, "grok").unwrap();
        assert_eq!(record.action.as_deref(), Some("SELL"));
        assert_eq!(record.reasoning, "odd {pattern} in tape");
    }

    #[test]
    fn test_structured_without_decision_field_is_rejected() {
        let raw = RawJudgment::Structured(json!({"verdict": "fine"}));
        assert!(parse_judgment(&raw, "gemini").is_err());
    }
}
