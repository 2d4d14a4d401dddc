//! Pitch factor resolution.
//!
//! Priority: explicit caller override, then model-assisted estimation (when
//! enabled and a Mistral client exists), then the punctuation/length
//! heuristic. Estimation is best-effort: no failure on this path may abort a
//! synthesis request.

use log::{debug, warn};
use serde::Deserialize;

use crate::mistral::{ChatParams, MistralClient};

/// Hard clamp applied to any model-suggested factor.
pub const MIN_PITCH_FACTOR: f32 = 0.7;
pub const MAX_PITCH_FACTOR: f32 = 1.3;

pub const NEUTRAL_PITCH: f32 = 1.0;

const ESTIMATION_MAX_TOKENS: u32 = 200;
const ESTIMATION_TEMPERATURE: f32 = 0.3;

// The model is asked for {"pitch_factor": f, "reasoning": s}; only the
// factor matters here, the rest of the object is ignored.
#[derive(Debug, Deserialize)]
struct PitchSuggestion {
    pitch_factor: f32,
}

/// Resolve the pitch factor for one request.
pub async fn resolve_pitch(
    mistral: Option<&MistralClient>,
    text: &str,
    explicit: Option<f32>,
    optimize: bool,
) -> f32 {
    if let Some(factor) = explicit {
        debug!("Using explicit pitch factor {}", factor);
        return factor;
    }

    if !optimize {
        return NEUTRAL_PITCH;
    }

    let Some(client) = mistral else {
        let factor = heuristic_pitch(text);
        debug!("Mistral unavailable, heuristic pitch factor {}", factor);
        return factor;
    };

    let params = ChatParams {
        temperature: ESTIMATION_TEMPERATURE,
        max_tokens: ESTIMATION_MAX_TOKENS,
        ..ChatParams::default()
    };

    match client.chat(&estimation_prompt(text), &params).await {
        Ok(outcome) => match extract_pitch_suggestion(&outcome.content) {
            Some(factor) => {
                debug!("Model suggested pitch factor {}", factor);
                factor
            }
            None => {
                let factor = heuristic_pitch(text);
                warn!(
                    "Could not parse pitch suggestion from model reply, heuristic factor {}",
                    factor
                );
                factor
            }
        },
        Err(e) => {
            warn!("Pitch estimation call failed, keeping neutral pitch: {}", e);
            NEUTRAL_PITCH
        }
    }
}

fn estimation_prompt(text: &str) -> String {
    format!(
        "You are tuning a text-to-speech voice. Analyze the utterance below: \
         its sentence type (question, exclamation, statement), sentiment, and \
         length/complexity. Suggest a pitch factor between 0.8 and 1.2 where \
         1.0 is neutral, higher is brighter and lower is calmer. Reply with a \
         JSON object with the fields \"pitch_factor\" (float) and \
         \"reasoning\" (string).\n\nUtterance: {}",
        text
    )
}

/// Best-effort extraction of a pitch suggestion embedded in a free-form
/// model reply: only the substring from the first `{` to the last `}` is
/// parsed, and the factor is clamped into the canonical range.
fn extract_pitch_suggestion(reply: &str) -> Option<f32> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }

    let suggestion: PitchSuggestion = serde_json::from_str(&reply[start..=end]).ok()?;
    if !suggestion.pitch_factor.is_finite() {
        return None;
    }

    Some(suggestion.pitch_factor.clamp(MIN_PITCH_FACTOR, MAX_PITCH_FACTOR))
}

/// Fixed rule-based guess used whenever model estimation is unavailable or
/// unparsable. Question marks win over exclamation marks.
pub fn heuristic_pitch(text: &str) -> f32 {
    if text.contains('?') {
        1.05
    } else if text.contains('!') {
        1.10
    } else if text.chars().count() > 100 {
        0.95
    } else {
        NEUTRAL_PITCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_question() {
        assert_eq!(heuristic_pitch("What is your name?"), 1.05);
    }

    #[test]
    fn test_heuristic_exclamation() {
        assert_eq!(heuristic_pitch("This is amazing!"), 1.10);
    }

    #[test]
    fn test_heuristic_question_wins_over_exclamation() {
        assert_eq!(heuristic_pitch("Really?!"), 1.05);
    }

    #[test]
    fn test_heuristic_long_text() {
        let text = "a".repeat(101);
        assert_eq!(heuristic_pitch(&text), 0.95);
    }

    #[test]
    fn test_heuristic_neutral() {
        assert_eq!(heuristic_pitch("Hello there"), 1.0);
        let text = "a".repeat(100);
        assert_eq!(heuristic_pitch(&text), 1.0);
    }

    #[test]
    fn test_extract_plain_json() {
        let reply = r#"{"pitch_factor": 1.12, "reasoning": "excited exclamation"}"#;
        assert_eq!(extract_pitch_suggestion(reply), Some(1.12));
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let reply = "Sure! Here is my analysis:\n{\"pitch_factor\": 0.92, \"reasoning\": \"long, calm statement\"}\nLet me know if you need more.";
        assert_eq!(extract_pitch_suggestion(reply), Some(0.92));
    }

    #[test]
    fn test_extract_clamps_out_of_range() {
        let high = r#"{"pitch_factor": 2.5, "reasoning": "very excited"}"#;
        assert_eq!(extract_pitch_suggestion(high), Some(MAX_PITCH_FACTOR));

        let low = r#"{"pitch_factor": 0.1, "reasoning": "very calm"}"#;
        assert_eq!(extract_pitch_suggestion(low), Some(MIN_PITCH_FACTOR));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert_eq!(extract_pitch_suggestion("no json here"), None);
        assert_eq!(extract_pitch_suggestion("{broken"), None);
        assert_eq!(extract_pitch_suggestion(r#"{"reasoning": "missing factor"}"#), None);
        assert_eq!(extract_pitch_suggestion(r#"{"pitch_factor": "high"}"#), None);
    }

    #[tokio::test]
    async fn test_resolve_explicit_override_wins() {
        // Explicit factor is used verbatim even with optimization on
        let factor = resolve_pitch(None, "Hello?", Some(0.85), true).await;
        assert_eq!(factor, 0.85);
    }

    #[tokio::test]
    async fn test_resolve_disabled_is_neutral() {
        let factor = resolve_pitch(None, "Hello?", None, false).await;
        assert_eq!(factor, NEUTRAL_PITCH);
    }

    #[tokio::test]
    async fn test_resolve_without_client_uses_heuristic() {
        let factor = resolve_pitch(None, "Hello?", None, true).await;
        assert_eq!(factor, 1.05);
    }
}
