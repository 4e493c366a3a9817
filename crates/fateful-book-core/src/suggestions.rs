//! Quick suggestions — short replies the user might send next. Never fails.

use serde::Deserialize;

use crate::conversation::Turn;
use crate::generator::TextGenerator;
use crate::prescription::extract_first_json_object;
use crate::prompts;

pub const MAX_SUGGESTIONS: usize = 4;

pub const FALLBACK_SUGGESTIONS: [&str; MAX_SUGGESTIONS] = [
    "Tell me more",
    "I'm not sure how I feel",
    "That's exactly it",
    "Could you recommend a book?",
];

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionPayload {
    Object { options: Vec<String> },
    List(Vec<String>),
}

/// Options from an `{"options": [...]}` object or a bare JSON array found in `text`.
pub fn parse_suggestions(text: &str) -> Option<Vec<String>> {
    let payload = extract_first_json_object(text)
        .and_then(|block| serde_json::from_str::<SuggestionPayload>(block).ok())
        .or_else(|| {
            let start = text.find('[')?;
            let end = text.rfind(']')?;
            (end > start)
                .then(|| serde_json::from_str::<SuggestionPayload>(&text[start..=end]).ok())
                .flatten()
        })?;

    let options = match payload {
        SuggestionPayload::Object { options } | SuggestionPayload::List(options) => options,
    };
    let cleaned: Vec<String> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Up to four options, or [`FALLBACK_SUGGESTIONS`] on any failure.
pub async fn suggest(generator: &dyn TextGenerator, code: &str, history: &[Turn]) -> Vec<String> {
    let prompt = prompts::suggestion_prompt(code, history);
    match generator.generate_structured(&prompt).await {
        Ok(text) => parse_suggestions(&text).unwrap_or_else(|| {
            tracing::warn!("suggestion answer could not be decoded; using fallback");
            fallback_suggestions()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "suggestion generation failed; using fallback");
            fallback_suggestions()
        }
    }
}
