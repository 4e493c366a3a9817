//! Book prescriptions: asks the generator for one real book and decodes the answer
//! leniently. A malformed answer degrades to [`Prescription::fallback`]; only transport failures
//! reach the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::conversation::Turn;
use crate::generator::{GenerateError, TextGenerator};
use crate::prompts;

const FALLBACK_TITLE: &str = "Hard-Boiled Wonderland and the End of the World";
const FALLBACK_AUTHOR: &str = "Haruki Murakami";
const FALLBACK_LINE: &str = "For a night when you want to cool your head between the real and the unreal.";
const FALLBACK_REASON: &str = "The temperature and tremor of your words told me you need a story \
that lets you sort your thoughts quietly. Murakami's singular world offers a calm landing place \
for a heart swaying between logic and feeling.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(alias = "book")]
    pub title: String,
    pub author: String,
    pub line: String,
    pub reason: String,
    /// Cover thumbnail, attached after generation when a lookup succeeds.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Prescription {
    /// The constant answer used whenever generation output cannot be decoded.
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            author: FALLBACK_AUTHOR.to_string(),
            line: FALLBACK_LINE.to_string(),
            reason: FALLBACK_REASON.to_string(),
            image_url: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.title == FALLBACK_TITLE && self.author == FALLBACK_AUTHOR
    }
}

/// First balanced `{...}` block in `text`. Braces inside JSON strings are ignored.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decodes the first JSON object into a prescription. `None` when there is no object,
/// it is not valid JSON, or a required field is missing or blank.
pub fn lenient_decode(text: &str) -> Option<Prescription> {
    let block = extract_first_json_object(text)?;
    let mut decoded: Prescription = serde_json::from_str(block).ok()?;
    let complete = [&decoded.title, &decoded.author, &decoded.line, &decoded.reason]
        .iter()
        .all(|f| !f.trim().is_empty());
    if !complete {
        return None;
    }
    decoded.image_url = None;
    Some(decoded)
}

pub struct PrescriptionOrchestrator {
    generator: Arc<dyn TextGenerator>,
}

impl PrescriptionOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn prescribe(&self, code: &str, history: &[Turn]) -> Result<Prescription, GenerateError> {
        tracing::debug!(code, turns = history.len(), "generating prescription");
        let prompt = prompts::prescription_prompt(code, history);
        let text = self.generator.generate_structured(&prompt).await?;

        match lenient_decode(&text) {
            Some(p) => {
                tracing::info!("[SYSTEM] Prescription issued for {}: \"{}\" by {}", code, p.title, p.author);
                Ok(p)
            }
            None => {
                tracing::warn!(code, "prescription answer could not be decoded; using fallback");
                Ok(Prescription::fallback())
            }
        }
    }

    /// Same as [`prescribe`](Self::prescribe) with the inverted code.
    pub async fn prescribe_shadow(&self, code: &str, history: &[Turn]) -> Result<Prescription, GenerateError> {
        self.prescribe(&codec::invert(code), history).await
    }
}
