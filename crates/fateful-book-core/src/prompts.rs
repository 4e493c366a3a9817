//! Prompt construction and counselor-reply shaping for the night pharmacy persona.

use crate::conversation::{Role, Turn};

const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];
const WIDE_TERMINATORS: [char; 3] = ['。', '！', '？'];
const ABBREVIATIONS: [&str; 7] = ["Dr", "Mr", "Mrs", "Ms", "Prof", "St", "vs"];

const RATIONAL_TONE: &str = "You are a quiet, rational sounding board. \
You help the visitor organize their thoughts rather than their feelings.";
const WARM_TONE: &str = "You are a gentle counselor who stays close to the visitor. \
You receive their heart warmly and quietly.";

/// Limits applied to every counselor reply before it reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyShape {
    pub max_sentences: usize,
    pub max_chars: usize,
}

impl Default for ReplyShape {
    fn default() -> Self {
        Self {
            max_sentences: 2,
            max_chars: 100,
        }
    }
}

/// Persona instruction sent with the first turn. Codes containing `T` get the rational tone.
pub fn persona_prompt(code: &str) -> String {
    let tone = if code.contains('T') {
        RATIONAL_TONE
    } else {
        WARM_TONE
    };
    format!(
        "You are the pharmacist of \"Fateful Book\", a late-night pharmacy of words.\n\
         You speak calmly, like the air of a quiet night.\n\n\
         Rules:\n\
         - Do not suggest any book during the first one or two turns.\n\
         - First ask questions that help you understand the visitor's feelings in depth, \
         such as \"Why do you feel that way?\" or \"How would you like to feel?\".\n\
         - Keep digging until you feel you have touched the core of what they carry.\n\
         - Do not name books until the visitor explicitly asks for one.\n\
         - Always answer in at most two sentences.\n\n\
         {tone}"
    )
}

/// `.` closes a sentence only before whitespace or the end, and never after a title
/// abbreviation, so "Dr. Smith" and "3.5" stay whole.
fn ends_sentence(c: char, before: &str, rest: &str) -> bool {
    if c != '.' {
        return SENTENCE_TERMINATORS.contains(&c);
    }
    if !rest.chars().next().map_or(true, char::is_whitespace) {
        return false;
    }
    let word = before.rsplit(char::is_whitespace).next().unwrap_or_default();
    !ABBREVIATIONS.iter().any(|a| a.eq_ignore_ascii_case(word))
}

/// Trims a reply to the configured sentence and character limits.
pub fn shorten_reply(text: &str, shape: ReplyShape) -> String {
    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        if ends_sentence(c, &text[start..i], &text[end..]) {
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    sentences.push(&text[start..]);

    let kept: String = sentences
        .into_iter()
        .filter(|s| !s.trim_matches(|c: char| c.is_whitespace() || SENTENCE_TERMINATORS.contains(&c)).is_empty())
        .take(shape.max_sentences)
        .collect();
    let mut shortened = kept.trim().to_string();

    if shortened.is_empty() {
        return shortened;
    }
    if !shortened.ends_with(SENTENCE_TERMINATORS) {
        let wide = text.contains(WIDE_TERMINATORS);
        shortened.push(if wide { '。' } else { '.' });
    }

    if shortened.chars().count() > shape.max_chars {
        let mut cut: String = shortened.chars().take(shape.max_chars).collect();
        cut.push_str("...");
        return cut;
    }
    shortened
}

/// One line per turn: `User: ...` / `Pharmacist: ...`.
pub fn conversation_summary(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let speaker = match t.role {
                Role::User => "User",
                Role::Counselor => "Pharmacist",
            };
            format!("{}: {}", speaker, t.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_or_unknown(code: &str) -> &str {
    if code.trim().is_empty() {
        "unknown"
    } else {
        code
    }
}

pub fn prescription_prompt(code: &str, turns: &[Turn]) -> String {
    format!(
        "You are the pharmacist of \"Fateful Book\", a late-night pharmacy of words.\n\
         From the information below, choose exactly one book, from all the real books in the world, \
         that will reach this person's heart right now.\n\n\
         [Diagnosis]\n{code}\n\n\
         [Counseling record]\n{summary}\n\n\
         Keep in mind:\n\
         - The book must really exist. Never invent a book.\n\
         - Give the author's name accurately.\n\
         - Choose a book that stays close to the person's current state of mind.\n\
         - Any genre is fine: novels, philosophy, essays, poetry.\n\
         - Aim at the core that surfaced in the conversation.\n\n\
         Answer ONLY with this JSON, nothing else:\n\
         {{\n\
         \x20 \"title\": \"book title\",\n\
         \x20 \"author\": \"author name\",\n\
         \x20 \"line\": \"a sentence from the book that pierces the heart, or a short phrase capturing its mood\",\n\
         \x20 \"reason\": \"two or three sentences on why this book works for this person now\"\n\
         }}",
        code = code_or_unknown(code),
        summary = conversation_summary(turns),
    )
}

pub fn suggestion_prompt(code: &str, turns: &[Turn]) -> String {
    format!(
        "A visitor with personality code {code} is talking with the pharmacist of a late-night \
         pharmacy of words.\n\n\
         [Conversation so far]\n{summary}\n\n\
         Suggest up to 4 short replies (a few words each) the visitor might send next.\n\
         Answer ONLY with this JSON: {{\"options\": [\"...\", \"...\"]}}",
        code = code_or_unknown(code),
        summary = conversation_summary(turns),
    )
}
