//! Four-letter personality codes: normalization, letter-wise inversion ("shadow")
//! and derivation of a code from the 12-item short-form questionnaire.

use thiserror::Error;

/// Number of Likert items in the short-form questionnaire.
pub const SHORT_FORM_ITEMS: usize = 12;

/// Statements of the short-form questionnaire, answered 1 (no) to 5 (yes).
pub const SHORT_FORM_STATEMENTS: [&str; SHORT_FORM_ITEMS] = [
    "Spending time alone recharges my energy",
    "I listen more than I talk",
    "I gather information before acting",
    "I don't mind reading manuals or rules",
    "Concrete instructions reassure me more than abstract ones",
    "I enjoy realistic topics",
    "I tend to think of solutions before feelings",
    "When choosing things I focus on specs and performance",
    "I want to hear the conclusion first",
    "I feel at ease when things go as planned",
    "I usually get moving well before a deadline",
    "Sudden changes of plan are hard for me",
];

/// Letter pairs per group: the first letter wins when the group sum exceeds the threshold.
const GROUP_POLES: [(char, char); 4] = [('I', 'E'), ('S', 'N'), ('T', 'F'), ('J', 'P')];
const GROUP_THRESHOLD: u32 = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagnosisError {
    #[error("expected {expected} answers, got {actual}")]
    WrongAnswerCount { expected: usize, actual: usize },
    #[error("answer {index} is {value}; answers must be between 1 and 5")]
    OutOfRange { index: usize, value: u8 },
}

fn invert_letter(c: char) -> char {
    match c {
        'E' => 'I',
        'I' => 'E',
        'S' => 'N',
        'N' => 'S',
        'T' => 'F',
        'F' => 'T',
        'J' => 'P',
        'P' => 'J',
        other => other,
    }
}

/// Letter-wise inversion (E↔I, S↔N, T↔F, J↔P). Unknown characters pass through,
/// so `invert(&invert(s)) == s` for every string.
pub fn invert(code: &str) -> String {
    code.chars().map(invert_letter).collect()
}

/// Canonical form of a caller-supplied code: trimmed and upper-cased, so `invert` sees letters it knows.
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Derives a code from 12 answers in 1..=5, three per letter.
pub fn derive_code(answers: &[u8]) -> Result<String, DiagnosisError> {
    if answers.len() != SHORT_FORM_ITEMS {
        return Err(DiagnosisError::WrongAnswerCount {
            expected: SHORT_FORM_ITEMS,
            actual: answers.len(),
        });
    }
    if let Some((index, &value)) = answers
        .iter()
        .enumerate()
        .find(|(_, v)| !(1..=5).contains(*v))
    {
        return Err(DiagnosisError::OutOfRange { index, value });
    }

    Ok(answers
        .chunks(3)
        .zip(GROUP_POLES)
        .map(|(group, (high, low))| {
            let sum: u32 = group.iter().map(|&v| u32::from(v)).sum();
            if sum > GROUP_THRESHOLD {
                high
            } else {
                low
            }
        })
        .collect())
}
