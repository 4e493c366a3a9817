//! Fateful Book — Core library.
//! Personality diagnosis, counseling turn control and book prescriptions for the
//! late-night pharmacy of words.

pub mod archetype;
pub mod codec;
pub mod config;
pub mod conversation;
pub mod counsel;
pub mod covers;
pub mod generator;
pub mod ledger;
pub mod prescription;
pub mod prompts;
pub mod providers;
pub mod questionnaire;
pub mod scoring;
pub mod suggestions;

pub use archetype::{archetypes, find_archetype, match_archetype, Archetype, HomeRange, ARCHETYPES};
pub use codec::{derive_code, invert, normalize as normalize_code, DiagnosisError, SHORT_FORM_ITEMS, SHORT_FORM_STATEMENTS};
pub use config::{ConfigError, GatewayConfig, LlmProvider};
pub use conversation::{
    sanitize_history, ChatRequest, ConversationError, ConversationSession, Phase, PrescriptionRequest, Role, Turn,
    TurnLimits, TurnOutcome,
};
pub use counsel::{CounselError, CounselingService, Exchange};
pub use covers::{CoverLookup, GoogleBooksCovers, NoCovers};
pub use generator::{GenerateError, MockGenerator, TextGenerator};
pub use ledger::{LedgerEntry, LedgerError, PrescriptionLedger};
pub use prescription::{lenient_decode, Prescription, PrescriptionOrchestrator};
pub use prompts::ReplyShape;
pub use providers::{select_generator, ChatCompletionsGenerator, ProviderKeys};
pub use questionnaire::{questions, Axis, Choice, Question, QuestionKind};
pub use scoring::{accumulate, AxisScores};
pub use suggestions::{suggest, FALLBACK_SUGGESTIONS};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
