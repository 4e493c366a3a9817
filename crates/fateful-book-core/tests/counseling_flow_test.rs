//! Integration test: CounselingService driving sessions through a scripted generator.
//!
//! Verifies that:
//! 1. A blank chat message performs zero collaborator calls.
//! 2. A failed chat turn rolls the session back and can be retried.
//! 3. Reaching the maximum issues the prescription automatically.
//! 4. Unparsable prescription output degrades to the fallback.
//! 5. The shadow prescription is generated once per session.
//! 6. Issued prescriptions land in the ledger.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fateful_book_core::{
    CounselError, CounselingService, ConversationError, ConversationSession, CoverLookup, GenerateError, NoCovers,
    Phase, Prescription, PrescriptionLedger, ReplyShape, TextGenerator, Turn, TurnLimits, FALLBACK_SUGGESTIONS,
};

const BOOK_JSON: &str = r#"Here is my choice:
{"title": "Momo", "author": "Michael Ende", "line": "Time is life.", "reason": "You need slowness."}"#;

/// Answers from queues; an empty queue means a transport failure. Counts every call.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    structured: Mutex<VecDeque<String>>,
    reply_calls: AtomicUsize,
    structured_calls: AtomicUsize,
    system_prompts: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    fn with_replies(replies: &[&str]) -> Self {
        let g = Self::default();
        g.replies.lock().unwrap().extend(replies.iter().map(|s| s.to_string()));
        g
    }

    fn push_structured(&self, text: &str) {
        self.structured.lock().unwrap().push_back(text.to_string());
    }

    fn calls(&self) -> usize {
        self.reply_calls.load(Ordering::SeqCst) + self.structured_calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> GenerateError {
    GenerateError::Status {
        provider: "scripted",
        status: 503,
        body: "unavailable".into(),
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_reply(
        &self,
        system_prompt: Option<&str>,
        _history: &[Turn],
        _live_message: &str,
    ) -> Result<String, GenerateError> {
        self.reply_calls.fetch_add(1, Ordering::SeqCst);
        self.system_prompts.lock().unwrap().push(system_prompt.map(str::to_string));
        self.replies.lock().unwrap().pop_front().ok_or_else(unavailable)
    }

    async fn generate_structured(&self, _prompt: &str) -> Result<String, GenerateError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.structured.lock().unwrap().pop_front().ok_or_else(unavailable)
    }
}

struct FixedCover;

#[async_trait]
impl CoverLookup for FixedCover {
    async fn find_cover(&self, title: &str, _author: &str) -> Option<String> {
        Some(format!("https://covers.test/{title}"))
    }
}

fn service(generator: &Arc<ScriptedGenerator>) -> CounselingService {
    CounselingService::new(generator.clone(), Arc::new(NoCovers), ReplyShape::default())
}

#[tokio::test]
async fn blank_message_makes_no_collaborator_call() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["Why?"]));
    let svc = service(&generator);

    let err = svc.chat("INFP", &[], "   ").await.unwrap_err();
    assert!(matches!(err, CounselError::Conversation(ConversationError::EmptyMessage)));

    let mut session = ConversationSession::new("INFP", TurnLimits::default());
    assert!(svc.send_message(&mut session, "").await.is_err());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn stateless_chat_sends_persona_only_without_history() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["First. Second. Third.", "Again."]));
    let svc = service(&generator);

    let reply = svc.chat("INTJ", &[Turn::counselor("welcome")], "hello").await.unwrap();
    assert_eq!(reply, "First. Second.");

    let history = vec![Turn::user("hello"), Turn::counselor("First. Second.")];
    svc.chat("INTJ", &history, "more").await.unwrap();

    let prompts = generator.system_prompts.lock().unwrap().clone();
    assert!(prompts[0].is_some());
    assert!(prompts[1].is_none());
}

#[tokio::test]
async fn failed_turn_rolls_back_and_retry_succeeds() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["How long has it been?"]));
    let svc = service(&generator);
    let mut session = ConversationSession::new("ISFP", TurnLimits::default());

    svc.send_message(&mut session, "I feel stuck").await.unwrap();
    assert_eq!(session.turn_count(), 1);

    let err = svc.send_message(&mut session, "A while").await.unwrap_err();
    assert!(matches!(err, CounselError::Generate(_)));
    assert_eq!(session.turn_count(), 1);
    assert_eq!(session.turns().len(), 2);
    assert_eq!(session.phase(), Phase::Active);

    generator.replies.lock().unwrap().push_back("What changed then?".into());
    let exchange = svc.send_message(&mut session, "A while").await.unwrap();
    assert_eq!(exchange.reply, "What changed then?");
    assert_eq!(session.turn_count(), 2);
}

#[tokio::test]
async fn maximum_turns_issue_prescription_automatically() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["One?", "Two?", "Three?"]));
    generator.push_structured(BOOK_JSON);
    let svc = CounselingService::new(generator.clone(), Arc::new(FixedCover), ReplyShape::default());
    let mut session = ConversationSession::new("ENFP", TurnLimits { min_turns: 1, max_turns: 3 });

    for msg in ["a", "b"] {
        let exchange = svc.send_message(&mut session, msg).await.unwrap();
        assert!(exchange.prescription.is_none());
    }
    assert_eq!(generator.structured_calls.load(Ordering::SeqCst), 0);

    let exchange = svc.send_message(&mut session, "c").await.unwrap();
    let p = exchange.prescription.expect("forced prescription");
    assert_eq!(p.title, "Momo");
    assert_eq!(p.image_url.as_deref(), Some("https://covers.test/Momo"));
    assert_eq!(generator.structured_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.phase(), Phase::Done);
    assert_eq!(session.turn_count(), 3);
}

#[tokio::test]
async fn failed_forced_prescription_can_be_retried() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["One?"]));
    let svc = service(&generator);
    let mut session = ConversationSession::new("ENFP", TurnLimits { min_turns: 1, max_turns: 1 });

    let exchange = svc.send_message(&mut session, "a").await.unwrap();
    assert!(exchange.prescription_pending);
    assert_eq!(session.phase(), Phase::Active);

    generator.push_structured(BOOK_JSON);
    let p = svc.request_prescription(&mut session).await.unwrap();
    assert_eq!(p.author, "Michael Ende");
    assert_eq!(session.phase(), Phase::Done);
}

#[tokio::test]
async fn voluntary_prescription_respects_minimum() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["One?", "Two?"]));
    let svc = service(&generator);
    let mut session = ConversationSession::new("ISTJ", TurnLimits { min_turns: 2, max_turns: 10 });

    svc.send_message(&mut session, "a").await.unwrap();
    let err = svc.request_prescription(&mut session).await.unwrap_err();
    assert!(matches!(err, CounselError::Conversation(ConversationError::TooEarly { .. })));
    assert_eq!(generator.structured_calls.load(Ordering::SeqCst), 0);

    svc.send_message(&mut session, "b").await.unwrap();
    generator.push_structured("I recommend a nice book, no JSON, sorry.");
    let p = svc.request_prescription(&mut session).await.unwrap();
    assert_eq!(p, Prescription::fallback());
}

#[tokio::test]
async fn empty_generation_yields_fallback() {
    let generator = Arc::new(ScriptedGenerator::default());
    generator.push_structured("");
    let svc = service(&generator);
    let p = svc.prescribe("INFP", &[], false).await.unwrap();
    assert!(p.is_fallback());
}

#[tokio::test]
async fn transport_failure_propagates_for_prescriptions() {
    let generator = Arc::new(ScriptedGenerator::default());
    let svc = service(&generator);
    assert!(matches!(
        svc.prescribe("INFP", &[], false).await,
        Err(CounselError::Generate(_))
    ));
}

#[tokio::test]
async fn shadow_is_generated_once_per_session() {
    let generator = Arc::new(ScriptedGenerator::with_replies(&["One?"]));
    generator.push_structured(BOOK_JSON);
    generator.push_structured(
        r#"{"title": "The Shadow Book", "author": "Someone", "line": "l", "reason": "r"}"#,
    );
    let svc = service(&generator);
    let mut session = ConversationSession::new("INFP", TurnLimits { min_turns: 1, max_turns: 5 });

    assert!(svc.shadow_prescription(&mut session).await.is_err());

    svc.send_message(&mut session, "a").await.unwrap();
    svc.request_prescription(&mut session).await.unwrap();

    let first = svc.shadow_prescription(&mut session).await.unwrap();
    let second = svc.shadow_prescription(&mut session).await.unwrap();
    assert_eq!(first.title, "The Shadow Book");
    assert_eq!(first, second);
    assert_eq!(generator.structured_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn suggestions_fall_back_on_failure() {
    let generator = Arc::new(ScriptedGenerator::default());
    let svc = service(&generator);
    let options = svc.suggest("INFP", &[]).await;
    assert_eq!(options, FALLBACK_SUGGESTIONS.to_vec());

    generator.push_structured(r#"{"options": ["Yes", "No"]}"#);
    assert_eq!(svc.suggest("INFP", &[]).await, vec!["Yes", "No"]);
}

#[tokio::test]
async fn issued_prescriptions_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(PrescriptionLedger::open(dir.path().join("ledger")).unwrap());
    let generator = Arc::new(ScriptedGenerator::default());
    generator.push_structured(BOOK_JSON);
    generator.push_structured(BOOK_JSON);
    let svc = service(&generator).with_ledger(ledger);

    svc.prescribe("INFP", &[], false).await.unwrap();
    svc.prescribe("INFP", &[], true).await.unwrap();

    let recent = svc.recent(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].shadow);
    assert_eq!(recent[0].code, "ESTJ");
    assert_eq!(recent[1].code, "INFP");
}
