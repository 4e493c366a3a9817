//! Drives counseling through the text generator: chat turns with rollback,
//! voluntary and forced prescriptions, cached shadow prescriptions, suggestions.
//! Cover lookup and ledger writes decorate issued prescriptions and never fail a request.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::codec;
use crate::conversation::{ChatRequest, ConversationError, ConversationSession, PrescriptionRequest, Turn, TurnOutcome};
use crate::covers::CoverLookup;
use crate::generator::{GenerateError, TextGenerator};
use crate::ledger::{LedgerEntry, LedgerError, PrescriptionLedger};
use crate::prescription::{Prescription, PrescriptionOrchestrator};
use crate::prompts::{self, ReplyShape};
use crate::suggestions;

#[derive(Debug, Error)]
pub enum CounselError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Result of one session turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub reply: String,
    /// Present when this turn hit the maximum and the forced prescription succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Prescription>,
    /// The forced prescription failed; the session waits for a retry.
    pub prescription_pending: bool,
}

pub struct CounselingService {
    generator: Arc<dyn TextGenerator>,
    orchestrator: PrescriptionOrchestrator,
    covers: Arc<dyn CoverLookup>,
    ledger: Option<Arc<PrescriptionLedger>>,
    reply_shape: ReplyShape,
}

impl CounselingService {
    pub fn new(generator: Arc<dyn TextGenerator>, covers: Arc<dyn CoverLookup>, reply_shape: ReplyShape) -> Self {
        Self {
            orchestrator: PrescriptionOrchestrator::new(Arc::clone(&generator)),
            generator,
            covers,
            ledger: None,
            reply_shape,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<PrescriptionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, GenerateError> {
        let raw = self
            .generator
            .generate_reply(request.system_prompt.as_deref(), &request.history, &request.message)
            .await?;
        let reply = prompts::shorten_reply(&raw, self.reply_shape);
        if reply.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(reply)
    }

    /// Stateless turn: the caller owns the history.
    pub async fn chat(&self, code: &str, history: &[Turn], message: &str) -> Result<String, CounselError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ConversationError::EmptyMessage.into());
        }
        let request = ChatRequest::new(&codec::normalize(code), history, message);
        Ok(self.reply(&request).await?)
    }

    /// One session turn. A failed call leaves the session exactly as it was.
    pub async fn send_message(&self, session: &mut ConversationSession, message: &str) -> Result<Exchange, CounselError> {
        let request = session.begin_turn(message)?;
        tracing::debug!(turn = session.turn_count(), history = request.history.len(), "session turn");

        let reply = match self.reply(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                session.rollback_turn()?;
                return Err(e.into());
            }
        };

        match session.complete_turn(reply.clone())? {
            TurnOutcome::AwaitingUser => Ok(Exchange {
                reply,
                prescription: None,
                prescription_pending: false,
            }),
            TurnOutcome::PrescriptionDue(due) => {
                tracing::info!(code = %due.code, "turn limit reached; issuing prescription");
                match self.settle(session, due).await {
                    Ok(prescription) => Ok(Exchange {
                        reply,
                        prescription: Some(prescription),
                        prescription_pending: false,
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "forced prescription failed; awaiting retry");
                        Ok(Exchange {
                            reply,
                            prescription: None,
                            prescription_pending: true,
                        })
                    }
                }
            }
        }
    }

    /// Voluntary prescription, or the retry of a failed forced one.
    pub async fn request_prescription(&self, session: &mut ConversationSession) -> Result<Prescription, CounselError> {
        let due = session.begin_prescription()?;
        self.settle(session, due).await
    }

    async fn settle(&self, session: &mut ConversationSession, due: PrescriptionRequest) -> Result<Prescription, CounselError> {
        match self.orchestrator.prescribe(&due.code, &due.history).await {
            Ok(p) => {
                let p = self.decorate(p, &due.code, false).await;
                session.attach_prescription(p.clone())?;
                Ok(p)
            }
            Err(e) => {
                session.abort_prescription()?;
                Err(e.into())
            }
        }
    }

    /// Shadow prescription for a finished session; generated once, then served from the session.
    pub async fn shadow_prescription(&self, session: &mut ConversationSession) -> Result<Prescription, CounselError> {
        if let Some(cached) = session.shadow() {
            return Ok(cached.clone());
        }
        let due = session.shadow_request()?;
        let p = self.orchestrator.prescribe(&due.code, &due.history).await?;
        let p = self.decorate(p, &due.code, true).await;
        Ok(session.cache_shadow(p).clone())
    }

    /// Stateless prescription. `shadow` prescribes for the inverted code.
    pub async fn prescribe(&self, code: &str, history: &[Turn], shadow: bool) -> Result<Prescription, CounselError> {
        let code = codec::normalize(code);
        let code = code.as_str();
        let (p, issued_for) = if shadow {
            (self.orchestrator.prescribe_shadow(code, history).await?, codec::invert(code))
        } else {
            (self.orchestrator.prescribe(code, history).await?, code.to_string())
        };
        Ok(self.decorate(p, &issued_for, shadow).await)
    }

    pub async fn suggest(&self, code: &str, history: &[Turn]) -> Vec<String> {
        suggestions::suggest(self.generator.as_ref(), &codec::normalize(code), history).await
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        match &self.ledger {
            Some(ledger) => ledger.recent(limit),
            None => Ok(Vec::new()),
        }
    }

    async fn decorate(&self, mut p: Prescription, code: &str, shadow: bool) -> Prescription {
        p.image_url = self.covers.find_cover(&p.title, &p.author).await;
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record(code, shadow, &p) {
                tracing::warn!(error = %e, "could not record prescription in ledger");
            }
        }
        p
    }
}
