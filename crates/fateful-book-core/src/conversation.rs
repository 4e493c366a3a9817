//! Counseling sessions and their turn state machine.
//!
//! `Idle → Active → Prescribing → Done`. A turn is a user message plus the counselor reply.
//! The user turn is appended optimistically by [`ConversationSession::begin_turn`] and either
//! confirmed by [`ConversationSession::complete_turn`] or undone by
//! [`ConversationSession::rollback_turn`] when the collaborator fails, so a failed call never
//! counts against the turn limit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archetype::Archetype;
use crate::codec;
use crate::prescription::Prescription;
use crate::prompts;
use crate::scoring::AxisScores;

pub const DEFAULT_MIN_TURNS: u32 = 3;
pub const DEFAULT_MAX_TURNS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// The generation API's own voice ("assistant" / "model").
    #[serde(alias = "assistant", alias = "model")]
    Counselor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(alias = "content")]
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn counselor(text: impl Into<String>) -> Self {
        Self {
            role: Role::Counselor,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Created, no turns yet.
    Idle,
    /// One or more turns exchanged.
    Active,
    /// A prescription request is in flight.
    Prescribing,
    /// Terminal; prescription attached.
    Done,
}

/// Turn thresholds: voluntary prescriptions need `min_turns`, `max_turns` forces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnLimits {
    pub min_turns: u32,
    pub max_turns: u32,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            min_turns: DEFAULT_MIN_TURNS,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("message is required")]
    EmptyMessage,
    #[error("a turn is already awaiting its reply")]
    TurnInFlight,
    #[error("no turn is awaiting a reply")]
    NoTurnInFlight,
    #[error("the turn limit of {0} has been reached; a prescription is due")]
    TurnLimitReached(u32),
    #[error("the session does not accept this in phase {0:?}")]
    WrongPhase(Phase),
    #[error("{turns} of {min_turns} turns exchanged; keep talking before asking for a prescription")]
    TooEarly { turns: u32, min_turns: u32 },
    #[error("there is no completed exchange to undo")]
    NothingToUndo,
}

impl ConversationError {
    /// Caller mistakes (bad input), as opposed to requests that conflict with session state.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConversationError::EmptyMessage)
    }
}

/// What the collaborator receives for one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Persona instruction, present on the first turn only.
    pub system_prompt: Option<String>,
    /// Sanitized prior turns; never ends on a user turn.
    pub history: Vec<Turn>,
    /// The live user message.
    pub message: String,
}

impl ChatRequest {
    pub fn new(code: &str, history: &[Turn], message: impl Into<String>) -> Self {
        let history = sanitize_history(history);
        let system_prompt = history.is_empty().then(|| prompts::persona_prompt(code));
        Self {
            system_prompt,
            history,
            message: message.into(),
        }
    }

    pub fn is_first_turn(&self) -> bool {
        self.system_prompt.is_some()
    }
}

/// What the collaborator receives for a prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionRequest {
    pub code: String,
    pub history: Vec<Turn>,
}

/// Result of confirming a counselor reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    AwaitingUser,
    /// The maximum was reached; the session is now `Prescribing` and the request must be issued.
    PrescriptionDue(PrescriptionRequest),
}

/// Drops leading non-user turns, then trailing user turns (the live message travels separately).
/// Idempotent: the output starts with a user turn and ends with a counselor turn, or is empty.
pub fn sanitize_history(turns: &[Turn]) -> Vec<Turn> {
    let start = turns
        .iter()
        .position(|t| t.role == Role::User)
        .unwrap_or(turns.len());
    let mut cleaned = turns[start..].to_vec();
    while cleaned.last().is_some_and(|t| t.role == Role::User) {
        cleaned.pop();
    }
    cleaned
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    turns_len: usize,
    turn_count: u32,
    phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    archetype_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<AxisScores>,
    turns: Vec<Turn>,
    turn_count: u32,
    phase: Phase,
    limits: TurnLimits,
    #[serde(skip)]
    pending: Option<Checkpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prescription: Option<Prescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shadow: Option<Prescription>,
}

impl ConversationSession {
    pub fn new(code: impl Into<String>, limits: TurnLimits) -> Self {
        Self {
            code: code.into(),
            archetype_id: None,
            scores: None,
            turns: Vec::new(),
            turn_count: 0,
            phase: Phase::Idle,
            limits,
            pending: None,
            prescription: None,
            shadow: None,
        }
    }

    /// Session whose code comes from a diagnosed archetype.
    pub fn from_profile(archetype: &Archetype, scores: AxisScores, limits: TurnLimits) -> Self {
        let mut session = Self::new(archetype.code, limits);
        session.archetype_id = Some(archetype.id.to_string());
        session.scores = Some(scores);
        session
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn shadow_code(&self) -> String {
        codec::invert(&self.code)
    }

    pub fn archetype_id(&self) -> Option<&str> {
        self.archetype_id.as_deref()
    }

    pub fn scores(&self) -> Option<&AxisScores> {
        self.scores.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn limits(&self) -> TurnLimits {
        self.limits
    }

    pub fn prescription(&self) -> Option<&Prescription> {
        self.prescription.as_ref()
    }

    pub fn shadow(&self) -> Option<&Prescription> {
        self.shadow.as_ref()
    }

    pub fn turn_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// True when a voluntary prescription request would be accepted.
    pub fn can_request_prescription(&self) -> bool {
        self.phase == Phase::Active
            && self.pending.is_none()
            && self.turn_count >= self.limits.min_turns
    }

    /// Appends the user turn, counts it, and returns the collaborator request.
    pub fn begin_turn(&mut self, message: &str) -> Result<ChatRequest, ConversationError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        if self.pending.is_some() {
            return Err(ConversationError::TurnInFlight);
        }
        if !matches!(self.phase, Phase::Idle | Phase::Active) {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        if self.turn_count >= self.limits.max_turns {
            return Err(ConversationError::TurnLimitReached(self.limits.max_turns));
        }

        self.pending = Some(Checkpoint {
            turns_len: self.turns.len(),
            turn_count: self.turn_count,
            phase: self.phase,
        });
        self.turns.push(Turn::user(message));
        self.turn_count += 1;
        self.phase = Phase::Active;

        Ok(ChatRequest::new(&self.code, &self.turns, message))
    }

    /// Confirms the in-flight turn with the counselor reply.
    pub fn complete_turn(&mut self, reply: impl Into<String>) -> Result<TurnOutcome, ConversationError> {
        if self.pending.take().is_none() {
            return Err(ConversationError::NoTurnInFlight);
        }
        self.turns.push(Turn::counselor(reply));

        if self.turn_count >= self.limits.max_turns {
            self.phase = Phase::Prescribing;
            return Ok(TurnOutcome::PrescriptionDue(self.prescription_request(&self.code)));
        }
        Ok(TurnOutcome::AwaitingUser)
    }

    /// Reverts the in-flight turn after a collaborator failure.
    pub fn rollback_turn(&mut self) -> Result<(), ConversationError> {
        let checkpoint = self.pending.take().ok_or(ConversationError::NoTurnInFlight)?;
        self.turns.truncate(checkpoint.turns_len);
        self.turn_count = checkpoint.turn_count;
        self.phase = checkpoint.phase;
        Ok(())
    }

    /// Removes the most recent user/counselor pair. Local only.
    pub fn undo_last_exchange(&mut self) -> Result<(), ConversationError> {
        if self.phase != Phase::Active {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        if self.pending.is_some() {
            return Err(ConversationError::TurnInFlight);
        }
        let n = self.turns.len();
        let has_pair = n >= 2
            && self.turns[n - 1].role == Role::Counselor
            && self.turns[n - 2].role == Role::User;
        if !has_pair {
            return Err(ConversationError::NothingToUndo);
        }

        self.turns.truncate(n - 2);
        self.turn_count = self.turn_count.saturating_sub(1);
        if self.turns.is_empty() {
            self.phase = Phase::Idle;
        }
        Ok(())
    }

    /// Voluntary prescription request; moves the session to `Prescribing`.
    pub fn begin_prescription(&mut self) -> Result<PrescriptionRequest, ConversationError> {
        if self.pending.is_some() {
            return Err(ConversationError::TurnInFlight);
        }
        if self.phase != Phase::Active {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        if self.turn_count < self.limits.min_turns {
            return Err(ConversationError::TooEarly {
                turns: self.turn_count,
                min_turns: self.limits.min_turns,
            });
        }
        self.phase = Phase::Prescribing;
        Ok(self.prescription_request(&self.code))
    }

    /// Attaches the issued prescription; the session becomes terminal.
    pub fn attach_prescription(&mut self, prescription: Prescription) -> Result<(), ConversationError> {
        if self.phase != Phase::Prescribing {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        self.prescription = Some(prescription);
        self.phase = Phase::Done;
        Ok(())
    }

    /// Returns to `Active` after a failed prescription call so it can be retried.
    pub fn abort_prescription(&mut self) -> Result<(), ConversationError> {
        if self.phase != Phase::Prescribing {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        self.phase = Phase::Active;
        Ok(())
    }

    /// Request for the shadow prescription, keyed by the inverted code. Requires `Done`.
    pub fn shadow_request(&self) -> Result<PrescriptionRequest, ConversationError> {
        if self.phase != Phase::Done {
            return Err(ConversationError::WrongPhase(self.phase));
        }
        Ok(self.prescription_request(&self.shadow_code()))
    }

    /// Caches the shadow prescription; the first one stored wins.
    pub fn cache_shadow(&mut self, prescription: Prescription) -> &Prescription {
        self.shadow.get_or_insert(prescription)
    }

    fn prescription_request(&self, code: &str) -> PrescriptionRequest {
        PrescriptionRequest {
            code: code.to_string(),
            history: self.turns.clone(),
        }
    }
}
