//! HTTP routes. Stateless routes take the history from the caller on every request;
//! `/api/sessions` hosts the conversation state machine server-side.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use fateful_book_core::{
    accumulate, derive_code, invert, match_archetype, normalize_code, questions, Archetype, AxisScores, Choice, ConversationSession,
    LedgerEntry, Prescription, Question, Turn,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, SharedSession};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

type ApiResult<T> = Result<T, ApiError>;
type JsonBody<T> = Result<Json<T>, JsonRejection>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/questions", get(list_questions))
        .route("/api/diagnose", post(diagnose))
        .route("/api/code", post(short_form_code))
        .route("/api/chat", post(chat))
        .route("/api/prescription", post(prescription))
        .route("/api/suggestions", post(suggestions))
        .route("/api/history", get(history))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        .route("/api/sessions/:id/messages", post(send_message))
        .route("/api/sessions/:id/prescription", post(session_prescription))
        .route("/api/sessions/:id/shadow", post(session_shadow))
        .route("/api/sessions/:id/undo", post(undo))
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    tracing::info!("[GATEWAY] {} {} -> {}", method, path, response.status().as_u16());
    response
}

async fn health() -> &'static str {
    "OK"
}

async fn list_questions() -> Json<&'static [Question]> {
    Json(questions())
}

#[derive(Deserialize)]
struct DiagnoseRequest {
    answers: Vec<Choice>,
}

#[derive(Serialize)]
struct Diagnosis {
    scores: AxisScores,
    archetype: &'static Archetype,
    code: &'static str,
}

fn diagnose_answers(answers: &[Choice]) -> Diagnosis {
    let scores = accumulate(answers);
    let archetype = match_archetype(&scores);
    Diagnosis {
        scores,
        archetype,
        code: archetype.code,
    }
}

async fn diagnose(payload: JsonBody<DiagnoseRequest>) -> ApiResult<Json<Diagnosis>> {
    let Json(body) = payload?;
    Ok(Json(diagnose_answers(&body.answers)))
}

#[derive(Deserialize)]
struct CodeRequest {
    answers: Vec<u8>,
}

async fn short_form_code(payload: JsonBody<CodeRequest>) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let code = derive_code(&body.answers)?;
    let shadow = invert(&code);
    Ok(Json(json!({ "code": code, "shadow": shadow })))
}

#[derive(Deserialize)]
struct ChatRequestBody {
    #[serde(default)]
    personality: String,
    #[serde(default)]
    history: Vec<Turn>,
    #[serde(default)]
    message: Option<String>,
}

async fn chat(State(state): State<Arc<AppState>>, payload: JsonBody<ChatRequestBody>) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("message is required"))?;

    let reply = state.counsel.chat(&body.personality, &body.history, &message).await?;
    Ok(Json(json!({ "reply": reply })))
}

#[derive(Deserialize)]
struct PrescriptionRequestBody {
    #[serde(default)]
    personality: Option<String>,
    #[serde(default)]
    history: Vec<Turn>,
    /// Prescribe for the inverted code.
    #[serde(default)]
    shadow: bool,
}

async fn prescription(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PrescriptionRequestBody>,
) -> ApiResult<Json<Prescription>> {
    let Json(body) = payload?;
    let code = body
        .personality
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("personality is required"))?;

    let p = state.counsel.prescribe(&code, &body.history, body.shadow).await?;
    Ok(Json(p))
}

#[derive(Deserialize)]
struct SuggestionRequestBody {
    #[serde(default)]
    personality: String,
    #[serde(default)]
    history: Vec<Turn>,
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<SuggestionRequestBody>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let options = state.counsel.suggest(&body.personality, &body.history).await;
    Ok(Json(json!({ "options": options })))
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    Ok(Json(state.counsel.recent(limit)?))
}

// --- Sessions ---

#[derive(Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    personality: Option<String>,
    #[serde(default)]
    answers: Option<Vec<Choice>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    id: Uuid,
    #[serde(flatten)]
    session: &'a ConversationSession,
    can_request_prescription: bool,
}

fn view(id: Uuid, session: &ConversationSession) -> ApiResult<Json<Value>> {
    let view = SessionView {
        id,
        session,
        can_request_prescription: session.can_request_prescription(),
    };
    let value = serde_json::to_value(view).map_err(|e| ApiError::internal("session snapshot failed", e.to_string()))?;
    Ok(Json(value))
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::session_not_found(raw))
}

fn lookup(state: &AppState, raw: &str) -> ApiResult<(Uuid, SharedSession)> {
    let id = parse_id(raw)?;
    let session = state.sessions.get(&id).ok_or_else(|| ApiError::session_not_found(raw))?;
    Ok((id, session))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let session = match (body.personality, body.answers) {
        (Some(code), _) if !code.trim().is_empty() => {
            ConversationSession::new(normalize_code(&code), state.limits)
        }
        (_, Some(answers)) => {
            let diagnosis = diagnose_answers(&answers);
            ConversationSession::from_profile(diagnosis.archetype, diagnosis.scores, state.limits)
        }
        _ => return Err(ApiError::bad_request("personality or answers is required")),
    };

    let id = state.sessions.insert(session.clone());
    tracing::info!(
        "[SYSTEM] Session {} opened for {} ({} active)",
        id,
        session.code(),
        state.sessions.len()
    );
    Ok((StatusCode::CREATED, view(id, &session)?))
}

async fn get_session(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> ApiResult<Json<Value>> {
    let (id, session) = lookup(&state, &raw)?;
    let session = session.lock().await;
    view(id, &session)
}

async fn close_session(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&raw)?;
    state.sessions.remove(&id).ok_or_else(|| ApiError::session_not_found(&raw))?;
    tracing::info!("[SYSTEM] Session {} closed ({} active)", id, state.sessions.len());
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: Option<String>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    payload: JsonBody<MessageRequest>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let (_, session) = lookup(&state, &raw)?;
    let message = body.message.unwrap_or_default();

    let mut session = session.lock().await;
    let exchange = state.counsel.send_message(&mut session, &message).await?;

    Ok(Json(json!({
        "reply": exchange.reply,
        "prescription": exchange.prescription,
        "prescriptionPending": exchange.prescription_pending,
        "turnCount": session.turn_count(),
        "phase": session.phase(),
        "turns": session.turns(),
    })))
}

async fn session_prescription(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Prescription>> {
    let (_, session) = lookup(&state, &raw)?;
    let mut session = session.lock().await;
    let p = state.counsel.request_prescription(&mut session).await?;
    Ok(Json(p))
}

async fn session_shadow(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> ApiResult<Json<Prescription>> {
    let (_, session) = lookup(&state, &raw)?;
    let mut session = session.lock().await;
    let p = state.counsel.shadow_prescription(&mut session).await?;
    Ok(Json(p))
}

async fn undo(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> ApiResult<Json<Value>> {
    let (id, session) = lookup(&state, &raw)?;
    let mut session = session.lock().await;
    session.undo_last_exchange()?;
    view(id, &session)
}
