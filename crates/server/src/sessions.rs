//! Session API endpoints.

use api_types::session::{
    ErrorLogView, LogQuery, PairingView, PhrasesRequest, SessionInit, SessionStatusView,
    SessionView, SettingsUpdateRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{CustomPhrase, EngineError, Language, NlpUpdate, Session, SettingsUpdate, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn view(session: &Session) -> SessionView {
    SessionView {
        id: session.id,
        handle: session.handle.clone(),
        status: session.status.as_str().to_string(),
        last_active: session.last_active,
        language: session.settings.language.as_str().to_string(),
        timezone: session.settings.timezone.clone(),
        auto_reply_enabled: session.settings.auto_reply_enabled,
        nlp_enabled: session.nlp.enabled,
        nlp_confidence: session.nlp.confidence,
    }
}

pub async fn init(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<SessionInit>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state.chat.initialize(user.id, &payload.handle).await?;
    Ok(Json(view(&session)))
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<SessionView>>, ServerError> {
    let sessions = state.engine.sessions_for_user(user.id).await?;
    Ok(Json(sessions.iter().map(view).collect()))
}

pub async fn status(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatusView>, ServerError> {
    let session = state.engine.session(user.id, id).await?;
    Ok(Json(SessionStatusView {
        status: session.status.as_str().to_string(),
        last_active: session.last_active,
    }))
}

pub async fn pairing_code(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PairingView>, ServerError> {
    let session = state.engine.session(user.id, id).await?;
    let pairing_code = session
        .pairing_code
        .ok_or_else(|| EngineError::KeyNotFound("pairing code".to_string()))?;
    Ok(Json(PairingView { pairing_code }))
}

pub async fn update_settings(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettingsUpdateRequest>,
) -> Result<Json<SessionView>, ServerError> {
    let language = payload
        .language
        .as_deref()
        .map(Language::try_from)
        .transpose()?;

    let settings = SettingsUpdate {
        auto_reply_enabled: payload.auto_reply_enabled,
        auto_reply_text: payload.auto_reply_text,
        notify_budget_alerts: payload.notify_budget_alerts,
        notify_daily_summary: payload.notify_daily_summary,
        notify_weekly_report: payload.notify_weekly_report,
        language,
        timezone: payload.timezone,
    };
    state
        .engine
        .update_session_settings(user.id, id, settings)
        .await?;

    let session = state
        .engine
        .update_nlp_settings(
            user.id,
            id,
            NlpUpdate {
                enabled: payload.nlp_enabled,
                confidence: payload.nlp_confidence,
            },
        )
        .await?;
    Ok(Json(view(&session)))
}

pub async fn add_phrases(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PhrasesRequest>,
) -> Result<Json<Vec<api_types::session::PhraseView>>, ServerError> {
    let phrases = payload
        .phrases
        .into_iter()
        .map(|p| CustomPhrase {
            phrase: p.phrase,
            intent: p.intent,
            examples: p.examples,
        })
        .collect();
    let stored = state.engine.add_custom_phrases(user.id, id, phrases).await?;
    Ok(Json(
        stored
            .into_iter()
            .map(|p| api_types::session::PhraseView {
                phrase: p.phrase,
                intent: p.intent,
                examples: p.examples,
            })
            .collect(),
    ))
}

pub async fn error_logs(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ErrorLogView>>, ServerError> {
    let entries = state
        .engine
        .session_errors(
            user.id,
            id,
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(50),
        )
        .await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|entry| ErrorLogView {
                at: entry.at,
                error: entry.error,
                context: entry.context,
            })
            .collect(),
    ))
}

pub async fn disconnect(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state.chat.disconnect(user.id, id).await?;
    Ok(Json(view(&session)))
}

pub async fn expire(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state.engine.expire_session(user.id, id).await?;
    Ok(Json(view(&session)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.chat.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
