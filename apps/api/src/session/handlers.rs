use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::questions::generate_with_fallback;
use crate::intake::resume::extract_resume_fields;
use crate::session::clock::Clock;
use crate::session::controller::{Collaborators, SessionSnapshot};
use crate::session::error::SessionError;
use crate::session::models::{Interview, InterviewMode, InterviewStatus, Response, TerminationReason};
use crate::session::profile::ProfileField;
use crate::session::report::FinalReport;
use crate::session::runtime::{spawn_session, SessionHandle};
use crate::session::signals::EnvironmentSignal;
use crate::state::AppState;

async fn live_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))
}

fn parse_mode(raw: &str) -> Result<InterviewMode, AppError> {
    match raw.trim() {
        "" | "proctored" => Ok(InterviewMode::Proctored),
        "practice" => Ok(InterviewMode::Practice),
        other => Err(AppError::Validation(format!(
            "mode must be 'proctored' or 'practice', got '{other}'"
        ))),
    }
}

/// POST /api/v1/interviews
///
/// Multipart fields: `resume` (PDF or text file), `position`, optional `mode`.
pub async fn handle_create_interview(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let mut resume: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut position = None;
    let mut mode = InterviewMode::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            AppError::Validation(format!("could not read field '{name}': {e}"))
        };
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(read_err)?;
                resume = Some((data, content_type, file_name));
            }
            "position" => position = Some(field.text().await.map_err(read_err)?),
            "mode" => mode = parse_mode(&field.text().await.map_err(read_err)?)?,
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let (data, content_type, file_name) =
        resume.ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;
    let position = position
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("position is required".to_string()))?;

    let extracted =
        extract_resume_fields(data, content_type.as_deref(), file_name.as_deref()).await?;
    let interview = Interview::new(Uuid::new_v4(), mode, extracted.into_profile(position));
    let id = interview.id;

    let collaborators = Collaborators {
        scorer: Arc::clone(&state.scorer),
        observer: state.store.clone(),
    };
    let handle = spawn_session(
        interview,
        collaborators,
        state.config.engine_settings(),
        Clock::default(),
    );
    let snapshot = handle.snapshot().await?;
    state.sessions.insert(handle).await;

    info!(
        interview_id = %id,
        ?mode,
        status = %snapshot.interview.status,
        missing = snapshot.missing_fields.len(),
        "interview session created"
    );
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// PATCH /api/v1/interviews/:id/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = live_session(&state, id).await?;
    let updates = [
        (ProfileField::Name, req.name),
        (ProfileField::Email, req.email),
        (ProfileField::Phone, req.phone),
    ];
    for (field, value) in updates {
        if let Some(value) = value {
            handle.provide_field(field, value).await?;
        }
    }
    Ok(Json(handle.snapshot().await?))
}

/// POST /api/v1/interviews/:id/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = live_session(&state, id).await?;
    let current = handle.snapshot().await?;
    if current.interview.status != InterviewStatus::Confirming {
        return Err(SessionError::InvalidTransition {
            status: current.interview.status,
            action: "start the interview",
        }
        .into());
    }

    let candidate = &current.interview.candidate;
    let questions = generate_with_fallback(
        state.question_generator.as_ref(),
        &candidate.resume_text,
        &candidate.position,
        &state.config.question_plan,
    )
    .await;
    handle.start(questions).await?;
    Ok(Json(handle.snapshot().await?))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub text: String,
}

/// PUT /api/v1/interviews/:id/draft
///
/// Drafts for a question that is already closed are dropped, not rejected.
pub async fn handle_update_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<StatusCode, AppError> {
    let handle = live_session(&state, id).await?;
    match handle.update_draft(req.question_index, req.text).await {
        Ok(()) => {}
        Err(
            e @ (SessionError::AlreadyAnswered { .. } | SessionError::TerminationInFlight { .. }),
        ) => debug!(interview_id = %id, error = %e, "draft ignored"),
        Err(e) => return Err(e.into()),
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    /// False when the question was already answered or the session is closing.
    pub accepted: bool,
    pub response: Option<Response>,
    pub snapshot: SessionSnapshot,
}

/// POST /api/v1/interviews/:id/responses
pub async fn handle_submit_response(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let handle = live_session(&state, id).await?;
    let response = match handle.submit(req.question_index, req.text).await {
        Ok(response) => Some(response),
        Err(
            e @ (SessionError::AlreadyAnswered { .. } | SessionError::TerminationInFlight { .. }),
        ) => {
            debug!(interview_id = %id, error = %e, "submission not accepted");
            None
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SubmitOutcome {
        accepted: response.is_some(),
        response,
        snapshot: handle.snapshot().await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct SignalAck {
    pub delivered: usize,
}

/// POST /api/v1/interviews/:id/signals
pub async fn handle_push_signal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(signal): Json<EnvironmentSignal>,
) -> Result<(StatusCode, Json<SignalAck>), AppError> {
    let handle = live_session(&state, id).await?;
    let delivered = handle.publish_signal(signal);
    Ok((StatusCode::ACCEPTED, Json(SignalAck { delivered })))
}

#[derive(Debug, Default, Deserialize)]
pub struct TerminateRequest {
    pub note: Option<String>,
}

/// POST /api/v1/interviews/:id/terminate
pub async fn handle_terminate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<TerminateRequest>>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = live_session(&state, id).await?;
    let note = body.and_then(|Json(req)| req.note);
    handle.terminate(TerminationReason::Requested { note }).await?;
    Ok(Json(handle.snapshot().await?))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = live_session(&state, id).await?;
    Ok(Json(handle.snapshot().await?))
}

/// GET /api/v1/interviews/:id/report
///
/// Served from the live session when it is still registered, else from the archive.
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalReport>, AppError> {
    if let Some(handle) = state.sessions.get(id).await {
        let snapshot = handle.snapshot().await?;
        return snapshot.report.map(Json).ok_or_else(|| {
            AppError::Conflict(format!(
                "Interview {id} is still {}; no report yet",
                snapshot.interview.status
            ))
        });
    }

    state
        .store
        .fetch_report(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No report for interview {id}")))
}
