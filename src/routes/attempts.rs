use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    GradeAttemptPayload, SaveAnswersRequest, SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::middleware::auth::Claims;
use crate::models::submission::SubmitOutcome;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let submission = state
        .attempt_service
        .start_attempt(id, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(submission.for_student())).into_response())
}

#[axum::debug_handler]
pub async fn attempt_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let history = state.attempt_service.history(id, &claims.sub).await?;
    Ok(Json(history).into_response())
}

#[axum::debug_handler]
pub async fn save_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveAnswersRequest>,
) -> crate::error::Result<Response> {
    let submission = state
        .attempt_service
        .save_answers(id, &claims.sub, req.answers)
        .await?;
    Ok(Json(submission.for_student()).into_response())
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAttemptRequest>,
) -> crate::error::Result<Response> {
    let (submission, outcome) = state
        .attempt_service
        .submit_attempt(id, &claims.sub, req.answers)
        .await?;
    Ok(Json(SubmitAttemptResponse {
        submission: submission.for_student(),
        already_submitted: outcome == SubmitOutcome::AlreadySubmitted,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn grade_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradeAttemptPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    tracing::debug!(grader = %claims.sub, submission_id = %id, "grading attempt");
    let submission = state
        .attempt_service
        .grade_attempt(id, &payload.overrides, payload.feedback)
        .await?;
    Ok(Json(submission).into_response())
}

#[axum::debug_handler]
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let submissions = state.attempt_service.list_for_assessment(id).await?;
    Ok(Json(submissions).into_response())
}
