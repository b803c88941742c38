use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::{
    AddQuestionPayload, AssessmentResponse, CreateAssessmentPayload, GenerateQuestionsPayload,
    GenerateQuestionsResponse, ListAssessmentsQuery, QuestionAddedResponse,
    QuestionRemovedResponse, ReorderPayload, StructuralEditQuery, SwitchTypePayload,
    TypeSwitchResponse, UpdateAssessmentPayload,
};
use crate::AppState;

#[axum::debug_handler]
pub async fn create_assessment(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssessmentPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let assessment = state.assessment_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(AssessmentResponse::from(assessment))).into_response())
}

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Query(query): Query<ListAssessmentsQuery>,
) -> crate::error::Result<Response> {
    let assessments = state
        .assessment_service
        .list(query.course_id.as_deref())
        .await?;
    let body: Vec<AssessmentResponse> = assessments.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let assessment = state.assessment_service.get(id).await?;
    Ok(Json(AssessmentResponse::from(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn update_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let assessment = state.assessment_service.update(id, payload).await?;
    Ok(Json(AssessmentResponse::from(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn delete_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.assessment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn publish_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let assessment = state.assessment_service.publish(id).await?;
    Ok(Json(AssessmentResponse::from(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn unpublish_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let assessment = state.assessment_service.unpublish(id).await?;
    Ok(Json(AssessmentResponse::from(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn switch_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SwitchTypePayload>,
) -> crate::error::Result<Response> {
    let (assessment, switch) = state
        .assessment_service
        .switch_type(id, payload.assessment_type, payload.new_version)
        .await?;
    Ok(Json(TypeSwitchResponse {
        assessment: assessment.into(),
        switch,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddQuestionPayload>,
) -> crate::error::Result<Response> {
    let (assessment, index) = state
        .assessment_service
        .add_question(id, payload.question, payload.new_version)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(QuestionAddedResponse {
            index,
            assessment: assessment.into(),
        }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn remove_question(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(query): Query<StructuralEditQuery>,
) -> crate::error::Result<Response> {
    let (assessment, removed) = state
        .assessment_service
        .remove_question(id, index, query.new_version)
        .await?;
    Ok(Json(QuestionRemovedResponse {
        removed,
        assessment: assessment.into(),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderPayload>,
) -> crate::error::Result<Response> {
    let assessment = state
        .assessment_service
        .reorder(id, payload.target, payload.order, payload.new_version)
        .await?;
    Ok(Json(AssessmentResponse::from(assessment)).into_response())
}

#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateQuestionsPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let (outcome, assessment) = state
        .assessment_service
        .generate_questions(id, payload)
        .await?;
    Ok(Json(GenerateQuestionsResponse {
        outcome,
        assessment: assessment.map(Into::into),
    })
    .into_response())
}
