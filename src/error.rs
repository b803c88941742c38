use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;

use crate::models::assessment::AssessmentType;
use crate::models::question::QuestionType;
use crate::models::submission::SubmissionStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Malformed question, rubric or milestone shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    TooFewOptions { found: usize },
    MissingCorrectAnswer,
    CorrectAnswerNotAnOption,
    UnexpectedOptions,
    QuestionTypeNotAllowed {
        question_type: QuestionType,
        assessment_type: AssessmentType,
    },
    PassingScoreOutOfRange { value: u32 },
    ZeroAttempts,
    InvalidAvailabilityWindow,
    LevelExceedsCriterionMax { level: usize, points: u32, max_points: u32 },
    InvalidDueWeek,
    PointsOutOfRange { points: u32, max: u32 },
    TotalPointsOutOfRange { max: u32 },
    ScoreExceedsMax { points: u32, max_points: u32 },
    UnknownQuestionIndex { index: usize },
    InvalidDeliverableUrl,
    FieldNotApplicable { assessment_type: AssessmentType },
    Malformed { reason: String },
}

/// Structural or lifecycle invariant that an operation would break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Invariant {
    MinimumQuestions { assessment_type: AssessmentType },
    NotQuestionBased { assessment_type: AssessmentType },
    NotCapstone { assessment_type: AssessmentType },
    QuestionIndexOutOfRange { index: usize, len: usize },
    ReorderLengthMismatch { expected: usize, found: usize },
    StructureLockedBySubmissions { submissions: u64 },
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
    NotPublished,
    OutsideAvailabilityWindow,
    AwaitingGrading { attempt_number: u32 },
}

/// Reasons an assessment cannot be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum PublishProblem {
    NoQuestions,
    EmptyQuestionText { index: usize },
    InvalidQuestion { index: usize, issue: ValidationIssue },
    NoProjectOptions,
    NoRubric,
    EmptyProjectOptionTitle { index: usize },
    EmptyCriterionName { index: usize },
    InvalidCriterion { index: usize, issue: ValidationIssue },
    NoMilestones,
    EmptyMilestoneTitle { index: usize },
    InvalidMilestone { index: usize, issue: ValidationIssue },
    InvalidSettings { issue: ValidationIssue },
    ZeroTotalPoints,
}

/// Recoverable domain outcomes. These carry machine-readable detail only;
/// wording for people is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DomainError {
    #[error("validation failed at {path}: {issue:?}")]
    Validation { path: String, issue: ValidationIssue },

    #[error("invariant violation: {invariant:?}")]
    InvariantViolation { invariant: Invariant },

    #[error("assessment is not gradable: {problems:?}")]
    NotGradable { problems: Vec<PublishProblem> },

    #[error("attempt limit exceeded: {used} of {limit} used")]
    AttemptLimitExceeded { used: u32, limit: u32 },

    #[error("already passed on attempt {attempt_number}")]
    AlreadyPassed { attempt_number: u32 },

    #[error("incomplete submission, unanswered: {missing:?}")]
    IncompleteSubmission { missing: Vec<usize> },
}

impl DomainError {
    pub fn validation(path: impl Into<String>, issue: ValidationIssue) -> Self {
        DomainError::Validation {
            path: path.into(),
            issue,
        }
    }

    pub fn invariant(invariant: Invariant) -> Self {
        DomainError::InvariantViolation { invariant }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation_error",
            DomainError::InvariantViolation { .. } => "invariant_violation",
            DomainError::NotGradable { .. } => "not_gradable",
            DomainError::AttemptLimitExceeded { .. } => "attempt_limit_exceeded",
            DomainError::AlreadyPassed { .. } => "already_passed",
            DomainError::IncompleteSubmission { .. } => "incomplete_submission",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DomainError::Validation { .. }
            | DomainError::InvariantViolation { .. }
            | DomainError::IncompleteSubmission { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::NotGradable { .. }
            | DomainError::AttemptLimitExceeded { .. }
            | DomainError::AlreadyPassed { .. } => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::Domain(err) = &self {
            let body = Json(json!({ "error": err.code(), "detail": err }));
            return (err.status(), body).into_response();
        }

        let (status, code, detail) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, "invalid_payload", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "invalid_json", err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, "upstream_error", err.to_string()),
            Error::Database(err) => {
                tracing::error!(error = ?err, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", String::new())
            }
            other => {
                tracing::error!(error = ?other, "unhandled error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", String::new())
            }
        };

        let body = Json(json!({ "error": code, "detail": detail }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                Error::Conflict("Concurrent write on the same record".to_string())
            }
            other => Error::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn domain_errors_render_machine_codes() {
        let err = Error::from(DomainError::AttemptLimitExceeded { used: 2, limit: 2 });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "attempt_limit_exceeded");
        assert_eq!(body["detail"]["used"], 2);
        assert_eq!(body["detail"]["limit"], 2);
    }

    #[test]
    fn incomplete_submission_maps_to_unprocessable() {
        let err = DomainError::IncompleteSubmission { missing: vec![1] };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "incomplete_submission");
    }
}
