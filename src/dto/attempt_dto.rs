use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::submission::{AnswerEntry, Submission};
use crate::services::grading_service::ScoreOverride;

#[derive(Debug, Deserialize)]
pub struct SaveAnswersRequest {
    pub answers: Vec<AnswerEntry>,
}

/// Final answers sent with the submit call; merged over saved draft answers.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GradeAttemptPayload {
    #[serde(default)]
    pub overrides: Vec<ScoreOverride>,
    #[validate(length(max = 10000, message = "feedback is too long"))]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub submission: Submission,
    pub already_submitted: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptHistoryResponse {
    pub submissions: Vec<Submission>,
    pub attempts_used: u32,
    pub attempts_allowed: u32,
    pub can_retake: bool,
}
