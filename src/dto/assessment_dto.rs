use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{DomainError, ValidationIssue};
use crate::models::assessment::{
    Assessment, AssessmentContent, AssessmentType, CapstoneMilestone, ProjectOption,
    ReorderTarget, RubricCriterion, TypeSwitch,
};
use crate::models::question::{Question, QuestionDraft, QuestionType};
use crate::models::type_policy::{ScoringShape, SettingFlags};
use crate::services::ai_service::GenerationOutcome;

/// Type-specific lists as sent by clients. Only the lists that belong to the
/// assessment's type may be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentParts {
    pub questions: Option<Vec<QuestionDraft>>,
    pub project_options: Option<Vec<ProjectOption>>,
    pub rubric: Option<Vec<RubricCriterion>>,
    pub milestones: Option<Vec<CapstoneMilestone>>,
}

impl ContentParts {
    pub fn is_empty(&self) -> bool {
        self.questions.is_none()
            && self.project_options.is_none()
            && self.rubric.is_none()
            && self.milestones.is_none()
    }

    /// Builds content for `assessment_type`, starting from `base` (current or
    /// default content) and replacing only the lists that were sent.
    pub fn into_content(
        self,
        assessment_type: AssessmentType,
        base: AssessmentContent,
    ) -> Result<AssessmentContent, DomainError> {
        let not_applicable = |field: &str| {
            DomainError::validation(
                field,
                ValidationIssue::FieldNotApplicable { assessment_type },
            )
        };

        match base {
            AssessmentContent::Quiz { questions } | AssessmentContent::Assignment { questions } => {
                if self.project_options.is_some() {
                    return Err(not_applicable("project_options"));
                }
                if self.rubric.is_some() {
                    return Err(not_applicable("rubric"));
                }
                if self.milestones.is_some() {
                    return Err(not_applicable("milestones"));
                }
                let questions = match self.questions {
                    Some(drafts) => build_questions(drafts)?,
                    None => questions,
                };
                let content = if assessment_type == AssessmentType::Quiz {
                    AssessmentContent::Quiz { questions }
                } else {
                    AssessmentContent::Assignment { questions }
                };
                content.check_question_types()?;
                Ok(content)
            }
            AssessmentContent::Project {
                project_options,
                rubric,
            } => {
                if self.questions.is_some() {
                    return Err(not_applicable("questions"));
                }
                if self.milestones.is_some() {
                    return Err(not_applicable("milestones"));
                }
                let rubric = self.rubric.unwrap_or(rubric);
                for (idx, criterion) in rubric.iter().enumerate() {
                    criterion
                        .check()
                        .map_err(|issue| DomainError::validation(format!("rubric[{idx}]"), issue))?;
                }
                Ok(AssessmentContent::Project {
                    project_options: self.project_options.unwrap_or(project_options),
                    rubric,
                })
            }
            AssessmentContent::Capstone { milestones } => {
                if self.questions.is_some() {
                    return Err(not_applicable("questions"));
                }
                if self.project_options.is_some() {
                    return Err(not_applicable("project_options"));
                }
                if self.rubric.is_some() {
                    return Err(not_applicable("rubric"));
                }
                let milestones = self.milestones.unwrap_or(milestones);
                for (idx, milestone) in milestones.iter().enumerate() {
                    milestone.check().map_err(|issue| {
                        DomainError::validation(format!("milestones[{idx}]"), issue)
                    })?;
                }
                Ok(AssessmentContent::Capstone { milestones })
            }
        }
    }
}

fn build_questions(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, DomainError> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| Question::new(draft).map_err(|e| at_path(e, format!("questions[{idx}]"))))
        .collect()
}

/// Re-anchors a question-level validation error at its position in a list.
pub fn at_path(err: DomainError, path: String) -> DomainError {
    match err {
        DomainError::Validation { issue, .. } => DomainError::Validation { path, issue },
        other => other,
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssessmentPayload {
    #[validate(length(min = 1, message = "course_id cannot be empty"))]
    pub course_id: String,
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    #[validate(range(max = 100))]
    pub passing_score: Option<u32>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<u32>,
    #[validate(range(min = 1))]
    pub attempts: Option<u32>,
    pub is_required_for_completion: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub content: ContentParts,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAssessmentPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[validate(range(max = 100, message = "Passing score must be between 0 and 100"))]
    pub passing_score: Option<u32>,

    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: Option<u32>,

    #[validate(range(min = 1, message = "Attempts must be at least 1"))]
    pub attempts: Option<u32>,

    pub is_required_for_completion: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub content: ContentParts,

    /// Acknowledges that a structural edit on a published, attempted
    /// assessment creates a new version.
    #[serde(default)]
    pub new_version: bool,
}

impl UpdateAssessmentPayload {
    pub fn is_structural(&self) -> bool {
        !self.content.is_empty()
    }
}

// Trims strings and turns blank ones into None
fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct SwitchTypePayload {
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    #[serde(default)]
    pub new_version: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddQuestionPayload {
    #[serde(flatten)]
    pub question: QuestionDraft,
    #[serde(default)]
    pub new_version: bool,
}

#[derive(Debug, Deserialize)]
pub struct StructuralEditQuery {
    #[serde(default)]
    pub new_version: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPayload {
    pub target: ReorderTarget,
    pub order: Vec<i64>,
    #[serde(default)]
    pub new_version: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuestionsPayload {
    #[validate(length(min = 1, message = "topic cannot be empty"))]
    pub topic: String,
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: usize,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub new_version: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListAssessmentsQuery {
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResponse {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub total_points: u32,
    pub scoring: ScoringShape,
    pub settings: SettingFlags,
    pub allowed_question_types: &'static [QuestionType],
}

impl From<Assessment> for AssessmentResponse {
    fn from(assessment: Assessment) -> Self {
        let policy = assessment.policy();
        Self {
            total_points: assessment.total_points(),
            scoring: policy.scoring,
            settings: policy.settings,
            allowed_question_types: policy.allowed_question_types,
            assessment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TypeSwitchResponse {
    pub assessment: AssessmentResponse,
    /// `None` when the requested type was already in place.
    pub switch: Option<TypeSwitch>,
}

#[derive(Debug, Serialize)]
pub struct QuestionAddedResponse {
    pub index: usize,
    pub assessment: AssessmentResponse,
}

#[derive(Debug, Serialize)]
pub struct QuestionRemovedResponse {
    pub removed: Question,
    pub assessment: AssessmentResponse,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuestionsResponse {
    #[serde(flatten)]
    pub outcome: GenerationOutcome,
    pub assessment: Option<AssessmentResponse>,
}
