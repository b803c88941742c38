use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::database::AssessmentStore;
use crate::dto::attempt_dto::AttemptHistoryResponse;
use crate::error::{DomainError, Error, Invariant, Result};
use crate::models::submission::{AnswerEntry, Submission, SubmissionStatus, SubmitOutcome};
use crate::services::grading_service::{GradingService, ScoreOverride};
use crate::services::retake::{attempts_used, can_retake, latest_turned_in};
use crate::utils::time::now;

#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn AssessmentStore>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    /// Opens a new attempt, or hands back the learner's open draft.
    pub async fn start_attempt(&self, assessment_id: Uuid, student_id: &str) -> Result<Submission> {
        let assessment = self.store.get_assessment(assessment_id).await?;
        if !assessment.is_published {
            return Err(DomainError::invariant(Invariant::NotPublished).into());
        }
        let started_at = now();
        if !assessment.is_open_at(started_at) {
            return Err(DomainError::invariant(Invariant::OutsideAvailabilityWindow).into());
        }

        let submissions = self
            .store
            .list_submissions(assessment_id, Some(student_id))
            .await?;

        if let Some(draft) = submissions
            .iter()
            .find(|s| s.status == SubmissionStatus::Draft)
        {
            return Ok(draft.clone());
        }

        if let Some(passed) = submissions.iter().find(|s| s.passed == Some(true)) {
            return Err(DomainError::AlreadyPassed {
                attempt_number: passed.attempt_number,
            }
            .into());
        }

        let used = attempts_used(&submissions);
        if used >= assessment.attempts {
            return Err(DomainError::AttemptLimitExceeded {
                used,
                limit: assessment.attempts,
            }
            .into());
        }

        if let Some(latest) = latest_turned_in(&submissions) {
            if latest.status == SubmissionStatus::Submitted {
                return Err(DomainError::invariant(Invariant::AwaitingGrading {
                    attempt_number: latest.attempt_number,
                })
                .into());
            }
        }

        let attempt_number = submissions
            .iter()
            .map(|s| s.attempt_number)
            .max()
            .unwrap_or(0)
            + 1;
        let submission = Submission::new_draft(&assessment, student_id, attempt_number, started_at);
        self.store.save_submission(&submission).await?;
        info!(
            submission_id = %submission.id,
            %assessment_id,
            student_id,
            attempt_number,
            version = submission.assessment_version,
            "attempt started"
        );
        Ok(submission)
    }

    pub async fn save_answers(
        &self,
        submission_id: Uuid,
        student_id: &str,
        answers: Vec<AnswerEntry>,
    ) -> Result<Submission> {
        let mut submission = self.owned_submission(submission_id, student_id).await?;
        submission.record_answers(answers)?;
        self.store.save_submission(&submission).await?;
        Ok(submission)
    }

    /// Submits and auto-grades. A repeat submit returns the stored record.
    pub async fn submit_attempt(
        &self,
        submission_id: Uuid,
        student_id: &str,
        answers: Vec<AnswerEntry>,
    ) -> Result<(Submission, SubmitOutcome)> {
        let mut submission = self.owned_submission(submission_id, student_id).await?;
        let submitted_at = now();
        let outcome = submission.submit(answers, submitted_at)?;
        if outcome == SubmitOutcome::AlreadySubmitted {
            return Ok((submission, outcome));
        }

        let assessment = self.store.get_assessment(submission.assessment_id).await?;
        GradingService::auto_grade(&mut submission, assessment.passing_score, submitted_at);
        self.store.save_submission(&submission).await?;
        info!(
            %submission_id,
            assessment_id = %submission.assessment_id,
            attempt_number = submission.attempt_number,
            status = submission.status.as_str(),
            pending_review = GradingService::pending_review(&submission).len(),
            "attempt submitted"
        );
        Ok((submission, outcome))
    }

    pub async fn grade_attempt(
        &self,
        submission_id: Uuid,
        overrides: &[ScoreOverride],
        feedback: Option<String>,
    ) -> Result<Submission> {
        let mut submission = self.store.get_submission(submission_id).await?;
        let assessment = self.store.get_assessment(submission.assessment_id).await?;
        GradingService::apply_manual(
            &mut submission,
            overrides,
            feedback,
            assessment.passing_score,
            now(),
        )?;
        self.store.save_submission(&submission).await?;
        info!(
            %submission_id,
            status = submission.status.as_str(),
            score = ?submission.score,
            passed = ?submission.passed,
            "attempt graded"
        );
        Ok(submission)
    }

    /// The learner's own attempts, answers hidden until graded.
    pub async fn history(&self, assessment_id: Uuid, student_id: &str) -> Result<AttemptHistoryResponse> {
        let assessment = self.store.get_assessment(assessment_id).await?;
        let submissions = self
            .store
            .list_submissions(assessment_id, Some(student_id))
            .await?;
        Ok(AttemptHistoryResponse {
            attempts_used: attempts_used(&submissions),
            attempts_allowed: assessment.attempts,
            can_retake: can_retake(&assessment, &submissions),
            submissions: submissions.iter().map(Submission::for_student).collect(),
        })
    }

    pub async fn list_for_assessment(&self, assessment_id: Uuid) -> Result<Vec<Submission>> {
        self.store.get_assessment(assessment_id).await?;
        self.store.list_submissions(assessment_id, None).await
    }

    async fn owned_submission(&self, submission_id: Uuid, student_id: &str) -> Result<Submission> {
        let submission = self.store.get_submission(submission_id).await?;
        if submission.student_id != student_id {
            return Err(Error::Forbidden("submission belongs to another student".to_string()));
        }
        Ok(submission)
    }
}
