use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{DomainError, Invariant, ValidationIssue};
use crate::models::assessment::Assessment;
use crate::models::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Graded => "graded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Answers,
    Deliverable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_index: usize,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradedBy {
    Engine,
    Instructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_index: usize,
    pub max_points: u32,
    pub points_earned: Option<u32>,
    pub graded_by: Option<GradedBy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// Repeat submit of a record that already left draft; nothing changed.
    AlreadySubmitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub assessment_version: u32,
    pub student_id: String,
    pub attempt_number: u32,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    pub questions_snapshot: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
    #[serde(default)]
    pub question_scores: Vec<QuestionScore>,
    pub score: Option<u32>,
    pub percentage: Option<u32>,
    pub passed: Option<bool>,
    pub feedback: Option<String>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new_draft(
        assessment: &Assessment,
        student_id: impl Into<String>,
        attempt_number: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let kind = if assessment.is_deliverable_based() {
            SubmissionKind::Deliverable
        } else {
            SubmissionKind::Answers
        };
        Self {
            id: Uuid::new_v4(),
            assessment_id: assessment.id,
            assessment_version: assessment.version,
            student_id: student_id.into(),
            attempt_number,
            kind,
            status: SubmissionStatus::Draft,
            questions_snapshot: assessment.gradable_questions(),
            answers: Vec::new(),
            question_scores: Vec::new(),
            score: None,
            percentage: None,
            passed: None,
            feedback: None,
            started_at: now,
            submitted_at: None,
            graded_at: None,
        }
    }

    /// Drafts never count toward the attempt limit.
    pub fn counts_toward_limit(&self) -> bool {
        self.status != SubmissionStatus::Draft
    }

    pub fn total_points(&self) -> u32 {
        self.questions_snapshot
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }

    pub fn answer_for(&self, question_index: usize) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.question_index == question_index)
            .map(|a| a.answer.as_str())
            .filter(|a| !a.trim().is_empty())
    }

    /// Indices of snapshot questions without a non-blank answer.
    pub fn missing_answers(&self) -> Vec<usize> {
        (0..self.questions_snapshot.len())
            .filter(|idx| self.answer_for(*idx).is_none())
            .collect()
    }

    /// Merges answers into a draft, replacing earlier answers to the same question.
    pub fn record_answers(&mut self, answers: Vec<AnswerEntry>) -> Result<(), DomainError> {
        if self.status != SubmissionStatus::Draft {
            return Err(DomainError::invariant(Invariant::InvalidTransition {
                from: self.status,
                to: SubmissionStatus::Draft,
            }));
        }
        for entry in &answers {
            self.check_answer(entry)?;
        }
        for entry in answers {
            match self
                .answers
                .iter_mut()
                .find(|a| a.question_index == entry.question_index)
            {
                Some(existing) => existing.answer = entry.answer,
                None => self.answers.push(entry),
            }
        }
        self.answers.sort_by_key(|a| a.question_index);
        Ok(())
    }

    fn check_answer(&self, entry: &AnswerEntry) -> Result<(), DomainError> {
        let path = format!("answers[{}]", entry.question_index);
        if entry.question_index >= self.questions_snapshot.len() {
            return Err(DomainError::validation(
                path,
                ValidationIssue::UnknownQuestionIndex {
                    index: entry.question_index,
                },
            ));
        }
        if self.kind == SubmissionKind::Deliverable {
            // Plain text is a repository or file reference; a `scheme://` link
            // has to be a web link.
            let text = entry.answer.trim();
            if has_url_scheme(text) {
                let is_web = Url::parse(text)
                    .map(|url| matches!(url.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !is_web {
                    return Err(DomainError::validation(
                        path,
                        ValidationIssue::InvalidDeliverableUrl,
                    ));
                }
            }
        }
        Ok(())
    }

    /// draft -> submitted, all-or-nothing. On error `self` is untouched.
    pub fn submit(
        &mut self,
        answers: Vec<AnswerEntry>,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, DomainError> {
        if self.status != SubmissionStatus::Draft {
            return Ok(SubmitOutcome::AlreadySubmitted);
        }

        let mut next = self.clone();
        next.record_answers(answers)?;
        let missing = next.missing_answers();
        if !missing.is_empty() {
            return Err(DomainError::IncompleteSubmission { missing });
        }

        next.status = SubmissionStatus::Submitted;
        next.submitted_at = Some(now);
        *self = next;
        Ok(SubmitOutcome::Submitted)
    }

    /// View for the learner: correct answers stay hidden until graded.
    pub fn for_student(&self) -> Self {
        let mut view = self.clone();
        if view.status != SubmissionStatus::Graded {
            view.questions_snapshot = view.questions_snapshot.iter().map(Question::redacted).collect();
        }
        view
    }
}

fn has_url_scheme(text: &str) -> bool {
    match text.split_once("://") {
        Some((scheme, _)) => {
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
