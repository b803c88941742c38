use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
    Coding,
}

impl QuestionType {
    /// Objective types carry options and are scored by the engine.
    pub fn is_objective(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
            QuestionType::Coding => "coding",
        }
    }
}

/// Unchecked question shape as it arrives from authors, storage or the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default)]
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub code_template: Option<String>,
}

fn default_points() -> u32 {
    1
}

/// Upper bound for the points of a single question, criterion or milestone.
pub const MAX_POINTS: u32 = 10_000;

/// One gradable unit. Built through [`Question::new`]; deserialization routes
/// through it as well, so stored questions are checked on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft")]
pub struct Question {
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub code_template: Option<String>,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = DomainError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        Question::new(draft)
    }
}

impl Question {
    /// Validates the shape. An answer key given as an option index is stored
    /// as that option's text, so grading always compares against option values.
    pub fn new(draft: QuestionDraft) -> Result<Self, DomainError> {
        let correct_answer =
            check_shape(&draft).map_err(|issue| DomainError::validation("question", issue))?;

        Ok(Self {
            question_text: draft.question_text,
            question_type: draft.question_type,
            points: draft.points,
            options: draft.options,
            correct_answer,
            explanation: draft.explanation,
            code_template: draft.code_template,
        })
    }

    pub fn multiple_choice(
        text: impl Into<String>,
        points: u32,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::new(QuestionDraft {
            question_text: text.into(),
            question_type: QuestionType::MultipleChoice,
            points,
            options,
            correct_answer: Some(correct_answer.into()),
            explanation: None,
            code_template: None,
        })
    }

    pub fn true_false(
        text: impl Into<String>,
        points: u32,
        correct: bool,
    ) -> Result<Self, DomainError> {
        Self::new(QuestionDraft {
            question_text: text.into(),
            question_type: QuestionType::TrueFalse,
            points,
            options: vec!["True".to_string(), "False".to_string()],
            correct_answer: Some(if correct { "True" } else { "False" }.to_string()),
            explanation: None,
            code_template: None,
        })
    }

    /// Free-form question; `model_answer` is a rubric for humans, never compared.
    pub fn free_form(
        question_type: QuestionType,
        text: impl Into<String>,
        points: u32,
        model_answer: Option<String>,
    ) -> Result<Self, DomainError> {
        Self::new(QuestionDraft {
            question_text: text.into(),
            question_type,
            points,
            options: Vec::new(),
            correct_answer: model_answer,
            explanation: None,
            code_template: None,
        })
    }

    pub fn has_text(&self) -> bool {
        !self.question_text.trim().is_empty()
    }

    /// Copy safe to hand to a learner mid-attempt.
    pub fn redacted(&self) -> Self {
        Self {
            correct_answer: None,
            explanation: None,
            ..self.clone()
        }
    }
}

/// Returns the answer key to store.
fn check_shape(draft: &QuestionDraft) -> Result<Option<String>, ValidationIssue> {
    if draft.points > MAX_POINTS {
        return Err(ValidationIssue::PointsOutOfRange {
            points: draft.points,
            max: MAX_POINTS,
        });
    }

    if !draft.question_type.is_objective() {
        if !draft.options.is_empty() {
            return Err(ValidationIssue::UnexpectedOptions);
        }
        return Ok(draft.correct_answer.clone());
    }

    if draft.options.len() < 2 {
        return Err(ValidationIssue::TooFewOptions {
            found: draft.options.len(),
        });
    }

    let Some(correct) = draft.correct_answer.as_deref() else {
        return Err(ValidationIssue::MissingCorrectAnswer);
    };

    if draft.options.iter().any(|o| o == correct) {
        return Ok(Some(correct.to_string()));
    }

    correct
        .parse::<usize>()
        .ok()
        .and_then(|idx| draft.options.get(idx))
        .map(|option| Some(option.clone()))
        .ok_or(ValidationIssue::CorrectAnswerNotAnOption)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn multiple_choice_accepts_value_or_index() {
        let by_value = Question::multiple_choice("2+2?", 1, opts(&["3", "4"]), "4").unwrap();
        assert_eq!(by_value.correct_answer.as_deref(), Some("4"));

        // "1" is an option value here, so it is kept as is
        let numeric = Question::multiple_choice("pick", 1, opts(&["1", "2"]), "1").unwrap();
        assert_eq!(numeric.correct_answer.as_deref(), Some("1"));
    }

    #[test]
    fn index_answer_key_is_stored_as_option_text() {
        let q = Question::multiple_choice("capital?", 10, opts(&["Paris", "Rome"]), "0").unwrap();
        assert_eq!(q.correct_answer.as_deref(), Some("Paris"));

        let q = Question::multiple_choice("2+2?", 1, opts(&["3", "4"]), "1").unwrap();
        assert_eq!(q.correct_answer.as_deref(), Some("4"));

        let stored = serde_json::json!({
            "question_text": "Rust has a GC",
            "type": "true_false",
            "options": ["True", "False"],
            "correct_answer": "1"
        });
        let q: Question = serde_json::from_value(stored).unwrap();
        assert_eq!(q.correct_answer.as_deref(), Some("False"));
    }

    #[test]
    fn points_are_capped() {
        let err = Question::true_false("big", MAX_POINTS + 1, true).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "question",
                ValidationIssue::PointsOutOfRange {
                    points: MAX_POINTS + 1,
                    max: MAX_POINTS
                }
            )
        );
        assert!(Question::true_false("max", MAX_POINTS, true).is_ok());
    }

    #[test]
    fn multiple_choice_rejects_unknown_answer() {
        let err = Question::multiple_choice("2+2?", 1, opts(&["3", "4"]), "5").unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("question", ValidationIssue::CorrectAnswerNotAnOption)
        );
    }

    #[test]
    fn objective_question_needs_two_options() {
        let err = Question::multiple_choice("pick", 1, opts(&["only"]), "only").unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("question", ValidationIssue::TooFewOptions { found: 1 })
        );
    }

    #[test]
    fn objective_question_needs_correct_answer() {
        let draft = QuestionDraft {
            question_text: "pick".into(),
            question_type: QuestionType::TrueFalse,
            points: 1,
            options: opts(&["True", "False"]),
            correct_answer: None,
            explanation: None,
            code_template: None,
        };
        assert_eq!(
            Question::new(draft).unwrap_err(),
            DomainError::validation("question", ValidationIssue::MissingCorrectAnswer)
        );
    }

    #[test]
    fn free_form_rejects_options() {
        let draft = QuestionDraft {
            question_text: "explain".into(),
            question_type: QuestionType::Essay,
            points: 5,
            options: opts(&["a", "b"]),
            correct_answer: None,
            explanation: None,
            code_template: None,
        };
        assert!(Question::new(draft).is_err());
    }

    #[test]
    fn deserialization_revalidates() {
        let bad = serde_json::json!({
            "question_text": "2+2?",
            "type": "multiple_choice",
            "points": 2,
            "options": ["3"],
            "correct_answer": "3"
        });
        assert!(serde_json::from_value::<Question>(bad).is_err());

        let good = serde_json::json!({
            "question_text": "Rust is memory safe",
            "type": "true_false",
            "options": ["True", "False"],
            "correct_answer": "True"
        });
        let q: Question = serde_json::from_value(good).unwrap();
        assert_eq!(q.points, 1);
        assert_eq!(q.question_type, QuestionType::TrueFalse);
    }

    #[test]
    fn redacted_hides_answers() {
        let q = Question::true_false("sky is blue", 1, true).unwrap();
        let r = q.redacted();
        assert!(r.correct_answer.is_none());
        assert_eq!(r.options, q.options);
    }
}
