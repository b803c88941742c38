use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, Invariant, ValidationIssue};
use crate::models::question::{Question, QuestionType, MAX_POINTS};
use crate::models::type_policy::AssessmentTypePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    Quiz,
    Assignment,
    Project,
    Capstone,
}

impl AssessmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentType::Quiz => "quiz",
            AssessmentType::Assignment => "assignment",
            AssessmentType::Project => "project",
            AssessmentType::Capstone => "capstone",
        }
    }

    pub fn policy(self) -> &'static AssessmentTypePolicy {
        AssessmentTypePolicy::for_type(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricLevel {
    pub label: String,
    pub points: u32,
    #[serde(default)]
    pub description: String,
}

/// Human-graded criterion; levels are anchors, not scored automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub criterion: String,
    #[serde(default)]
    pub description: String,
    pub max_points: u32,
    #[serde(default)]
    pub levels: Vec<RubricLevel>,
}

impl RubricCriterion {
    pub(crate) fn starter() -> Self {
        Self {
            criterion: String::new(),
            description: String::new(),
            max_points: 10,
            levels: Vec::new(),
        }
    }

    pub fn check(&self) -> Result<(), ValidationIssue> {
        if self.max_points > MAX_POINTS {
            return Err(ValidationIssue::PointsOutOfRange {
                points: self.max_points,
                max: MAX_POINTS,
            });
        }
        for (idx, level) in self.levels.iter().enumerate() {
            if level.points > self.max_points {
                return Err(ValidationIssue::LevelExceedsCriterionMax {
                    level: idx,
                    points: level.points,
                    max_points: self.max_points,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOption {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapstoneMilestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_week: u32,
    pub points: u32,
    #[serde(default)]
    pub deliverables: Vec<String>,
}

impl CapstoneMilestone {
    pub(crate) fn starter(due_week: u32) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_week,
            points: 10,
            deliverables: Vec::new(),
        }
    }

    pub fn check(&self) -> Result<(), ValidationIssue> {
        if self.due_week == 0 {
            return Err(ValidationIssue::InvalidDueWeek);
        }
        if self.points > MAX_POINTS {
            return Err(ValidationIssue::PointsOutOfRange {
                points: self.points,
                max: MAX_POINTS,
            });
        }
        Ok(())
    }
}

/// Scoring structure, keyed on the assessment type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssessmentContent {
    Quiz {
        questions: Vec<Question>,
    },
    Assignment {
        questions: Vec<Question>,
    },
    Project {
        project_options: Vec<ProjectOption>,
        #[serde(default)]
        rubric: Vec<RubricCriterion>,
    },
    Capstone {
        milestones: Vec<CapstoneMilestone>,
    },
}

impl AssessmentContent {
    pub fn assessment_type(&self) -> AssessmentType {
        match self {
            AssessmentContent::Quiz { .. } => AssessmentType::Quiz,
            AssessmentContent::Assignment { .. } => AssessmentType::Assignment,
            AssessmentContent::Project { .. } => AssessmentType::Project,
            AssessmentContent::Capstone { .. } => AssessmentType::Capstone,
        }
    }

    /// Saturates at `u32::MAX`; [`AssessmentContent::checked_total_points`]
    /// tells an overflow apart.
    pub fn total_points(&self) -> u32 {
        self.item_points()
            .fold(0u32, |total, points| total.saturating_add(points))
    }

    pub fn checked_total_points(&self) -> Option<u32> {
        self.item_points()
            .try_fold(0u32, |total, points| total.checked_add(points))
    }

    fn item_points(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            AssessmentContent::Quiz { questions } | AssessmentContent::Assignment { questions } => {
                Box::new(questions.iter().map(|q| q.points))
            }
            AssessmentContent::Project { rubric, .. } => Box::new(rubric.iter().map(|c| c.max_points)),
            AssessmentContent::Capstone { milestones } => {
                Box::new(milestones.iter().map(|m| m.points))
            }
        }
    }

    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            AssessmentContent::Quiz { questions } | AssessmentContent::Assignment { questions } => {
                Some(questions)
            }
            _ => None,
        }
    }

    /// Validates every question against the type's allowed set.
    pub fn check_question_types(&self) -> Result<(), DomainError> {
        let policy = self.assessment_type().policy();
        if let Some(questions) = self.questions() {
            for (idx, q) in questions.iter().enumerate() {
                if !policy.allows(q.question_type) {
                    return Err(DomainError::validation(
                        format!("questions[{idx}]"),
                        ValidationIssue::QuestionTypeNotAllowed {
                            question_type: q.question_type,
                            assessment_type: policy.assessment_type,
                        },
                    ));
                }
            }
        }
        Ok(())
    }
}

/// What a type switch threw away, handed back so callers can surface it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSwitch {
    pub from: AssessmentType,
    pub to: AssessmentType,
    pub discarded: AssessmentContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderTarget {
    Questions,
    Milestones,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub content: AssessmentContent,
    pub passing_score: u32,
    pub duration_minutes: Option<u32>,
    pub attempts: u32,
    pub is_published: bool,
    pub is_required_for_completion: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "first_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn first_version() -> u32 {
    1
}

pub const DEFAULT_PASSING_SCORE: u32 = 70;

pub const MAX_TOTAL_POINTS: u32 = 1_000_000;

impl Assessment {
    pub fn new(
        course_id: impl Into<String>,
        title: impl Into<String>,
        assessment_type: AssessmentType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id: course_id.into(),
            title: title.into(),
            description: None,
            content: assessment_type.policy().default_content(),
            passing_score: DEFAULT_PASSING_SCORE,
            duration_minutes: None,
            attempts: 1,
            is_published: false,
            is_required_for_completion: false,
            start_date: None,
            end_date: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assessment_type(&self) -> AssessmentType {
        self.content.assessment_type()
    }

    pub fn policy(&self) -> &'static AssessmentTypePolicy {
        self.assessment_type().policy()
    }

    /// Always recomputed from the active structure.
    pub fn total_points(&self) -> u32 {
        self.content.total_points()
    }

    pub fn check_total_points(&self) -> Result<(), ValidationIssue> {
        match self.content.checked_total_points() {
            Some(total) if total <= MAX_TOTAL_POINTS => Ok(()),
            _ => Err(ValidationIssue::TotalPointsOutOfRange {
                max: MAX_TOTAL_POINTS,
            }),
        }
    }

    pub fn questions(&self) -> Option<&[Question]> {
        self.content.questions()
    }

    /// Project and capstone work is a single deliverable rather than answers.
    pub fn is_deliverable_based(&self) -> bool {
        self.questions().is_none()
    }

    /// The questions a learner answers. Project-like types expose one synthetic
    /// free-form question worth `total_points` that carries the deliverable.
    pub fn gradable_questions(&self) -> Vec<Question> {
        match self.questions() {
            Some(questions) => questions.to_vec(),
            None => vec![Question {
                question_text: format!("{}_submission", self.assessment_type().as_str()),
                question_type: QuestionType::ShortAnswer,
                points: self.total_points(),
                options: Vec::new(),
                correct_answer: None,
                explanation: None,
                code_template: None,
            }],
        }
    }

    /// Settings that hold independently of publish state.
    pub fn check_settings(&self) -> Result<(), ValidationIssue> {
        if self.passing_score > 100 {
            return Err(ValidationIssue::PassingScoreOutOfRange {
                value: self.passing_score,
            });
        }
        if self.attempts == 0 {
            return Err(ValidationIssue::ZeroAttempts);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start >= end {
                return Err(ValidationIssue::InvalidAvailabilityWindow);
            }
        }
        Ok(())
    }

    /// Clears settings the type does not expose.
    pub fn normalize_settings(&mut self) {
        let flags = self.policy().settings;
        if !flags.show_duration {
            self.duration_minutes = None;
        }
        if !flags.show_attempts {
            self.attempts = 1;
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| now >= start)
            && self.end_date.map_or(true, |end| now <= end)
    }

    fn questions_mut(&mut self) -> Result<&mut Vec<Question>, DomainError> {
        let assessment_type = self.assessment_type();
        match &mut self.content {
            AssessmentContent::Quiz { questions } | AssessmentContent::Assignment { questions } => {
                Ok(questions)
            }
            _ => Err(DomainError::invariant(Invariant::NotQuestionBased {
                assessment_type,
            })),
        }
    }

    fn check_allowed(&self, question: &Question, path: String) -> Result<(), DomainError> {
        let policy = self.policy();
        if policy.allows(question.question_type) {
            Ok(())
        } else {
            Err(DomainError::validation(
                path,
                ValidationIssue::QuestionTypeNotAllowed {
                    question_type: question.question_type,
                    assessment_type: policy.assessment_type,
                },
            ))
        }
    }

    /// Appends a question and returns its index.
    pub fn add_question(&mut self, question: Question) -> Result<usize, DomainError> {
        let len = self.questions().map_or(0, |q| q.len());
        self.check_allowed(&question, format!("questions[{len}]"))?;
        let questions = self.questions_mut()?;
        questions.push(question);
        Ok(questions.len() - 1)
    }

    pub fn replace_question(&mut self, index: usize, question: Question) -> Result<(), DomainError> {
        self.check_allowed(&question, format!("questions[{index}]"))?;
        let questions = self.questions_mut()?;
        let len = questions.len();
        let slot = questions
            .get_mut(index)
            .ok_or(DomainError::invariant(Invariant::QuestionIndexOutOfRange {
                index,
                len,
            }))?;
        *slot = question;
        Ok(())
    }

    pub fn remove_question(&mut self, index: usize) -> Result<Question, DomainError> {
        let policy = self.policy();
        let questions = self.questions_mut()?;
        if index >= questions.len() {
            return Err(DomainError::invariant(Invariant::QuestionIndexOutOfRange {
                index,
                len: questions.len(),
            }));
        }
        if questions.len() <= policy.min_questions {
            return Err(DomainError::invariant(Invariant::MinimumQuestions {
                assessment_type: policy.assessment_type,
            }));
        }
        Ok(questions.remove(index))
    }

    /// Reorders by explicit order index, one per item. Equal indices keep
    /// their original relative order.
    pub fn reorder(&mut self, target: ReorderTarget, order: &[i64]) -> Result<(), DomainError> {
        let assessment_type = self.assessment_type();
        match target {
            ReorderTarget::Questions => {
                let questions = self.questions_mut()?;
                stable_reorder(questions, order)
            }
            ReorderTarget::Milestones => match &mut self.content {
                AssessmentContent::Capstone { milestones } => stable_reorder(milestones, order),
                _ => Err(DomainError::invariant(Invariant::NotCapstone {
                    assessment_type,
                })),
            },
        }
    }

    /// Replaces the content with the new type's default shape. Destructive:
    /// the previous content is returned, never merged. `None` when the type
    /// is unchanged.
    pub fn switch_type(&mut self, to: AssessmentType) -> Option<TypeSwitch> {
        let from = self.assessment_type();
        if from == to {
            return None;
        }
        let fresh = to.policy().default_content();
        let discarded = std::mem::replace(&mut self.content, fresh);
        self.normalize_settings();
        Some(TypeSwitch {
            from,
            to,
            discarded,
        })
    }
}

fn stable_reorder<T>(items: &mut Vec<T>, order: &[i64]) -> Result<(), DomainError> {
    if order.len() != items.len() {
        return Err(DomainError::invariant(Invariant::ReorderLengthMismatch {
            expected: items.len(),
            found: order.len(),
        }));
    }
    let mut keyed: Vec<(i64, T)> = order.iter().copied().zip(items.drain(..)).collect();
    // sort_by_key is stable, so ties stay in original position order
    keyed.sort_by_key(|(key, _)| *key);
    items.extend(keyed.into_iter().map(|(_, item)| item));
    Ok(())
}
