use serde::Serialize;

use crate::models::assessment::{
    AssessmentContent, AssessmentType, CapstoneMilestone, ProjectOption, RubricCriterion,
};
use crate::models::question::{Question, QuestionDraft, QuestionType};

/// Which settings an assessment type exposes to authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingFlags {
    pub show_duration: bool,
    pub show_attempts: bool,
    pub show_deadline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringShape {
    FlatPoints,
    Rubric,
    Milestones,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AssessmentTypePolicy {
    pub assessment_type: AssessmentType,
    pub allowed_question_types: &'static [QuestionType],
    pub min_questions: usize,
    pub scoring: ScoringShape,
    pub settings: SettingFlags,
}

const QUIZ: AssessmentTypePolicy = AssessmentTypePolicy {
    assessment_type: AssessmentType::Quiz,
    allowed_question_types: &[QuestionType::MultipleChoice, QuestionType::TrueFalse],
    min_questions: 1,
    scoring: ScoringShape::FlatPoints,
    settings: SettingFlags {
        show_duration: true,
        show_attempts: true,
        show_deadline: true,
    },
};

const ASSIGNMENT: AssessmentTypePolicy = AssessmentTypePolicy {
    assessment_type: AssessmentType::Assignment,
    allowed_question_types: &[
        QuestionType::ShortAnswer,
        QuestionType::Essay,
        QuestionType::MultipleChoice,
    ],
    min_questions: 1,
    scoring: ScoringShape::FlatPoints,
    settings: SettingFlags {
        show_duration: false,
        show_attempts: true,
        show_deadline: true,
    },
};

const PROJECT: AssessmentTypePolicy = AssessmentTypePolicy {
    assessment_type: AssessmentType::Project,
    allowed_question_types: &[],
    min_questions: 0,
    scoring: ScoringShape::Rubric,
    settings: SettingFlags {
        show_duration: false,
        show_attempts: false,
        show_deadline: true,
    },
};

const CAPSTONE: AssessmentTypePolicy = AssessmentTypePolicy {
    assessment_type: AssessmentType::Capstone,
    allowed_question_types: &[],
    min_questions: 0,
    scoring: ScoringShape::Milestones,
    settings: SettingFlags {
        show_duration: false,
        show_attempts: false,
        show_deadline: true,
    },
};

impl AssessmentTypePolicy {
    pub fn for_type(assessment_type: AssessmentType) -> &'static AssessmentTypePolicy {
        match assessment_type {
            AssessmentType::Quiz => &QUIZ,
            AssessmentType::Assignment => &ASSIGNMENT,
            AssessmentType::Project => &PROJECT,
            AssessmentType::Capstone => &CAPSTONE,
        }
    }

    pub fn allows(&self, question_type: QuestionType) -> bool {
        self.allowed_question_types.contains(&question_type)
    }

    /// Starter question for question-based types; `None` for project-like types.
    pub fn default_question(&self) -> Option<Question> {
        let draft = match self.assessment_type {
            AssessmentType::Quiz => QuestionDraft {
                question_text: String::new(),
                question_type: QuestionType::MultipleChoice,
                points: 1,
                options: (1..=4).map(|n| format!("Option {n}")).collect(),
                correct_answer: Some("0".to_string()),
                explanation: None,
                code_template: None,
            },
            AssessmentType::Assignment => QuestionDraft {
                question_text: String::new(),
                question_type: QuestionType::ShortAnswer,
                points: 10,
                options: Vec::new(),
                correct_answer: None,
                explanation: None,
                code_template: None,
            },
            AssessmentType::Project | AssessmentType::Capstone => return None,
        };
        Question::new(draft).ok()
    }

    /// Fresh content for this type. Used on creation and on type switches.
    pub fn default_content(&self) -> AssessmentContent {
        match self.assessment_type {
            AssessmentType::Quiz => AssessmentContent::Quiz {
                questions: self.default_question().into_iter().collect(),
            },
            AssessmentType::Assignment => AssessmentContent::Assignment {
                questions: self.default_question().into_iter().collect(),
            },
            AssessmentType::Project => AssessmentContent::Project {
                project_options: vec![ProjectOption::default()],
                rubric: vec![RubricCriterion::starter()],
            },
            AssessmentType::Capstone => AssessmentContent::Capstone {
                milestones: vec![CapstoneMilestone::starter(1)],
            },
        }
    }
}
