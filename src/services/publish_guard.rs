use crate::error::{DomainError, Invariant, PublishProblem, ValidationIssue};
use crate::models::assessment::{Assessment, AssessmentContent};

/// Gatekeeper for the draft <-> published transition.
pub struct PublishGuard;

impl PublishGuard {
    /// Every reason the assessment cannot be published, in content order.
    pub fn problems(assessment: &Assessment) -> Vec<PublishProblem> {
        let mut problems = Vec::new();

        if let Err(issue) = assessment.check_settings() {
            problems.push(PublishProblem::InvalidSettings { issue });
        }

        let policy = assessment.policy();
        match &assessment.content {
            AssessmentContent::Quiz { questions } | AssessmentContent::Assignment { questions } => {
                if questions.len() < policy.min_questions.max(1) {
                    problems.push(PublishProblem::NoQuestions);
                }
                for (index, q) in questions.iter().enumerate() {
                    if !q.has_text() {
                        problems.push(PublishProblem::EmptyQuestionText { index });
                    }
                    if !policy.allows(q.question_type) {
                        problems.push(PublishProblem::InvalidQuestion {
                            index,
                            issue: ValidationIssue::QuestionTypeNotAllowed {
                                question_type: q.question_type,
                                assessment_type: policy.assessment_type,
                            },
                        });
                    }
                }
            }
            AssessmentContent::Project {
                project_options,
                rubric,
            } => {
                if project_options.is_empty() {
                    problems.push(PublishProblem::NoProjectOptions);
                }
                for (index, option) in project_options.iter().enumerate() {
                    if option.title.trim().is_empty() {
                        problems.push(PublishProblem::EmptyProjectOptionTitle { index });
                    }
                }
                if rubric.is_empty() {
                    problems.push(PublishProblem::NoRubric);
                }
                for (index, criterion) in rubric.iter().enumerate() {
                    if criterion.criterion.trim().is_empty() {
                        problems.push(PublishProblem::EmptyCriterionName { index });
                    }
                    if let Err(issue) = criterion.check() {
                        problems.push(PublishProblem::InvalidCriterion { index, issue });
                    }
                }
            }
            AssessmentContent::Capstone { milestones } => {
                if milestones.is_empty() {
                    problems.push(PublishProblem::NoMilestones);
                }
                for (index, milestone) in milestones.iter().enumerate() {
                    if milestone.title.trim().is_empty() {
                        problems.push(PublishProblem::EmptyMilestoneTitle { index });
                    }
                    if let Err(issue) = milestone.check() {
                        problems.push(PublishProblem::InvalidMilestone { index, issue });
                    }
                }
            }
        }

        // empty structures are reported above
        let structure_missing = problems.iter().any(|p| {
            matches!(
                p,
                PublishProblem::NoQuestions | PublishProblem::NoRubric | PublishProblem::NoMilestones
            )
        });
        if !structure_missing {
            if let Err(issue) = assessment.check_total_points() {
                problems.push(PublishProblem::InvalidSettings { issue });
            } else if assessment.total_points() == 0 {
                problems.push(PublishProblem::ZeroTotalPoints);
            }
        }

        problems
    }

    pub fn check(assessment: &Assessment) -> Result<(), DomainError> {
        let problems = Self::problems(assessment);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::NotGradable { problems })
        }
    }

    pub fn publish(assessment: &mut Assessment) -> Result<(), DomainError> {
        Self::check(assessment)?;
        assessment.is_published = true;
        Ok(())
    }

    /// Always permitted.
    pub fn unpublish(assessment: &mut Assessment) {
        assessment.is_published = false;
    }

    /// Structural edits on a published assessment that learners have already
    /// turned in need an explicit new version.
    pub fn check_structural_edit(
        assessment: &Assessment,
        turned_in: u64,
        new_version: bool,
    ) -> Result<(), DomainError> {
        if assessment.is_published && turned_in > 0 && !new_version {
            return Err(DomainError::invariant(
                Invariant::StructureLockedBySubmissions {
                    submissions: turned_in,
                },
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::{
        AssessmentType, CapstoneMilestone, ProjectOption, RubricCriterion,
    };
    use crate::models::question::Question;
    use chrono::Utc;

    fn empty_quiz() -> Assessment {
        let mut a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        a.content = AssessmentContent::Quiz {
            questions: Vec::new(),
        };
        a
    }

    #[test]
    fn quiz_without_questions_is_not_gradable() {
        let mut a = empty_quiz();
        let err = PublishGuard::publish(&mut a).unwrap_err();
        assert_eq!(
            err,
            DomainError::NotGradable {
                problems: vec![PublishProblem::NoQuestions]
            }
        );
        assert!(!a.is_published);
    }

    #[test]
    fn quiz_with_one_valid_question_publishes() {
        let mut a = empty_quiz();
        a.add_question(
            Question::multiple_choice("2+2?", 1, vec!["3".into(), "4".into()], "4").unwrap(),
        )
        .unwrap();
        PublishGuard::publish(&mut a).unwrap();
        assert!(a.is_published);
    }

    #[test]
    fn blank_question_text_blocks_publish() {
        let mut a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        // the starter question has no text yet
        let err = PublishGuard::publish(&mut a).unwrap_err();
        assert_eq!(
            err,
            DomainError::NotGradable {
                problems: vec![PublishProblem::EmptyQuestionText { index: 0 }]
            }
        );
    }

    #[test]
    fn project_needs_a_titled_option() {
        let mut a = Assessment::new("c", "Project", AssessmentType::Project, Utc::now());
        a.content = AssessmentContent::Project {
            project_options: Vec::new(),
            rubric: Vec::new(),
        };
        assert!(matches!(
            PublishGuard::check(&a),
            Err(DomainError::NotGradable { problems }) if problems == vec![PublishProblem::NoProjectOptions]
        ));

        a.content = AssessmentContent::Project {
            project_options: vec![ProjectOption {
                title: "Build a CLI".into(),
                ..ProjectOption::default()
            }],
            rubric: vec![RubricCriterion {
                criterion: "Correctness".into(),
                description: String::new(),
                max_points: 50,
                levels: Vec::new(),
            }],
        };
        assert!(PublishGuard::check(&a).is_ok());
    }

    #[test]
    fn project_without_rubric_is_not_gradable() {
        let mut a = Assessment::new("c", "Project", AssessmentType::Project, Utc::now());
        a.content = AssessmentContent::Project {
            project_options: vec![ProjectOption {
                title: "Build a CLI".into(),
                ..ProjectOption::default()
            }],
            rubric: Vec::new(),
        };
        assert_eq!(
            PublishGuard::publish(&mut a),
            Err(DomainError::NotGradable {
                problems: vec![PublishProblem::NoRubric]
            })
        );
        assert!(!a.is_published);
    }

    #[test]
    fn zero_point_quiz_is_not_gradable() {
        let mut a = empty_quiz();
        a.add_question(Question::true_false("free", 0, true).unwrap())
            .unwrap();
        assert_eq!(
            PublishGuard::check(&a),
            Err(DomainError::NotGradable {
                problems: vec![PublishProblem::ZeroTotalPoints]
            })
        );

        let mut capstone = Assessment::new("c", "Capstone", AssessmentType::Capstone, Utc::now());
        capstone.content = AssessmentContent::Capstone {
            milestones: vec![CapstoneMilestone {
                title: "Proposal".into(),
                description: String::new(),
                due_week: 1,
                points: 0,
                deliverables: Vec::new(),
            }],
        };
        assert_eq!(
            PublishGuard::check(&capstone),
            Err(DomainError::NotGradable {
                problems: vec![PublishProblem::ZeroTotalPoints]
            })
        );
    }

    #[test]
    fn capstone_needs_a_milestone() {
        let mut a = Assessment::new("c", "Capstone", AssessmentType::Capstone, Utc::now());
        a.content = AssessmentContent::Capstone {
            milestones: Vec::new(),
        };
        assert!(PublishGuard::check(&a).is_err());

        a.content = AssessmentContent::Capstone {
            milestones: vec![CapstoneMilestone {
                title: "Proposal".into(),
                description: String::new(),
                due_week: 2,
                points: 20,
                deliverables: vec!["proposal.pdf".into()],
            }],
        };
        assert!(PublishGuard::check(&a).is_ok());
    }

    #[test]
    fn unpublish_is_always_allowed() {
        let mut a = empty_quiz();
        a.is_published = true;
        PublishGuard::unpublish(&mut a);
        assert!(!a.is_published);
    }

    #[test]
    fn structural_edits_with_submissions_need_new_version() {
        let mut a = empty_quiz();
        a.is_published = true;
        assert!(PublishGuard::check_structural_edit(&a, 0, false).is_ok());
        assert!(PublishGuard::check_structural_edit(&a, 3, false).is_err());
        assert!(PublishGuard::check_structural_edit(&a, 3, true).is_ok());
    }
}
