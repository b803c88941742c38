use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Invariant, ValidationIssue};
use crate::models::question::Question;
use crate::models::submission::{GradedBy, QuestionScore, Submission, SubmissionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOverride {
    pub question_index: usize,
    pub points: u32,
}

pub struct GradingService;

impl GradingService {
    /// Engine score for one question, or `None` when a human has to grade it.
    pub fn score_question(question: &Question, answer: Option<&str>) -> Option<u32> {
        if !question.question_type.is_objective() {
            return None;
        }
        let correct = question.correct_answer.as_deref();
        match (answer, correct) {
            (Some(given), Some(expected)) if given == expected => Some(question.points),
            _ => Some(0),
        }
    }

    pub fn percentage(score: u32, total_points: u32) -> u32 {
        if total_points == 0 {
            return 0;
        }
        let scaled = u64::from(score) * 100;
        let total = u64::from(total_points);
        ((scaled * 2 + total) / (total * 2)) as u32
    }

    pub fn passed(percentage: u32, passing_score: u32) -> bool {
        percentage >= passing_score
    }

    /// Scores objective questions on a freshly submitted attempt. The
    /// submission only reaches `graded` when nothing is left for a human.
    pub fn auto_grade(submission: &mut Submission, passing_score: u32, now: DateTime<Utc>) {
        submission.question_scores = submission
            .questions_snapshot
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let earned = Self::score_question(q, submission.answer_for(idx));
                QuestionScore {
                    question_index: idx,
                    max_points: q.points,
                    points_earned: earned,
                    graded_by: earned.map(|_| GradedBy::Engine),
                }
            })
            .collect();

        Self::finalize(submission, passing_score, now);
    }

    /// Instructor grading. Overrides may replace engine scores; each is capped at
    /// the question's points, which for project-like work is the assessment total.
    pub fn apply_manual(
        submission: &mut Submission,
        overrides: &[ScoreOverride],
        feedback: Option<String>,
        passing_score: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if submission.status == SubmissionStatus::Draft {
            return Err(DomainError::invariant(Invariant::InvalidTransition {
                from: SubmissionStatus::Draft,
                to: SubmissionStatus::Graded,
            }));
        }

        let mut scores = submission.question_scores.clone();
        if scores.len() != submission.questions_snapshot.len() {
            scores = submission
                .questions_snapshot
                .iter()
                .enumerate()
                .map(|(idx, q)| QuestionScore {
                    question_index: idx,
                    max_points: q.points,
                    points_earned: None,
                    graded_by: None,
                })
                .collect();
        }

        for o in overrides {
            let path = format!("overrides[{}]", o.question_index);
            let slot = scores.get_mut(o.question_index).ok_or_else(|| {
                DomainError::validation(
                    path.clone(),
                    ValidationIssue::UnknownQuestionIndex {
                        index: o.question_index,
                    },
                )
            })?;
            if o.points > slot.max_points {
                return Err(DomainError::validation(
                    path,
                    ValidationIssue::ScoreExceedsMax {
                        points: o.points,
                        max_points: slot.max_points,
                    },
                ));
            }
            slot.points_earned = Some(o.points);
            slot.graded_by = Some(GradedBy::Instructor);
        }

        submission.question_scores = scores;
        if feedback.is_some() {
            submission.feedback = feedback;
        }
        Self::finalize(submission, passing_score, now);
        Ok(())
    }

    fn finalize(submission: &mut Submission, passing_score: u32, now: DateTime<Utc>) {
        let earned: Option<u32> = submission
            .question_scores
            .iter()
            .try_fold(0u32, |total, s| s.points_earned.map(|p| total.saturating_add(p)));

        match earned {
            Some(score) => {
                let percentage = Self::percentage(score, submission.total_points());
                submission.score = Some(score);
                submission.percentage = Some(percentage);
                submission.passed = Some(Self::passed(percentage, passing_score));
                submission.status = SubmissionStatus::Graded;
                submission.graded_at = Some(now);
            }
            None => {
                submission.score = None;
                submission.percentage = None;
                submission.passed = None;
                submission.status = SubmissionStatus::Submitted;
                submission.graded_at = None;
            }
        }
    }

    /// Questions still waiting on an instructor.
    pub fn pending_review(submission: &Submission) -> Vec<usize> {
        submission
            .question_scores
            .iter()
            .filter(|s| s.points_earned.is_none())
            .map(|s| s.question_index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::{Assessment, AssessmentContent, AssessmentType};
    use crate::models::question::QuestionType;
    use crate::models::submission::AnswerEntry;

    fn answers(values: &[&str]) -> Vec<AnswerEntry> {
        values
            .iter()
            .enumerate()
            .map(|(idx, v)| AnswerEntry {
                question_index: idx,
                answer: v.to_string(),
            })
            .collect()
    }

    fn submitted(assessment: &Assessment, given: &[&str]) -> Submission {
        let mut s = Submission::new_draft(assessment, "student-1", 1, Utc::now());
        s.submit(answers(given), Utc::now()).unwrap();
        s
    }

    fn quiz(questions: Vec<Question>) -> Assessment {
        let mut a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        a.content = AssessmentContent::Quiz { questions };
        a
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(GradingService::percentage(14, 20), 70);
        assert_eq!(GradingService::percentage(1, 3), 33);
        assert_eq!(GradingService::percentage(2, 3), 67);
        assert_eq!(GradingService::percentage(1, 8), 13);
        assert_eq!(GradingService::percentage(0, 0), 0);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(GradingService::passed(70, 70));
        assert!(!GradingService::passed(70, 71));
    }

    #[test]
    fn objective_answers_compare_exactly() {
        let q = Question::multiple_choice(
            "capital?",
            4,
            vec!["Paris".into(), "Rome".into()],
            "Paris",
        )
        .unwrap();
        assert_eq!(GradingService::score_question(&q, Some("Paris")), Some(4));
        assert_eq!(GradingService::score_question(&q, Some("paris")), Some(0));
        assert_eq!(GradingService::score_question(&q, None), Some(0));

        let essay = Question::free_form(QuestionType::Essay, "why?", 5, None).unwrap();
        assert_eq!(GradingService::score_question(&essay, Some("because")), None);
    }

    #[test]
    fn all_objective_quiz_is_graded_by_engine() {
        let a = quiz(vec![
            Question::true_false("a", 10, true).unwrap(),
            Question::true_false("b", 6, true).unwrap(),
            Question::true_false("c", 4, true).unwrap(),
        ]);
        let mut s = submitted(&a, &["True", "False", "True"]);
        GradingService::auto_grade(&mut s, 70, Utc::now());

        assert_eq!(s.status, SubmissionStatus::Graded);
        assert_eq!(s.score, Some(14));
        assert_eq!(s.percentage, Some(70));
        assert_eq!(s.passed, Some(true));

        let mut strict = submitted(&a, &["True", "False", "True"]);
        GradingService::auto_grade(&mut strict, 71, Utc::now());
        assert_eq!(strict.passed, Some(false));
    }

    #[test]
    fn free_form_question_blocks_auto_grading() {
        let mut a = Assessment::new("c", "HW", AssessmentType::Assignment, Utc::now());
        a.content = AssessmentContent::Assignment {
            questions: vec![
                Question::multiple_choice("pick", 5, vec!["x".into(), "y".into()], "x").unwrap(),
                Question::free_form(QuestionType::Essay, "discuss", 15, None).unwrap(),
            ],
        };
        let mut s = submitted(&a, &["x", "an essay"]);
        GradingService::auto_grade(&mut s, 50, Utc::now());

        assert_eq!(s.status, SubmissionStatus::Submitted);
        assert_eq!(s.score, None);
        assert_eq!(s.percentage, None);
        assert_eq!(s.question_scores[0].points_earned, Some(5));
        assert_eq!(GradingService::pending_review(&s), vec![1]);

        GradingService::apply_manual(
            &mut s,
            &[ScoreOverride {
                question_index: 1,
                points: 12,
            }],
            Some("solid argument".into()),
            50,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(s.status, SubmissionStatus::Graded);
        assert_eq!(s.score, Some(17));
        assert_eq!(s.percentage, Some(85));
        assert_eq!(s.passed, Some(true));
        assert_eq!(s.feedback.as_deref(), Some("solid argument"));
    }

    #[test]
    fn project_score_cannot_exceed_total() {
        let a = Assessment::new("c", "Project", AssessmentType::Project, Utc::now());
        let total = a.total_points();
        let mut s = submitted(&a, &["https://github.com/me/project"]);
        GradingService::auto_grade(&mut s, 60, Utc::now());
        assert_eq!(s.status, SubmissionStatus::Submitted);

        let err = GradingService::apply_manual(
            &mut s,
            &[ScoreOverride {
                question_index: 0,
                points: total + 1,
            }],
            None,
            60,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                issue: ValidationIssue::ScoreExceedsMax { .. },
                ..
            }
        ));
        assert_eq!(s.status, SubmissionStatus::Submitted);

        GradingService::apply_manual(
            &mut s,
            &[ScoreOverride {
                question_index: 0,
                points: total,
            }],
            None,
            60,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(s.percentage, Some(100));
    }

    #[test]
    fn index_keyed_question_grades_option_text() {
        let a = quiz(vec![
            Question::multiple_choice("capital?", 10, vec!["Paris".into(), "Rome".into()], "0")
                .unwrap(),
        ]);
        let mut s = submitted(&a, &["Paris"]);
        GradingService::auto_grade(&mut s, 70, Utc::now());
        assert_eq!(s.status, SubmissionStatus::Graded);
        assert_eq!(s.score, Some(10));
        assert_eq!(s.passed, Some(true));

        let mut wrong = submitted(&a, &["Rome"]);
        GradingService::auto_grade(&mut wrong, 70, Utc::now());
        assert_eq!(wrong.score, Some(0));
    }

    #[test]
    fn drafts_cannot_be_graded() {
        let a = quiz(vec![Question::true_false("a", 1, true).unwrap()]);
        let mut s = Submission::new_draft(&a, "student-1", 1, Utc::now());
        assert!(GradingService::apply_manual(&mut s, &[], None, 50, Utc::now()).is_err());
    }
}
