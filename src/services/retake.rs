use crate::models::assessment::Assessment;
use crate::models::submission::{Submission, SubmissionStatus};

/// Non-draft submissions, the ones that consume attempts.
pub fn attempts_used(submissions: &[Submission]) -> u32 {
    submissions.iter().filter(|s| s.counts_toward_limit()).count() as u32
}

pub fn latest_turned_in(submissions: &[Submission]) -> Option<&Submission> {
    submissions
        .iter()
        .filter(|s| s.counts_toward_limit())
        .max_by_key(|s| s.attempt_number)
}

/// Whether the learner may start another attempt after a graded, failed one.
/// Pure: only answers the question.
pub fn can_retake(assessment: &Assessment, submissions: &[Submission]) -> bool {
    let Some(latest) = latest_turned_in(submissions) else {
        return false;
    };
    latest.status == SubmissionStatus::Graded
        && latest.passed == Some(false)
        && attempts_used(submissions) < assessment.attempts
}
