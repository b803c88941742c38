use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::assessment::Assessment;
use crate::models::submission::Submission;

/// Persistence seam. The domain core hands snapshots in and gets snapshots back;
/// everything behind this trait is I/O.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment>;

    async fn save_assessment(&self, assessment: &Assessment) -> Result<()>;

    /// Removes the assessment and every submission taken against it.
    async fn delete_assessment(&self, id: Uuid) -> Result<bool>;

    async fn list_assessments(&self, course_id: Option<&str>) -> Result<Vec<Assessment>>;

    async fn get_submission(&self, id: Uuid) -> Result<Submission>;

    /// Submissions for an assessment ordered by student then attempt number;
    /// `student_id` narrows to one learner.
    async fn list_submissions(
        &self,
        assessment_id: Uuid,
        student_id: Option<&str>,
    ) -> Result<Vec<Submission>>;

    async fn save_submission(&self, submission: &Submission) -> Result<()>;

    /// Submissions that left draft, across all learners.
    async fn count_turned_in(&self, assessment_id: Uuid) -> Result<u64> {
        let submissions = self.list_submissions(assessment_id, None).await?;
        Ok(submissions.iter().filter(|s| s.counts_toward_limit()).count() as u64)
    }
}
