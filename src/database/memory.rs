use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::AssessmentStore;
use crate::error::{Error, Result};
use crate::models::assessment::Assessment;
use crate::models::submission::Submission;

/// In-process store. Backs tests and single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    assessments: RwLock<HashMap<Uuid, Assessment>>,
    submissions: RwLock<HashMap<Uuid, Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment> {
        self.assessments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("assessment {id}")))
    }

    async fn save_assessment(&self, assessment: &Assessment) -> Result<()> {
        self.assessments
            .write()
            .await
            .insert(assessment.id, assessment.clone());
        Ok(())
    }

    async fn delete_assessment(&self, id: Uuid) -> Result<bool> {
        let removed = self.assessments.write().await.remove(&id).is_some();
        if removed {
            self.submissions
                .write()
                .await
                .retain(|_, s| s.assessment_id != id);
        }
        Ok(removed)
    }

    async fn list_assessments(&self, course_id: Option<&str>) -> Result<Vec<Assessment>> {
        let guard = self.assessments.read().await;
        let mut rows: Vec<Assessment> = guard
            .values()
            .filter(|a| course_id.map_or(true, |c| a.course_id == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Submission> {
        self.submissions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("submission {id}")))
    }

    async fn list_submissions(
        &self,
        assessment_id: Uuid,
        student_id: Option<&str>,
    ) -> Result<Vec<Submission>> {
        let guard = self.submissions.read().await;
        let mut rows: Vec<Submission> = guard
            .values()
            .filter(|s| s.assessment_id == assessment_id)
            .filter(|s| student_id.map_or(true, |id| s.student_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.student_id
                .cmp(&b.student_id)
                .then(a.attempt_number.cmp(&b.attempt_number))
        });
        Ok(rows)
    }

    async fn save_submission(&self, submission: &Submission) -> Result<()> {
        let mut guard = self.submissions.write().await;
        let clash = guard.values().any(|s| {
            s.id != submission.id
                && s.assessment_id == submission.assessment_id
                && s.student_id == submission.student_id
                && s.attempt_number == submission.attempt_number
        });
        if clash {
            return Err(Error::Conflict(format!(
                "attempt {} already exists",
                submission.attempt_number
            )));
        }
        guard.insert(submission.id, submission.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::AssessmentType;
    use chrono::Utc;

    #[tokio::test]
    async fn delete_cascades_to_submissions() {
        let store = MemoryStore::new();
        let a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        store.save_assessment(&a).await.unwrap();
        let s = Submission::new_draft(&a, "student-1", 1, Utc::now());
        store.save_submission(&s).await.unwrap();

        assert!(store.delete_assessment(a.id).await.unwrap());
        assert!(matches!(
            store.get_submission(s.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(!store.delete_assessment(a.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_attempt_numbers_conflict() {
        let store = MemoryStore::new();
        let a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        store
            .save_submission(&Submission::new_draft(&a, "s", 1, Utc::now()))
            .await
            .unwrap();
        let dup = Submission::new_draft(&a, "s", 1, Utc::now());
        assert!(matches!(
            store.save_submission(&dup).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_student_and_orders_attempts() {
        let store = MemoryStore::new();
        let a = Assessment::new("c", "Quiz", AssessmentType::Quiz, Utc::now());
        for (student, n) in [("b", 2), ("a", 1), ("b", 1)] {
            store
                .save_submission(&Submission::new_draft(&a, student, n, Utc::now()))
                .await
                .unwrap();
        }
        let rows = store.list_submissions(a.id, Some("b")).await.unwrap();
        let numbers: Vec<u32> = rows.iter().map(|s| s.attempt_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(store.list_submissions(a.id, None).await.unwrap().len(), 3);
    }
}
