use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::AssessmentStore;
use crate::error::Result;
use crate::models::assessment::Assessment;
use crate::models::submission::Submission;

/// Postgres store. Aggregates live in JSONB `body` columns; the key columns
/// alongside them exist for filtering and the attempt uniqueness constraint.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment> {
        let Json(assessment) =
            sqlx::query_scalar::<_, Json<Assessment>>(r#"SELECT body FROM assessments WHERE id = $1"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(assessment)
    }

    async fn save_assessment(&self, assessment: &Assessment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assessments (
                id, course_id, assessment_type, is_published, version, body, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                assessment_type = EXCLUDED.assessment_type,
                is_published = EXCLUDED.is_published,
                version = EXCLUDED.version,
                body = EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(assessment.id)
        .bind(&assessment.course_id)
        .bind(assessment.assessment_type().as_str())
        .bind(assessment.is_published)
        .bind(assessment.version as i32)
        .bind(Json(assessment))
        .bind(assessment.created_at)
        .bind(assessment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_assessment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM assessments WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_assessments(&self, course_id: Option<&str>) -> Result<Vec<Assessment>> {
        let rows = sqlx::query_scalar::<_, Json<Assessment>>(
            r#"
            SELECT body FROM assessments
            WHERE ($1::text IS NULL OR course_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(a)| a).collect())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Submission> {
        let Json(submission) =
            sqlx::query_scalar::<_, Json<Submission>>(r#"SELECT body FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(submission)
    }

    async fn list_submissions(
        &self,
        assessment_id: Uuid,
        student_id: Option<&str>,
    ) -> Result<Vec<Submission>> {
        let rows = sqlx::query_scalar::<_, Json<Submission>>(
            r#"
            SELECT body FROM submissions
            WHERE assessment_id = $1
              AND ($2::text IS NULL OR student_id = $2)
            ORDER BY student_id, attempt_number
            "#,
        )
        .bind(assessment_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(s)| s).collect())
    }

    async fn save_submission(&self, submission: &Submission) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, assessment_id, student_id, attempt_number, status, body
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                body = EXCLUDED.body,
                updated_at = NOW()
            "#,
        )
        .bind(submission.id)
        .bind(submission.assessment_id)
        .bind(&submission.student_id)
        .bind(submission.attempt_number as i32)
        .bind(submission.status.as_str())
        .bind(Json(submission))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_turned_in(&self, assessment_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM submissions WHERE assessment_id = $1 AND status <> 'draft'"#,
        )
        .bind(assessment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}
