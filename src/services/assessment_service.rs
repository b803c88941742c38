use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::database::AssessmentStore;
use crate::dto::assessment_dto::{
    CreateAssessmentPayload, GenerateQuestionsPayload, UpdateAssessmentPayload,
};
use crate::error::{DomainError, Error, Invariant, Result};
use crate::models::assessment::{Assessment, AssessmentType, ReorderTarget, TypeSwitch};
use crate::models::question::{Question, QuestionDraft};
use crate::services::ai_service::{revalidate, GenerationOutcome, QuestionGenerator};
use crate::services::publish_guard::PublishGuard;
use crate::utils::time::now;

/// Authoring side of the lifecycle: create, edit, publish.
#[derive(Clone)]
pub struct AssessmentService {
    store: Arc<dyn AssessmentStore>,
    generator: Option<Arc<dyn QuestionGenerator>>,
    max_generated_questions: usize,
}

impl AssessmentService {
    pub fn new(
        store: Arc<dyn AssessmentStore>,
        generator: Option<Arc<dyn QuestionGenerator>>,
        max_generated_questions: usize,
    ) -> Self {
        Self {
            store,
            generator,
            max_generated_questions,
        }
    }

    pub async fn create(&self, payload: CreateAssessmentPayload) -> Result<Assessment> {
        let mut assessment = Assessment::new(
            payload.course_id,
            payload.title,
            payload.assessment_type,
            now(),
        );
        assessment.description = payload.description;
        assessment.content = payload
            .content
            .into_content(payload.assessment_type, assessment.content.clone())?;

        if let Some(passing_score) = payload.passing_score {
            assessment.passing_score = passing_score;
        }
        if let Some(attempts) = payload.attempts {
            assessment.attempts = attempts;
        }
        assessment.duration_minutes = payload.duration_minutes;
        assessment.is_required_for_completion = payload.is_required_for_completion.unwrap_or(false);
        assessment.start_date = payload.start_date;
        assessment.end_date = payload.end_date;
        assessment.normalize_settings();
        assessment
            .check_settings()
            .map_err(|issue| DomainError::validation("settings", issue))?;
        assessment
            .check_total_points()
            .map_err(|issue| DomainError::validation("total_points", issue))?;

        self.store.save_assessment(&assessment).await?;
        info!(
            assessment_id = %assessment.id,
            course_id = %assessment.course_id,
            assessment_type = assessment.assessment_type().as_str(),
            "assessment created"
        );
        Ok(assessment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Assessment> {
        self.store.get_assessment(id).await
    }

    pub async fn list(&self, course_id: Option<&str>) -> Result<Vec<Assessment>> {
        self.store.list_assessments(course_id).await
    }

    /// Metadata edits always go through. Structural edits on a published
    /// assessment are subject to the submission lock.
    pub async fn update(&self, id: Uuid, payload: UpdateAssessmentPayload) -> Result<Assessment> {
        let structural = payload.is_structural();
        let mut next = self.store.get_assessment(id).await?;

        if let Some(title) = payload.title {
            next.title = title;
        }
        if payload.description.is_some() {
            next.description = payload.description;
        }
        if let Some(passing_score) = payload.passing_score {
            next.passing_score = passing_score;
        }
        if payload.duration_minutes.is_some() {
            next.duration_minutes = payload.duration_minutes;
        }
        if let Some(attempts) = payload.attempts {
            next.attempts = attempts;
        }
        if let Some(required) = payload.is_required_for_completion {
            next.is_required_for_completion = required;
        }
        if payload.start_date.is_some() {
            next.start_date = payload.start_date;
        }
        if payload.end_date.is_some() {
            next.end_date = payload.end_date;
        }
        next.normalize_settings();
        next.check_settings()
            .map_err(|issue| DomainError::validation("settings", issue))?;

        if structural {
            next.content = payload
                .content
                .into_content(next.assessment_type(), next.content.clone())?;
            next.check_total_points()
                .map_err(|issue| DomainError::validation("total_points", issue))?;
            self.guard_structure(&mut next, payload.new_version).await?;
        }

        next.updated_at = now();
        self.store.save_assessment(&next).await?;
        info!(assessment_id = %id, structural, version = next.version, "assessment updated");
        Ok(next)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_assessment(id).await? {
            return Err(Error::NotFound(format!("assessment {id}")));
        }
        info!(assessment_id = %id, "assessment deleted");
        Ok(())
    }

    pub async fn publish(&self, id: Uuid) -> Result<Assessment> {
        let mut assessment = self.store.get_assessment(id).await?;
        if let Err(err) = PublishGuard::publish(&mut assessment) {
            warn!(assessment_id = %id, error = ?err, "publish rejected");
            return Err(err.into());
        }
        assessment.updated_at = now();
        self.store.save_assessment(&assessment).await?;
        info!(assessment_id = %id, total_points = assessment.total_points(), "assessment published");
        Ok(assessment)
    }

    pub async fn unpublish(&self, id: Uuid) -> Result<Assessment> {
        let mut assessment = self.store.get_assessment(id).await?;
        PublishGuard::unpublish(&mut assessment);
        assessment.updated_at = now();
        self.store.save_assessment(&assessment).await?;
        info!(assessment_id = %id, "assessment unpublished");
        Ok(assessment)
    }

    /// Destructive: prior content is returned in the switch report and not kept.
    pub async fn switch_type(
        &self,
        id: Uuid,
        to: AssessmentType,
        new_version: bool,
    ) -> Result<(Assessment, Option<TypeSwitch>)> {
        let current = self.store.get_assessment(id).await?;
        if current.assessment_type() == to {
            return Ok((current, None));
        }

        let (assessment, switch) = self
            .edit_structure(id, new_version, move |a| Ok(a.switch_type(to)))
            .await?;
        if let Some(switch) = &switch {
            info!(
                assessment_id = %id,
                from = switch.from.as_str(),
                to = switch.to.as_str(),
                discarded_points = switch.discarded.total_points(),
                "assessment type switched"
            );
        }
        Ok((assessment, switch))
    }

    pub async fn add_question(
        &self,
        id: Uuid,
        draft: QuestionDraft,
        new_version: bool,
    ) -> Result<(Assessment, usize)> {
        let question = Question::new(draft)?;
        self.edit_structure(id, new_version, move |a| a.add_question(question))
            .await
    }

    pub async fn remove_question(
        &self,
        id: Uuid,
        index: usize,
        new_version: bool,
    ) -> Result<(Assessment, Question)> {
        self.edit_structure(id, new_version, move |a| a.remove_question(index))
            .await
    }

    pub async fn reorder(
        &self,
        id: Uuid,
        target: ReorderTarget,
        order: Vec<i64>,
        new_version: bool,
    ) -> Result<Assessment> {
        let (assessment, ()) = self
            .edit_structure(id, new_version, move |a| a.reorder(target, &order))
            .await?;
        Ok(assessment)
    }

    /// Asks the configured generator for questions and revalidates them. With
    /// `append`, accepted questions are added to the assessment.
    pub async fn generate_questions(
        &self,
        id: Uuid,
        payload: GenerateQuestionsPayload,
    ) -> Result<(GenerationOutcome, Option<Assessment>)> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::BadRequest("question generation is not configured".to_string()))?;

        let assessment = self.store.get_assessment(id).await?;
        let assessment_type = assessment.assessment_type();
        let policy = assessment_type.policy();
        if policy.allowed_question_types.is_empty() {
            return Err(DomainError::invariant(Invariant::NotQuestionBased { assessment_type }).into());
        }

        let count = payload.count.min(self.max_generated_questions);
        let raw = generator
            .generate(&payload.topic, count, policy.allowed_question_types)
            .await?;
        let outcome = revalidate(raw, assessment_type, count);
        info!(
            assessment_id = %id,
            requested = count,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "questions generated"
        );

        if !payload.append || outcome.accepted.is_empty() {
            return Ok((outcome, None));
        }

        let questions = outcome.accepted.clone();
        let (assessment, ()) = self
            .edit_structure(id, payload.new_version, move |a| {
                for q in questions {
                    a.add_question(q)?;
                }
                Ok(())
            })
            .await?;
        Ok((outcome, Some(assessment)))
    }

    /// Runs a structural edit against a fresh copy and saves it only if the
    /// result still satisfies the publish rules.
    async fn edit_structure<T, F>(&self, id: Uuid, new_version: bool, edit: F) -> Result<(Assessment, T)>
    where
        T: Send,
        F: FnOnce(&mut Assessment) -> std::result::Result<T, DomainError> + Send,
    {
        let mut next = self.store.get_assessment(id).await?;
        let out = edit(&mut next)?;
        next.check_total_points()
            .map_err(|issue| DomainError::validation("total_points", issue))?;
        self.guard_structure(&mut next, new_version).await?;
        next.updated_at = now();
        self.store.save_assessment(&next).await?;
        Ok((next, out))
    }

    async fn guard_structure(&self, next: &mut Assessment, new_version: bool) -> Result<()> {
        if !next.is_published {
            return Ok(());
        }
        let turned_in = self.store.count_turned_in(next.id).await?;
        PublishGuard::check_structural_edit(next, turned_in, new_version)?;
        PublishGuard::check(next)?;
        if turned_in > 0 {
            next.version += 1;
            info!(assessment_id = %next.id, version = next.version, "assessment versioned");
        }
        Ok(())
    }
}
