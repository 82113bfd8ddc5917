use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::catalog::{CatalogError, QuestionCatalog};
use super::domain::{
    AgeGroup, AssessmentDetail, AssessmentId, AssessmentRecord, AssessmentSubmission, Language,
    LocalizedQuestion, Question, QuestionDraft, QuestionId, QuestionPatch, RecordedResponse,
};
use super::repository::{AssessmentRepository, RepositoryError};
use super::scoring::QuestionIndex;
use super::validation::{
    referenced_questions, validate_question, validate_submission, ValidationError,
};
use crate::access::{require_role, AccessError, Principal, Role, UserId};

/// Service composing the question catalog, the scoring engine and assessment history.
pub struct ScreeningService<C, R> {
    catalog: Arc<C>,
    assessments: Arc<R>,
}

impl<C, R> ScreeningService<C, R>
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    pub fn new(catalog: Arc<C>, assessments: Arc<R>) -> Self {
        Self {
            catalog,
            assessments,
        }
    }

    /// Scores and stores a submission for `user`.
    ///
    /// Validation and scoring complete before the repository is touched, so a rejected
    /// submission leaves no record behind. Catalog failures abort the submission.
    pub fn submit(
        &self,
        user: UserId,
        submission: AssessmentSubmission,
    ) -> Result<AssessmentDetail, ScreeningError> {
        validate_submission(&submission)?;

        let ids = referenced_questions(&submission);
        let questions = self
            .catalog
            .find_by_ids(&ids)
            .map_err(ScreeningError::dependency)?;
        let outcome = QuestionIndex::new(&questions).score(&submission.responses)?;

        let record = AssessmentRecord {
            id: AssessmentId::generate(),
            user,
            user_type: submission.user_type,
            age: submission.age,
            language: submission.language,
            score: outcome.total_score,
            max_score: outcome.max_score,
            risk_level: outcome.risk_level,
            responses: outcome.responses.iter().map(RecordedResponse::from).collect(),
            created_at: Utc::now(),
        };

        let stored = self.assessments.create(record)?;
        info!(
            assessment = %stored.id,
            user = %stored.user,
            answered = stored.responses.len(),
            risk = stored.risk_level.label(),
            "assessment scored"
        );

        Ok(AssessmentDetail::populate(stored, &questions))
    }

    /// The caller's assessments, newest first.
    pub fn history(&self, user: &UserId) -> Result<Vec<AssessmentRecord>, ScreeningError> {
        Ok(self.assessments.list_by_user(user)?)
    }

    pub fn latest(&self, user: &UserId) -> Result<Option<AssessmentDetail>, ScreeningError> {
        match self.assessments.latest_by_user(user)? {
            Some(record) => self.populate(record).map(Some),
            None => Ok(None),
        }
    }

    /// One assessment, readable by its owner or an admin.
    pub fn assessment(
        &self,
        principal: &Principal,
        id: &AssessmentId,
    ) -> Result<AssessmentDetail, ScreeningError> {
        let record = self
            .assessments
            .fetch(id)?
            .ok_or_else(|| ScreeningError::NotFound("Assessment not found".to_string()))?;

        if record.user != principal.user_id && !principal.is_admin() {
            warn!(assessment = %id, user = %principal.user_id, "foreign assessment requested");
            return Err(AccessError::Forbidden(
                "Not authorized to view this assessment".to_string(),
            )
            .into());
        }

        self.populate(record)
    }

    /// Question set for an age group rendered in `language`.
    pub fn questions_for(
        &self,
        age_group: &str,
        language: &str,
    ) -> Result<Vec<LocalizedQuestion>, ScreeningError> {
        let age_group = AgeGroup::new(age_group);
        if age_group.as_str().is_empty() || language.trim().is_empty() {
            return Err(ValidationError::Malformed(
                "Age group and language are required".to_string(),
            )
            .into());
        }
        let language = Language::parse(language).ok_or_else(|| {
            ValidationError::Malformed(format!("unsupported language '{}'", language.trim()))
        })?;

        let questions = self
            .catalog
            .find_by_age_group(&age_group)
            .map_err(ScreeningError::dependency)?;
        if questions.is_empty() {
            return Err(ScreeningError::NotFound(
                "No questions found for this age group".to_string(),
            ));
        }

        Ok(questions
            .iter()
            .map(|question| question.localize(language))
            .collect())
    }

    pub fn list_questions(&self, principal: &Principal) -> Result<Vec<Question>, ScreeningError> {
        require_role(principal, Role::Admin)?;
        let mut questions = self.catalog.all()?;
        questions.sort_by_key(|question| question.id);
        Ok(questions)
    }

    pub fn create_question(
        &self,
        principal: &Principal,
        draft: QuestionDraft,
    ) -> Result<Question, ScreeningError> {
        require_role(principal, Role::Admin)?;
        let question = Question::from(draft);
        validate_question(&question)?;

        let stored = self.catalog.insert(question)?;
        info!(question = %stored.id, admin = %principal.user_id, "question created");
        Ok(stored)
    }

    /// Applies `patch` over the stored question and re-validates the result.
    pub fn update_question(
        &self,
        principal: &Principal,
        id: QuestionId,
        patch: QuestionPatch,
    ) -> Result<Question, ScreeningError> {
        require_role(principal, Role::Admin)?;
        let current = self
            .catalog
            .find_by_ids(&BTreeSet::from([id]))?
            .into_iter()
            .next()
            .ok_or_else(|| ScreeningError::NotFound("Question not found".to_string()))?;

        let updated = patch.apply(current);
        validate_question(&updated)?;
        self.catalog.update(updated.clone())?;

        info!(question = %id, admin = %principal.user_id, "question updated");
        Ok(updated)
    }

    pub fn delete_question(
        &self,
        principal: &Principal,
        id: QuestionId,
    ) -> Result<(), ScreeningError> {
        require_role(principal, Role::Admin)?;
        self.catalog.remove(id)?;
        info!(question = %id, admin = %principal.user_id, "question removed");
        Ok(())
    }

    fn populate(&self, record: AssessmentRecord) -> Result<AssessmentDetail, ScreeningError> {
        let ids: BTreeSet<QuestionId> = record
            .responses
            .iter()
            .map(|response| response.question)
            .collect();
        let questions = self
            .catalog
            .find_by_ids(&ids)
            .map_err(ScreeningError::dependency)?;
        Ok(AssessmentDetail::populate(record, &questions))
    }
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("question catalog unavailable: {0}")]
    Dependency(String),
}

impl ScreeningError {
    /// Catalog reads behind a submission or a render are never defaulted.
    fn dependency(error: CatalogError) -> Self {
        match error {
            CatalogError::Unavailable(reason) => ScreeningError::Dependency(reason),
            other => ScreeningError::Catalog(other),
        }
    }
}
