use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Extension;
use serde_json::Value;

use crate::access::{AccessError, Authenticator, Principal, Role, SharedAuthenticator, UserId};
use crate::screening::catalog::{CatalogError, QuestionCatalog};
use crate::screening::domain::{
    AgeGroup, AssessmentId, AssessmentRecord, AssessmentSubmission, Language, Question,
    QuestionId, ResponseSet, Translated, UserType,
};
use crate::screening::repository::{newest_first, AssessmentRepository, RepositoryError};
use crate::screening::{screening_router, ScreeningService};

pub(super) const QUESTION_A: QuestionId = QuestionId(1);
pub(super) const QUESTION_B: QuestionId = QuestionId(2);

pub(super) fn question(id: u32, weights: &[f64], age_groups: &[&str]) -> Question {
    let options_en: Vec<String> = (0..weights.len()).map(|i| format!("Option {i}")).collect();
    let options_hi: Vec<String> = (0..weights.len()).map(|i| format!("विकल्प {i}")).collect();
    Question {
        id: QuestionId(id),
        category: "Social Communication".to_string(),
        age_groups: age_groups.iter().map(|group| AgeGroup::new(*group)).collect(),
        text: Translated {
            en: format!("Question {id}"),
            hi: format!("प्रश्न {id}"),
        },
        options: Translated {
            en: options_en,
            hi: options_hi,
        },
        weights: weights.to_vec(),
    }
}

/// Question A weights `[0,1,2,3]`, question B weights `[0,2,4]`.
pub(super) fn sample_questions() -> Vec<Question> {
    vec![
        question(1, &[0.0, 1.0, 2.0, 3.0], &["2-5", "6-12"]),
        question(2, &[0.0, 2.0, 4.0], &["2-5"]),
    ]
}

pub(super) fn responses(pairs: &[(QuestionId, i64)]) -> ResponseSet {
    pairs.iter().copied().collect()
}

pub(super) fn submission(pairs: &[(QuestionId, i64)]) -> AssessmentSubmission {
    AssessmentSubmission {
        user_type: UserType::Child,
        age: 4,
        language: Language::En,
        responses: responses(pairs),
    }
}

pub(super) fn member() -> Principal {
    Principal {
        user_id: UserId::generate(),
        role: Role::User,
    }
}

pub(super) fn admin() -> Principal {
    Principal {
        user_id: UserId::generate(),
        role: Role::Admin,
    }
}

pub(super) fn build_service() -> (
    ScreeningService<MemoryCatalog, MemoryAssessments>,
    Arc<MemoryCatalog>,
    Arc<MemoryAssessments>,
) {
    let catalog = Arc::new(MemoryCatalog::with_questions(sample_questions()));
    let assessments = Arc::new(MemoryAssessments::default());
    let service = ScreeningService::new(catalog.clone(), assessments.clone());
    (service, catalog, assessments)
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
}

impl MemoryCatalog {
    pub(super) fn with_questions(questions: Vec<Question>) -> Self {
        let catalog = Self::default();
        for question in questions {
            catalog.insert(question).expect("seed question");
        }
        catalog
    }
}

impl QuestionCatalog for MemoryCatalog {
    fn find_by_ids(&self, ids: &BTreeSet<QuestionId>) -> Result<Vec<Question>, CatalogError> {
        let guard = self.questions.lock().expect("catalog mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    fn find_by_age_group(&self, age_group: &AgeGroup) -> Result<Vec<Question>, CatalogError> {
        let guard = self.questions.lock().expect("catalog mutex poisoned");
        Ok(guard
            .values()
            .filter(|question| question.applies_to(age_group))
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Question>, CatalogError> {
        let guard = self.questions.lock().expect("catalog mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert(&self, question: Question) -> Result<Question, CatalogError> {
        let mut guard = self.questions.lock().expect("catalog mutex poisoned");
        if guard.contains_key(&question.id) {
            return Err(CatalogError::Conflict(question.id));
        }
        guard.insert(question.id, question.clone());
        Ok(question)
    }

    fn update(&self, question: Question) -> Result<(), CatalogError> {
        let mut guard = self.questions.lock().expect("catalog mutex poisoned");
        match guard.get_mut(&question.id) {
            Some(slot) => {
                *slot = question;
                Ok(())
            }
            None => Err(CatalogError::NotFound),
        }
    }

    fn remove(&self, id: QuestionId) -> Result<(), CatalogError> {
        let mut guard = self.questions.lock().expect("catalog mutex poisoned");
        guard
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }
}

pub(super) struct UnavailableCatalog;

impl QuestionCatalog for UnavailableCatalog {
    fn find_by_ids(&self, _ids: &BTreeSet<QuestionId>) -> Result<Vec<Question>, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn find_by_age_group(&self, _age_group: &AgeGroup) -> Result<Vec<Question>, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Question>, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _question: Question) -> Result<Question, CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _question: Question) -> Result<(), CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _id: QuestionId) -> Result<(), CatalogError> {
        Err(CatalogError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAssessments {
    records: Arc<Mutex<Vec<AssessmentRecord>>>,
}

impl MemoryAssessments {
    pub(super) fn count(&self) -> usize {
        self.records.lock().expect("assessment mutex poisoned").len()
    }
}

impl AssessmentRepository for MemoryAssessments {
    fn create(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("assessment mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn list_by_user(&self, user: &UserId) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("assessment mutex poisoned");
        Ok(newest_first(
            guard
                .iter()
                .filter(|record| &record.user == user)
                .cloned()
                .collect(),
        ))
    }

    fn latest_by_user(&self, user: &UserId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Ok(self.list_by_user(user)?.into_iter().next())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("assessment mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }
}

pub(super) struct UnavailableAssessments;

impl AssessmentRepository for UnavailableAssessments {
    fn create(&self, _record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_user(&self, _user: &UserId) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest_by_user(
        &self,
        _user: &UserId,
    ) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Maps fixed bearer tokens to principals so routes can be driven without real logins.
#[derive(Default)]
pub(super) struct StaticAuthenticator {
    tokens: HashMap<String, Principal>,
}

impl StaticAuthenticator {
    pub(super) fn with(mut self, token: &str, principal: Principal) -> Self {
        self.tokens.insert(token.to_string(), principal);
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Principal, AccessError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| AccessError::Unauthorized("Not authorized, token failed".to_string()))
    }
}

pub(super) fn router_with(
    service: ScreeningService<MemoryCatalog, MemoryAssessments>,
    authenticator: StaticAuthenticator,
) -> axum::Router {
    let authenticator: SharedAuthenticator = Arc::new(authenticator);
    screening_router(Arc::new(service)).layer(Extension(authenticator))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
