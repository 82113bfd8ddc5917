use botpsych::access::{
    MailError, ResendMailer, User, UserId, UserRepository, UserRepositoryError,
    VerificationMailer, VerificationNotice,
};
use botpsych::screening::{
    newest_first, AgeGroup, AssessmentId, AssessmentRecord, AssessmentRepository, CatalogError,
    Question, QuestionCatalog, QuestionId, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryQuestionCatalog {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
}

impl QuestionCatalog for InMemoryQuestionCatalog {
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
        if guard.contains_key(&question.id) {
            guard.insert(question.id, question);
            Ok(())
        } else {
            Err(CatalogError::NotFound)
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Arc<Mutex<Vec<AssessmentRecord>>>,
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn create(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn list_by_user(&self, user: &UserId) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(UserRepositoryError::Conflict);
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    fn update(&self, user: User) -> Result<(), UserRepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.email == user.email && existing.id != user.id)
        {
            return Err(UserRepositoryError::Conflict);
        }
        match guard.get_mut(&user.id) {
            Some(slot) => {
                *slot = user;
                Ok(())
            }
            None => Err(UserRepositoryError::NotFound),
        }
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }

    fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard
            .values()
            .find(|user| user.verification_token.as_deref() == Some(token))
            .cloned())
    }

    fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn remove(&self, id: &UserId) -> Result<(), UserRepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(UserRepositoryError::NotFound)
    }
}

/// Writes verification links to the log when no mail provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingMailer;

#[async_trait::async_trait]
impl VerificationMailer for LoggingMailer {
    async fn send_verification(&self, notice: &VerificationNotice) -> Result<(), MailError> {
        info!(
            email = %notice.email,
            url = %notice.verification_url,
            "verification email not sent; no mail provider configured"
        );
        Ok(())
    }
}

/// Mail transport picked at startup.
#[derive(Debug, Clone)]
pub(crate) enum OutboundMailer {
    Resend(ResendMailer),
    Log(LoggingMailer),
}

#[async_trait::async_trait]
impl VerificationMailer for OutboundMailer {
    async fn send_verification(&self, notice: &VerificationNotice) -> Result<(), MailError> {
        match self {
            OutboundMailer::Resend(mailer) => mailer.send_verification(notice).await,
            OutboundMailer::Log(mailer) => mailer.send_verification(notice).await,
        }
    }
}
