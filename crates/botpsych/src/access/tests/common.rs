use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Extension;
use chrono::Utc;
use serde_json::Value;

use crate::access::domain::{Credentials, Registration, Role, User, UserId, VerificationNotice};
use crate::access::extract::SharedAuthenticator;
use crate::access::password::hash_password;
use crate::access::repository::{
    MailError, UserRepository, UserRepositoryError, VerificationMailer,
};
use crate::access::{access_router, AccessService};
use crate::config::AuthConfig;

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "access-tests-secret".to_string(),
        token_ttl_days: 30,
        frontend_url: "https://botpsy.test".to_string(),
        admin_emails: vec!["admin@botpsy.test".to_string()],
    }
}

pub(super) fn registration(email: &str) -> Registration {
    Registration {
        name: "Asha Rao".to_string(),
        email: email.to_string(),
        password: "s3cure-pass".to_string(),
    }
}

pub(super) fn credentials(email: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: "s3cure-pass".to_string(),
    }
}

pub(super) fn build_service() -> (
    AccessService<MemoryUsers, MemoryMailer>,
    Arc<MemoryUsers>,
    Arc<MemoryMailer>,
) {
    let users = Arc::new(MemoryUsers::default());
    let mailer = Arc::new(MemoryMailer::default());
    let service = AccessService::new(users.clone(), mailer.clone(), &auth_config());
    (service, users, mailer)
}

/// Stores a verified account directly, bypassing the email flow.
pub(super) fn seed_verified(users: &MemoryUsers, email: &str, role: Role) -> User {
    let user = User {
        id: UserId::generate(),
        name: format!("{} account", role.label()),
        email: email.to_string(),
        password_hash: hash_password("s3cure-pass").expect("hash"),
        role,
        verified: true,
        verification_token: None,
        created_at: Utc::now(),
    };
    users.insert(user.clone()).expect("seed user");
    user
}

#[derive(Default, Clone)]
pub(super) struct MemoryUsers {
    records: Arc<Mutex<HashMap<UserId, User>>>,
}

impl UserRepository for MemoryUsers {
    fn insert(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(UserRepositoryError::Conflict);
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    fn update(&self, user: User) -> Result<(), UserRepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        match guard.get_mut(&user.id) {
            Some(slot) => {
                *slot = user;
                Ok(())
            }
            None => Err(UserRepositoryError::NotFound),
        }
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }

    fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard
            .values()
            .find(|user| user.verification_token.as_deref() == Some(token))
            .cloned())
    }

    fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn remove(&self, id: &UserId) -> Result<(), UserRepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(UserRepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    sent: Arc<Mutex<Vec<VerificationNotice>>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<VerificationNotice> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    /// Token embedded in the most recent verification link.
    pub(super) fn last_token(&self) -> String {
        let sent = self.sent();
        let notice = sent.last().expect("a verification email was sent");
        notice
            .verification_url
            .split("token=")
            .nth(1)
            .expect("link carries a token")
            .to_string()
    }
}

#[async_trait::async_trait]
impl VerificationMailer for MemoryMailer {
    async fn send_verification(&self, notice: &VerificationNotice) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

pub(super) struct OfflineMailer;

#[async_trait::async_trait]
impl VerificationMailer for OfflineMailer {
    async fn send_verification(&self, _notice: &VerificationNotice) -> Result<(), MailError> {
        Err(MailError::Transport("smtp offline".to_string()))
    }
}

pub(super) fn router_with_service(service: AccessService<MemoryUsers, MemoryMailer>) -> axum::Router {
    let service = Arc::new(service);
    let authenticator: SharedAuthenticator = service.clone();
    access_router(service).layer(Extension(authenticator))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
