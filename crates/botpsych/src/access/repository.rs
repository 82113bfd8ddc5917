use super::domain::{User, UserId, VerificationNotice};

/// Account storage so the access service can be exercised in isolation.
pub trait UserRepository: Send + Sync {
    /// Stores a new account; `Conflict` when the email is already registered.
    fn insert(&self, user: User) -> Result<User, UserRepositoryError>;
    fn update(&self, user: User) -> Result<(), UserRepositoryError>;
    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;
    /// `email` is already normalized by the caller.
    fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;
    fn find_by_verification_token(&self, token: &str)
        -> Result<Option<User>, UserRepositoryError>;
    fn list(&self) -> Result<Vec<User>, UserRepositoryError>;
    fn remove(&self, id: &UserId) -> Result<(), UserRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("account already exists")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook delivering verification links (e-mail provider adapters).
#[async_trait::async_trait]
pub trait VerificationMailer: Send + Sync {
    async fn send_verification(&self, notice: &VerificationNotice) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
