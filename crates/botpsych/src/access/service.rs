use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::domain::{
    normalize_email, Credentials, LoginResponse, Principal, Registration, Role, User, UserId,
    UserPatch, UserProfile, VerificationNotice,
};
use super::password::{
    hash_password_async, verification_token, verify_password_async, PasswordError,
};
use super::repository::{MailError, UserRepository, UserRepositoryError, VerificationMailer};
use super::token::{TokenError, TokenIssuer};
use crate::config::AuthConfig;

/// Resolves bearer tokens into principals. Routers depend on this seam rather
/// than on a concrete service.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Principal, AccessError>;
}

/// Identity and permission failures plus the dependencies behind them.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("account not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] UserRepositoryError),
    #[error("user registered, but the verification email could not be sent: {0}")]
    Mail(#[from] MailError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(TokenError),
}

/// Checks that the caller holds `role`. Admins pass every check.
pub fn require_role(principal: &Principal, role: Role) -> Result<(), AccessError> {
    if principal.role == role || principal.is_admin() {
        Ok(())
    } else {
        Err(AccessError::Forbidden(format!(
            "not authorized as {}",
            role.label()
        )))
    }
}

/// Registration, verification, login and account administration.
pub struct AccessService<U, M> {
    users: Arc<U>,
    mailer: Arc<M>,
    tokens: TokenIssuer,
    frontend_url: String,
    admin_emails: Vec<String>,
}

impl<U, M> AccessService<U, M>
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    pub fn new(users: Arc<U>, mailer: Arc<M>, config: &AuthConfig) -> Self {
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            Duration::days(i64::from(config.token_ttl_days)),
        );
        Self {
            users,
            mailer,
            tokens,
            frontend_url: config.frontend_url.clone(),
            admin_emails: config.admin_emails.clone(),
        }
    }

    /// Creates an unverified account and mails the verification link. A mail failure
    /// keeps the account and is reported as [`AccessError::Mail`]. Addresses listed in
    /// `ADMIN_EMAILS` are registered as admins.
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<UserProfile, AccessError> {
        let name = registration.name.trim().to_string();
        let email = normalize_email(&registration.email);
        if name.is_empty() || email.is_empty() || registration.password.is_empty() {
            return Err(AccessError::Validation("Please add all fields".to_string()));
        }
        if !email.contains('@') {
            return Err(AccessError::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }
        if self.users.find_by_email(&email)?.is_some() {
            return Err(AccessError::Validation("User already exists".to_string()));
        }

        let role = if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::User
        };
        let token = verification_token();
        let user = User {
            id: UserId::generate(),
            name,
            email,
            password_hash: hash_password_async(registration.password).await?,
            role,
            verified: false,
            verification_token: Some(token.clone()),
            created_at: Utc::now(),
        };

        let stored = match self.users.insert(user) {
            Ok(stored) => stored,
            Err(UserRepositoryError::Conflict) => {
                return Err(AccessError::Validation("User already exists".to_string()))
            }
            Err(other) => return Err(other.into()),
        };
        info!(user = %stored.id, role = stored.role.label(), "account registered");

        let notice = VerificationNotice {
            name: stored.name.clone(),
            email: stored.email.clone(),
            verification_url: format!("{}/verify-email?token={token}", self.frontend_url),
        };
        if let Err(err) = self.mailer.send_verification(&notice).await {
            warn!(user = %stored.id, error = %err, "verification email failed");
            return Err(err.into());
        }

        Ok(stored.profile())
    }

    pub fn verify_email(&self, token: &str) -> Result<UserProfile, AccessError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccessError::Validation(
                "Verification token is missing.".to_string(),
            ));
        }

        let mut user = self.users.find_by_verification_token(token)?.ok_or_else(|| {
            AccessError::Validation("Invalid or expired verification token.".to_string())
        })?;
        user.verified = true;
        user.verification_token = None;
        self.users.update(user.clone())?;

        info!(user = %user.id, "email verified");
        Ok(user.profile())
    }

    pub async fn login(&self, credentials: Credentials) -> Result<LoginResponse, AccessError> {
        let invalid = || AccessError::Unauthorized("Invalid credentials".to_string());
        let email = normalize_email(&credentials.email);
        if email.is_empty() || credentials.password.is_empty() {
            return Err(invalid());
        }

        let user = self.users.find_by_email(&email)?.ok_or_else(invalid)?;
        if !verify_password_async(credentials.password, user.password_hash.clone()).await? {
            return Err(invalid());
        }
        if !user.verified {
            return Err(AccessError::Forbidden(
                "Please verify your email address before logging in.".to_string(),
            ));
        }

        let token = self.tokens.issue(user.id).map_err(AccessError::Token)?;
        Ok(LoginResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token,
        })
    }

    pub fn me(&self, principal: &Principal) -> Result<UserProfile, AccessError> {
        self.users
            .find_by_id(&principal.user_id)?
            .map(|user| user.profile())
            .ok_or(AccessError::NotFound)
    }

    pub fn list_users(&self, principal: &Principal) -> Result<Vec<UserProfile>, AccessError> {
        require_role(principal, Role::Admin)?;
        let mut users: Vec<UserProfile> =
            self.users.list()?.iter().map(User::profile).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    pub fn update_user(
        &self,
        principal: &Principal,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<UserProfile, AccessError> {
        require_role(principal, Role::Admin)?;
        let mut user = self.users.find_by_id(id)?.ok_or(AccessError::NotFound)?;

        if let Some(name) = patch.name.map(|name| name.trim().to_string()) {
            if !name.is_empty() {
                user.name = name;
            }
        }
        if let Some(email) = patch.email.map(|email| normalize_email(&email)) {
            if !email.is_empty() && email != user.email {
                if !email.contains('@') {
                    return Err(AccessError::Validation(
                        "Please provide a valid email address".to_string(),
                    ));
                }
                if self.users.find_by_email(&email)?.is_some() {
                    return Err(AccessError::Validation("Email already in use".to_string()));
                }
                user.email = email;
            }
        }
        if let Some(role) = patch.role {
            user.role = role;
        }

        self.users.update(user.clone())?;
        info!(admin = %principal.user_id, user = %user.id, "account updated");
        Ok(user.profile())
    }

    pub fn delete_user(&self, principal: &Principal, id: &UserId) -> Result<(), AccessError> {
        require_role(principal, Role::Admin)?;
        match self.users.remove(id) {
            Ok(()) => {
                info!(admin = %principal.user_id, user = %id, "account removed");
                Ok(())
            }
            Err(UserRepositoryError::NotFound) => Err(AccessError::NotFound),
            Err(other) => Err(other.into()),
        }
    }
}

impl<U, M> Authenticator for AccessService<U, M>
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    /// Deleted accounts and role changes take effect on the next request because the
    /// role is read from the store, not from the token.
    fn authenticate(&self, token: &str) -> Result<Principal, AccessError> {
        let user_id = self.tokens.verify(token).map_err(|_| {
            AccessError::Unauthorized("Not authorized, token failed".to_string())
        })?;
        let user = self.users.find_by_id(&user_id)?.ok_or_else(|| {
            AccessError::Unauthorized("Not authorized, account no longer exists".to_string())
        })?;

        Ok(Principal {
            user_id: user.id,
            role: user.role,
        })
    }
}
