//! Accounts, email verification, bearer tokens and role checks.

pub mod domain;
pub mod extract;
pub mod mailer;
pub mod password;
pub mod repository;
pub mod router;
pub mod service;
pub mod token;

#[cfg(test)]
mod tests;

pub use domain::{
    Credentials, LoginResponse, Principal, Registration, Role, User, UserId, UserPatch,
    UserProfile, VerificationNotice,
};
pub use extract::{bearer_token, SharedAuthenticator};
pub use mailer::ResendMailer;
pub use repository::{MailError, UserRepository, UserRepositoryError, VerificationMailer};
pub use router::access_router;
pub use service::{require_role, AccessError, AccessService, Authenticator};
pub use token::{TokenClaims, TokenError, TokenIssuer};
