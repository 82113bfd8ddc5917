use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// Claims carried by the bearer tokens this service issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token could not be signed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("token subject is not a user id")]
    Subject,
}

/// HS256 signer/validator for login tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.to_string(),
            iat: now.timestamp().max(0) as u64,
            exp: (now + self.ttl).timestamp().max(0) as u64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Checks signature and expiry, returning the user the token was issued to.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data =
            decode::<TokenClaims>(token, &self.decoding, &validation).map_err(TokenError::Invalid)?;
        UserId::parse(&data.claims.sub).ok_or(TokenError::Subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_to_the_same_user() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(30));
        let user = UserId::generate();
        let token = issuer.issue(user).expect("token issued");
        assert_eq!(issuer.verify(&token).expect("token verifies"), user);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(30));
        let other = TokenIssuer::new("other-secret", Duration::days(30));
        let token = other.issue(UserId::generate()).expect("token issued");
        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new("test-secret", Duration::minutes(-10));
        let token = issuer.issue(UserId::generate()).expect("token issued");
        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(1));
        assert!(issuer.verify("not.a.token").is_err());
    }
}
