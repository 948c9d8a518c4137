//! Session credentials: HS256 JWTs with an embedded expiry.
//!
//! No revocation list is consulted on verification; a token is valid until
//! its `exp` passes.

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::entities::users;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub username: String,
    pub exp: i64,
}

pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl AccessTokens {
    #[must_use]
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn mint(&self, user: &users::Model) -> Result<String> {
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            exp: chrono::Utc::now().timestamp() + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign access token")
    }

    /// Decodes and validates a bearer token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .context("Invalid access token")?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> users::Model {
        users::Model {
            id: 42,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            role: "user".to_string(),
            bio: None,
            first_name: None,
            last_name: None,
            is_superuser: false,
            last_login: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_mint_and_verify() {
        let tokens = AccessTokens::new("secret", 3600);
        let token = tokens.mint(&user()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "bob");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tokens = AccessTokens::new("secret", 3600);
        let other = AccessTokens::new("other", 3600);
        let token = tokens.mint(&user()).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = AccessTokens::new("secret", -120);
        let token = tokens.mint(&user()).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = AccessTokens::new("secret", 3600);
        assert!(tokens.verify("not.a.jwt").is_err());
        assert!(tokens.verify("").is_err());
    }
}
