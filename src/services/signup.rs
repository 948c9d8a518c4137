//! The signup / token-exchange handshake.
//!
//! Two stateless steps: signup validates the (username, email) binding,
//! get-or-creates the identity, and emails a confirmation code; token
//! exchange trades a valid code for a JWT access credential. The service
//! takes every input explicitly so it is testable without an HTTP harness.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::api::validation;
use crate::auth::{AccessTokens, ConfirmationCodes};
use crate::constants::auth::CONFIRMATION_MAIL_SUBJECT;
use crate::db::Store;
use crate::services::Mailer;

#[derive(Debug, Error)]
pub enum SignupError {
    /// Field-scoped validation failure.
    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    /// The (username, email) pair collides with an existing binding.
    #[error("{0}")]
    Conflict(String),

    #[error("No user with username '{0}'")]
    UnknownUsername(String),

    /// The confirmation mail could not be delivered; the signup as a whole
    /// fails rather than succeeding silently without a code.
    #[error("Failed to deliver confirmation code: {0}")]
    MailDelivery(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct SignupService {
    store: Store,
    codes: ConfirmationCodes,
    tokens: AccessTokens,
    mailer: Arc<dyn Mailer>,
}

impl SignupService {
    #[must_use]
    pub fn new(
        store: Store,
        codes: ConfirmationCodes,
        tokens: AccessTokens,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            codes,
            tokens,
            mailer,
        }
    }

    /// Step 1: validate, cross-check the binding, get-or-create, mail a
    /// fresh confirmation code. Idempotent for the same (username, email)
    /// pair; every call issues a new code.
    pub async fn signup(&self, username: &str, email: &str) -> Result<(), SignupError> {
        validation::validate_username(username).map_err(|message| SignupError::Invalid {
            field: "username",
            message,
        })?;
        validation::validate_email(email).map_err(|message| SignupError::Invalid {
            field: "email",
            message,
        })?;

        let by_username = self.store.get_user_by_username(username).await?;
        let by_email = self.store.get_user_by_email(email).await?;

        if let Some(user) = &by_username
            && user.email != email
        {
            return Err(SignupError::Conflict(format!(
                "Username '{username}' is already registered with a different email"
            )));
        }

        if let Some(user) = &by_email
            && user.username != username
        {
            return Err(SignupError::Conflict(format!(
                "Email '{email}' is already bound to another username"
            )));
        }

        let user = self.store.get_or_create_user(username, email).await?;

        let code = self.codes.issue(&user);

        // Addressed to the submitted email, which by now is known to match
        // the stored one.
        self.mailer
            .send(
                email,
                CONFIRMATION_MAIL_SUBJECT,
                &format!("Your confirmation code: {code}"),
            )
            .await
            .map_err(|e| SignupError::MailDelivery(e.to_string()))?;

        info!("Issued confirmation code for {username}");
        Ok(())
    }

    /// Step 2: trade a confirmation code for an access token. Bumps
    /// `last_login`, which retires the code just used.
    pub async fn exchange(&self, username: &str, code: &str) -> Result<String, SignupError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| SignupError::UnknownUsername(username.to_string()))?;

        if !self.codes.verify(&user, code) {
            return Err(SignupError::Invalid {
                field: "confirmation_code",
                message: "Invalid or expired confirmation code".to_string(),
            });
        }

        let token = self.tokens.mint(&user)?;
        self.store.touch_last_login(user).await?;

        info!("Access token minted for {username}");
        Ok(token)
    }

    /// Exposed so tests and the CLI can issue codes without going through
    /// mail delivery.
    #[must_use]
    pub const fn codes(&self) -> &ConfirmationCodes {
        &self.codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::LogMailer;
    use crate::services::mailer::testing::FailingMailer;

    async fn service(mailer: Arc<dyn Mailer>) -> SignupService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        SignupService::new(
            store,
            ConfirmationCodes::new("test-secret", 3600),
            AccessTokens::new("test-secret", 3600),
            mailer,
        )
    }

    #[tokio::test]
    async fn test_signup_is_idempotent_per_pair() {
        let svc = service(Arc::new(LogMailer)).await;

        svc.signup("alice", "alice@example.com").await.unwrap();
        svc.signup("alice", "alice@example.com").await.unwrap();

        let users = svc.store.list_users(None).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_signup_rejects_reserved_username() {
        let svc = service(Arc::new(LogMailer)).await;
        let err = svc.signup("me", "me@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            SignupError::Invalid {
                field: "username",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_signup_conflicts_on_rebinding() {
        let svc = service(Arc::new(LogMailer)).await;
        svc.signup("alice", "alice@example.com").await.unwrap();

        let err = svc
            .signup("alice", "other@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, SignupError::Conflict(_)));

        let err = svc.signup("bob", "alice@example.com").await.unwrap_err();
        assert!(matches!(err, SignupError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mail_failure_aborts_signup() {
        let svc = service(Arc::new(FailingMailer)).await;
        let err = svc.signup("alice", "alice@example.com").await.unwrap_err();
        assert!(matches!(err, SignupError::MailDelivery(_)));
    }

    #[tokio::test]
    async fn test_exchange_unknown_username() {
        let svc = service(Arc::new(LogMailer)).await;
        let err = svc.exchange("ghost", "whatever").await.unwrap_err();
        assert!(matches!(err, SignupError::UnknownUsername(_)));
    }

    #[tokio::test]
    async fn test_exchange_wrong_code_is_field_scoped() {
        let svc = service(Arc::new(LogMailer)).await;
        svc.signup("alice", "alice@example.com").await.unwrap();

        let err = svc.exchange("alice", "0-bogus").await.unwrap_err();
        assert!(matches!(
            err,
            SignupError::Invalid {
                field: "confirmation_code",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_exchange_happy_path_retires_code() {
        let svc = service(Arc::new(LogMailer)).await;
        svc.signup("alice", "alice@example.com").await.unwrap();

        let user = svc
            .store
            .get_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        let code = svc.codes.issue(&user);

        let token = svc.exchange("alice", &code).await.unwrap();
        assert!(svc.tokens.verify(&token).is_ok());

        // last_login moved, so the same code no longer verifies.
        let err = svc.exchange("alice", &code).await.unwrap_err();
        assert!(matches!(err, SignupError::Invalid { .. }));
    }
}
