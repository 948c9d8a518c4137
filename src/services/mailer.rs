//! Out-of-band delivery of confirmation codes.
//!
//! Delivery is a hard dependency of signup: if the mailer reports failure
//! the whole signup request fails, it is never silently swallowed.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Posts messages to an HTTP mail gateway (Mailgun-style JSON endpoint).
pub struct HttpMailer {
    client: reqwest::Client,
    gateway_url: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds.into(),
            ))
            .build()
            .map_err(|e| anyhow!("Failed to build mail HTTP client: {e}"))?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            from: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = OutgoingMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&message)
            .send()
            .await
            .context("Mail gateway unreachable")?;

        if !response.status().is_success() {
            anyhow::bail!("Mail gateway rejected message: HTTP {}", response.status());
        }

        Ok(())
    }
}

/// Logs messages instead of delivering them. Used when mail is disabled in
/// config and in tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!("Mail (not delivered) to {to}: {subject} / {body}");
        Ok(())
    }
}
