//! Mail transports: the Resend HTTP API, and a logger for keyless setups.

use async_trait::async_trait;
use reqwest::Client;

use super::{Email, MailError, Mailer};

#[derive(Debug, Clone)]
pub struct ResendClient {
    http: Client,
    api_key: String,
    api_base: String,
}

impl ResendClient {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Self {
        Self { http: Client::new(), api_key: api_key.into(), api_base: api_base.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let response = self.http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, message });
        }
        Ok(())
    }
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = ?email.to, subject = %email.subject, "email (not delivered, no RESEND_API_KEY)");
        Ok(())
    }
}
