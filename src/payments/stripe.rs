//! Stripe Checkout over its form-encoded REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway, SessionStatus};
use crate::config::StripeSettings;

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: Option<String>,
    api_base: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            http: Client::new(),
            secret_key: settings.secret_key.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn key(&self) -> Result<&str, PaymentError> {
        self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(text);
            return Err(PaymentError::Api { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }
}

/// Flattens a session request into Stripe's bracketed form keys.
pub(crate) fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), item.currency.code().to_lowercase()));
        form.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
        form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
        form.push((format!("{prefix}[price_data][product_data][description]"), item.description.clone()));
    }
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError> {
        let response = self.http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.key()?)
            .form(&session_form(&request))
            .send()
            .await?;
        let session: CheckoutSession = Self::parse(response).await?;
        tracing::info!(session_id = %session.id, items = request.line_items.len(), "created checkout session");
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let response = self.http
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .bearer_auth(self.key()?)
            .send()
            .await?;
        Self::parse(response).await
    }
}
