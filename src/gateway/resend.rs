use crate::email::{Mailer, OutgoingEmail};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// [`Mailer`] backed by the Resend HTTP API
pub struct ResendMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_base: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, email), fields(to = ?email.to))]
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BookingError::Email { message: format!("{} - {}", status, body) });
        }
        let parsed: SendResponse = serde_json::from_str(&body)?;
        debug!("Resend accepted message {}", parsed.id);
        Ok(parsed.id)
    }
}
