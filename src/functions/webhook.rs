use crate::constants::{
    EMAIL_STATUS_BOUNCED, EMAIL_STATUS_CLICKED, EMAIL_STATUS_COMPLAINED, EMAIL_STATUS_DELAYED,
    EMAIL_STATUS_DELIVERED, EMAIL_STATUS_OPENED, EMAIL_STATUS_SENT, INVOICES_TABLE,
};
use crate::error::{BookingError, Result};
use crate::metrics::FunctionMetrics;
use crate::state::AppState;
use crate::storage::Filter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const FUNCTION_NAME: &str = "email-webhook";

/// Delivery event posted by the email provider
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailEvent {
    Sent,
    Delivered,
    DeliveryDelayed,
    Bounced,
    Complained,
    Opened,
    Clicked,
    Other(String),
}

impl EmailEvent {
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "email.sent" => EmailEvent::Sent,
            "email.delivered" => EmailEvent::Delivered,
            "email.delivery_delayed" => EmailEvent::DeliveryDelayed,
            "email.bounced" => EmailEvent::Bounced,
            "email.complained" => EmailEvent::Complained,
            "email.opened" => EmailEvent::Opened,
            "email.clicked" => EmailEvent::Clicked,
            other => EmailEvent::Other(other.to_string()),
        }
    }

    /// Value written to `invoices.email_status`
    pub fn status(&self) -> Option<&'static str> {
        match self {
            EmailEvent::Sent => Some(EMAIL_STATUS_SENT),
            EmailEvent::Delivered => Some(EMAIL_STATUS_DELIVERED),
            EmailEvent::DeliveryDelayed => Some(EMAIL_STATUS_DELAYED),
            EmailEvent::Bounced => Some(EMAIL_STATUS_BOUNCED),
            EmailEvent::Complained => Some(EMAIL_STATUS_COMPLAINED),
            EmailEvent::Opened => Some(EMAIL_STATUS_OPENED),
            EmailEvent::Clicked => Some(EMAIL_STATUS_CLICKED),
            EmailEvent::Other(_) => None,
        }
    }

    /// Column stamped with the event time
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            EmailEvent::Sent => Some("sent_at"),
            EmailEvent::Delivered => Some("delivered_at"),
            EmailEvent::Bounced => Some("bounced_at"),
            EmailEvent::Complained => Some("complained_at"),
            EmailEvent::Opened => Some("opened_at"),
            EmailEvent::Clicked => Some("clicked_at"),
            EmailEvent::DeliveryDelayed | EmailEvent::Other(_) => None,
        }
    }

    /// Columns to set on the invoice rows the event refers to
    pub fn invoice_patch(&self, occurred_at: &str, data: &Value) -> Option<Value> {
        let status = self.status()?;
        let mut patch = Map::new();
        patch.insert("email_status".to_string(), Value::String(status.to_string()));
        if let Some(column) = self.timestamp_column() {
            patch.insert(column.to_string(), Value::String(occurred_at.to_string()));
        }
        if *self == EmailEvent::Bounced {
            if let Some(reason) = data.pointer("/bounce/message").and_then(Value::as_str) {
                patch.insert("email_error".to_string(), Value::String(reason.to_string()));
            }
        }
        Some(Value::Object(patch))
    }
}

/// Applies a delivery event to the invoices that carry its email id.
///
/// Unknown event types are acknowledged and ignored.
pub async fn handle_email_webhook(state: &AppState, event: WebhookEvent) -> Result<WebhookAck> {
    FunctionMetrics::record_webhook_event(&event.event_type);
    let kind = EmailEvent::parse(&event.event_type);

    let occurred_at = event.created_at.clone().unwrap_or_else(|| Utc::now().to_rfc3339());
    let patch = match kind.invoice_patch(&occurred_at, &event.data) {
        Some(patch) => patch,
        None => {
            info!("Ignoring email webhook event of type '{}'", event.event_type);
            return Ok(WebhookAck { received: true });
        }
    };

    let email_id = event
        .data
        .get("email_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BookingError::MissingField("data.email_id".to_string()))?;

    let updated = state
        .db
        .update(INVOICES_TABLE, &[Filter::eq("email_id", email_id)], patch)
        .await?;
    if updated.is_empty() {
        debug!("No invoice carries email id {}", email_id);
    } else {
        state.queries.invalidate_invoices();
        info!("{} updated {} invoice(s) for email {}", event.event_type, updated.len(), email_id);
    }

    Ok(WebhookAck { received: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_known_type_maps_to_a_status() {
        let known = [
            ("email.sent", "sent"),
            ("email.delivered", "delivered"),
            ("email.delivery_delayed", "delivery_delayed"),
            ("email.bounced", "bounced"),
            ("email.complained", "complained"),
            ("email.opened", "opened"),
            ("email.clicked", "clicked"),
        ];
        for (event_type, status) in known {
            assert_eq!(EmailEvent::parse(event_type).status(), Some(status));
        }
        assert_eq!(EmailEvent::parse("contact.created"), EmailEvent::Other("contact.created".into()));
        assert_eq!(EmailEvent::parse("contact.created").status(), None);
    }

    #[test]
    fn bounce_patch_carries_the_reason() {
        let data = json!({"email_id": "e1", "bounce": {"message": "Mailbox full"}});
        let patch = EmailEvent::Bounced.invoice_patch("2026-10-01T10:00:00Z", &data).unwrap();
        assert_eq!(
            patch,
            json!({"email_status": "bounced", "bounced_at": "2026-10-01T10:00:00Z", "email_error": "Mailbox full"})
        );
    }

    #[test]
    fn delayed_delivery_has_no_timestamp_column() {
        let patch = EmailEvent::DeliveryDelayed.invoice_patch("t", &Value::Null).unwrap();
        assert_eq!(patch, json!({"email_status": "delivery_delayed"}));
    }
}
