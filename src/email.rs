use crate::display::{format_currency, format_date};
use crate::domain::Invoice;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Transactional email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the message and returns the provider's message id
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

/// Dry-run mailer: logs messages and keeps them in memory instead of sending
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<(String, OutgoingEmail)>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, OutgoingEmail)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let id = format!("outbox-{}", Uuid::new_v4());
        info!("[dry run] email {} to {:?}: {}", id, email.to, email.subject);
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((id.clone(), email.clone()));
        Ok(id)
    }
}

pub fn invoice_email(invoice: &Invoice, to: &str, from: &str) -> OutgoingEmail {
    let greeting = invoice.client_name.as_deref().unwrap_or("there");
    let due = invoice
        .due_date
        .map(|d| format!("<p>Payment is due by <strong>{}</strong>.</p>", format_date(d)))
        .unwrap_or_default();

    OutgoingEmail {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("Invoice {} from Nanny Booking", invoice.display_number()),
        html: format!(
            "<p>Hi {},</p>\
             <p>Your invoice <strong>{}</strong> for <strong>{}</strong> is ready.</p>\
             {}\
             <p>Thank you for booking with us.</p>",
            escape_html(greeting),
            escape_html(&invoice.display_number()),
            format_currency(invoice.amount),
            due
        ),
    }
}

pub fn client_message_email(client_email: &str, client_name: &str, message: &str, from: &str) -> OutgoingEmail {
    let body: String = message
        .lines()
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect();
    OutgoingEmail {
        from: from.to_string(),
        to: vec![client_email.to_string()],
        subject: "A message about your booking".to_string(),
        html: format!("<p>Hi {},</p>{}", escape_html(client_name), body),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn invoice() -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            invoice_number: Some("INV-0042".to_string()),
            client_id: Some("c1".to_string()),
            client_email: Some("thandi@example.com".to_string()),
            client_name: Some("Thandi".to_string()),
            amount: 1450.0,
            due_date: NaiveDate::from_ymd_opt(2026, 11, 1),
            status: Some("unpaid".to_string()),
            email_id: None,
            email_status: None,
        }
    }

    #[test]
    fn invoice_email_carries_amount_and_due_date() {
        let email = invoice_email(&invoice(), "thandi@example.com", "Billing <billing@example.com>");
        assert_eq!(email.to, vec!["thandi@example.com"]);
        assert_eq!(email.subject, "Invoice INV-0042 from Nanny Booking");
        assert!(email.html.contains("R1 450.00"));
        assert!(email.html.contains("1 November 2026"));
        assert!(email.html.starts_with("<p>Hi Thandi,</p>"));
    }

    #[test]
    fn client_messages_are_escaped() {
        let email = client_message_email("a@example.com", "Sam <admin>", "See you at 8\nBring <snacks>", "f@example.com");
        assert_eq!(email.html, "<p>Hi Sam &lt;admin&gt;,</p><p>See you at 8</p><p>Bring &lt;snacks&gt;</p>");
    }

    #[tokio::test]
    async fn outbox_records_what_it_sends() {
        let outbox = OutboxMailer::new();
        let id = outbox.send(&invoice_email(&invoice(), "thandi@example.com", "f@example.com")).await.unwrap();
        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, id);
        assert!(id.starts_with("outbox-"));
    }
}
