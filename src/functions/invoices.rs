use crate::constants::{EMAIL_STATUS_SENT, INVOICES_TABLE};
use crate::domain::Invoice;
use crate::email::invoice_email;
use crate::error::{BookingError, Result};
use crate::metrics::FunctionMetrics;
use crate::state::AppState;
use crate::storage::Filter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{info, warn};

pub const FUNCTION_NAME: &str = "send-invoice-emails";

#[derive(Debug, Deserialize)]
pub struct SendInvoiceEmailsRequest {
    pub invoice_ids: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FailedInvoice {
    pub invoice_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SendInvoiceEmailsResponse {
    pub success: bool,
    pub sent: usize,
    pub failed: Vec<FailedInvoice>,
}

/// Emails each requested invoice to its client and records the send on the invoice row.
///
/// Problems with individual invoices are reported in `failed` rather than
/// failing the whole request.
pub async fn send_invoice_emails(state: &AppState, request: SendInvoiceEmailsRequest) -> Result<SendInvoiceEmailsResponse> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = request
        .invoice_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect();
    if ids.is_empty() {
        return Err(BookingError::Validation("invoice_ids must contain at least one invoice id".to_string()));
    }

    let rows = state.db.select(INVOICES_TABLE, &[Filter::is_in("id", ids.iter().cloned())]).await?;
    let found: HashSet<&str> = rows.iter().filter_map(|row| row.get("id").and_then(Value::as_str)).collect();

    let mut failed: Vec<FailedInvoice> = ids
        .iter()
        .filter(|id| !found.contains(id.as_str()))
        .map(|id| FailedInvoice { invoice_id: id.clone(), error: "invoice not found".to_string() })
        .collect();
    let mut sent = 0;

    for row in rows {
        let row_id = row.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let invoice: Invoice = match serde_json::from_value(row) {
            Ok(invoice) => invoice,
            Err(e) => {
                warn!("Skipping unreadable invoice row {}: {}", row_id, e);
                failed.push(FailedInvoice { invoice_id: row_id, error: format!("invalid invoice row: {}", e) });
                continue;
            }
        };
        let Some(recipient) = invoice.recipient() else {
            failed.push(FailedInvoice { invoice_id: invoice.id.clone(), error: "invoice has no client email".to_string() });
            continue;
        };

        let email = invoice_email(&invoice, recipient, &state.email_from);
        match state.mailer.send(&email).await {
            Ok(email_id) => {
                sent += 1;
                FunctionMetrics::record_email_sent();
                let patch = json!({
                    "email_id": email_id,
                    "email_status": EMAIL_STATUS_SENT,
                    "sent_at": Utc::now().to_rfc3339(),
                });
                if let Err(e) = state.db.update(INVOICES_TABLE, &[Filter::eq("id", invoice.id.as_str())], patch).await {
                    warn!("Invoice {} emailed but status update failed: {}", invoice.id, e);
                }
            }
            Err(e) => {
                FunctionMetrics::record_email_failed();
                warn!("Failed to email invoice {}: {}", invoice.id, e);
                failed.push(FailedInvoice { invoice_id: invoice.id.clone(), error: e.to_string() });
            }
        }
    }

    state.queries.invalidate_invoices();
    info!("Sent {} invoice emails, {} failed", sent, failed.len());
    Ok(SendInvoiceEmailsResponse { success: true, sent, failed })
}
