use crate::email::client_message_email;
use crate::error::{BookingError, Result};
use crate::metrics::FunctionMetrics;
use crate::state::AppState;
use serde::{Deserialize, Serialize};

pub const FUNCTION_NAME: &str = "send-client-message";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessageRequest {
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientMessageResponse {
    pub success: bool,
    pub id: String,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BookingError::MissingField(field.to_string()))
}

pub async fn send_client_message(state: &AppState, request: ClientMessageRequest) -> Result<ClientMessageResponse> {
    let client_email = required(&request.client_email, "clientEmail")?;
    let client_name = required(&request.client_name, "clientName")?;
    let message = required(&request.message, "message")?;
    if !client_email.contains('@') {
        return Err(BookingError::Validation(format!("'{}' is not an email address", client_email)));
    }

    let email = client_message_email(client_email, client_name, message, &state.email_from);
    let id = state.mailer.send(&email).await.map_err(|e| {
        FunctionMetrics::record_email_failed();
        e
    })?;
    FunctionMetrics::record_email_sent();
    Ok(ClientMessageResponse { success: true, id })
}
