//! Row shapes returned by the managed database and their display projections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::display::{
    format_currency, format_date, format_location_value, get_home_size_display_name,
    get_home_size_full_description, is_valid_home_size,
};
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub nanny_id: Option<String>,
    pub booking_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub status: String,
    #[serde(default)]
    pub home_size: Option<String>,
    /// Either a JSON address object or free text
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

/// What the dashboards show for a booking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    pub id: String,
    pub date: String,
    pub time_range: Option<String>,
    pub status: String,
    pub home_size: String,
    pub home_size_description: String,
    pub location: String,
    pub total: Option<String>,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        let time_range = match (&booking.start_time, &booking.end_time) {
            (Some(start), Some(end)) => Some(format!("{} - {}", short_time(start), short_time(end))),
            (Some(start), None) => Some(short_time(start).to_string()),
            _ => None,
        };
        BookingSummary {
            id: booking.id.clone(),
            date: format_date(booking.booking_date),
            time_range,
            status: booking.status.clone(),
            home_size: get_home_size_display_name(booking.home_size.as_deref()).to_string(),
            home_size_description: get_home_size_full_description(booking.home_size.as_deref()).to_string(),
            location: format_location_value(booking.location.as_ref()),
            total: booking.total_amount.map(format_currency),
        }
    }
}

// "08:00:00" -> "08:00"
fn short_time(time: &str) -> &str {
    match time.match_indices(':').nth(1) {
        Some((idx, _)) => &time[..idx],
        None => time,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub email_status: Option<String>,
}

impl Invoice {
    pub fn display_number(&self) -> String {
        match &self.invoice_number {
            Some(number) if !number.trim().is_empty() => number.trim().to_string(),
            _ => self.id.chars().take(8).collect::<String>().to_uppercase(),
        }
    }

    /// Trimmed client address, if the row has a usable one
    pub fn recipient(&self) -> Option<&str> {
        self.client_email.as_deref().map(str::trim).filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default)]
    pub sms_notifications: bool,
    #[serde(default)]
    pub preferred_home_size: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Partial update sent by the preferences form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_home_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<Value>,
}

impl PreferencesUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = &self.preferred_home_size {
            if !is_valid_home_size(size) {
                return Err(BookingError::Validation(format!("unknown home size '{}'", size)));
            }
        }
        if self == &PreferencesUpdate::default() {
            return Err(BookingError::Validation("no preferences to update".to_string()));
        }
        Ok(())
    }

    /// Columns the profile row mirrors from preferences
    pub fn profile_patch(&self) -> Option<Value> {
        let mut patch = serde_json::Map::new();
        if let Some(size) = &self.preferred_home_size {
            patch.insert("home_size".to_string(), Value::String(size.clone()));
        }
        if let Some(location) = &self.preferred_location {
            patch.insert("location".to_string(), location.clone());
        }
        (!patch.is_empty()).then_some(Value::Object(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booking_summary_is_display_ready() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-1",
            "client_id": "c-1",
            "booking_date": "2026-03-14",
            "start_time": "08:00:00",
            "end_time": "16:30:00",
            "status": "confirmed",
            "home_size": "grand_estate",
            "location": "{\"street\":\"4 Bree St\",\"city\":\"Cape Town\"}",
            "total_amount": 1200
        }))
        .unwrap();

        let summary = BookingSummary::from(&booking);
        assert_eq!(summary.date, "14 March 2026");
        assert_eq!(summary.time_range.as_deref(), Some("08:00 - 16:30"));
        assert_eq!(summary.home_size, "Grand Estate");
        assert_eq!(summary.location, "4 Bree St, Cape Town");
        assert_eq!(summary.total.as_deref(), Some("R1 200.00"));
    }

    #[test]
    fn sparse_booking_uses_defaults() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-2",
            "client_id": "c-1",
            "booking_date": "2026-03-15",
            "status": "pending",
            "location": {"suburb": "Observatory"}
        }))
        .unwrap();

        let summary = BookingSummary::from(&booking);
        assert_eq!(summary.time_range, None);
        assert_eq!(summary.home_size, "Family Hub");
        assert_eq!(summary.location, "Observatory");
        assert_eq!(summary.total, None);
    }

    #[test]
    fn invoice_number_falls_back_to_id_prefix() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "a1b2c3d4-0000",
            "client_email": "x@example.com",
            "amount": 10.0
        }))
        .unwrap();
        assert_eq!(invoice.display_number(), "A1B2C3D4");
        assert_eq!(invoice.recipient(), Some("x@example.com"));
    }

    #[test]
    fn invoice_without_client_email_has_no_recipient() {
        let null_email: Invoice =
            serde_json::from_value(json!({"id": "i-1", "client_email": null, "amount": 10.0})).unwrap();
        assert_eq!(null_email.recipient(), None);

        let blank: Invoice = serde_json::from_value(json!({"id": "i-2", "client_email": "  ", "amount": 10.0})).unwrap();
        assert_eq!(blank.recipient(), None);
    }

    #[test]
    fn preference_updates_are_validated() {
        assert!(PreferencesUpdate::default().validate().is_err());

        let bad = PreferencesUpdate { preferred_home_size: Some("castle".into()), ..Default::default() };
        assert!(matches!(bad.validate(), Err(BookingError::Validation(_))));

        let good = PreferencesUpdate { sms_notifications: Some(true), ..Default::default() };
        assert!(good.validate().is_ok());
        assert_eq!(good.profile_patch(), None);

        let sized = PreferencesUpdate { preferred_home_size: Some("pocket_palace".into()), ..Default::default() };
        assert_eq!(sized.profile_patch(), Some(json!({"home_size": "pocket_palace"})));
    }
}
