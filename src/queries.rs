//! Cached data-access for the dashboards.
//!
//! Reads go through per-shape [`QueryBatcher`]s keyed by `<table>:<scope>:<id>`,
//! so writes can drop everything for a table with one `clear_cache` call.

use crate::cache::QueryBatcher;
use crate::constants::{BOOKINGS_TABLE, INVOICES_TABLE, PROFILES_TABLE, USER_PREFERENCES_TABLE};
use crate::domain::{Booking, BookingSummary, Invoice, PreferencesUpdate, UserPreferences};
use crate::error::{BookingError, Result};
use crate::storage::{fetch_rows, Database, Filter};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct BookingQueries {
    db: Arc<dyn Database>,
    bookings: QueryBatcher<Vec<BookingSummary>>,
    invoices: QueryBatcher<Vec<Invoice>>,
    preferences: QueryBatcher<UserPreferences>,
}

impl BookingQueries {
    pub fn new(db: Arc<dyn Database>, ttl: Duration) -> Self {
        Self {
            db,
            bookings: QueryBatcher::new(ttl),
            invoices: QueryBatcher::new(ttl),
            preferences: QueryBatcher::new(ttl),
        }
    }

    pub fn database(&self) -> Arc<dyn Database> {
        Arc::clone(&self.db)
    }

    pub async fn bookings_for_client(&self, client_id: &str) -> Result<Vec<BookingSummary>> {
        self.bookings_by("client_id", client_id).await
    }

    pub async fn bookings_for_nanny(&self, nanny_id: &str) -> Result<Vec<BookingSummary>> {
        self.bookings_by("nanny_id", nanny_id).await
    }

    async fn bookings_by(&self, column: &'static str, id: &str) -> Result<Vec<BookingSummary>> {
        let key = format!("{}:{}:{}", BOOKINGS_TABLE, column, id);
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        self.bookings
            .get_or_fetch(&key, move || async move {
                let mut rows: Vec<Booking> = fetch_rows(db.as_ref(), BOOKINGS_TABLE, &[Filter::eq(column, id)]).await?;
                rows.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
                Ok(rows.iter().map(BookingSummary::from).collect())
            })
            .await
    }

    pub async fn invoices_for_client(&self, client_id: &str) -> Result<Vec<Invoice>> {
        let key = format!("{}:client_id:{}", INVOICES_TABLE, client_id);
        let db = Arc::clone(&self.db);
        let client_id = client_id.to_string();
        self.invoices
            .get_or_fetch(&key, move || async move {
                fetch_rows(db.as_ref(), INVOICES_TABLE, &[Filter::eq("client_id", client_id)]).await
            })
            .await
    }

    pub async fn preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let key = preferences_key(user_id);
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        self.preferences
            .get_or_fetch(&key, move || async move {
                let rows: Vec<UserPreferences> =
                    fetch_rows(db.as_ref(), USER_PREFERENCES_TABLE, &[Filter::eq("user_id", user_id.clone())]).await?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| BookingError::NotFound(format!("preferences for user {}", user_id)))
            })
            .await
    }

    /// Writes the preferences row, then mirrors the relevant columns onto the profile.
    ///
    /// A failed profile sync is logged and left as is; the preferences write stands.
    pub async fn update_preferences(&self, user_id: &str, update: &PreferencesUpdate) -> Result<UserPreferences> {
        update.validate()?;

        let mut patch = serde_json::to_value(update)?;
        if let Value::Object(map) = &mut patch {
            map.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }

        let filters = [Filter::eq("user_id", user_id)];
        let mut rows = self.db.update(USER_PREFERENCES_TABLE, &filters, patch.clone()).await?;
        if rows.is_empty() {
            if let Value::Object(map) = &mut patch {
                map.insert("user_id".to_string(), Value::String(user_id.to_string()));
            }
            rows = self.db.insert(USER_PREFERENCES_TABLE, vec![patch]).await?;
        }
        self.preferences.invalidate(&preferences_key(user_id));

        let saved: UserPreferences = rows
            .into_iter()
            .next()
            .map(serde_json::from_value::<UserPreferences>)
            .transpose()?
            .ok_or_else(|| BookingError::NotFound(format!("preferences for user {}", user_id)))?;
        info!("Updated preferences for user {}", user_id);

        if let Some(profile_patch) = update.profile_patch() {
            if let Err(e) = self.db.update(PROFILES_TABLE, &[Filter::eq("id", user_id)], profile_patch).await {
                warn!("Profile sync failed for user {} after preferences update: {}", user_id, e);
            }
        }

        Ok(saved)
    }

    /// Drops cached invoice reads after invoice rows change
    pub fn invalidate_invoices(&self) -> usize {
        self.invoices.clear_cache(INVOICES_TABLE)
    }

    pub fn invalidate_bookings(&self) -> usize {
        self.bookings.clear_cache(BOOKINGS_TABLE)
    }
}

fn preferences_key(user_id: &str) -> String {
    format!("{}:user_id:{}", USER_PREFERENCES_TABLE, user_id)
}
