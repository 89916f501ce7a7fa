use crate::config::Config;
use crate::email::{Mailer, OutboxMailer};
use crate::gateway::{ResendMailer, SupabaseDatabase};
use crate::queries::BookingQueries;
use crate::storage::{Database, InMemoryDatabase};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared handles for the HTTP handlers
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub mailer: Arc<dyn Mailer>,
    pub queries: BookingQueries,
    pub email_from: String,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, mailer: Arc<dyn Mailer>, cache_ttl: Duration, email_from: &str) -> Self {
        Self {
            queries: BookingQueries::new(Arc::clone(&db), cache_ttl),
            db,
            mailer,
            email_from: email_from.to_string(),
        }
    }

    /// Supabase and Resend when credentials are configured, in-memory stand-ins otherwise
    pub fn from_config(config: &Config) -> Self {
        let db: Arc<dyn Database> = match &config.supabase {
            Some(supabase) => {
                info!("Using Supabase backend at {}", supabase.url);
                Arc::new(SupabaseDatabase::new(supabase))
            }
            None => {
                warn!("SUPABASE_URL not set; using an empty in-memory database");
                Arc::new(InMemoryDatabase::new())
            }
        };
        let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(&config.email.api_base, key)),
            None => {
                warn!("RESEND_API_KEY not set; emails are logged, not sent");
                Arc::new(OutboxMailer::new())
            }
        };
        Self::new(db, mailer, config.cache.ttl(), &config.email.from_address)
    }
}
