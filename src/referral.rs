use crate::constants::{
    REFERRAL_ATTEMPTS_PER_CODE, REFERRAL_CODES_TABLE, REFERRAL_CODE_ALPHABET, REFERRAL_CODE_LENGTH,
    REFERRAL_SINGLE_CODE_ATTEMPTS,
};
use crate::error::{BookingError, Result};
use crate::storage::{Database, Filter};
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Random code over `[A-Z0-9]`
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LENGTH)
        .map(|_| REFERRAL_CODE_ALPHABET[rng.gen_range(0..REFERRAL_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Where issued referral codes live
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    async fn code_exists(&self, code: &str) -> Result<bool>;
    async fn store_codes(&self, codes: &[String]) -> Result<()>;
}

/// [`CodeRegistry`] over the `referral_codes` table
pub struct DatabaseCodeRegistry {
    db: Arc<dyn Database>,
}

impl DatabaseCodeRegistry {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodeRegistry for DatabaseCodeRegistry {
    async fn code_exists(&self, code: &str) -> Result<bool> {
        let rows = self.db.select(REFERRAL_CODES_TABLE, &[Filter::eq("code", code)]).await?;
        Ok(!rows.is_empty())
    }

    async fn store_codes(&self, codes: &[String]) -> Result<()> {
        let rows = codes.iter().map(|code| json!({ "code": code, "is_active": true })).collect();
        self.db.insert(REFERRAL_CODES_TABLE, rows).await?;
        Ok(())
    }
}

pub struct ReferralCodeGenerator {
    registry: Arc<dyn CodeRegistry>,
    generate: fn() -> String,
}

impl ReferralCodeGenerator {
    pub fn new(registry: Arc<dyn CodeRegistry>) -> Self {
        Self { registry, generate: generate_code }
    }

    /// Swaps the random source, for deterministic collisions in tests
    pub fn with_source(mut self, generate: fn() -> String) -> Self {
        self.generate = generate;
        self
    }

    /// One code not yet in the registry
    pub async fn generate_unique_code(&self) -> Result<String> {
        for attempt in 1..=REFERRAL_SINGLE_CODE_ATTEMPTS {
            let code = (self.generate)();
            if !self.registry.code_exists(&code).await? {
                return Ok(code);
            }
            debug!("Referral code {} already taken (attempt {})", code, attempt);
        }
        Err(BookingError::Api {
            message: format!(
                "could not find an unused referral code after {} attempts",
                REFERRAL_SINGLE_CODE_ATTEMPTS
            ),
        })
    }

    /// Up to `count` distinct unused codes.
    ///
    /// Candidates are checked one at a time. After `3 * count` attempts the
    /// generator stops with a warning and returns the codes it has, so the
    /// result can be shorter than requested.
    pub async fn generate_bulk_codes(&self, count: usize) -> Result<Vec<String>> {
        let max_attempts = count.saturating_mul(REFERRAL_ATTEMPTS_PER_CODE);
        let mut codes = Vec::new();
        let mut seen = HashSet::new();
        let mut attempts = 0;

        while codes.len() < count && attempts < max_attempts {
            attempts += 1;
            let code = (self.generate)();
            if seen.contains(&code) || self.registry.code_exists(&code).await? {
                continue;
            }
            seen.insert(code.clone());
            codes.push(code);
        }

        if codes.len() < count {
            warn!(
                "Only generated {} of {} referral codes after {} attempts",
                codes.len(),
                count,
                attempts
            );
        } else {
            info!("Generated {} referral codes in {} attempts", count, attempts);
        }
        Ok(codes)
    }

    /// Generates and persists a batch
    pub async fn issue_codes(&self, count: usize) -> Result<Vec<String>> {
        let codes = self.generate_bulk_codes(count).await?;
        if !codes.is_empty() {
            self.registry.store_codes(&codes).await?;
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDatabase;

    fn is_well_formed(code: &str) -> bool {
        code.len() == 6 && code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }

    fn registry_with(codes: &[&str]) -> (Arc<InMemoryDatabase>, Arc<dyn CodeRegistry>) {
        let rows = codes.iter().map(|c| json!({ "code": c })).collect();
        let db = Arc::new(InMemoryDatabase::new().with_rows(REFERRAL_CODES_TABLE, rows));
        let registry: Arc<dyn CodeRegistry> = Arc::new(DatabaseCodeRegistry::new(db.clone()));
        (db, registry)
    }

    #[test]
    fn codes_are_six_uppercase_alphanumerics() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(is_well_formed(&code), "bad code {}", code);
        }
    }

    #[tokio::test]
    async fn bulk_returns_exactly_n_distinct_codes() {
        let (_, registry) = registry_with(&[]);
        let generator = ReferralCodeGenerator::new(registry);

        let codes = generator.generate_bulk_codes(50).await.unwrap();
        assert_eq!(codes.len(), 50);
        assert!(codes.iter().all(|c| is_well_formed(c)));
        let distinct: HashSet<_> = codes.iter().collect();
        assert_eq!(distinct.len(), 50);
    }

    #[tokio::test]
    async fn bulk_gives_up_after_three_attempts_per_code() {
        let (_, registry) = registry_with(&["AAAAAA"]);
        let generator = ReferralCodeGenerator::new(registry).with_source(|| "AAAAAA".to_string());

        let codes = generator.generate_bulk_codes(4).await.unwrap();
        assert!(codes.is_empty());
    }

    #[tokio::test]
    async fn duplicates_within_a_batch_are_skipped() {
        let (_, registry) = registry_with(&[]);
        let generator = ReferralCodeGenerator::new(registry).with_source(|| "BBBBBB".to_string());

        let codes = generator.generate_bulk_codes(3).await.unwrap();
        assert_eq!(codes, vec!["BBBBBB".to_string()]);
    }

    #[tokio::test]
    async fn single_code_exhausts_its_attempts() {
        let (_, registry) = registry_with(&["CCCCCC"]);
        let generator = ReferralCodeGenerator::new(registry).with_source(|| "CCCCCC".to_string());
        assert!(generator.generate_unique_code().await.is_err());
    }

    struct UnreachableRegistry;

    #[async_trait]
    impl CodeRegistry for UnreachableRegistry {
        async fn code_exists(&self, _code: &str) -> Result<bool> {
            Err(BookingError::Backend { status: 503, message: "unavailable".into() })
        }

        async fn store_codes(&self, _codes: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn huge_counts_do_not_overflow_the_attempt_budget() {
        let generator = ReferralCodeGenerator::new(Arc::new(UnreachableRegistry));
        let err = generator.generate_bulk_codes(usize::MAX).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn issued_codes_are_stored() {
        let (db, registry) = registry_with(&["TAKEN1"]);
        let generator = ReferralCodeGenerator::new(registry);

        let codes = generator.issue_codes(5).await.unwrap();
        assert_eq!(codes.len(), 5);
        assert_eq!(db.rows(REFERRAL_CODES_TABLE).len(), 6);
        let single = generator.generate_unique_code().await.unwrap();
        assert!(!codes.contains(&single));
    }
}
