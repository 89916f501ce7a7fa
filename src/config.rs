use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_EMAIL_FROM, RESEND_API_BASE};
use crate::error::{BookingError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application settings.
///
/// Non-secret settings come from an optional TOML file. Credentials are only
/// ever read from the environment, and the file format rejects unknown
/// sections so a `[supabase]` block with a key in it fails loudly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub email: EmailConfig,
    #[serde(skip)]
    pub supabase: Option<SupabaseConfig>,
    #[serde(skip)]
    pub resend_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8787, log_dir: "logs".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: DEFAULT_CACHE_TTL_SECS }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    pub from_address: String,
    pub api_base: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_address: DEFAULT_EMAIL_FROM.to_string(),
            api_base: RESEND_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
}

impl SupabaseConfig {
    /// Reads `SUPABASE_URL` (or `SUPABASE_PROJECT_REF`) and `SUPABASE_SERVICE_ROLE_KEY`.
    /// `Ok(None)` when no backend is configured.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let url = match lookup("SUPABASE_URL").filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None => match lookup("SUPABASE_PROJECT_REF").filter(|r| !r.trim().is_empty()) {
                Some(project_ref) => format!("https://{}.supabase.co", project_ref.trim()),
                None => return Ok(None),
            },
        };
        let service_role_key = lookup("SUPABASE_SERVICE_ROLE_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                BookingError::Config("SUPABASE_SERVICE_ROLE_KEY must be set when a Supabase URL is configured".to_string())
            })?;
        Ok(Some(Self { url: url.trim_end_matches('/').to_string(), service_role_key }))
    }
}

impl Config {
    /// Loads `NANNY_CONFIG` (default `config.toml`) if it exists, then overlays the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("NANNY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            Self::default()
        };
        base.with_env(&|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BookingError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies environment overrides and secrets
    pub fn with_env(mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = lookup("NANNY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| BookingError::Config(format!("NANNY_PORT is not a valid port: '{}'", port)))?;
        }
        if let Some(from) = lookup("EMAIL_FROM").filter(|f| !f.trim().is_empty()) {
            self.email.from_address = from;
        }
        self.supabase = SupabaseConfig::from_lookup(lookup)?;
        self.resend_api_key = lookup("RESEND_API_KEY").filter(|k| !k.trim().is_empty());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = Config::default().with_env(&env(&[])).unwrap();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert!(config.supabase.is_none());
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn file_settings_then_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9000\n\n[cache]\nttl_secs = 30\n\n[email]\nfrom_address = \"Ops <ops@example.com>\"").unwrap();

        let config = Config::from_file(file.path())
            .unwrap()
            .with_env(&env(&[
                ("NANNY_PORT", "9100"),
                ("SUPABASE_PROJECT_REF", "abcd1234"),
                ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
                ("RESEND_API_KEY", "re_test"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.email.from_address, "Ops <ops@example.com>");
        assert_eq!(
            config.supabase,
            Some(SupabaseConfig {
                url: "https://abcd1234.supabase.co".to_string(),
                service_role_key: "service-key".to_string(),
            })
        );
        assert_eq!(config.resend_api_key.as_deref(), Some("re_test"));
    }

    #[test]
    fn credentials_in_the_file_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[supabase]\nservice_role_key = \"leaked\"").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(BookingError::Toml(_))));
    }

    #[test]
    fn url_without_key_is_a_config_error() {
        let err = SupabaseConfig::from_lookup(&env(&[("SUPABASE_URL", "https://x.supabase.co/")])).unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Config::default().with_env(&env(&[("NANNY_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("NANNY_PORT"));
    }
}
