//! Application configuration
//!
//! Central location for configuration constants, storage keys, validation
//! boundaries and endpoint paths, plus the runtime settings loaded from the
//! environment at startup.

use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;

// ===== Persisted Store Keys =====

/// Session blob: `{ user_id, user_name, token }`
pub const USER_DATA_KEY: &str = "user_data";
/// Ordered list of locally created document records
pub const DOCUMENTS_KEY: &str = "documents_data";
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_NAME_KEY: &str = "user_name";

// ===== Categories =====

pub const PERSONAL_MINOR_HEADS: &[&str] = &["John", "Emily", "Tom", "Roy", "Heena"];
pub const PROFESSIONAL_MINOR_HEADS: &[&str] = &["Accounts", "HR", "IT", "Finance", "Marketing"];

// ===== Login Limits =====

/// Mobile numbers are entered without the country code
pub const MOBILE_NUMBER_LENGTH: usize = 10;
pub const OTP_LENGTH: usize = 6;
/// Seconds before a new OTP may be requested for the same number
pub const OTP_RESEND_COOLDOWN_SECS: i64 = 30;
/// Code accepted by the static OTP gateway used in development builds
pub const STATIC_OTP_CODE: &str = "123456";

// ===== Search Defaults =====

pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Upper bound on a single page request
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Number of `{tag_name: ""}` entries the legacy request shape sends for an empty tag list
pub const LEGACY_EMPTY_TAG_PLACEHOLDERS: usize = 2;

// ===== Upload Limits =====

pub const ALLOWED_UPLOAD_MIME_PREFIXES: &[&str] = &["image/"];
pub const ALLOWED_UPLOAD_MIME_TYPES: &[&str] = &["application/pdf"];

// ===== Remote Endpoints =====

pub const DEFAULT_API_URL: &str = "https://apis.allsoft.co/api/documentManagement";
pub const SEARCH_PATH: &str = "/searchDocumentEntry";
pub const UPLOAD_PATH: &str = "/documents/upload";
pub const TAGS_PATH: &str = "/documentTags";
pub const DOWNLOAD_PATH: &str = "/documents/download";
pub const DOWNLOAD_MULTIPLE_PATH: &str = "/documents/download-multiple";
pub const GENERATE_OTP_PATH: &str = "/generateOTP";
pub const VALIDATE_OTP_PATH: &str = "/validateOTP";

/// Which search strategy a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Filter the locally persisted records in memory
    Local,
    /// Paginated remote search endpoint
    Remote,
}

/// Which OTP gateway a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpMode {
    /// Accepts [`STATIC_OTP_CODE`] without contacting the network
    Static,
    Remote,
}

/// Runtime settings loaded from the environment at startup
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub search_strategy: SearchStrategy,
    pub otp_mode: OtpMode,
    pub legacy_empty_tag_placeholders: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from("./docvault-data"),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            search_strategy: SearchStrategy::Remote,
            otp_mode: OtpMode::Static,
            legacy_empty_tag_placeholders: false,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the current directory is read first, except in tests.
    pub fn from_env() -> Result<Self> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("DOCVAULT_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let data_dir = lookup("DOCVAULT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let page_size = match lookup("DOCVAULT_PAGE_SIZE") {
            Some(raw) => {
                let size = parse_var::<usize>("DOCVAULT_PAGE_SIZE", &raw)?;
                if size == 0 || size > MAX_PAGE_SIZE {
                    return Err(AppError::Config(format!(
                        "DOCVAULT_PAGE_SIZE must be between 1 and {}, got {}",
                        MAX_PAGE_SIZE, size
                    )));
                }
                size
            }
            None => defaults.page_size,
        };

        let request_timeout = match lookup("DOCVAULT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_var::<u64>("DOCVAULT_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let search_strategy = match lookup("DOCVAULT_SEARCH").as_deref() {
            None => defaults.search_strategy,
            Some(raw) => match raw.to_lowercase().as_str() {
                "local" => SearchStrategy::Local,
                "remote" => SearchStrategy::Remote,
                other => {
                    return Err(AppError::Config(format!(
                        "DOCVAULT_SEARCH must be 'local' or 'remote', got '{}'",
                        other
                    )))
                }
            },
        };

        let otp_mode = match lookup("DOCVAULT_OTP").as_deref() {
            None => defaults.otp_mode,
            Some(raw) => match raw.to_lowercase().as_str() {
                "static" => OtpMode::Static,
                "remote" => OtpMode::Remote,
                other => {
                    return Err(AppError::Config(format!(
                        "DOCVAULT_OTP must be 'static' or 'remote', got '{}'",
                        other
                    )))
                }
            },
        };

        let legacy_empty_tag_placeholders = match lookup("DOCVAULT_LEGACY_EMPTY_TAGS") {
            Some(raw) => parse_var::<bool>("DOCVAULT_LEGACY_EMPTY_TAGS", &raw)?,
            None => defaults.legacy_empty_tag_placeholders,
        };

        Ok(Self {
            api_url,
            data_dir,
            page_size,
            request_timeout,
            search_strategy,
            otp_mode,
            legacy_empty_tag_placeholders,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("docvault.db")
    }

    pub fn file_cache_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }

    /// Empty `{tag_name}` entries to send when a search has no tags
    pub fn empty_tag_placeholders(&self) -> usize {
        if self.legacy_empty_tag_placeholders {
            LEGACY_EMPTY_TAG_PLACEHOLDERS
        } else {
            0
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.search_strategy, SearchStrategy::Remote);
        assert_eq!(config.otp_mode, OtpMode::Static);
        assert!(!config.legacy_empty_tag_placeholders);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("DOCVAULT_API_URL", "http://localhost:8080/api/"),
            ("DOCVAULT_DATA_DIR", "/tmp/docvault"),
            ("DOCVAULT_PAGE_SIZE", "25"),
            ("DOCVAULT_TIMEOUT_SECS", "5"),
            ("DOCVAULT_SEARCH", "Local"),
            ("DOCVAULT_OTP", "remote"),
            ("DOCVAULT_LEGACY_EMPTY_TAGS", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080/api");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/docvault/docvault.db"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.search_strategy, SearchStrategy::Local);
        assert_eq!(config.otp_mode, OtpMode::Remote);
        assert!(config.legacy_empty_tag_placeholders);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup_from(&[("DOCVAULT_PAGE_SIZE", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[("DOCVAULT_PAGE_SIZE", "ten")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[("DOCVAULT_SEARCH", "cloud")])).is_err());
    }
}
