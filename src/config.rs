use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MedPanel";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when `MEDPANEL_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// HTTP timeout used when `MEDPANEL_HTTP_TIMEOUT_SECS` is unset or invalid.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Storage passphrase used when `MEDPANEL_STORAGE_KEY` is unset.
pub const DEFAULT_STORAGE_PASSPHRASE: &str = "default-key";

const ENV_API_URL: &str = "MEDPANEL_API_URL";
const ENV_TIMEOUT: &str = "MEDPANEL_HTTP_TIMEOUT_SECS";
const ENV_STORAGE_KEY: &str = "MEDPANEL_STORAGE_KEY";

/// Filter used by `init_tracing` when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medpanel=info,warn"
}

/// Get the application data directory
/// ~/MedPanel/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the encrypted local storage file
pub fn storage_path() -> PathBuf {
    app_data_dir().join("storage.enc")
}

/// Connection settings for the hospital backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix, without trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Passphrase the local token storage key is derived from.
    pub storage_passphrase: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_passphrase: DEFAULT_STORAGE_PASSPHRASE.to_string(),
        }
    }

    /// Read settings from the environment, with defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "Ignoring invalid HTTP timeout, using default");
                    DEFAULT_TIMEOUT_SECS
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let storage_passphrase = lookup(ENV_STORAGE_KEY)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_PASSPHRASE.to_string());

        Self {
            timeout_secs,
            storage_passphrase,
            ..Self::new(&base_url)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
