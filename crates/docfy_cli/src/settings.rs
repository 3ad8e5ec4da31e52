//! Settings file loading.
//!
//! Settings come from a TOML file with `[storage]`, `[google]`, `[sync]`,
//! `[server]` and `[logging]` sections. Every key has a default, so a
//! missing default file yields a usable (if unauthorized) configuration.

use docfy_server::{AuthConfig, ServerConfig};
use docfy_sync_engine::{GoogleConfig, SyncConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings file read when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "docfy.toml";

/// Environment variable overriding `storage.path`.
pub const DATA_PATH_ENV: &str = "DOCFY_DATA_PATH";

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read settings {path}: {source}")]
    Io {
        /// Settings path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid settings TOML.
    #[error("invalid settings {path}: {source}")]
    Parse {
        /// Settings path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}

/// Root of the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local store.
    pub storage: StorageSettings,
    /// Google OAuth client and contacts API.
    pub google: GoogleSettings,
    /// Reconciliation.
    pub sync: SyncSettings,
    /// Request handlers.
    pub server: ServerSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

/// `[storage]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON snapshot file.
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/docfy.json"),
        }
    }
}

/// `[google]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Consent callback URL.
    pub redirect_url: String,
    /// Entries per batch request, at most 100.
    pub batch_size: usize,
    /// Entries per feed page.
    pub page_size: usize,
    /// Per-request timeout, seconds.
    pub request_timeout_secs: u64,
    /// Replaces every Google endpoint host, for local fakes.
    pub base_url: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        let defaults = GoogleConfig::default();
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: "http://localhost:3000/contacts/google/callback".to_string(),
            batch_size: defaults.batch_size,
            page_size: defaults.page_size,
            request_timeout_secs: defaults.request_timeout.as_secs(),
            base_url: None,
        }
    }
}

/// `[sync]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Email of the authoritative box.
    pub main_email: Option<String>,
    /// Email of the internal-domain box.
    pub domain_email: Option<String>,
    /// Seconds between scheduled runs.
    pub watch_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            main_email: None,
            domain_email: None,
            watch_interval_secs: SyncConfig::default().watch_interval.as_secs(),
        }
    }
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Token signing secret.
    pub token_secret: String,
    /// Token lifetime, minutes.
    pub token_lifetime_minutes: u64,
    /// Minimum password length on registration.
    pub min_password_length: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_lifetime_minutes: 1000,
            min_password_length: 1,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from [`DEFAULT_SETTINGS_FILE`].
    ///
    /// An explicit path must exist; a missing default file yields the
    /// defaults. `DOCFY_DATA_PATH` is applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(settings.with_data_path_override(std::env::var(DATA_PATH_ENV).ok()))
    }

    /// Reads and parses one settings file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses settings TOML.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Replaces the storage path when `value` is a non-empty path.
    pub fn with_data_path_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        self
    }

    /// Builds the Google client configuration.
    pub fn google_config(&self) -> GoogleConfig {
        let google = &self.google;
        let mut config = GoogleConfig::new(
            google.client_id.clone(),
            google.client_secret.clone(),
            google.redirect_url.clone(),
        )
        .with_batch_size(google.batch_size)
        .with_page_size(google.page_size)
        .with_request_timeout(Duration::from_secs(google.request_timeout_secs.max(1)));
        if let Some(base) = &google.base_url {
            config = config.with_base_url(base);
        }
        config
    }

    /// Builds the reconciliation configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::default()
            .with_watch_interval(Duration::from_secs(self.sync.watch_interval_secs.max(1)));
        config.main_email = self.sync.main_email.clone().filter(|e| !e.is_empty());
        config.domain_email = self.sync.domain_email.clone().filter(|e| !e.is_empty());
        config
    }

    /// Builds the handler configuration.
    pub fn server_config(&self) -> ServerConfig {
        let auth = AuthConfig::new(self.server.token_secret.as_bytes().to_vec())
            .with_lifetime(Duration::from_secs(self.server.token_lifetime_minutes * 60));
        ServerConfig::new(Vec::new())
            .with_auth(auth)
            .with_min_password_length(self.server.min_password_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[storage]
path = "/var/lib/docfy/store.json"

[google]
client_id = "client"
client_secret = "secret"
redirect_url = "https://docfy.example.com/contacts/google/callback"
batch_size = 500

[sync]
main_email = "main@docfy.com"
domain_email = "team@docfy.com"
watch_interval_secs = 30

[server]
token_secret = "s3cret"
token_lifetime_minutes = 10

[logging]
level = "debug"
"#;

    #[test]
    fn parses_every_section() {
        let settings = Settings::parse(SAMPLE).unwrap();

        assert_eq!(settings.storage.path, PathBuf::from("/var/lib/docfy/store.json"));
        assert_eq!(settings.google.client_id, "client");
        assert_eq!(settings.sync.main_email.as_deref(), Some("main@docfy.com"));
        assert_eq!(settings.server.token_lifetime_minutes, 10);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn missing_keys_take_defaults() {
        let settings = Settings::parse("[sync]\nmain_email = \"m@x.com\"\n").unwrap();

        assert_eq!(settings.storage.path, PathBuf::from("data/docfy.json"));
        assert_eq!(settings.server.token_lifetime_minutes, 1000);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.sync.watch_interval_secs, 300);
    }

    #[test]
    fn builds_library_configs() {
        let settings = Settings::parse(SAMPLE).unwrap();

        let google = settings.google_config();
        assert_eq!(google.effective_batch_size(), 100);

        let sync = settings.sync_config();
        assert_eq!(sync.domain_email.as_deref(), Some("team@docfy.com"));
        assert_eq!(sync.watch_interval, Duration::from_secs(30));

        let server = settings.server_config();
        assert_eq!(server.auth.secret, b"s3cret".to_vec());
        assert_eq!(server.auth.token_lifetime, Duration::from_secs(600));
    }

    #[test]
    fn data_path_override() {
        let settings = Settings::default().with_data_path_override(Some("/tmp/x.json".into()));
        assert_eq!(settings.storage.path, PathBuf::from("/tmp/x.json"));

        let settings = Settings::default().with_data_path_override(Some("  ".into()));
        assert_eq!(settings.storage.path, PathBuf::from("data/docfy.json"));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[sync\nmain_email = 1").unwrap();

        assert!(matches!(
            Settings::from_file(&path),
            Err(SettingsError::Parse { .. })
        ));
    }
}
