//! Configuration for the sync engine and the Google client.

use std::time::Duration;

/// Configuration for reconciliation and the watcher.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Email of the main (source of truth) contact box.
    pub main_email: Option<String>,
    /// Email of the internal-domain box; ids it assigns are also kept as
    /// `Contact::domain_id`.
    pub domain_email: Option<String>,
    /// Interval between scheduled reconciliations.
    pub watch_interval: Duration,
}

impl SyncConfig {
    /// Creates a configuration watching `main_email`.
    pub fn new(main_email: impl Into<String>) -> Self {
        Self {
            main_email: Some(main_email.into()),
            ..Self::default()
        }
    }

    /// Sets the internal-domain box email.
    pub fn with_domain_email(mut self, email: impl Into<String>) -> Self {
        self.domain_email = Some(email.into());
        self
    }

    /// Sets the watch interval.
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            main_email: None,
            domain_email: None,
            watch_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Default Google OAuth consent endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Default Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Default Google userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
/// Default contacts feed base URL.
pub const GOOGLE_CONTACTS_URL: &str = "https://www.google.com/m8/feeds/contacts/default/full";
/// Largest batch the contacts API accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for the Google contacts client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URL registered for the OAuth client.
    pub redirect_url: String,
    /// Scopes requested on consent.
    pub scopes: Vec<String>,
    /// Consent endpoint.
    pub auth_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// Userinfo endpoint.
    pub userinfo_url: String,
    /// Contacts feed base URL; the batch endpoint is `<base>/batch`.
    pub contacts_url: String,
    /// Entries per batch request (clamped to [`MAX_BATCH_SIZE`]).
    pub batch_size: usize,
    /// Entries per feed page.
    pub page_size: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl GoogleConfig {
    /// Creates a configuration for an OAuth client.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            ..Self::default()
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Points every endpoint at `base`, for test servers and proxies.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{base}/o/oauth2/v2/auth");
        self.token_url = format!("{base}/token");
        self.userinfo_url = format!("{base}/userinfo");
        self.contacts_url = format!("{base}/m8/feeds/contacts/default/full");
        self
    }

    /// Returns the batch size actually used.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Returns the batch endpoint.
    pub fn batch_url(&self) -> String {
        format!("{}/batch", self.contacts_url.trim_end_matches('/'))
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            scopes: vec![
                "https://www.google.com/m8/feeds/".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
            ],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            contacts_url: GOOGLE_CONTACTS_URL.to_string(),
            batch_size: MAX_BATCH_SIZE,
            page_size: 500,
            request_timeout: Duration::from_secs(30),
        }
    }
}
