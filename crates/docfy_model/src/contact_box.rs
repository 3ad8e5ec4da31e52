//! Registered external contact accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 credential bundle for one contact box.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Instant after which the access token is no longer valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// OpenID Connect identity token, when granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthTokens {
    /// Creates a bearer token bundle.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expiry_date: None,
            token_type: default_token_type(),
            id_token: None,
        }
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiry instant.
    pub fn with_expiry(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Returns true once `now` has reached the expiry instant.
    ///
    /// A bundle without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| now >= expiry)
    }
}

/// One registered external account: the main source or a satellite mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBox {
    /// Account email (unique key).
    pub email: String,
    /// OAuth credentials.
    pub tokens: OAuthTokens,
    /// Reconciliation watermark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
}

impl ContactBox {
    /// Creates a box that has never been reconciled.
    pub fn new(email: impl Into<String>, tokens: OAuthTokens) -> Self {
        Self {
            email: email.into(),
            tokens,
            last_check: None,
        }
    }

    /// Sets the watermark.
    pub fn with_last_check(mut self, last_check: DateTime<Utc>) -> Self {
        self.last_check = Some(last_check);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let tokens = OAuthTokens::new("access").with_expiry(now);
        assert!(tokens.is_expired(now));
        assert!(!tokens.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn missing_expiry_never_expires() {
        let tokens = OAuthTokens::new("access");
        assert!(!tokens.is_expired(Utc::now()));
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let tokens: OAuthTokens = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert!(tokens.refresh_token.is_none());
    }

    #[test]
    fn new_box_has_no_watermark() {
        let contact_box = ContactBox::new("main@x.com", OAuthTokens::new("a"));
        assert!(contact_box.last_check.is_none());

        let json = serde_json::to_value(&contact_box).unwrap();
        assert!(json.get("lastCheck").is_none());
    }
}
