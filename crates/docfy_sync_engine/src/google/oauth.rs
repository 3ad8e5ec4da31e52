//! OAuth2 consent, code exchange and refresh against Google.

use crate::config::GoogleConfig;
use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Duration, Utc};
use docfy_model::OAuthTokens;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl TokenResponse {
    /// Builds the stored bundle. Google omits the refresh token on refresh,
    /// so `previous_refresh` is kept in that case.
    pub(crate) fn into_tokens(
        self,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> OAuthTokens {
        let mut tokens = OAuthTokens::new(self.access_token);
        tokens.refresh_token = self.refresh_token.or(previous_refresh);
        tokens.expiry_date = self.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(token_type) = self.token_type {
            tokens.token_type = token_type;
        }
        tokens.id_token = self.id_token;
        tokens
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
}

/// Builds the consent URL from a parsed consent endpoint.
pub(crate) fn consent_url(endpoint: &Url, config: &GoogleConfig) -> String {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    url.to_string()
}

/// Maps a non-success response to an error, 401 as an auth failure.
pub(crate) async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::AuthenticationFailed(body));
    }
    Err(SyncError::RemoteStatus {
        status: status.as_u16(),
        body,
    })
}

async fn post_token_form(
    http: &Client,
    config: &GoogleConfig,
    params: &[(&str, &str)],
) -> SyncResult<TokenResponse> {
    let response = http.post(&config.token_url).form(params).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "token endpoint rejected request");
        // 400 invalid_grant means a revoked or spent code/refresh token.
        if status.is_client_error() {
            return Err(SyncError::AuthenticationFailed(body));
        }
        return Err(SyncError::RemoteStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

/// Exchanges an authorization code for a token bundle.
pub(crate) async fn exchange_code(
    http: &Client,
    config: &GoogleConfig,
    code: &str,
) -> SyncResult<OAuthTokens> {
    debug!("exchanging authorization code");
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_url.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    let response = post_token_form(http, config, &params).await?;
    Ok(response.into_tokens(None, Utc::now()))
}

/// Exchanges the refresh token for a new access token.
pub(crate) async fn refresh(
    http: &Client,
    config: &GoogleConfig,
    tokens: &OAuthTokens,
) -> SyncResult<OAuthTokens> {
    let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
        SyncError::AuthenticationFailed("no refresh token stored".to_string())
    })?;

    debug!("refreshing access token");
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    let response = post_token_form(http, config, &params).await?;
    Ok(response.into_tokens(tokens.refresh_token.clone(), Utc::now()))
}

/// Resolves the email of the account owning `tokens`.
pub(crate) async fn fetch_email(
    http: &Client,
    config: &GoogleConfig,
    tokens: &OAuthTokens,
) -> SyncResult<String> {
    let response = http
        .get(&config.userinfo_url)
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    let info: UserInfo = check_status(response).await?.json().await?;
    info.email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| SyncError::Protocol("userinfo response has no email".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_url_requests_offline_access() {
        let config = GoogleConfig::new("client-1", "secret", "http://localhost:3000/callback");
        let endpoint = Url::parse(&config.auth_url).unwrap();
        let url = Url::parse(&consent_url(&endpoint, &config)).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("client_id").as_deref(), Some("client-1"));
        assert_eq!(get("access_type").as_deref(), Some("offline"));
        assert_eq!(get("response_type").as_deref(), Some("code"));
        assert_eq!(
            get("redirect_uri").as_deref(),
            Some("http://localhost:3000/callback")
        );
        assert!(get("scope").unwrap().contains("m8/feeds"));
    }

    #[test]
    fn token_response_sets_expiry() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29","refresh_token":"1//r","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        let now = Utc::now();
        let tokens = response.into_tokens(None, now);

        assert_eq!(tokens.access_token, "ya29");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(tokens.expiry_date, Some(now + Duration::seconds(3599)));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":60}"#).unwrap();
        let tokens = response.into_tokens(Some("old-refresh".into()), Utc::now());

        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(tokens.token_type, "Bearer");
    }
}
