//! Bearer token support for the back office.
//!
//! Tokens are signed with HMAC-SHA256 and carry their own expiry.
//!
//! ## Token Format
//!
//! ```text
//! base64url(JSON claims) "." base64url(HMAC-SHA256(claims segment))
//! ```
//!
//! Both segments use the URL-safe alphabet without padding. Claims are
//! `{sub, username, exp}` with `exp` in Unix seconds.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use docfy_model::User;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 1000 minutes.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(1000 * 60);

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// How long an issued token stays valid.
    pub token_lifetime: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Sets the token lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }
}

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Username.
    pub username: String,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Returns true once `now` is past the expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Issues and validates bearer tokens.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issues a token for `user`, valid from now.
    pub fn create_token(&self, user: &User) -> ServerResult<String> {
        self.create_token_at(user, Utc::now())
    }

    /// Issues a token for `user`, valid from `now`.
    pub fn create_token_at(&self, user: &User, now: DateTime<Utc>) -> ServerResult<String> {
        let sub = user
            .id
            .map(|id| id.to_string())
            .ok_or_else(|| ServerError::Internal("user has no id".into()))?;
        self.sign_claims(&Claims {
            sub,
            username: user.username.clone(),
            exp: self.expiry_from(now),
        })
    }

    /// Validates a token against the current time.
    pub fn validate(&self, token: &str) -> ServerResult<Claims> {
        self.validate_at(token, Utc::now())
    }

    /// Validates signature and expiry, returning the claims.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> ServerResult<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| ServerError::NotAuthorized("Malformed token".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| ServerError::NotAuthorized("Malformed token".into()))?;

        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| ServerError::NotAuthorized("Invalid signature".into()))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| ServerError::NotAuthorized("Malformed token".into()))?;
        let claims: Claims = serde_json::from_slice(&json)
            .map_err(|_| ServerError::NotAuthorized("Malformed token".into()))?;

        if claims.is_expired(now) {
            return Err(ServerError::NotAuthorized("Token expired".into()));
        }
        Ok(claims)
    }

    /// Re-issues a valid token with a fresh expiry.
    pub fn renew(&self, token: &str) -> ServerResult<String> {
        self.renew_at(token, Utc::now())
    }

    /// Re-issues a token valid at `now` with an expiry counted from `now`.
    pub fn renew_at(&self, token: &str, now: DateTime<Utc>) -> ServerResult<String> {
        let mut claims = self.validate_at(token, now)?;
        claims.exp = self.expiry_from(now);
        self.sign_claims(&claims)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> i64 {
        let lifetime = ChronoDuration::from_std(self.config.token_lifetime)
            .unwrap_or_else(|_| ChronoDuration::minutes(1000));
        (now + lifetime).timestamp()
    }

    fn sign_claims(&self, claims: &Claims) -> ServerResult<String> {
        let json = serde_json::to_vec(claims).map_err(|e| ServerError::Internal(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.mac(payload.as_bytes())?.finalize().into_bytes();
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    fn mac(&self, data: &[u8]) -> ServerResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` (scheme case-insensitive) or a bare token.
pub fn bearer_token(header: Option<&str>) -> ServerResult<&str> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ServerError::NotAuthorized("No authorization token was found".into()))?;

    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => {
            return Err(ServerError::NotAuthorized(
                "Format is Authorization: Bearer [token]".into(),
            ))
        }
        None => header,
    };
    if token.is_empty() {
        return Err(ServerError::NotAuthorized("No authorization token was found".into()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfy_model::LocalId;

    fn validator() -> TokenValidator {
        TokenValidator::new(AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec()))
    }

    fn user() -> User {
        let mut user = User::new("Ana", "$argon2id$stub");
        user.id = Some(LocalId::generate());
        user
    }

    #[test]
    fn create_and_validate_token() {
        let validator = validator();
        let user = user();

        let token = validator.create_token(&user).unwrap();
        let claims = validator.validate(&token).unwrap();

        assert_eq!(claims.username, "ana");
        assert_eq!(claims.sub, user.id.unwrap().to_string());
    }

    #[test]
    fn lifetime_sets_expiry() {
        let validator = validator();
        let now = Utc::now();
        let token = validator.create_token_at(&user(), now).unwrap();

        let claims = validator.validate_at(&token, now).unwrap();
        assert_eq!(claims.exp, now.timestamp() + 1000 * 60);
    }

    #[test]
    fn reject_expired() {
        let validator = TokenValidator::new(
            AuthConfig::new(b"secret".to_vec()).with_lifetime(Duration::from_secs(60)),
        );
        let now = Utc::now();
        let token = validator.create_token_at(&user(), now).unwrap();

        let later = now + ChronoDuration::seconds(61);
        let result = validator.validate_at(&token, later);
        assert!(matches!(result, Err(ServerError::NotAuthorized(m)) if m == "Token expired"));
    }

    #[test]
    fn reject_wrong_secret() {
        let token = validator().create_token(&user()).unwrap();
        let other = TokenValidator::new(AuthConfig::new(b"another-secret".to_vec()));

        assert!(matches!(
            other.validate(&token),
            Err(ServerError::NotAuthorized(m)) if m == "Invalid signature"
        ));
    }

    #[test]
    fn reject_tampered_claims() {
        let validator = validator();
        let token = validator.create_token(&user()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged = Claims {
            sub: "someone".into(),
            username: "admin".into(),
            exp: i64::MAX,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let result = validator.validate(&format!("{payload}.{signature}"));
        assert!(result.is_err());
    }

    #[test]
    fn reject_garbage() {
        let validator = validator();
        assert!(validator.validate("no-dot-here").is_err());
        assert!(validator.validate("a.!!!").is_err());
        assert!(validator.validate("").is_err());
    }

    #[test]
    fn renew_extends_expiry() {
        let validator = validator();
        let issued = Utc::now() - ChronoDuration::minutes(500);
        let token = validator.create_token_at(&user(), issued).unwrap();

        let now = Utc::now();
        let renewed = validator.renew_at(&token, now).unwrap();
        let claims = validator.validate_at(&renewed, now).unwrap();

        assert_eq!(claims.exp, now.timestamp() + 1000 * 60);
        assert_eq!(claims.username, "ana");
    }

    #[test]
    fn renew_rejects_expired() {
        let validator = validator();
        let issued = Utc::now() - ChronoDuration::minutes(1001);
        let token = validator.create_token_at(&user(), issued).unwrap();

        assert!(validator.renew(&token).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("abc")).unwrap(), "abc");
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("   ")).is_err());
        assert!(bearer_token(None).is_err());
    }
}
