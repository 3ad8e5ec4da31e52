//! Server configuration.

use crate::auth::AuthConfig;

/// Configuration for the Docfy server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token signing configuration.
    pub auth: AuthConfig,
    /// Minimum password length accepted on registration.
    pub min_password_length: usize,
}

impl ServerConfig {
    /// Creates a configuration signing tokens with `secret`.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            auth: AuthConfig::new(secret),
            min_password_length: 1,
        }
    }

    /// Sets the token signing configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the minimum password length.
    pub fn with_min_password_length(mut self, length: usize) -> Self {
        self.min_password_length = length.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_lifetime_is_1000_minutes() {
        let config = ServerConfig::new(b"secret".to_vec());
        assert_eq!(config.auth.token_lifetime, Duration::from_secs(1000 * 60));
        assert_eq!(config.min_password_length, 1);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new(b"secret".to_vec())
            .with_auth(AuthConfig::new(b"other".to_vec()).with_lifetime(Duration::from_secs(60)))
            .with_min_password_length(0);

        assert_eq!(config.auth.secret, b"other".to_vec());
        assert_eq!(config.auth.token_lifetime, Duration::from_secs(60));
        assert_eq!(config.min_password_length, 1);
    }
}
