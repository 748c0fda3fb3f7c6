//! Shared state handed to every auth handler via an `Extension`.

use secrecy::SecretString;
use std::sync::Arc;

use super::otp::OtpRegistry;
use super::throttle::LoginThrottle;
use crate::api::email::OtpMailer;

/// Tunables that reach the handlers. Defaults mirror the CLI defaults.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_ttl_seconds: u64,
    otp_sweep_seconds: u64,
    throttle_sweep_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frontend_base_url: "http://localhost:5173".to_string(),
            token_ttl_seconds: 86_400,
            otp_sweep_seconds: 60,
            throttle_sweep_seconds: 900,
        }
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_sweep_seconds(mut self, seconds: u64) -> Self {
        self.otp_sweep_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_throttle_sweep_seconds(mut self, seconds: u64) -> Self {
        self.throttle_sweep_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub const fn token_ttl_seconds(&self) -> u64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub const fn otp_sweep_seconds(&self) -> u64 {
        self.otp_sweep_seconds
    }

    #[must_use]
    pub const fn throttle_sweep_seconds(&self) -> u64 {
        self.throttle_sweep_seconds
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthState {
    config: AuthConfig,
    token_secret: SecretString,
    otp: Arc<OtpRegistry>,
    throttle: Arc<LoginThrottle>,
    mailer: Arc<dyn OtpMailer>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        token_secret: SecretString,
        otp: Arc<OtpRegistry>,
        throttle: Arc<LoginThrottle>,
        mailer: Arc<dyn OtpMailer>,
    ) -> Self {
        Self {
            config,
            token_secret,
            otp,
            throttle,
            mailer,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    #[must_use]
    pub fn otp(&self) -> &OtpRegistry {
        &self.otp
    }

    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    #[must_use]
    pub fn mailer(&self) -> Arc<dyn OtpMailer> {
        Arc::clone(&self.mailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.frontend_base_url(), "http://localhost:5173");
        assert_eq!(config.token_ttl_seconds(), 86_400);
        assert_eq!(config.otp_sweep_seconds(), 60);
        assert_eq!(config.throttle_sweep_seconds(), 900);
    }

    #[test]
    fn config_builder_overrides() {
        let config = AuthConfig::new()
            .with_frontend_base_url("https://prepmitra.dev")
            .with_token_ttl_seconds(3600)
            .with_otp_sweep_seconds(30)
            .with_throttle_sweep_seconds(600);
        assert_eq!(config.frontend_base_url(), "https://prepmitra.dev");
        assert_eq!(config.token_ttl_seconds(), 3600);
        assert_eq!(config.otp_sweep_seconds(), 30);
        assert_eq!(config.throttle_sweep_seconds(), 600);
    }
}
