use crate::api::{
    self,
    email::{LogMailer, OtpMailer, SmtpMailer},
    handlers::auth::AuthConfig,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::warn;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub token_ttl_seconds: u64,
    pub frontend_base_url: String,
    pub otp_sweep_seconds: u64,
    pub throttle_sweep_seconds: u64,
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub smtp_from: Option<String>,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the SMTP transport cannot be built or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new()
        .with_frontend_base_url(args.frontend_base_url)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_otp_sweep_seconds(args.otp_sweep_seconds)
        .with_throttle_sweep_seconds(args.throttle_sweep_seconds);

    // All four SMTP args or none; validated at parse time.
    let mailer: Arc<dyn OtpMailer> = match (
        args.smtp_host,
        args.smtp_username,
        args.smtp_password,
        args.smtp_from,
    ) {
        (Some(host), Some(username), Some(password), Some(from)) => Arc::new(
            SmtpMailer::new(&host, &username, &password, &from)
                .context("Failed to build SMTP transport")?,
        ),
        _ => {
            warn!("SMTP not configured, OTP codes will be logged instead of mailed");
            Arc::new(LogMailer)
        }
    };

    api::new(args.port, args.dsn, auth_config, args.token_secret, mailer).await
}
