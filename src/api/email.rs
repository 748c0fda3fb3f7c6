//! Outbound OTP mail.
//!
//! Delivery is behind the [`OtpMailer`] trait so the server can run without
//! SMTP credentials: the fallback [`LogMailer`] writes the code to the log,
//! which is what local development wants anyway.

use anyhow::{anyhow, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// One OTP email, ready to render.
#[derive(Debug, Clone)]
pub struct OtpEmail {
    pub to_email: String,
    pub code: String,
    pub ttl_minutes: u64,
}

/// Sends OTP mail. Implementations block; handlers call through
/// `spawn_blocking`.
pub trait OtpMailer: Send + Sync {
    /// # Errors
    /// Returns an error when the message cannot be built or delivered.
    fn send(&self, email: &OtpEmail) -> Result<()>;
}

/// Development mailer: logs the code instead of delivering it.
pub struct LogMailer;

impl OtpMailer for LogMailer {
    fn send(&self, email: &OtpEmail) -> Result<()> {
        info!(to = %email.to_email, code = %email.code, "OTP issued (log mailer, no delivery)");
        Ok(())
    }
}

/// SMTP mailer over TLS with authentication.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// # Errors
    /// Returns an error when the relay host or from address is invalid.
    pub fn new(host: &str, username: &str, password: &SecretString, from: &str) -> Result<Self> {
        let transport = SmtpTransport::relay(host)
            .map_err(|e| anyhow!("invalid SMTP relay {host}: {e}"))?
            .credentials(Credentials::new(
                username.to_string(),
                password.expose_secret().to_string(),
            ))
            .build();
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| anyhow!("invalid from address {from}: {e}"))?;
        Ok(Self { transport, from })
    }
}

impl OtpMailer for SmtpMailer {
    fn send(&self, email: &OtpEmail) -> Result<()> {
        let to = email
            .to_email
            .parse::<Mailbox>()
            .map_err(|e| anyhow!("invalid recipient {}: {e}", email.to_email))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your Prepmitra verification code")
            .body(format!(
                "Your Prepmitra verification code is {}.\n\n\
                 It expires in {} minutes. If you did not request this code, ignore this email.",
                email.code, email.ttl_minutes
            ))
            .map_err(|e| anyhow!("failed to build OTP email: {e}"))?;
        self.transport
            .send(&message)
            .map_err(|e| anyhow!("failed to send OTP email: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mailer_always_succeeds() {
        let email = OtpEmail {
            to_email: "asha@gmail.com".to_string(),
            code: "123456".to_string(),
            ttl_minutes: 5,
        };
        assert!(LogMailer.send(&email).is_ok());
    }

    #[test]
    fn smtp_mailer_rejects_bad_from_address() {
        let result = SmtpMailer::new(
            "smtp.gmail.com",
            "mailer@prepmitra.dev",
            &SecretString::from("app-password"),
            "not a mailbox",
        );
        assert!(result.is_err());
    }
}
