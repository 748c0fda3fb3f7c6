//! # Prepmitra authentication service
//!
//! Backend for the Prepmitra exam preparation platform. It owns the account
//! lifecycle: OTP-based email verification, registration, login, and JWT
//! session management.
//!
//! ## Email verification (OTP)
//!
//! Registration is gated on proving control of the email address. A 6-digit
//! code is mailed on request, expires after five minutes, and allows five
//! wrong guesses before it is discarded. Issuance is limited to three codes
//! per address in a rolling fifteen-minute window; a successful verification
//! refunds one send. Verifying opens a thirty-minute window in which the
//! address may register.
//!
//! ## Login throttling
//!
//! Failed logins are counted per `email:client-address` pair. Five failures
//! block the pair for fifteen minutes; a successful login clears the record.
//! Blocked requests are rejected before any credential work, so they cannot
//! extend the block.
//!
//! ## Sessions
//!
//! Sessions are HS256-signed JWTs, one day by default, carried as bearer
//! tokens. `/api/auth/me` resolves the token to the live user row and
//! `/api/auth/refresh-token` re-issues with a full TTL.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
