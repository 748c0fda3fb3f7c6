//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, smtp};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    // SMTP args are all-or-none
    crate::cli::commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let auth_opts = auth::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: SecretString::from(auth_opts.token_secret),
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        frontend_base_url: auth_opts.frontend_base_url,
        otp_sweep_seconds: auth_opts.otp_sweep_seconds,
        throttle_sweep_seconds: auth_opts.throttle_sweep_seconds,
        smtp_host: smtp_opts.host,
        smtp_username: smtp_opts.username,
        smtp_password: smtp_opts.password.map(SecretString::from),
        smtp_from: smtp_opts.from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn token_secret_required() {
        temp_env::with_vars(
            [
                ("PREPMITRA_TOKEN_SECRET", None::<&str>),
                (
                    "PREPMITRA_DSN",
                    Some("postgres://user@localhost:5432/prepmitra"),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["prepmitra"]);
                assert!(result.is_err(), "token-secret is required");
            },
        );
    }

    #[test]
    fn handler_builds_server_args() {
        temp_env::with_vars(
            [
                ("PREPMITRA_SMTP_HOST", None::<&str>),
                ("PREPMITRA_SMTP_USERNAME", None::<&str>),
                ("PREPMITRA_SMTP_PASSWORD", None::<&str>),
                ("PREPMITRA_SMTP_FROM", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "prepmitra",
                    "--dsn",
                    "postgres://user@localhost:5432/prepmitra",
                    "--token-secret",
                    "super-secret",
                    "--token-ttl-seconds",
                    "3600",
                ]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.token_ttl_seconds, 3600);
                    assert_eq!(args.frontend_base_url, "http://localhost:5173");
                    assert!(args.smtp_host.is_none());
                }
            },
        );
    }
}
