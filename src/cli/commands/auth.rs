use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_OTP_SWEEP_SECONDS: &str = "otp-sweep-seconds";
pub const ARG_THROTTLE_SWEEP_SECONDS: &str = "throttle-sweep-seconds";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign session tokens")
                .env("PREPMITRA_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("PREPMITRA_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed for CORS")
                .env("PREPMITRA_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_OTP_SWEEP_SECONDS)
                .long(ARG_OTP_SWEEP_SECONDS)
                .help("Interval between OTP registry sweeps")
                .env("PREPMITRA_OTP_SWEEP_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_THROTTLE_SWEEP_SECONDS)
                .long(ARG_THROTTLE_SWEEP_SECONDS)
                .help("Interval between login throttle sweeps")
                .env("PREPMITRA_THROTTLE_SWEEP_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_secret: String,
    pub token_ttl_seconds: u64,
    pub frontend_base_url: String,
    pub otp_sweep_seconds: u64,
    pub throttle_sweep_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            token_secret: matches
                .get_one::<String>(ARG_TOKEN_SECRET)
                .cloned()
                .context("missing required argument: --token-secret")?,
            token_ttl_seconds: matches
                .get_one::<u64>(ARG_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(86_400),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            otp_sweep_seconds: matches
                .get_one::<u64>(ARG_OTP_SWEEP_SECONDS)
                .copied()
                .unwrap_or(60),
            throttle_sweep_seconds: matches
                .get_one::<u64>(ARG_THROTTLE_SWEEP_SECONDS)
                .copied()
                .unwrap_or(900),
        })
    }
}
