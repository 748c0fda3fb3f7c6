use clap::{Arg, ArgMatches, Command};

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host; when unset OTP codes are logged instead of mailed")
                .env("PREPMITRA_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("PREPMITRA_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password or app password")
                .env("PREPMITRA_SMTP_PASSWORD"),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("From address for OTP mail")
                .env("PREPMITRA_SMTP_FROM"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            host: matches.get_one::<String>(ARG_SMTP_HOST).cloned(),
            username: matches.get_one::<String>(ARG_SMTP_USERNAME).cloned(),
            password: matches.get_one::<String>(ARG_SMTP_PASSWORD).cloned(),
            from: matches.get_one::<String>(ARG_SMTP_FROM).cloned(),
        }
    }
}
