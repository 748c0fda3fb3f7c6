//! In-process one-time passcode registry.
//!
//! The registry owns three keyed maps behind one lock: live OTP records
//! (hashed code, expiry, failed-attempt counter), per-email issuance windows
//! used for rate limiting, and a short-lived verified-email allowlist that
//! gates registration. Nothing here is persisted; a process restart resets
//! all state, which is an accepted limitation of the single-instance
//! deployment. Multi-instance deployments need an external TTL-capable store
//! behind the same interface.
//!
//! Every operation resolves against an explicit instant internally so the
//! sweeper and the tests share the exact same code paths.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use super::utils::normalize_email;

const DEFAULT_CODE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_ISSUE_WINDOW: Duration = Duration::from_secs(15 * 60);
const DEFAULT_ISSUE_LIMIT: usize = 3;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_VERIFIED_TTL: Duration = Duration::from_secs(30 * 60);

struct OtpRecord {
    hashed_secret: Vec<u8>,
    expires_at: Instant,
    failed_attempts: u32,
}

#[derive(Default)]
struct OtpMaps {
    codes: HashMap<String, OtpRecord>,
    issuances: HashMap<String, VecDeque<Instant>>,
    verified: HashMap<String, Instant>,
}

/// Issuance was refused because the rolling window is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

impl RateLimitExceeded {
    #[must_use]
    pub fn message(&self) -> String {
        let minutes = (self.retry_after.as_secs() + 59) / 60;
        format!(
            "Too many OTP requests for this email, try again in {} minute{}",
            minutes.max(1),
            if minutes == 1 { "" } else { "s" }
        )
    }
}

/// Outcome of a verification attempt. Only `Verified` is a success; every
/// other variant is an expected, user-facing rejection, never a server error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpVerification {
    Verified,
    NotFound,
    Expired,
    TooManyAttempts,
    Mismatch,
}

impl OtpVerification {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::Verified
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Verified => "Email verified",
            Self::NotFound => "No OTP found for this email, request a new OTP",
            Self::Expired => "OTP has expired, request a new OTP",
            Self::TooManyAttempts => "Too many failed attempts, request a new OTP",
            Self::Mismatch => "Invalid OTP",
        }
    }
}

pub struct OtpRegistry {
    code_ttl: Duration,
    issue_window: Duration,
    issue_limit: usize,
    max_failed_attempts: u32,
    verified_ttl: Duration,
    maps: Mutex<OtpMaps>,
}

impl OtpRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_ttl: DEFAULT_CODE_TTL,
            issue_window: DEFAULT_ISSUE_WINDOW,
            issue_limit: DEFAULT_ISSUE_LIMIT,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            verified_ttl: DEFAULT_VERIFIED_TTL,
            maps: Mutex::new(OtpMaps::default()),
        }
    }

    #[must_use]
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_issue_window(mut self, window: Duration) -> Self {
        self.issue_window = window;
        self
    }

    #[must_use]
    pub fn with_issue_limit(mut self, limit: usize) -> Self {
        self.issue_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_verified_ttl(mut self, ttl: Duration) -> Self {
        self.verified_ttl = ttl;
        self
    }

    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        self.code_ttl
    }

    /// Issue a fresh 6-digit code for the email, replacing any prior record.
    ///
    /// The plaintext code is returned exactly once so the caller can hand it
    /// to the mailer; only its hash is retained.
    ///
    /// # Errors
    /// Returns `RateLimitExceeded` when the email already has
    /// `issue_limit` issuances inside the rolling window.
    pub async fn generate(&self, email: &str) -> Result<String, RateLimitExceeded> {
        self.generate_at(email, Instant::now()).await
    }

    pub async fn generate_at(
        &self,
        email: &str,
        now: Instant,
    ) -> Result<String, RateLimitExceeded> {
        let email = normalize_email(email);
        let mut maps = self.maps.lock().await;

        let window = maps.issuances.entry(email.clone()).or_default();
        prune_window(window, now, self.issue_window);
        if window.len() >= self.issue_limit {
            let retry_after = window.front().map_or(self.issue_window, |oldest| {
                (*oldest + self.issue_window).saturating_duration_since(now)
            });
            return Err(RateLimitExceeded { retry_after });
        }
        window.push_back(now);

        let code = generate_code();
        maps.codes.insert(
            email,
            OtpRecord {
                hashed_secret: hash_code(&code),
                expires_at: now + self.code_ttl,
                failed_attempts: 0,
            },
        );

        Ok(code)
    }

    /// Check a submitted code against the stored record.
    ///
    /// A match deletes the record, marks the email verified, and refunds one
    /// issuance credit from the rate-limit window. The refund is a documented
    /// contract of this method, not an incidental detail: a user who proves
    /// control of the mailbox gets one send back.
    pub async fn verify(&self, email: &str, submitted: &str) -> OtpVerification {
        self.verify_at(email, submitted, Instant::now()).await
    }

    pub async fn verify_at(&self, email: &str, submitted: &str, now: Instant) -> OtpVerification {
        let email = normalize_email(email);
        let mut maps = self.maps.lock().await;

        let max_failed = self.max_failed_attempts;
        let outcome = match maps.codes.get_mut(&email) {
            None => return OtpVerification::NotFound,
            Some(record) => {
                if now > record.expires_at {
                    OtpVerification::Expired
                } else if record.failed_attempts >= max_failed {
                    OtpVerification::TooManyAttempts
                } else if hash_code(submitted.trim()) != record.hashed_secret {
                    record.failed_attempts += 1;
                    OtpVerification::Mismatch
                } else {
                    OtpVerification::Verified
                }
            }
        };

        match outcome {
            OtpVerification::Expired | OtpVerification::TooManyAttempts => {
                maps.codes.remove(&email);
            }
            OtpVerification::Verified => {
                maps.codes.remove(&email);
                if let Some(window) = maps.issuances.get_mut(&email) {
                    window.pop_front();
                    if window.is_empty() {
                        maps.issuances.remove(&email);
                    }
                }
                maps.verified.insert(email, now);
            }
            OtpVerification::NotFound | OtpVerification::Mismatch => {}
        }

        outcome
    }

    /// True while the email carries a fresh verification mark. The freshness
    /// check is done inline rather than trusting the sweeper, so callers
    /// never act on a stale entry between sweeps.
    pub async fn is_verified(&self, email: &str) -> bool {
        self.is_verified_at(email, Instant::now()).await
    }

    pub async fn is_verified_at(&self, email: &str, now: Instant) -> bool {
        let email = normalize_email(email);
        let maps = self.maps.lock().await;
        maps.verified
            .get(&email)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.verified_ttl)
    }

    /// Drop the verification mark. Called exactly once, right after the
    /// registration that relied on it succeeds, so the mark cannot be reused.
    pub async fn consume_verification(&self, email: &str) {
        let email = normalize_email(email);
        let mut maps = self.maps.lock().await;
        maps.verified.remove(&email);
    }

    /// Remove expired codes, drained issuance windows, and stale
    /// verification marks.
    pub async fn prune(&self) {
        self.prune_at(Instant::now()).await;
    }

    pub async fn prune_at(&self, now: Instant) {
        let mut maps = self.maps.lock().await;
        maps.codes.retain(|_, record| now <= record.expires_at);
        let issue_window = self.issue_window;
        maps.issuances.retain(|_, window| {
            prune_window(window, now, issue_window);
            !window.is_empty()
        });
        let verified_ttl = self.verified_ttl;
        maps.verified
            .retain(|_, at| now.saturating_duration_since(*at) < verified_ttl);
    }
}

impl Default for OtpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prune_window(window: &mut VecDeque<Instant>, now: Instant, issue_window: Duration) {
    while window
        .front()
        .is_some_and(|at| now.saturating_duration_since(*at) > issue_window)
    {
        window.pop_front();
    }
}

fn generate_code() -> String {
    // Six digits, no letters or symbols; the range keeps a leading digit.
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn hash_code(code: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.finalize().to_vec()
}

/// Spawn the background sweep that reclaims expired entries.
///
/// The returned handle must be aborted on shutdown so tests and the server
/// can exit cleanly.
pub fn spawn_sweeper(registry: Arc<OtpRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            registry.prune().await;
            debug!("otp registry sweep complete");
        }
    })
}
