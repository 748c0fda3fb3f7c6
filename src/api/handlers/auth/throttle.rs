//! Failed-login throttle keyed by `email:client_address`.
//!
//! A key moves Clean -> Accumulating -> Blocked: five consecutive failures
//! block the pair for fifteen minutes. Records expire lazily (a blocked
//! record past its reset time behaves as if absent) and a periodic sweep
//! reclaims the memory. One successful login deletes the record outright.
//!
//! The throttle is best-effort, not a hard security boundary: two attempts
//! racing across the check and the recorded outcome can both pass the gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use super::utils::normalize_email;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BLOCK_WINDOW: Duration = Duration::from_secs(15 * 60);

struct AttemptRecord {
    attempts: u32,
    reset_at: Instant,
    blocked: bool,
}

pub struct LoginThrottle {
    max_attempts: u32,
    block_window: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

/// Build the composite throttle key for an email and client address.
#[must_use]
pub fn throttle_key(email: &str, client_addr: &str) -> String {
    format!("{}:{client_addr}", normalize_email(email))
}

impl LoginThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            block_window: DEFAULT_BLOCK_WINDOW,
            records: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_block_window(mut self, window: Duration) -> Self {
        self.block_window = window;
        self
    }

    /// Returns how long the key stays blocked, or `None` when login may
    /// proceed. A record past its reset time is treated as absent.
    pub async fn check(&self, key: &str) -> Option<Duration> {
        self.check_at(key, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, now: Instant) -> Option<Duration> {
        let records = self.records.lock().await;
        records.get(key).and_then(|record| {
            if record.blocked && now < record.reset_at {
                Some(record.reset_at - now)
            } else {
                None
            }
        })
    }

    /// Record the result of an attempt that reached the credential check.
    ///
    /// Requests rejected at the gate must not be reported here; a blocked
    /// key only extends its window on a genuine new failure.
    pub async fn record_outcome(&self, key: &str, success: bool) {
        self.record_outcome_at(key, success, Instant::now()).await;
    }

    pub async fn record_outcome_at(&self, key: &str, success: bool, now: Instant) {
        let mut records = self.records.lock().await;

        if success {
            records.remove(key);
            return;
        }

        let record = records.entry(key.to_string()).or_insert(AttemptRecord {
            attempts: 0,
            reset_at: now + self.block_window,
            blocked: false,
        });
        if now >= record.reset_at {
            // Stale record: restart the count instead of compounding it.
            record.attempts = 0;
            record.reset_at = now + self.block_window;
            record.blocked = false;
        }
        record.attempts += 1;
        if record.attempts >= self.max_attempts {
            record.blocked = true;
            record.reset_at = now + self.block_window;
        }
    }

    /// Drop records whose reset time has passed.
    pub async fn prune(&self) {
        self.prune_at(Instant::now()).await;
    }

    pub async fn prune_at(&self, now: Instant) {
        let mut records = self.records.lock().await;
        records.retain(|_, record| now < record.reset_at);
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background sweep that reclaims stale attempt records.
pub fn spawn_sweeper(throttle: Arc<LoginThrottle>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            throttle.prune().await;
            debug!("login throttle sweep complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn five_failures_block_the_key() {
        let throttle = LoginThrottle::new();
        let key = throttle_key("student@gmail.com", "1.2.3.4");
        for _ in 0..4 {
            throttle.record_outcome(&key, false).await;
            assert_eq!(throttle.check(&key).await, None);
        }
        throttle.record_outcome(&key, false).await;
        assert!(throttle.check(&key).await.is_some());
    }

    #[tokio::test]
    async fn success_clears_the_record() {
        let throttle = LoginThrottle::new();
        let key = throttle_key("student@gmail.com", "1.2.3.4");
        for _ in 0..5 {
            throttle.record_outcome(&key, false).await;
        }
        assert!(throttle.check(&key).await.is_some());
        throttle.record_outcome(&key, true).await;
        assert_eq!(throttle.check(&key).await, None);
    }

    #[tokio::test]
    async fn block_expires_after_window() {
        let throttle = LoginThrottle::new();
        let key = throttle_key("student@gmail.com", "1.2.3.4");
        let t0 = Instant::now();
        for _ in 0..5 {
            throttle.record_outcome_at(&key, false, t0).await;
        }
        assert!(throttle.check_at(&key, t0).await.is_some());
        let after = t0 + DEFAULT_BLOCK_WINDOW + Duration::from_secs(1);
        assert_eq!(throttle.check_at(&key, after).await, None);
    }

    #[tokio::test]
    async fn stale_record_restarts_the_count() {
        let throttle = LoginThrottle::new();
        let key = throttle_key("student@gmail.com", "1.2.3.4");
        let t0 = Instant::now();
        for _ in 0..5 {
            throttle.record_outcome_at(&key, false, t0).await;
        }
        // One failure after expiry accumulates from one, it does not re-block.
        let after = t0 + DEFAULT_BLOCK_WINDOW + Duration::from_secs(1);
        throttle.record_outcome_at(&key, false, after).await;
        assert_eq!(throttle.check_at(&key, after).await, None);
    }

    #[tokio::test]
    async fn keys_are_scoped_per_address() {
        let throttle = LoginThrottle::new();
        let here = throttle_key("student@gmail.com", "1.2.3.4");
        let there = throttle_key("student@gmail.com", "5.6.7.8");
        for _ in 0..5 {
            throttle.record_outcome(&here, false).await;
        }
        assert!(throttle.check(&here).await.is_some());
        assert_eq!(throttle.check(&there).await, None);
    }

    #[tokio::test]
    async fn prune_reclaims_expired_records() {
        let throttle = LoginThrottle::new();
        let key = throttle_key("student@gmail.com", "1.2.3.4");
        let t0 = Instant::now();
        throttle.record_outcome_at(&key, false, t0).await;
        throttle
            .prune_at(t0 + DEFAULT_BLOCK_WINDOW + Duration::from_secs(1))
            .await;
        // A fresh failure after the prune starts a brand new record.
        throttle.record_outcome_at(&key, false, t0).await;
        assert_eq!(throttle.check_at(&key, t0).await, None);
    }

    #[tokio::test]
    async fn sweeper_handle_can_be_aborted() {
        let throttle = Arc::new(LoginThrottle::new());
        let handle = spawn_sweeper(throttle, Duration::from_secs(60));
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
