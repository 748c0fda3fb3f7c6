//! Authentication endpoints and their supporting state.
//!
//! The flow is OTP-first: `send-otp` emails a short-lived code, `verify-otp`
//! opens a thirty-minute registration window, `register` creates the account
//! inside that window, and `login`/`me`/`refresh-token` run the session
//! lifecycle. OTP state and the login throttle live in process memory.

pub mod error;
pub mod login;
pub mod otp;
pub mod register;
pub mod session;
pub mod state;
pub mod storage;
pub mod throttle;
pub mod token;
pub mod types;
pub mod utils;
pub mod verification;

pub use error::{AuthError, ErrorBody};
pub use otp::{OtpRegistry, OtpVerification, RateLimitExceeded};
pub use state::{AuthConfig, AuthState};
pub use throttle::{throttle_key, LoginThrottle};
