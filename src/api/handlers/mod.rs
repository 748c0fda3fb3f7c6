//! API handlers.
//!
//! Auth endpoints live under [`auth`]; `health` and `root` are the
//! operational probes.

pub mod auth;
pub mod health;
pub mod root;
