//! Shared primitives for the handoff workspace: id/timestamp aliases,
//! worker configuration, and the payload cipher.

pub mod config;
pub mod crypto;
pub mod types;
