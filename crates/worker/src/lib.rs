//! The automation worker: consumes queued jobs, drives a browser session
//! per job, and escalates to a human operator when a challenge blocks
//! progress.
//!
//! The moving parts, leaves first:
//!
//! - [`evidence`] persists screenshot/markup artifacts for operators.
//! - [`rendezvous`] suspends a session task until its human response
//!   arrives.
//! - [`detect`] decides whether a page is showing a challenge.
//! - [`bridge`] connects the bus topics to the rendezvous table (inbound)
//!   and publishes record snapshots (outbound).
//! - [`intake`] spawns one session task per queued job.
//! - [`session`] is the state machine driving a record from `Queued` to a
//!   terminal state.

pub mod bridge;
pub mod detect;
pub mod evidence;
pub mod intake;
pub mod rendezvous;
pub mod session;
