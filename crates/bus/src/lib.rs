//! Publish/subscribe transport for the automation topics.
//!
//! The [`Bus`](bus::Bus) trait is the seam between the worker and the
//! out-of-process message transport. Delivery is at-most-once on every
//! implementation: no persistence, no redelivery, no acknowledgment.

pub mod bus;
pub mod messages;
pub mod redis_bus;
pub mod topics;

pub use bus::{Bus, BusError, LocalBus};
pub use messages::{HumanActionMessage, JobQueueMessage};
pub use redis_bus::RedisBus;
