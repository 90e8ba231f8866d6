//! Repository structs providing static async query methods over [`DbPool`].
//!
//! [`DbPool`]: crate::DbPool

mod record_repo;

pub use record_repo::RecordRepo;
