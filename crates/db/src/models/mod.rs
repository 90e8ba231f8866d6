//! Domain model structs for automation records.

pub mod record;
