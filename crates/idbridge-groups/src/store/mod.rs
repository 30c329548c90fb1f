//! Storage implementations of the migration traits.

pub mod memory;
pub mod postgres;

pub use memory::{CallCounts, InMemoryDirectory, MemoryTransaction};
pub use postgres::PgDirectoryStore;
