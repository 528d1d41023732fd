//! Implementations of the identity directory traits.
//!
//! [`InMemoryDirectory`] is for tests and local development;
//! [`PostgresDirectory`] is the persistent backend.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDirectory;
pub use postgres::{DbOptions, PostgresDirectory};
