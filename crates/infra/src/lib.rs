//! Infrastructure layer: directory backends.

pub mod directory;

pub use directory::{DbOptions, InMemoryDirectory, PostgresDirectory};
