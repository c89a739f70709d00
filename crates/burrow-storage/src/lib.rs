//! Storage backends for the Burrow URL shortener.
//!
//! Every backend implements [`Repository`] with the same conflict rules:
//! a short code is unique across all records, deleted or not, and an owner
//! has at most one live record per original URL.

mod index;

pub mod file;
pub mod memory;
pub mod postgres;

pub use burrow_core::repository::{ReadRepository, Repository, Result};
pub use burrow_core::StorageError;
pub use file::FileRepository;
pub use memory::InMemoryRepository;
pub use postgres::{PostgresOptions, PostgresRepository};
