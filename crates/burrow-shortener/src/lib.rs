//! URL shortener service implementation.
//!
//! [`ShortenerService`] drives a [`Generator`] and a
//! [`Repository`](burrow_core::Repository): it retries on short-code
//! collisions and answers "already shortened" conflicts with the existing
//! code. Core types are re-exported from `burrow_core`.

pub mod service;

pub use burrow_core::{
    BatchEntry, BatchItem, ShortenParams, Shortened, Shortener, ShortenerError,
};
pub use burrow_generator::Generator;
pub use service::{ShortenerService, DEFAULT_MAX_ATTEMPTS};
