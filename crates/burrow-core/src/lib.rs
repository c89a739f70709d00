//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the types shared by the code generator, the storage
//! backends, the shortening service and the HTTP gateway.

pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use error::{CoreError, ShortenerError, StorageError};
pub use repository::{ReadRepository, Repository, UrlRecord, UNKNOWN_OWNER};
pub use shortcode::ShortCode;
pub use shortener::{BatchEntry, BatchItem, ShortenParams, Shortened, Shortener};
