use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Owner assigned to records saved without an anonymous identity.
pub const UNKNOWN_OWNER: &str = "unknown";

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The short code the URL is reachable under.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Anonymous identity of the creator.
    pub owner_id: String,
    /// Soft-delete flag. Deleted records keep their short code reserved.
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a live record, substituting [`UNKNOWN_OWNER`] for an empty owner.
    pub fn new(
        short_code: ShortCode,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            owner_id: normalize_owner(owner_id),
            deleted: false,
        }
    }
}

/// Maps an empty owner id to [`UNKNOWN_OWNER`].
pub fn normalize_owner(owner_id: impl Into<String>) -> String {
    let owner_id = owner_id.into();
    if owner_id.is_empty() {
        UNKNOWN_OWNER.to_string()
    } else {
        owner_id
    }
}

/// Rejects a batch that is invalid on its own, before any backend state is
/// consulted: empty urls or codes, a code used twice, or a url repeated for
/// the same owner.
pub fn check_batch(records: &[UrlRecord]) -> Result<()> {
    let mut codes = HashSet::with_capacity(records.len());
    let mut urls: HashMap<(&str, &str), &ShortCode> = HashMap::with_capacity(records.len());

    for record in records {
        if record.original_url.is_empty() {
            return Err(StorageError::EmptyUrl);
        }
        if record.short_code.is_empty() {
            return Err(StorageError::EmptyCode);
        }
        if !codes.insert(record.short_code.as_str()) {
            return Err(StorageError::CodeAlreadyUsed(record.short_code.clone()));
        }
        match urls.entry((record.owner_id.as_str(), record.original_url.as_str())) {
            Entry::Occupied(first) => {
                return Err(StorageError::UrlConflict {
                    original_url: record.original_url.clone(),
                    existing: (*first.get()).clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(&record.short_code);
            }
        }
    }

    Ok(())
}

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Returns the original URL for a live short code.
    ///
    /// Fails with `NotFound` for unknown codes and `Gone` for soft-deleted ones.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Lists the live records created by `owner_id`.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record.
    ///
    /// Returns `CodeAlreadyUsed` if the code exists (deleted or not) and
    /// `UrlConflict` if the owner already has a live record for the URL.
    async fn save(&self, record: UrlRecord) -> Result<()>;

    /// Inserts all records or none of them.
    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<()>;

    /// Soft-deletes the live records among `codes` that belong to `owner_id`.
    /// Codes that do not match are skipped.
    async fn delete_batch(&self, codes: &[ShortCode], owner_id: &str) -> Result<()>;

    /// Flushes and releases backend resources.
    async fn close(&self) -> Result<()>;
}
