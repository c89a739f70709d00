use burrow_core::repository::{check_batch, Result};
use burrow_core::{ShortCode, StorageError, UrlRecord};
use std::collections::HashMap;

/// In-process view of every record, shared by the memory and file backends.
///
/// Records are kept in insertion order. `live_urls` only holds entries for
/// non-deleted records and is keyed by `(owner_id, original_url)`.
#[derive(Debug, Default)]
pub(crate) struct Index {
    records: Vec<UrlRecord>,
    positions: HashMap<ShortCode, usize>,
    live_urls: HashMap<(String, String), ShortCode>,
}

impl Index {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks that `record` can be inserted without touching the index.
    pub(crate) fn check_insert(&self, record: &UrlRecord) -> Result<()> {
        if record.original_url.is_empty() {
            return Err(StorageError::EmptyUrl);
        }
        if record.short_code.is_empty() {
            return Err(StorageError::EmptyCode);
        }
        if self.positions.contains_key(&record.short_code) {
            return Err(StorageError::CodeAlreadyUsed(record.short_code.clone()));
        }
        if let Some(existing) = self.live_code(&record.owner_id, &record.original_url) {
            return Err(StorageError::UrlConflict {
                original_url: record.original_url.clone(),
                existing: existing.clone(),
            });
        }
        Ok(())
    }

    /// Checks a whole batch against itself and against the index.
    pub(crate) fn check_insert_batch(&self, records: &[UrlRecord]) -> Result<()> {
        check_batch(records)?;
        records.iter().try_for_each(|record| self.check_insert(record))
    }

    /// Inserts a record that already passed [`Index::check_insert`].
    pub(crate) fn insert(&mut self, record: UrlRecord) {
        if !record.deleted {
            self.live_urls.insert(
                (record.owner_id.clone(), record.original_url.clone()),
                record.short_code.clone(),
            );
        }
        self.positions
            .insert(record.short_code.clone(), self.records.len());
        self.records.push(record);
    }

    /// Inserts or replaces the record for its code. Used when replaying a log
    /// where a later line supersedes an earlier one.
    pub(crate) fn upsert(&mut self, record: UrlRecord) {
        let Some(&pos) = self.positions.get(&record.short_code) else {
            self.insert(record);
            return;
        };

        let previous = std::mem::replace(&mut self.records[pos], record);
        self.unlink_live(&previous);
        let current = &self.records[pos];
        if !current.deleted {
            self.live_urls.insert(
                (current.owner_id.clone(), current.original_url.clone()),
                current.short_code.clone(),
            );
        }
    }

    pub(crate) fn resolve(&self, code: &ShortCode) -> Result<String> {
        if code.is_empty() {
            return Err(StorageError::EmptyCode);
        }
        let record = self
            .positions
            .get(code)
            .map(|&pos| &self.records[pos])
            .ok_or_else(|| StorageError::NotFound(code.clone()))?;

        if record.deleted {
            return Err(StorageError::Gone(code.clone()));
        }
        Ok(record.original_url.clone())
    }

    pub(crate) fn list_by_owner(&self, owner_id: &str) -> Vec<UrlRecord> {
        self.records
            .iter()
            .filter(|record| !record.deleted && record.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Returns the records that [`Index::mark_deleted`] would change, as they
    /// will look afterwards.
    pub(crate) fn deletions(&self, codes: &[ShortCode], owner_id: &str) -> Vec<UrlRecord> {
        let mut out: Vec<UrlRecord> = Vec::new();
        for code in codes {
            let Some(&pos) = self.positions.get(code) else {
                continue;
            };
            let record = &self.records[pos];
            if record.deleted || record.owner_id != owner_id {
                continue;
            }
            if out.iter().any(|r| r.short_code == *code) {
                continue;
            }
            out.push(UrlRecord {
                deleted: true,
                ..record.clone()
            });
        }
        out
    }

    /// Soft-deletes the owner's live records among `codes` and returns how
    /// many changed.
    pub(crate) fn mark_deleted(&mut self, codes: &[ShortCode], owner_id: &str) -> usize {
        let changed = self.deletions(codes, owner_id);
        let count = changed.len();
        for record in changed {
            self.upsert(record);
        }
        count
    }

    fn live_code(&self, owner_id: &str, original_url: &str) -> Option<&ShortCode> {
        self.live_urls
            .get(&(owner_id.to_string(), original_url.to_string()))
    }

    fn unlink_live(&mut self, record: &UrlRecord) {
        if record.deleted {
            return;
        }
        let key = (record.owner_id.clone(), record.original_url.clone());
        if self.live_urls.get(&key) == Some(&record.short_code) {
            self.live_urls.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, url: &str, owner: &str) -> UrlRecord {
        UrlRecord::new(ShortCode::new_unchecked(code), url, owner)
    }

    #[test]
    fn code_collision_is_reported_before_url_conflict() {
        let mut index = Index::default();
        index.insert(record("abc123", "https://a.com", "u1"));

        let err = index
            .check_insert(&record("abc123", "https://a.com", "u1"))
            .unwrap_err();
        assert!(matches!(err, StorageError::CodeAlreadyUsed(_)));
    }

    #[test]
    fn url_conflict_is_scoped_per_owner() {
        let mut index = Index::default();
        index.insert(record("abc123", "https://a.com", "u1"));

        assert!(index
            .check_insert(&record("xyz789", "https://a.com", "u2"))
            .is_ok());
        let err = index
            .check_insert(&record("xyz789", "https://a.com", "u1"))
            .unwrap_err();
        assert!(
            matches!(err, StorageError::UrlConflict { existing, .. } if existing.as_str() == "abc123")
        );
    }

    #[test]
    fn upsert_replaces_and_relinks_live_url() {
        let mut index = Index::default();
        index.insert(record("abc123", "https://a.com", "u1"));
        index.upsert(UrlRecord {
            deleted: true,
            ..record("abc123", "https://a.com", "u1")
        });

        assert_eq!(index.len(), 1);
        assert!(matches!(
            index.resolve(&ShortCode::new_unchecked("abc123")),
            Err(StorageError::Gone(_))
        ));
        assert!(index
            .check_insert(&record("new001", "https://a.com", "u1"))
            .is_ok());
    }

    #[test]
    fn deletions_skip_foreign_deleted_and_repeated_codes() {
        let mut index = Index::default();
        index.insert(record("aaaaaa", "https://a.com", "u1"));
        index.insert(record("bbbbbb", "https://b.com", "u2"));
        index.insert(UrlRecord {
            deleted: true,
            ..record("cccccc", "https://c.com", "u1")
        });

        let codes = ["aaaaaa", "aaaaaa", "bbbbbb", "cccccc", "missing"]
            .map(ShortCode::new_unchecked);
        let changed = index.deletions(&codes, "u1");
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].short_code.as_str(), "aaaaaa");
        assert!(changed[0].deleted);

        assert_eq!(index.mark_deleted(&codes, "u1"), 1);
        assert!(index.list_by_owner("u1").is_empty());
        assert_eq!(index.list_by_owner("u2").len(), 1);
    }
}
