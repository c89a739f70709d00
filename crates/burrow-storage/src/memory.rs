use crate::index::Index;
use async_trait::async_trait;
use burrow_core::repository::{ReadRepository, Repository, Result};
use burrow_core::{ShortCode, UrlRecord};
use parking_lot::RwLock;

/// In-memory implementation of the repository contract.
///
/// A single `RwLock` guards the code map and the per-owner URL map together,
/// so every check-then-write runs as one critical section. Nothing survives
/// a restart.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    index: RwLock<Index>,
}

impl InMemoryRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, deleted ones included.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        self.index.read().resolve(code)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>> {
        Ok(self.index.read().list_by_owner(owner_id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save(&self, record: UrlRecord) -> Result<()> {
        let mut index = self.index.write();
        index.check_insert(&record)?;
        index.insert(record);
        Ok(())
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<()> {
        let mut index = self.index.write();
        index.check_insert_batch(&records)?;
        for record in records {
            index.insert(record);
        }
        Ok(())
    }

    async fn delete_batch(&self, codes: &[ShortCode], owner_id: &str) -> Result<()> {
        let deleted = self.index.write().mark_deleted(codes, owner_id);
        tracing::debug!(owner_id, requested = codes.len(), deleted, "soft-deleted records");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::StorageError;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(c: &str, url: &str, owner: &str) -> UrlRecord {
        UrlRecord::new(code(c), url, owner)
    }

    #[tokio::test]
    async fn save_and_resolve() {
        let repo = InMemoryRepository::new();

        repo.save(record("abc123", "https://a.com", "u1"))
            .await
            .unwrap();

        assert_eq!(repo.resolve(&code("abc123")).await.unwrap(), "https://a.com");
    }

    #[tokio::test]
    async fn resolve_unknown_and_empty() {
        let repo = InMemoryRepository::new();

        assert!(matches!(
            repo.resolve(&code("nope00")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            repo.resolve(&code("")).await,
            Err(StorageError::EmptyCode)
        ));
    }

    #[tokio::test]
    async fn save_rejects_empty_url() {
        let repo = InMemoryRepository::new();

        let err = repo.save(record("abc123", "", "u1")).await.unwrap_err();
        assert!(matches!(err, StorageError::EmptyUrl));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn lifecycle_scenario() {
        let repo = InMemoryRepository::new();

        repo.save(record("abc123", "https://a.com", "u1"))
            .await
            .unwrap();
        assert_eq!(repo.resolve(&code("abc123")).await.unwrap(), "https://a.com");

        let err = repo
            .save(record("zzz999", "https://a.com", "u1"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::UrlConflict { existing, .. } if existing == code("abc123"))
        );

        repo.delete_batch(&[code("abc123")], "u1").await.unwrap();
        assert!(matches!(
            repo.resolve(&code("abc123")).await,
            Err(StorageError::Gone(_))
        ));

        // the code stays reserved, the url is free again
        let err = repo
            .save(record("abc123", "https://b.com", "u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CodeAlreadyUsed(_)));
        repo.save(record("zzz999", "https://a.com", "u1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn same_url_for_different_owners() {
        let repo = InMemoryRepository::new();

        repo.save(record("aaaaaa", "https://a.com", "u1"))
            .await
            .unwrap();
        repo.save(record("bbbbbb", "https://a.com", "u2"))
            .await
            .unwrap();

        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn save_batch_is_all_or_nothing() {
        let repo = InMemoryRepository::new();
        repo.save(record("taken1", "https://taken.com", "u1"))
            .await
            .unwrap();

        let err = repo
            .save_batch(vec![
                record("aaaaaa", "https://a.com", "u1"),
                record("taken1", "https://b.com", "u1"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CodeAlreadyUsed(c) if c == code("taken1")));
        assert!(matches!(
            repo.resolve(&code("aaaaaa")).await,
            Err(StorageError::NotFound(_))
        ));

        let err = repo
            .save_batch(vec![
                record("aaaaaa", "https://a.com", "u1"),
                record("bbbbbb", "https://taken.com", "u1"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UrlConflict { .. }));
        assert_eq!(repo.len(), 1);

        repo.save_batch(vec![
            record("aaaaaa", "https://a.com", "u1"),
            record("bbbbbb", "https://b.com", "u1"),
        ])
        .await
        .unwrap();
        assert_eq!(repo.list_by_owner("u1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_only_touches_owned_records() {
        let repo = InMemoryRepository::new();
        repo.save(record("aaaaaa", "https://a.com", "u1"))
            .await
            .unwrap();
        repo.save(record("bbbbbb", "https://b.com", "u2"))
            .await
            .unwrap();

        repo.delete_batch(&[code("aaaaaa"), code("bbbbbb"), code("nope00")], "u1")
            .await
            .unwrap();

        assert!(repo.list_by_owner("u1").await.unwrap().is_empty());
        assert_eq!(repo.resolve(&code("bbbbbb")).await.unwrap(), "https://b.com");
    }

    #[tokio::test]
    async fn list_by_owner_keeps_insertion_order() {
        let repo = InMemoryRepository::new();
        for (c, url) in [("aaaaaa", "https://1.com"), ("bbbbbb", "https://2.com")] {
            repo.save(record(c, url, "u1")).await.unwrap();
        }

        let urls: Vec<_> = repo
            .list_by_owner("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.original_url)
            .collect();
        assert_eq!(urls, ["https://1.com", "https://2.com"]);
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_url_keep_a_single_live_record() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..16u32 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.save(record(&format!("code{i:02}"), "https://same.com", "u1"))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(StorageError::UrlConflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.list_by_owner("u1").await.unwrap().len(), 1);
    }
}
