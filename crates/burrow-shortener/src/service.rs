use async_trait::async_trait;
use burrow_core::repository::normalize_owner;
use burrow_core::{
    BatchEntry, BatchItem, Repository, ShortCode, ShortenParams, Shortened, Shortener,
    ShortenerError, StorageError, UrlRecord,
};
use burrow_generator::Generator;
use std::collections::HashMap;
use std::sync::Arc;

/// Attempts `shorten` makes before giving up on short-code collisions.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - Short code generation, retried on collisions
/// - Translation of "URL already shortened" into the existing code
/// - Input validation before storage is touched
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    max_attempts: u32,
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many codes `shorten` tries before failing. At least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn generate_code(&self) -> ShortCode {
        self.generator.generate().into()
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<Shortened, ShortenerError> {
        if params.original_url.is_empty() {
            return Err(ShortenerError::EmptyUrl);
        }
        let owner_id = normalize_owner(params.owner_id);

        for attempt in 1..=self.max_attempts {
            let code = self.generate_code();
            let record = UrlRecord::new(code.clone(), params.original_url.as_str(), owner_id.as_str());

            match self.repository.save(record).await {
                Ok(()) => {
                    tracing::debug!(%code, %owner_id, attempt, "shortened url");
                    return Ok(Shortened::Created(code));
                }
                Err(StorageError::CodeAlreadyUsed(_)) => {
                    tracing::warn!(%code, attempt, "short code collision, retrying");
                }
                Err(StorageError::UrlConflict { existing, .. }) => {
                    tracing::debug!(code = %existing, %owner_id, "url already shortened");
                    return Ok(Shortened::Existing(existing));
                }
                Err(err) => return Err(storage_to_shortener_error(err)),
            }
        }

        tracing::error!(attempts = self.max_attempts, "no free short code found");
        Err(ShortenerError::FailedToGenerate {
            attempts: self.max_attempts,
        })
    }

    async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner_id: &str,
    ) -> Result<Vec<BatchEntry>, ShortenerError> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }
        for item in &items {
            if item.correlation_id.is_empty() {
                return Err(ShortenerError::EmptyCorrelationId);
            }
            if item.original_url.is_empty() {
                return Err(ShortenerError::EmptyUrl);
            }
        }
        let owner_id = normalize_owner(owner_id);

        // Repeated urls are stored once; later occurrences reuse the first
        // occurrence's answer.
        let mut first_by_url: HashMap<&str, usize> = HashMap::with_capacity(items.len());
        let mut repeats: Vec<(usize, usize)> = Vec::new();
        let mut pending: Vec<(usize, UrlRecord)> = Vec::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if let Some(&first) = first_by_url.get(item.original_url.as_str()) {
                repeats.push((pos, first));
                continue;
            }
            first_by_url.insert(item.original_url.as_str(), pos);
            let record = UrlRecord::new(self.generate_code(), item.original_url.as_str(), owner_id.as_str());
            pending.push((pos, record));
        }

        let mut answers: Vec<Option<(ShortCode, bool)>> = vec![None; items.len()];

        // Every conflict answers at least one pending item, so this runs at
        // most once per item plus the final successful write.
        while !pending.is_empty() {
            let records = pending.iter().map(|(_, record)| record.clone()).collect();
            match self.repository.save_batch(records).await {
                Ok(()) => {
                    for (pos, record) in pending.drain(..) {
                        answers[pos] = Some((record.short_code, false));
                    }
                }
                Err(StorageError::UrlConflict {
                    original_url,
                    existing,
                }) => {
                    let before = pending.len();
                    pending.retain(|(pos, record)| {
                        if record.original_url == original_url {
                            answers[*pos] = Some((existing.clone(), true));
                            false
                        } else {
                            true
                        }
                    });
                    if pending.len() == before {
                        return Err(ShortenerError::Storage(StorageError::UrlConflict {
                            original_url,
                            existing,
                        }));
                    }
                    tracing::debug!(
                        code = %existing,
                        remaining = pending.len(),
                        "batch item already shortened, resubmitting the rest"
                    );
                }
                Err(err) => return Err(storage_to_shortener_error(err)),
            }
        }

        for (pos, first) in repeats {
            answers[pos] = answers[first].clone().map(|(code, _)| (code, true));
        }

        items
            .into_iter()
            .zip(answers)
            .map(|(item, answer)| {
                let (short_code, existing) = answer.ok_or_else(|| {
                    ShortenerError::Storage(StorageError::InvalidData(format!(
                        "no short code assigned to {}",
                        item.correlation_id
                    )))
                })?;
                Ok(BatchEntry {
                    correlation_id: item.correlation_id,
                    short_code,
                    existing,
                })
            })
            .collect()
    }

    async fn resolve(&self, code: &str) -> Result<String, ShortenerError> {
        let code = ShortCode::new(code.trim())?;
        let url = self
            .repository
            .resolve(&code)
            .await
            .map_err(storage_to_shortener_error)?;
        tracing::trace!(%code, %url, "resolved short code");
        Ok(url)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>, ShortenerError> {
        if owner_id.is_empty() {
            return Err(ShortenerError::EmptyOwner);
        }
        self.repository
            .list_by_owner(owner_id)
            .await
            .map_err(storage_to_shortener_error)
    }

    async fn delete_batch(&self, codes: &[String], owner_id: &str) -> Result<(), ShortenerError> {
        if owner_id.is_empty() {
            return Err(ShortenerError::EmptyOwner);
        }
        if codes.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }

        let valid: Vec<ShortCode> = codes
            .iter()
            .filter_map(|code| ShortCode::new(code.trim()).ok())
            .collect();
        if valid.len() < codes.len() {
            tracing::debug!(
                skipped = codes.len() - valid.len(),
                "ignoring invalid codes in delete request"
            );
        }
        if valid.is_empty() {
            return Ok(());
        }

        self.repository
            .delete_batch(&valid, owner_id)
            .await
            .map_err(storage_to_shortener_error)
    }

    async fn ping(&self) -> Result<(), ShortenerError> {
        self.repository
            .ping()
            .await
            .map_err(storage_to_shortener_error)
    }

    async fn close(&self) -> Result<(), ShortenerError> {
        self.repository
            .close()
            .await
            .map_err(storage_to_shortener_error)
    }
}

/// Converts a StorageError to a ShortenerError.
fn storage_to_shortener_error(e: StorageError) -> ShortenerError {
    match e {
        StorageError::EmptyUrl => ShortenerError::EmptyUrl,
        StorageError::EmptyCode => ShortenerError::EmptyShortCode,
        StorageError::EmptyOwner => ShortenerError::EmptyOwner,
        StorageError::NotFound(code) => ShortenerError::NotFound(code.to_string()),
        StorageError::Gone(code) => ShortenerError::Gone(code.to_string()),
        other => ShortenerError::Storage(other),
    }
}
