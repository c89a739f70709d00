use crate::index::Index;
use async_trait::async_trait;
use burrow_core::repository::{normalize_owner, ReadRepository, Repository, Result};
use burrow_core::{ShortCode, StorageError, UrlRecord};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One line of the append log.
#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    uuid: u64,
    short_url: String,
    original_url: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
}

impl LogLine {
    fn new(uuid: u64, record: &UrlRecord) -> Self {
        Self {
            uuid,
            short_url: record.short_code.to_string(),
            original_url: record.original_url.clone(),
            user_id: record.owner_id.clone(),
            is_deleted: record.deleted,
        }
    }

    fn parse(line: &str) -> std::result::Result<(u64, UrlRecord), String> {
        let line: LogLine = serde_json::from_str(line).map_err(|e| e.to_string())?;
        let short_code = ShortCode::new(line.short_url).map_err(|e| e.to_string())?;
        let record = UrlRecord {
            short_code,
            original_url: line.original_url,
            owner_id: normalize_owner(line.user_id),
            deleted: line.is_deleted,
        };
        Ok((line.uuid, record))
    }
}

struct State {
    index: Index,
    /// `None` once the repository has been closed, or after a failed append
    /// could not be rolled back.
    file: Option<File>,
    /// Length of the log up to the last successful append.
    len: u64,
    next_uuid: u64,
}

impl State {
    /// Appends `records` as one write and flushes it.
    ///
    /// On failure the file is truncated back to its previous length so the
    /// rejected lines never reach a later replay. If that truncation fails
    /// too, the log stops accepting writes.
    async fn append(&mut self, records: &[UrlRecord]) -> Result<()> {
        let mut buf = Vec::with_capacity(records.len() * 128);
        let mut uuid = self.next_uuid;
        for record in records {
            serde_json::to_writer(&mut buf, &LogLine::new(uuid, record))
                .map_err(|e| StorageError::InvalidData(format!("encode record: {e}")))?;
            buf.push(b'\n');
            uuid += 1;
        }

        let file = self.file.as_mut().ok_or_else(|| {
            StorageError::Unavailable("file repository is not accepting writes".to_string())
        })?;
        if let Err(err) = write_all_flushed(file, &buf).await {
            match file.set_len(self.len).await {
                Ok(()) => {
                    tracing::warn!(error = %err, len = self.len, "rolled back failed append");
                }
                Err(rollback) => {
                    tracing::error!(
                        error = %err,
                        rollback_error = %rollback,
                        "failed to roll back append, refusing further writes"
                    );
                    self.file = None;
                }
            }
            return Err(err.into());
        }

        self.len += buf.len() as u64;
        self.next_uuid = uuid;
        Ok(())
    }
}

async fn write_all_flushed(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.flush().await
}

/// Repository backed by an append-only newline-delimited JSON log.
///
/// The whole log is replayed into memory on [`FileRepository::open`]; the
/// latest line for a code wins. Appends and index updates share one async
/// mutex so lines never interleave and the index never runs ahead of the
/// file.
pub struct FileRepository {
    path: PathBuf,
    state: Mutex<State>,
}

impl std::fmt::Debug for FileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRepository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileRepository {
    /// Opens (or creates) the log at `path` and replays it.
    ///
    /// A final line without its terminating newline that does not parse is
    /// treated as a torn write: it is dropped from the file with a warning.
    /// Any other malformed line fails with `InvalidData`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let replay = replay(&path, &content)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let mut len = replay.valid_len as u64;
        if replay.valid_len < content.len() {
            file.set_len(len).await?;
        }
        if replay.valid_len > 0 && !content[..replay.valid_len].ends_with('\n') {
            write_all_flushed(&mut file, b"\n").await?;
            len += 1;
        }

        tracing::info!(
            path = %path.display(),
            records = replay.index.len(),
            next_uuid = replay.next_uuid,
            "file repository opened"
        );

        Ok(Self {
            path,
            state: Mutex::new(State {
                index: replay.index,
                file: Some(file),
                len,
                next_uuid: replay.next_uuid,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct Replay {
    index: Index,
    next_uuid: u64,
    /// Byte length of the well-formed prefix of the log.
    valid_len: usize,
}

fn replay(path: &Path, content: &str) -> Result<Replay> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for chunk in content.split_inclusive('\n') {
        let line = chunk.trim();
        if !line.is_empty() {
            lines.push((offset, line, chunk.ends_with('\n')));
        }
        offset += chunk.len();
    }

    let mut index = Index::default();
    let mut max_uuid = None;
    let mut valid_len = content.len();

    for (n, &(offset, line, terminated)) in lines.iter().enumerate() {
        match LogLine::parse(line) {
            Ok((uuid, record)) => {
                max_uuid = max_uuid.max(Some(uuid));
                index.upsert(record);
            }
            Err(reason) if n + 1 == lines.len() && !terminated => {
                tracing::warn!(
                    path = %path.display(),
                    line = n + 1,
                    %reason,
                    "dropping torn final line"
                );
                valid_len = offset;
            }
            Err(reason) => {
                return Err(StorageError::InvalidData(format!(
                    "{}: line {} is corrupt: {reason}",
                    path.display(),
                    n + 1
                )));
            }
        }
    }

    Ok(Replay {
        index,
        next_uuid: max_uuid.map_or(1, |uuid| uuid + 1),
        valid_len,
    })
}

#[async_trait]
impl ReadRepository for FileRepository {
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        self.state.lock().await.index.resolve(code)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>> {
        Ok(self.state.lock().await.index.list_by_owner(owner_id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn save(&self, record: UrlRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        state.index.check_insert(&record)?;
        state.append(std::slice::from_ref(&record)).await?;
        state.index.insert(record);
        Ok(())
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.index.check_insert_batch(&records)?;
        state.append(&records).await?;
        for record in records {
            state.index.insert(record);
        }
        Ok(())
    }

    async fn delete_batch(&self, codes: &[ShortCode], owner_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let changed = state.index.deletions(codes, owner_id);
        if changed.is_empty() {
            return Ok(());
        }

        state.append(&changed).await?;
        tracing::debug!(owner_id, deleted = changed.len(), "soft-deleted records");
        for record in changed {
            state.index.upsert(record);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mut file) = state.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            tracing::info!(path = %self.path.display(), "file repository closed");
        }
        Ok(())
    }
}
