use async_trait::async_trait;
use burrow_core::repository::{check_batch, ReadRepository, Repository, Result};
use burrow_core::{ShortCode, StorageError, UrlRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use typed_builder::TypedBuilder;

const SCHEMA: &str = include_str!("../ddl/postgres/short_urls.sql");

const SHORT_CODE_CONSTRAINT: &str = "short_urls_short_code_key";
const LIVE_OWNER_URL_CONSTRAINT: &str = "short_urls_live_owner_url_key";

/// Connection pool settings for [`PostgresRepository::connect`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresOptions {
    #[builder(default = 10)]
    pub max_connections: u32,
    #[builder(default = Duration::from_secs(5))]
    pub acquire_timeout: Duration,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// PostgreSQL implementation of the repository contract.
///
/// Soft delete is implemented with `is_deleted`. Short codes are unique over
/// every row, deleted or not, so a code is never reused. The "same URL"
/// rule is a partial unique index on `(user_id, original_url)` over live
/// rows; violations of it are turned into `UrlConflict` by looking up the
/// live code.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    ///
    /// The schema is not created; call [`PostgresRepository::migrate`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url` and creates the schema if needed.
    pub async fn connect(database_url: &str, options: &PostgresOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Creates the `short_urls` table and its indexes if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn code_exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM short_urls WHERE short_code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();
        Ok(exists)
    }

    async fn live_code(&self, owner_id: &str, original_url: &str) -> Result<Option<ShortCode>> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM short_urls
            WHERE user_id = $1
              AND original_url = $2
              AND NOT is_deleted
            "#,
        )
        .bind(owner_id)
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| {
            row.try_get::<String, _>("short_code")
                .map(ShortCode::new_unchecked)
                .map_err(map_sqlx_error)
        })
        .transpose()
    }

    /// Turns a failed insert of `record` into the contract's error.
    ///
    /// Must run outside any aborted transaction since it may query the pool.
    async fn insert_error(&self, err: sqlx::Error, record: &UrlRecord) -> StorageError {
        match violated_constraint(&err).as_deref() {
            Some(SHORT_CODE_CONSTRAINT) => StorageError::CodeAlreadyUsed(record.short_code.clone()),
            Some(LIVE_OWNER_URL_CONSTRAINT) => self.url_conflict(record).await,
            _ => map_sqlx_error(err),
        }
    }

    async fn url_conflict(&self, record: &UrlRecord) -> StorageError {
        // a row can violate both constraints; the code collision wins
        match self.code_exists(&record.short_code).await {
            Ok(true) => return StorageError::CodeAlreadyUsed(record.short_code.clone()),
            Ok(false) => {}
            Err(err) => return err,
        }

        match self.live_code(&record.owner_id, &record.original_url).await {
            Ok(Some(existing)) => StorageError::UrlConflict {
                original_url: record.original_url.clone(),
                existing,
            },
            Ok(None) => StorageError::Query(format!(
                "conflicting record for {} disappeared",
                record.original_url
            )),
            Err(err) => err,
        }
    }
}

fn check_record(record: &UrlRecord) -> Result<()> {
    if record.original_url.is_empty() {
        return Err(StorageError::EmptyUrl);
    }
    if record.short_code.is_empty() {
        return Err(StorageError::EmptyCode);
    }
    Ok(())
}

fn insert_query(
    record: &UrlRecord,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO short_urls (short_code, original_url, user_id, is_deleted)
        VALUES ($1, $2, $3, FALSE)
        "#,
    )
    .bind(record.short_code.as_str())
    .bind(record.original_url.as_str())
    .bind(record.owner_id.as_str())
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    db_err.constraint().map(str::to_string)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for PostgresRepository {
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        if code.is_empty() {
            return Err(StorageError::EmptyCode);
        }

        let row = sqlx::query(
            r#"
            SELECT original_url, is_deleted
            FROM short_urls
            WHERE short_code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(code.clone()));
        };

        let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
        if is_deleted {
            return Err(StorageError::Gone(code.clone()));
        }
        row.try_get("original_url").map_err(map_sqlx_error)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url, user_id
            FROM short_urls
            WHERE user_id = $1
              AND NOT is_deleted
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(UrlRecord {
                    short_code: ShortCode::new_unchecked(
                        row.try_get::<String, _>("short_code")
                            .map_err(map_sqlx_error)?,
                    ),
                    original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
                    owner_id: row.try_get("user_id").map_err(map_sqlx_error)?,
                    deleted: false,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn save(&self, record: UrlRecord) -> Result<()> {
        check_record(&record)?;

        match insert_query(&record).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.insert_error(err, &record).await),
        }
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<()> {
        check_batch(&records)?;
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for record in &records {
            if let Err(err) = insert_query(record).execute(&mut *tx).await {
                tx.rollback().await.map_err(map_sqlx_error)?;
                return Err(self.insert_error(err, record).await);
            }
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(count = records.len(), "saved batch");
        Ok(())
    }

    async fn delete_batch(&self, codes: &[ShortCode], owner_id: &str) -> Result<()> {
        let codes: Vec<&str> = codes.iter().map(ShortCode::as_str).collect();

        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET is_deleted = TRUE
            WHERE user_id = $1
              AND short_code = ANY($2)
              AND NOT is_deleted
            "#,
        )
        .bind(owner_id)
        .bind(&codes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!(
            owner_id,
            requested = codes.len(),
            deleted = result.rows_affected(),
            "soft-deleted records"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
