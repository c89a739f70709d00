use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Anonymous identity of the caller.
    pub owner_id: String,
}

/// Outcome of a successful [`Shortener::shorten`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// A new record was stored under this code.
    Created(ShortCode),
    /// The owner had already shortened this URL; this is the existing code.
    Existing(ShortCode),
}

impl Shortened {
    pub fn code(&self) -> &ShortCode {
        match self {
            Shortened::Created(code) | Shortened::Existing(code) => code,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Shortened::Existing(_))
    }
}

/// One entry of a batch shorten request.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// Result for one [`BatchItem`], in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub correlation_id: String,
    pub short_code: ShortCode,
    /// `true` when the URL had already been shortened by the owner.
    pub existing: bool,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a shortened URL, or returns the owner's existing code for it.
    async fn shorten(&self, params: ShortenParams) -> Result<Shortened>;

    /// Shortens every item in one atomic storage write per attempt.
    async fn shorten_batch(&self, items: Vec<BatchItem>, owner_id: &str) -> Result<Vec<BatchEntry>>;

    /// Resolves a short code to its original URL.
    async fn resolve(&self, code: &str) -> Result<String>;

    /// Lists the live records of an owner.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>>;

    /// Soft-deletes the owner's records among `codes`.
    async fn delete_batch(&self, codes: &[String], owner_id: &str) -> Result<()>;

    /// Checks that storage is reachable.
    async fn ping(&self) -> Result<()>;

    /// Releases storage resources.
    async fn close(&self) -> Result<()>;
}
