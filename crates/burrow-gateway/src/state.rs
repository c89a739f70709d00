use std::sync::Arc;

use burrow_core::{ShortCode, Shortener};

use crate::identity::TokenSigner;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    base_url: Arc<str>,
    signer: Arc<TokenSigner>,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        public_base_url: impl AsRef<str>,
        signer: TokenSigner,
    ) -> Self {
        Self {
            shortener,
            base_url: Arc::from(public_base_url.as_ref().trim_end_matches('/')),
            signer: Arc::new(signer),
        }
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute short URL for `code`.
    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }
}
