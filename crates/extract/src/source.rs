use async_trait::async_trait;
use gensave_core::Result;
use tracing::trace;

use crate::http::Fetcher;

/// One rendered view of the target page.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Address of the page, used to resolve relative media URLs.
    pub url: String,
    pub html: String,
}

/// Anything that can produce the current document on demand.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn snapshot(&self) -> Result<PageSnapshot>;

    fn name(&self) -> &'static str;
}

/// Re-fetches the page over HTTP on every tick.
pub struct HttpDocument {
    fetcher: Fetcher,
    url: String,
}

impl HttpDocument {
    pub fn new(fetcher: Fetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpDocument {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        let html = self.fetcher.fetch_text(&self.url).await?;
        trace!(url = %self.url, bytes = html.len(), "fetched page snapshot");
        Ok(PageSnapshot {
            url: self.url.clone(),
            html,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// A fixed, already-rendered document (e.g. a saved page).
pub struct StaticDocument {
    snapshot: PageSnapshot,
}

impl StaticDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            snapshot: PageSnapshot {
                url: url.into(),
                html: html.into(),
            },
        }
    }
}

#[async_trait]
impl DocumentSource for StaticDocument {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
