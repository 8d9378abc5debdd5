//! Audio transfer and size probing.
//!
//! The reconciliation pass talks to [`ContentFetcher`] rather than to HTTP
//! directly so it can be exercised against an in-memory fake.

pub mod error;
pub mod file;

use std::path::Path;

use reqwest::Client;

pub use error::DownloadError;

/// Byte-level access to remote audio content and its local copies.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Advertised size of the remote content, `None` when unknown.
    async fn remote_size(&self, url: &str) -> Option<u64>;

    /// Size of the local file, `None` when absent or unreadable.
    async fn local_size(&self, path: &Path) -> Option<u64>;

    /// Download `url` to `path`, creating parent directories and
    /// overwriting whatever is there.
    async fn fetch(&self, url: &str, path: &Path) -> Result<(), DownloadError>;
}

/// [`ContentFetcher`] backed by a plain `reqwest::Client` and the local
/// filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn remote_size(&self, url: &str) -> Option<u64> {
        file::remote_size(&self.client, url).await
    }

    async fn local_size(&self, path: &Path) -> Option<u64> {
        file::local_size(path).await
    }

    async fn fetch(&self, url: &str, path: &Path) -> Result<(), DownloadError> {
        file::download_file(&self.client, url, path).await
    }
}
