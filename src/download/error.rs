use thiserror::Error;

/// Why a single audio transfer failed.
///
/// The sync never retries a failed transfer within a run; `is_transient()`
/// only decides how loudly the failure is reported.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {path}")]
    HttpStatus { status: u16, path: String },

    #[error("Download URL is empty for {0}")]
    MissingUrl(String),

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("HTTP error downloading {path} (bytes_so_far={bytes_written}): {source}")]
    Http {
        source: reqwest::Error,
        path: String,
        bytes_written: u64,
    },
}

impl DownloadError {
    /// Whether the next run has a fair chance of succeeding where this one
    /// did not (server errors, rate limits, dropped connections).
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Http { .. } => true,
            DownloadError::MissingUrl(_) | DownloadError::Disk(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> DownloadError {
        DownloadError::HttpStatus {
            status,
            path: "x".into(),
        }
    }

    #[test]
    fn test_client_errors_not_transient() {
        assert!(!status(403).is_transient());
        assert!(!status(404).is_transient());
    }

    #[test]
    fn test_server_errors_transient() {
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
    }

    #[test]
    fn test_disk_and_missing_url_not_transient() {
        assert!(!DownloadError::Disk(std::io::Error::other("disk full")).is_transient());
        assert!(!DownloadError::MissingUrl("a.mp3".into()).is_transient());
    }

    #[tokio::test]
    async fn test_connection_error_transient() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err();
        let e = DownloadError::Http {
            source: err,
            path: "x".into(),
            bytes_written: 0,
        };
        assert!(e.is_transient());
    }
}
