use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;

/// Sibling `.part` path the transfer is staged in before the final rename,
/// so an interrupted run never leaves a truncated file under the real name.
fn part_path(download_path: &Path) -> PathBuf {
    let mut name = download_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    download_path.with_file_name(name)
}

/// Fetch `url` into `download_path`, creating parent directories and
/// replacing any existing file.
pub async fn download_file(client: &Client, url: &str, download_path: &Path) -> Result<(), DownloadError> {
    if url.is_empty() {
        return Err(DownloadError::MissingUrl(download_path.display().to_string()));
    }
    if let Some(parent) = download_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let part = part_path(download_path);
    let result = attempt_download(client, url, download_path, &part).await;
    if result.is_err() {
        let _ = fs::remove_file(&part).await;
    }
    result
}

async fn attempt_download(
    client: &Client,
    url: &str,
    download_path: &Path,
    part_path: &Path,
) -> Result<(), DownloadError> {
    let path_str = download_path.display().to_string();
    let response = client.get(url).send().await.map_err(|e| DownloadError::Http {
        source: e,
        path: path_str.clone(),
        bytes_written: 0,
    })?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            status: response.status().as_u16(),
            path: path_str,
        });
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Http {
            source: e,
            path: path_str.clone(),
            bytes_written,
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    fs::rename(part_path, download_path).await?;
    tracing::debug!(bytes = bytes_written, "Wrote {}", download_path.display());
    Ok(())
}

/// Byte length advertised by a HEAD request, or `None` when the server
/// does not say or the request fails.
///
/// Reads the header rather than `Response::content_length()`, which reports
/// the (empty) body size for HEAD responses.
pub async fn remote_size(client: &Client, url: &str) -> Option<u64> {
    if url.is_empty() {
        return None;
    }
    let response = match client.head(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Cannot probe size of {}: {}", url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::warn!("Size probe for {} returned HTTP {}", url, response.status());
        return None;
    }
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Size of a regular file on disk, `None` if it is absent or unreadable.
pub async fn local_size(path: &Path) -> Option<u64> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Cannot stat {}: {}", path.display(), e);
            None
        }
    }
}
