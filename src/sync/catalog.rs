use std::path::{Path, PathBuf};

use crate::vk::{RawAudio, VkError};

use super::paths;
use super::registry::AlbumRegistry;
use super::remote::CatalogSource;

/// A remote audio record with its local destination worked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRecord {
    pub id: i64,
    pub artist: String,
    pub title: String,
    pub duration: u32,
    pub album_id: i64,
    pub url: String,
    /// Title of the owning album, empty for "no album" or an id the
    /// registry does not know.
    pub album_title: String,
    pub target_path: PathBuf,
}

impl AudioRecord {
    pub fn from_raw(raw: RawAudio, registry: &AlbumRegistry, root: &Path) -> Self {
        let artist = paths::clean_text(&raw.artist);
        let title = paths::clean_text(&raw.title);
        let album_title = registry.title_of(raw.album_id).unwrap_or_default().to_string();
        let target_path =
            paths::target_path(root, &album_title, &paths::audio_filename(&artist, &title));
        Self {
            id: raw.id,
            artist,
            title,
            duration: raw.duration,
            album_id: raw.album_id,
            url: raw.url,
            album_title,
            target_path,
        }
    }

    /// `Artist - Title` for log lines.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Fetch the whole remote audio list in `page_size` windows, resolving
/// album titles against `registry`. Records keep the service's order.
pub async fn fetch_catalog<C: CatalogSource + ?Sized>(
    source: &C,
    registry: &AlbumRegistry,
    root: &Path,
    page_size: u64,
) -> Result<Vec<AudioRecord>, VkError> {
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0u64;

    loop {
        let page = source.audio_page(offset, page_size).await?;
        let received = page.items.len() as u64;
        tracing::debug!(offset, received, total = page.total, "Fetched catalog window");
        records.extend(
            page.items
                .into_iter()
                .map(|raw| AudioRecord::from_raw(raw, registry, root)),
        );
        offset += received;
        if received == 0 || offset >= page.total {
            break;
        }
    }

    Ok(records)
}
