//! The remote operations the sync consumes, abstracted so the engine can be
//! driven by a fake in tests. [`VkClient`] is the production implementation.

use crate::vk::{RawAlbum, RawAudio, VkClient, VkError};

/// One window of the remote audio list plus the list's total length.
#[derive(Debug, Default)]
pub struct CatalogPage {
    pub total: u64,
    pub items: Vec<RawAudio>,
}

/// Read side: the audio list and the album list.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn audio_page(&self, offset: u64, count: u64) -> Result<CatalogPage, VkError>;

    async fn albums(&self) -> Result<Vec<RawAlbum>, VkError>;
}

/// Write side: album creation and batch reassignment.
#[async_trait::async_trait]
pub trait AlbumService: Send + Sync {
    /// Create an album, returning its id or `0` if the service refused.
    async fn create_album(&self, title: &str) -> Result<i64, VkError>;

    /// Move `audio_ids` into `album_id`; `false` if the service refused.
    async fn move_to_album(&self, album_id: i64, audio_ids: &[i64]) -> Result<bool, VkError>;
}

#[async_trait::async_trait]
impl CatalogSource for VkClient {
    async fn audio_page(&self, offset: u64, count: u64) -> Result<CatalogPage, VkError> {
        let page = self.audio_get(offset, count).await?;
        Ok(CatalogPage {
            total: page.count,
            items: page.items,
        })
    }

    async fn albums(&self) -> Result<Vec<RawAlbum>, VkError> {
        self.audio_get_albums().await
    }
}

#[async_trait::async_trait]
impl AlbumService for VkClient {
    async fn create_album(&self, title: &str) -> Result<i64, VkError> {
        self.audio_add_album(title).await
    }

    async fn move_to_album(&self, album_id: i64, audio_ids: &[i64]) -> Result<bool, VkError> {
        self.audio_move_to_album(album_id, audio_ids).await
    }
}
