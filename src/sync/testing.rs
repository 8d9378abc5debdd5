//! In-memory stand-ins for the VK API and the HTTP/filesystem layer.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::download::{ContentFetcher, DownloadError};
use crate::vk::{RawAlbum, RawAudio, VkError};

use super::remote::{AlbumService, CatalogPage, CatalogSource};

pub fn raw_audio(id: i64, artist: &str, title: &str, album_id: i64) -> RawAudio {
    RawAudio {
        id,
        artist: artist.to_string(),
        title: title.to_string(),
        duration: 200,
        url: format!("http://x/{}", id),
        album_id,
    }
}

pub fn raw_album(id: i64, title: &str) -> RawAlbum {
    RawAlbum {
        id,
        title: title.to_string(),
    }
}

/// Remote sizes keyed by URL, local sizes keyed by path. A successful fetch
/// makes the local size equal the remote one, like a real download would.
#[derive(Default)]
pub struct FakeFetcher {
    remote: HashMap<String, u64>,
    local: Mutex<HashMap<PathBuf, u64>>,
    failing: HashSet<String>,
    pub fetched: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    pub fn with_remote(mut self, url: &str, size: u64) -> Self {
        self.remote.insert(url.to_string(), size);
        self
    }

    pub fn with_local(self, path: impl Into<PathBuf>, size: u64) -> Self {
        self.local.lock().unwrap().insert(path.into(), size);
        self
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn fetched_paths(&self) -> Vec<PathBuf> {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl ContentFetcher for FakeFetcher {
    async fn remote_size(&self, url: &str) -> Option<u64> {
        self.remote.get(url).copied()
    }

    async fn local_size(&self, path: &Path) -> Option<u64> {
        self.local.lock().unwrap().get(path).copied()
    }

    async fn fetch(&self, url: &str, path: &Path) -> Result<(), DownloadError> {
        self.fetched
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));
        if self.failing.contains(url) {
            return Err(DownloadError::HttpStatus {
                status: 503,
                path: path.display().to_string(),
            });
        }
        if let Some(size) = self.remote.get(url) {
            self.local.lock().unwrap().insert(path.to_path_buf(), *size);
        }
        Ok(())
    }
}

/// Fake VK account: a fixed catalog and album list, recording every
/// album creation and move.
pub struct FakeRemote {
    pub audios: Vec<RawAudio>,
    pub albums: Vec<RawAlbum>,
    next_album_id: Mutex<i64>,
    refuse_create: HashSet<String>,
    fail_create: HashSet<String>,
    reject_moves_into: HashSet<i64>,
    fail_catalog: bool,
    pub created: Mutex<Vec<String>>,
    pub moves: Mutex<Vec<(i64, Vec<i64>)>>,
}

impl FakeRemote {
    pub fn new(audios: Vec<RawAudio>, albums: Vec<RawAlbum>) -> Self {
        Self {
            audios,
            albums,
            next_album_id: Mutex::new(1000),
            refuse_create: HashSet::new(),
            fail_create: HashSet::new(),
            reject_moves_into: HashSet::new(),
            fail_catalog: false,
            created: Mutex::new(Vec::new()),
            moves: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing_create(mut self, title: &str) -> Self {
        self.refuse_create.insert(title.to_string());
        self
    }

    pub fn failing_create(mut self, title: &str) -> Self {
        self.fail_create.insert(title.to_string());
        self
    }

    pub fn rejecting_moves_into(mut self, album_id: i64) -> Self {
        self.reject_moves_into.insert(album_id);
        self
    }

    pub fn with_broken_catalog(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<(i64, Vec<i64>)> {
        self.moves.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for FakeRemote {
    async fn audio_page(&self, offset: u64, count: u64) -> Result<CatalogPage, VkError> {
        if self.fail_catalog {
            return Err(VkError::Api {
                code: 15,
                message: "Access denied".into(),
            });
        }
        Ok(CatalogPage {
            total: self.audios.len() as u64,
            items: self
                .audios
                .iter()
                .skip(offset as usize)
                .take(count as usize)
                .cloned()
                .collect(),
        })
    }

    async fn albums(&self) -> Result<Vec<RawAlbum>, VkError> {
        Ok(self.albums.clone())
    }
}

#[async_trait::async_trait]
impl AlbumService for FakeRemote {
    async fn create_album(&self, title: &str) -> Result<i64, VkError> {
        self.created.lock().unwrap().push(title.to_string());
        if self.refuse_create.contains(title) {
            return Ok(0);
        }
        if self.fail_create.contains(title) {
            return Err(VkError::Api {
                code: 100,
                message: "One of the parameters specified was missing or invalid".into(),
            });
        }
        let mut next = self.next_album_id.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    async fn move_to_album(&self, album_id: i64, audio_ids: &[i64]) -> Result<bool, VkError> {
        self.moves
            .lock()
            .unwrap()
            .push((album_id, audio_ids.to_vec()));
        Ok(!self.reject_moves_into.contains(&album_id))
    }
}
