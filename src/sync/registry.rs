use std::collections::HashMap;

use crate::vk::RawAlbum;

use super::paths;

/// Album id VK uses for "not in any album" and returns when an album
/// could not be created.
pub const NO_ALBUM: i64 = 0;

/// Title ↔ id mapping of the user's remote albums. Seeded once per run from
/// `audio.getAlbums`; grows as the mover creates albums.
#[derive(Debug, Default, Clone)]
pub struct AlbumRegistry {
    by_title: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl AlbumRegistry {
    pub fn from_albums(albums: impl IntoIterator<Item = RawAlbum>) -> Self {
        let mut registry = Self::default();
        for album in albums {
            registry.register(&paths::clean_text(&album.title), album.id);
        }
        registry
    }

    /// Remote id for an album title.
    pub fn resolve(&self, title: &str) -> Option<i64> {
        self.by_title.get(title).copied()
    }

    /// Title of the album with `id`; `None` for [`NO_ALBUM`] and unknown ids.
    pub fn title_of(&self, id: i64) -> Option<&str> {
        if id == NO_ALBUM {
            return None;
        }
        self.by_id.get(&id).map(String::as_str)
    }

    /// Record an album. A repeated title keeps its first id so lookups stay
    /// stable for the rest of the run.
    pub fn register(&mut self, title: &str, id: i64) {
        if id == NO_ALBUM {
            return;
        }
        self.by_title.entry(title.to_string()).or_insert(id);
        self.by_id.insert(id, title.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    /// Titles in alphabetical order.
    pub fn titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = self.by_title.keys().map(String::as_str).collect();
        titles.sort_unstable();
        titles
    }
}
