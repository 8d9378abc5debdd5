use serde::Deserialize;

/// Successful VK response: `{"response": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

/// Failed VK response: `{"error": {"error_code": 5, "error_msg": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

/// Paged list as returned by `audio.get` and `audio.getAlbums`.
#[derive(Debug, Deserialize)]
pub struct ItemsPage<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// An audio record exactly as the API returns it. Artist and title are
/// still HTML-escaped and untrimmed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAudio {
    pub id: i64,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub url: String,
    /// 0 when the audio is not filed under any album.
    #[serde(default)]
    pub album_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAlbum {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl User {
    /// Directory label for this user's library: `First Last (idN, N)`.
    pub fn library_label(&self, requested: &str) -> String {
        format!(
            "{} {} ({}, {})",
            self.first_name, self.last_name, requested, self.id
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct AddAlbumResponse {
    pub album_id: i64,
}
