//! VK API client: the handful of `users.*` and `audio.*` methods the sync
//! needs. Every call is a GET against `https://api.vk.com/method/<name>` with
//! the access token and API version appended; responses arrive wrapped in a
//! `{"response": ...}` or `{"error": ...}` envelope.

pub mod auth;
pub mod error;
pub mod types;

pub use error::VkError;
pub use types::{RawAlbum, RawAudio, User};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::retry::{self, RetryAction, RetryConfig};
use auth::Credentials;
use types::{AddAlbumResponse, Envelope, ErrorEnvelope, ItemsPage};

pub const API_BASE: &str = "https://api.vk.com/method";
pub const DEFAULT_API_VERSION: &str = "5.16";

/// `audio.getAlbums` returns at most this many albums per call.
const ALBUMS_PAGE_SIZE: u64 = 100;

pub struct VkClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    version: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for VkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.credentials.user_id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl VkClient {
    pub fn new(
        http: reqwest::Client,
        credentials: Credentials,
        version: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
            credentials,
            version: version.into(),
            retry,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.credentials.user_id
    }

    /// Call `method`, retrying transient failures with backoff.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, VkError> {
        self.call_with(method, params, VkError::is_retryable).await
    }

    /// Call `method`, retrying only the failures `retryable` accepts.
    async fn call_with<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        retryable: fn(&VkError) -> bool,
    ) -> Result<T, VkError> {
        retry::retry_with_backoff(
            &self.retry,
            |e: &VkError| {
                if retryable(e) {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || self.call_once(method, params),
        )
        .await
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, VkError> {
        let url = format!("{}/{}", self.base_url, method);
        tracing::debug!(method, "VK request");
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[
                ("access_token", self.credentials.token.as_str()),
                ("v", self.version.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VkError::HttpStatus {
                status: status.as_u16(),
                method: method.to_string(),
            });
        }
        let body = response.bytes().await?;
        decode_response(method, &body)
    }

    pub async fn users_get(&self, user_ids: &str) -> Result<Vec<User>, VkError> {
        self.call("users.get", &[("user_ids", user_ids.to_string())])
            .await
    }

    pub async fn audio_get_count(&self) -> Result<u64, VkError> {
        self.call("audio.getCount", &[("owner_id", self.user_id().to_string())])
            .await
    }

    /// One window of the user's audio list, newest first.
    pub async fn audio_get(&self, offset: u64, count: u64) -> Result<ItemsPage<RawAudio>, VkError> {
        self.call(
            "audio.get",
            &[
                ("owner_id", self.user_id().to_string()),
                ("album_id", "0".to_string()),
                ("need_user", "0".to_string()),
                ("offset", offset.to_string()),
                ("count", count.to_string()),
            ],
        )
        .await
    }

    /// All of the user's albums, following pagination to the end.
    pub async fn audio_get_albums(&self) -> Result<Vec<RawAlbum>, VkError> {
        let mut albums = Vec::new();
        let mut offset = 0u64;
        loop {
            let page: ItemsPage<RawAlbum> = self
                .call(
                    "audio.getAlbums",
                    &[
                        ("owner_id", self.user_id().to_string()),
                        ("offset", offset.to_string()),
                        ("count", ALBUMS_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let received = page.items.len() as u64;
            albums.extend(page.items);
            offset += received;
            if received == 0 || offset >= page.count {
                break;
            }
        }
        Ok(albums)
    }

    /// Create an album and return its id. VK reports failure as id 0.
    ///
    /// Only rate-limit rejections are retried: after a timeout or a 5xx the
    /// album may already exist, and a second request would duplicate it.
    pub async fn audio_add_album(&self, title: &str) -> Result<i64, VkError> {
        let added: AddAlbumResponse = self
            .call_with(
                "audio.addAlbum",
                &[
                    ("owner_id", self.user_id().to_string()),
                    ("title", title.to_string()),
                ],
                VkError::is_rate_limited,
            )
            .await?;
        Ok(added.album_id)
    }

    /// Reassign `audio_ids` to `album_id`. Returns whether VK acknowledged it.
    pub async fn audio_move_to_album(&self, album_id: i64, audio_ids: &[i64]) -> Result<bool, VkError> {
        let acknowledged: i64 = self
            .call(
                "audio.moveToAlbum",
                &[
                    ("owner_id", self.user_id().to_string()),
                    ("album_id", album_id.to_string()),
                    ("audio_ids", join_ids(audio_ids)),
                ],
            )
            .await?;
        Ok(acknowledged == 1)
    }
}

/// Comma-joined id list as `audio.moveToAlbum` expects it.
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Unwrap a VK envelope, turning `{"error": ...}` into a typed error.
pub(crate) fn decode_response<T: DeserializeOwned>(method: &str, body: &[u8]) -> Result<T, VkError> {
    let decode_err = |source| VkError::Decode {
        method: method.to_string(),
        source,
    };
    let value: Value = serde_json::from_slice(body).map_err(decode_err)?;
    if value.get("error").is_some() {
        let envelope: ErrorEnvelope = serde_json::from_value(value).map_err(decode_err)?;
        tracing::debug!(
            method,
            code = envelope.error.error_code,
            "VK returned error: {}",
            envelope.error.error_msg
        );
        return Err(VkError::from_api(
            envelope.error.error_code,
            envelope.error.error_msg,
        ));
    }
    let envelope: Envelope<T> = serde_json::from_value(value).map_err(decode_err)?;
    Ok(envelope.response)
}
