use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::vk::{join_ids, VkError};

use super::reconcile::MoveGroups;
use super::registry::{AlbumRegistry, NO_ALBUM};
use super::remote::AlbumService;

/// Flood-control pause before every move call.
pub const DEFAULT_MOVE_DELAY: Duration = Duration::from_secs(1);

/// A move call that did not go through. Aborts the run: continuing would
/// leave the remote album state unknown for the next diff.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("VK refused to move [{ids}] into album {album_id} ('{title}')")]
    Rejected {
        album_id: i64,
        title: String,
        ids: String,
    },

    #[error("Moving [{ids}] into album {album_id} ('{title}') failed: {source}")]
    Api {
        album_id: i64,
        title: String,
        ids: String,
        #[source]
        source: VkError,
    },
}

/// Why a group was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Files sit directly under the root and VK has no "remove from album"
    /// call to mirror that.
    NoAlbumTitle,
    /// `audio.addAlbum` answered with the no-album sentinel.
    CreateRefused,
    CreateFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAlbumTitle => write!(f, "no album to move into"),
            Self::CreateRefused => write!(f, "album creation was refused"),
            Self::CreateFailed(e) => write!(f, "album creation failed: {}", e),
        }
    }
}

/// Result of applying one move group.
#[derive(Debug)]
pub enum GroupOutcome {
    Moved { album_id: i64, count: usize },
    /// Dry run: what would have been sent. `album_id` is `None` when the
    /// album would have been created first.
    Planned { album_id: Option<i64>, count: usize },
    Skipped(SkipReason),
    Fatal(MoveError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MoveSummary {
    pub moved_groups: usize,
    pub moved_audios: usize,
    pub planned_audios: usize,
    pub created_albums: usize,
    pub skipped_groups: usize,
}

/// Applies move groups against the remote album list, creating albums on
/// demand. Owns the registry borrow for the duration of the pass so every
/// creation is visible to later groups.
pub struct AlbumMover<'a, S: AlbumService + ?Sized> {
    service: &'a S,
    registry: &'a mut AlbumRegistry,
    delay: Duration,
    dry_run: bool,
    created: usize,
}

impl<'a, S: AlbumService + ?Sized> AlbumMover<'a, S> {
    pub fn new(service: &'a S, registry: &'a mut AlbumRegistry, delay: Duration, dry_run: bool) -> Self {
        Self {
            service,
            registry,
            delay,
            dry_run,
            created: 0,
        }
    }

    /// Id for `title`, creating the album when it is unknown.
    /// `Ok(None)` only happens in a dry run for an album that does not exist yet.
    async fn resolve_album(&mut self, title: &str) -> Result<Option<i64>, SkipReason> {
        if title.is_empty() {
            return Err(SkipReason::NoAlbumTitle);
        }
        if let Some(id) = self.registry.resolve(title) {
            return Ok(Some(id));
        }
        if self.dry_run {
            tracing::info!("[DRY RUN] Would create album '{}'", title);
            return Ok(None);
        }

        match self.service.create_album(title).await {
            Ok(NO_ALBUM) => Err(SkipReason::CreateRefused),
            Ok(id) => {
                tracing::info!(album_id = id, "Created album '{}'", title);
                self.registry.register(title, id);
                self.created += 1;
                Ok(Some(id))
            }
            Err(e) => Err(SkipReason::CreateFailed(e.to_string())),
        }
    }

    /// Move every id in `ids` into the album titled `title`.
    pub async fn move_group(&mut self, title: &str, ids: &BTreeSet<i64>) -> GroupOutcome {
        let album_id = match self.resolve_album(title).await {
            Ok(id) => id,
            Err(reason) => return GroupOutcome::Skipped(reason),
        };
        let ids: Vec<i64> = ids.iter().copied().collect();

        let album_id = match album_id {
            Some(id) if !self.dry_run => id,
            album_id => {
                return GroupOutcome::Planned {
                    album_id,
                    count: ids.len(),
                }
            }
        };

        tokio::time::sleep(self.delay).await;
        match self.service.move_to_album(album_id, &ids).await {
            Ok(true) => GroupOutcome::Moved {
                album_id,
                count: ids.len(),
            },
            Ok(false) => GroupOutcome::Fatal(MoveError::Rejected {
                album_id,
                title: title.to_string(),
                ids: join_ids(&ids),
            }),
            Err(source) => GroupOutcome::Fatal(MoveError::Api {
                album_id,
                title: title.to_string(),
                ids: join_ids(&ids),
                source,
            }),
        }
    }

    /// Apply every group, stopping at the first fatal move.
    pub async fn apply(mut self, groups: &MoveGroups) -> Result<MoveSummary, MoveError> {
        let mut summary = MoveSummary::default();

        for (title, ids) in groups {
            match self.move_group(title, ids).await {
                GroupOutcome::Moved { album_id, count } => {
                    tracing::info!(album_id, "Moved {} audio(s) into '{}'", count, title);
                    summary.moved_groups += 1;
                    summary.moved_audios += count;
                }
                GroupOutcome::Planned { album_id, count } => {
                    match album_id {
                        Some(id) => tracing::info!(
                            "[DRY RUN] Would move {} audio(s) into '{}' ({})",
                            count,
                            title,
                            id
                        ),
                        None => tracing::info!(
                            "[DRY RUN] Would move {} audio(s) into new album '{}'",
                            count,
                            title
                        ),
                    }
                    summary.planned_audios += count;
                }
                GroupOutcome::Skipped(reason) => {
                    tracing::warn!(
                        "Skipping {} audio(s) for album '{}': {}",
                        ids.len(),
                        title,
                        reason
                    );
                    summary.skipped_groups += 1;
                }
                GroupOutcome::Fatal(e) => return Err(e),
            }
        }

        summary.created_albums = self.created;
        Ok(summary)
    }
}
