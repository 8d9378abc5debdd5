use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::download::ContentFetcher;

use super::catalog::AudioRecord;
use super::inventory::LocalInventory;

/// Audio ids to reassign, keyed by the album title they should end up in.
pub type MoveGroups = BTreeMap<String, BTreeSet<i64>>;

/// Where the local copy of a remote record stands, before sizes are
/// compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMatch<'a> {
    /// No local copy anywhere under the root.
    Absent,
    /// Local copy filed under the same album as the remote record.
    Matching { path: &'a Path },
    /// Local copy in a folder naming a different album.
    Mismatched { path: &'a Path, local_album: &'a str },
}

pub fn locate<'a>(inventory: &'a LocalInventory, record: &AudioRecord) -> LocalMatch<'a> {
    match inventory.find(&record.target_path) {
        None => LocalMatch::Absent,
        Some(entry) if entry.album == record.album_title => LocalMatch::Matching { path: entry.path },
        Some(entry) => LocalMatch::Mismatched {
            path: entry.path,
            local_album: entry.album,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReason {
    Missing,
    SizeMismatch {
        remote: Option<u64>,
        local: Option<u64>,
    },
}

/// What a single record needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Download {
        id: i64,
        url: String,
        path: PathBuf,
        reason: DownloadReason,
    },
    /// Reassign the remote record to the album its local folder names.
    Move { id: i64, album: String },
    Keep { id: i64 },
}

/// Decide what `record` needs.
///
/// A missing record is fetched to its target path. A local copy whose size
/// differs (an unknown size counts as different) is overwritten where it
/// lies, and placement is left for a later run. Only a size-identical copy
/// is checked for album placement.
pub async fn classify<F: ContentFetcher + ?Sized>(
    record: &AudioRecord,
    inventory: &LocalInventory,
    fetcher: &F,
) -> Action {
    let (path, local_album) = match locate(inventory, record) {
        LocalMatch::Absent => {
            return Action::Download {
                id: record.id,
                url: record.url.clone(),
                path: record.target_path.clone(),
                reason: DownloadReason::Missing,
            }
        }
        LocalMatch::Matching { path } => (path, None),
        LocalMatch::Mismatched { path, local_album } => (path, Some(local_album)),
    };

    let remote = fetcher.remote_size(&record.url).await;
    let local = fetcher.local_size(path).await;
    if remote.is_none() || local.is_none() || remote != local {
        return Action::Download {
            id: record.id,
            url: record.url.clone(),
            path: path.to_path_buf(),
            reason: DownloadReason::SizeMismatch { remote, local },
        };
    }

    match local_album {
        Some(album) => Action::Move {
            id: record.id,
            album: album.to_string(),
        },
        None => Action::Keep { id: record.id },
    }
}

/// Result of one classification pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub downloaded: usize,
    pub failed: Vec<PathBuf>,
    /// Downloads a dry run would have performed.
    pub planned_downloads: usize,
    pub unchanged: usize,
    pub moves: MoveGroups,
}

impl ReconcileReport {
    pub fn pending_moves(&self) -> usize {
        self.moves.values().map(BTreeSet::len).sum()
    }
}

/// Classify every record in catalog order, downloading as it goes and
/// collecting moves for the album pass. A failed download is logged and
/// left for the next run.
pub async fn reconcile<F: ContentFetcher + ?Sized>(
    records: &[AudioRecord],
    inventory: &LocalInventory,
    fetcher: &F,
    dry_run: bool,
    pb: &ProgressBar,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for record in records {
        pb.set_message(record.display_name());
        match classify(record, inventory, fetcher).await {
            Action::Download {
                url, path, reason, ..
            } => {
                match &reason {
                    DownloadReason::Missing => pb.suspend(|| {
                        tracing::info!("Missing locally: {}", record.display_name())
                    }),
                    DownloadReason::SizeMismatch { remote, local } => pb.suspend(|| {
                        tracing::info!(
                            ?remote,
                            ?local,
                            "Size differs: {}",
                            record.display_name()
                        )
                    }),
                }
                if dry_run {
                    pb.suspend(|| tracing::info!("[DRY RUN] Would download {}", path.display()));
                    report.planned_downloads += 1;
                } else {
                    match fetcher.fetch(&url, &path).await {
                        Ok(()) => report.downloaded += 1,
                        Err(e) => {
                            pb.suspend(|| {
                                if e.is_transient() {
                                    tracing::warn!("Download failed, will retry next run: {}", e);
                                } else {
                                    tracing::error!("Download failed: {}", e);
                                }
                            });
                            report.failed.push(path);
                        }
                    }
                }
            }
            Action::Move { id, album } => {
                pb.suspend(|| {
                    tracing::info!(
                        local = %album,
                        remote = %record.album_title,
                        "Present locally under a different album: {}",
                        record.display_name()
                    )
                });
                report.moves.entry(album).or_default().insert(id);
            }
            Action::Keep { .. } => {
                tracing::debug!(
                    album_id = record.album_id,
                    duration = record.duration,
                    "Up to date: {}",
                    record.display_name()
                );
                report.unchanged += 1;
            }
        }
        pb.inc(1);
    }

    report
}
