//! One sync pass: diff the remote audio list against the local tree,
//! download what is missing or changed, then bring remote album
//! assignments in line with the local folder layout.
//!
//! Everything runs sequentially. The album registry is owned by the pass
//! and threaded through the mover by `&mut`, so an album created for one
//! group is visible to every later group.

pub mod catalog;
pub mod inventory;
pub mod mover;
pub mod paths;
pub mod reconcile;
pub mod registry;
pub mod remote;

#[cfg(test)]
pub(crate) mod testing;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::download::ContentFetcher;

use inventory::LocalInventory;
use mover::{AlbumMover, MoveSummary};
use registry::AlbumRegistry;
use remote::{AlbumService, CatalogSource};

/// Settings for a sync pass, decoupled from CLI parsing.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Per-user library folder everything is mirrored into.
    pub root: PathBuf,
    pub page_size: u64,
    pub move_delay: Duration,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub remote_audios: usize,
    pub local_files: usize,
    pub downloaded: usize,
    pub failed: Vec<PathBuf>,
    pub planned_downloads: usize,
    pub unchanged: usize,
    pub moves: MoveSummary,
}

/// Progress bar for the classification pass.
///
/// Hidden when the user passed `--no-progress-bar` or stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Run one full pass. Failing to read the album list or the catalog aborts
/// before anything is touched; a rejected move aborts mid-way. Individual
/// download failures are counted in the summary and do not fail the pass.
pub async fn run_sync<R, F>(remote: &R, fetcher: &F, config: &SyncConfig) -> Result<SyncSummary>
where
    R: CatalogSource + AlbumService + ?Sized,
    F: ContentFetcher + ?Sized,
{
    let started = Instant::now();

    let albums = remote.albums().await.context("Failed to fetch album list")?;
    let mut registry = AlbumRegistry::from_albums(albums);
    tracing::info!("{} remote albums", registry.len());

    let records = catalog::fetch_catalog(remote, &registry, &config.root, config.page_size)
        .await
        .context("Failed to fetch audio list")?;
    tracing::info!("{} remote audios", records.len());

    let root = config.root.clone();
    let inventory = tokio::task::spawn_blocking(move || LocalInventory::scan(&root))
        .await
        .context("Local scan task panicked")?;
    if inventory.is_empty() {
        tracing::info!("No local files under {}", config.root.display());
    } else {
        tracing::info!("{} local files under {}", inventory.len(), config.root.display());
    }

    let pb = create_progress_bar(config.no_progress_bar, records.len() as u64);
    let report = reconcile::reconcile(&records, &inventory, fetcher, config.dry_run, &pb).await;
    pb.finish_and_clear();

    if !report.moves.is_empty() {
        tracing::info!(
            "Reassigning {} audio(s) across {} album(s)",
            report.pending_moves(),
            report.moves.len()
        );
    }
    let moves = AlbumMover::new(remote, &mut registry, config.move_delay, config.dry_run)
        .apply(&report.moves)
        .await?;

    let summary = SyncSummary {
        remote_audios: records.len(),
        local_files: inventory.len(),
        downloaded: report.downloaded,
        failed: report.failed,
        planned_downloads: report.planned_downloads,
        unchanged: report.unchanged,
        moves,
    };
    log_summary(&summary, config, started.elapsed());
    Ok(summary)
}

fn log_summary(summary: &SyncSummary, config: &SyncConfig, elapsed: Duration) {
    if config.dry_run {
        tracing::info!("── Dry Run Summary ──");
        tracing::info!("  {} files would be downloaded", summary.planned_downloads);
        tracing::info!("  {} audios would be moved", summary.moves.planned_audios);
        tracing::info!("  destination: {}", config.root.display());
        return;
    }

    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} remote audios, {} local files",
        summary.remote_audios,
        summary.local_files
    );
    tracing::info!(
        "  {} downloaded, {} failed, {} up to date",
        summary.downloaded,
        summary.failed.len(),
        summary.unchanged
    );
    tracing::info!(
        "  {} moved into {} album(s), {} album(s) created, {} group(s) skipped",
        summary.moves.moved_audios,
        summary.moves.moved_groups,
        summary.moves.created_albums,
        summary.moves.skipped_groups
    );
    tracing::info!("  elapsed: {}", format_duration(elapsed));
    for path in &summary.failed {
        tracing::error!("Download failed: {}", path.display());
    }
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
