//! vkms-rs: keeps a local music folder in step with a VK audio library.
//!
//! Audio missing locally (or whose size differs) is downloaded; audio that
//! is present but filed under a different folder has its remote album
//! switched to match. The local folder layout is authoritative for albums,
//! the remote copy is authoritative for content.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
pub mod retry;
mod sync;
mod types;
mod vk;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sync::registry::AlbumRegistry;

/// Timeout for a single HTTP request, API call or audio transfer.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("vkms-rs/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Print the remote album titles, one per line.
async fn run_list_albums(client: &vk::VkClient) -> anyhow::Result<()> {
    let registry = AlbumRegistry::from_albums(client.audio_get_albums().await?);
    println!("Albums:");
    for title in registry.titles() {
        println!("  {}", title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Starting vkms-rs");

    let http = build_http_client()?;
    let client = vk::auth::authenticate(http.clone(), &config.auth(), config.preset.clone()).await?;

    if config.auth_only {
        tracing::info!("Authentication completed successfully");
        return Ok(());
    }

    if config.list_albums {
        return run_list_albums(&client).await;
    }

    let requested = format!("id{}", client.user_id());
    let user = client
        .users_get(&requested)
        .await
        .context("Failed to look up the account owner")?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("users.get returned nothing for {}", requested))?;
    let root = config.directory.join(user.library_label(&requested));
    tracing::info!("Syncing into {}", root.display());

    let fetcher = download::HttpFetcher::new(http);
    let summary = sync::run_sync(&client, &fetcher, &config.sync(root)).await?;

    if !summary.failed.is_empty() {
        anyhow::bail!(
            "{} of {} downloads failed",
            summary.failed.len(),
            summary.failed.len() + summary.downloaded
        );
    }

    Ok(())
}
