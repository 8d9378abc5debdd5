use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;
use crate::sync::SyncConfig;
use crate::vk::auth::{AuthConfig, Credentials};

/// Application configuration.
pub struct Config {
    pub directory: PathBuf,
    pub token_file: PathBuf,
    pub app_id: String,
    pub api_version: String,
    /// Token passed on the command line or via `VK_ACCESS_TOKEN`.
    pub preset: Option<Credentials>,

    pub move_delay: Duration,
    pub retry_delay_secs: u64,
    pub page_size: u64,
    pub max_retries: u32,


    pub auth_only: bool,
    pub list_albums: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("token_file", &self.token_file)
            .field("app_id", &self.app_id)
            .field("preset", &self.preset.as_ref().map(|_| "<redacted>"))
            .field("auth_only", &self.auth_only)
            .field("list_albums", &self.list_albums)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let preset = match (cli.access_token, cli.user_id) {
            (Some(token), Some(user_id)) => Some(Credentials::new(token, user_id)),
            (Some(_), None) => anyhow::bail!("An access token needs --user-id / VK_USER_ID"),
            _ => None,
        };

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            token_file: expand_tilde(&cli.token_file),
            app_id: cli.app_id,
            api_version: cli.api_version,
            preset,
            move_delay: Duration::from_millis(cli.move_delay_ms),
            retry_delay_secs: cli.retry_delay,
            page_size: cli.page_size,
            max_retries: cli.max_retries,
            auth_only: cli.auth_only,
            list_albums: cli.list_albums,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs(self.retry_delay_secs),
            ..RetryConfig::default()
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            app_id: self.app_id.clone(),
            api_version: self.api_version.clone(),
            token_file: self.token_file.clone(),
            retry: self.retry(),
        }
    }

    /// Settings for a sync pass into `root`, the per-user library folder.
    pub fn sync(&self, root: PathBuf) -> SyncConfig {
        SyncConfig {
            root,
            page_size: self.page_size,
            move_delay: self.move_delay,
            dry_run: self.dry_run,
            no_progress_bar: self.no_progress_bar,
        }
    }
}
