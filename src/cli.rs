use clap::Parser;
use crate::types::*;

#[derive(Parser, Debug)]
#[command(
    name = "vkms-rs",
    about = "Keep a local music folder in sync with your VK audio library"
)]
pub struct Cli {
    /// Base directory; the library lands in a per-user folder inside it
    #[arg(short = 'd', long, default_value = ".")]
    pub directory: String,

    /// File the access token is saved to between runs
    #[arg(long, default_value = "~/.vkms-rs/token.json")]
    pub token_file: String,

    /// VK application id used for the OAuth flow
    #[arg(long, default_value = "4263245")]
    pub app_id: String,

    /// VK API version
    #[arg(long, default_value = crate::vk::DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Access token to use instead of the token file.
    /// WARNING: passing via --access-token is visible in process listings.
    /// Prefer the VK_ACCESS_TOKEN environment variable instead.
    #[arg(long, env = "VK_ACCESS_TOKEN", requires = "user_id")]
    pub access_token: Option<String>,

    /// Numeric user id the access token belongs to
    #[arg(long, env = "VK_USER_ID")]
    pub user_id: Option<String>,

    /// Only authenticate (obtain and save an access token)
    #[arg(long)]
    pub auth_only: bool,

    /// List remote albums and exit
    #[arg(short = 'l', long)]
    pub list_albums: bool,

    /// Log what would be downloaded or moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Pause before every move call, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub move_delay_ms: u64,

    /// Audio records fetched per catalog request
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..=6000))]
    pub page_size: u64,

    /// Max retries for a failing API call (0 disables)
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Initial retry delay in seconds
    #[arg(long, default_value_t = 2)]
    pub retry_delay: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
