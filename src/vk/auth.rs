//! Access-token lifecycle: load a saved token, fall back to VK's implicit
//! OAuth flow (the user pastes the redirect URL back into the terminal),
//! validate the token against the API and persist it for the next run.

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use super::{VkClient, VkError};
use crate::retry::RetryConfig;

pub const OAUTH_AUTHORIZE_URL: &str = "https://oauth.vk.com/authorize";
pub const OAUTH_REDIRECT_URI: &str = "https://oauth.vk.com/blank.html";
pub const PERMISSIONS: &str = "audio";

/// Validation attempts before giving up on obtaining a working token.
const MAX_TOKEN_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Redirect URL has no {0}")]
    MissingField(&'static str),

    #[error("Cannot parse redirect URL: {0}")]
    InvalidRedirect(#[from] url::ParseError),

    #[error("Failed to obtain a valid access token after {0} attempts")]
    NoValidToken(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A VK access token and the user it belongs to.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            saved_at: None,
        }
    }
}

/// Parameters for obtaining a token.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub app_id: String,
    pub api_version: String,
    pub token_file: std::path::PathBuf,
    pub retry: RetryConfig,
}

/// Build the implicit-flow authorize URL the user has to open in a browser.
pub fn authorize_url(app_id: &str, version: &str) -> String {
    let params = [
        ("client_id", app_id),
        ("scope", PERMISSIONS),
        ("redirect_uri", OAUTH_REDIRECT_URI),
        ("display", "page"),
        ("v", version),
        ("response_type", "token"),
    ];
    match url::Url::parse_with_params(OAUTH_AUTHORIZE_URL, &params) {
        Ok(url) => url.to_string(),
        // The base URL is a constant, parsing it cannot fail.
        Err(_) => OAUTH_AUTHORIZE_URL.to_string(),
    }
}

/// Extract the token from the URL VK redirected to. The token travels in
/// the fragment (`blank.html#access_token=...&user_id=...`).
pub fn parse_redirect(line: &str) -> Result<Credentials, AuthError> {
    let url = url::Url::parse(line.trim())?;
    let fragment = url.fragment().or(url.query()).unwrap_or_default();

    let mut token = None;
    let mut user_id = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => token = Some(value.into_owned()),
            "user_id" => user_id = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(Credentials::new(
        token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingField("access_token"))?,
        user_id.filter(|u| !u.is_empty()).ok_or(AuthError::MissingField("user_id"))?,
    ))
}

/// Load saved credentials. A missing file is `Ok(None)`; a corrupt one is
/// logged and treated as missing.
pub async fn load_credentials(path: &Path) -> Result<Option<Credentials>, AuthError> {
    let contents = match fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("No saved token at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<Credentials>(&contents) {
        Ok(creds) => {
            tracing::debug!("Loaded token from {}", path.display());
            Ok(Some(creds))
        }
        Err(e) => {
            tracing::warn!("Token file {} is corrupt, ignoring: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Persist credentials, readable by the owner only.
pub async fn save_credentials(path: &Path, credentials: &Credentials) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut stamped = credentials.clone();
    stamped.saved_at = Some(Utc::now());
    fs::write(path, serde_json::to_string_pretty(&stamped)?).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    tracing::debug!("Saved token to {}", path.display());
    Ok(())
}

/// Walk the user through the browser flow and read the redirect URL back.
async fn prompt_for_credentials(app_id: &str, version: &str) -> anyhow::Result<Credentials> {
    let url = authorize_url(app_id, version);
    let line = tokio::task::spawn_blocking(move || {
        println!("Please visit this URL to authorize the application:\n  {}", url);
        print!("Paste here the URL that you were redirected to: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok::<String, io::Error>(line)
    })
    .await??;
    Ok(parse_redirect(&line)?)
}

/// The two steps of obtaining a token that talk to the outside world.
#[async_trait::async_trait]
trait Login: Send + Sync {
    /// Ask VK whether `credentials` work; returns the user's audio count.
    async fn check(&self, credentials: &Credentials) -> Result<u64, VkError>;

    /// Obtain fresh credentials from the user.
    async fn relogin(&self) -> anyhow::Result<Credentials>;
}

struct InteractiveLogin<'a> {
    http: reqwest::Client,
    config: &'a AuthConfig,
}

#[async_trait::async_trait]
impl Login for InteractiveLogin<'_> {
    async fn check(&self, credentials: &Credentials) -> Result<u64, VkError> {
        VkClient::new(
            self.http.clone(),
            credentials.clone(),
            self.config.api_version.clone(),
            self.config.retry,
        )
        .audio_get_count()
        .await
    }

    async fn relogin(&self) -> anyhow::Result<Credentials> {
        prompt_for_credentials(&self.config.app_id, &self.config.api_version).await
    }
}

/// Check `credentials` up to [`MAX_TOKEN_ATTEMPTS`] times. An expired token
/// is replaced through `relogin`, except on the last attempt where the new
/// token could no longer be checked.
async fn validate<L: Login + ?Sized>(
    login: &L,
    mut credentials: Credentials,
) -> anyhow::Result<(Credentials, u64)> {
    for attempt in 1..=MAX_TOKEN_ATTEMPTS {
        match login.check(&credentials).await {
            Ok(count) => return Ok((credentials, count)),
            Err(VkError::TokenExpired) if attempt < MAX_TOKEN_ATTEMPTS => {
                tracing::warn!("Access token rejected, requesting a new one");
                credentials = login.relogin().await?;
            }
            Err(e) => {
                tracing::warn!("Token check {}/{} failed: {}", attempt, MAX_TOKEN_ATTEMPTS, e);
            }
        }
    }

    Err(AuthError::NoValidToken(MAX_TOKEN_ATTEMPTS).into())
}

/// Produce an API client with a token VK accepts.
///
/// Tries, in order: `preset` credentials, the token file, the interactive
/// flow. A token rejected as expired triggers a fresh interactive login.
/// The working token is written back to the token file.
pub async fn authenticate(
    http: reqwest::Client,
    config: &AuthConfig,
    preset: Option<Credentials>,
) -> anyhow::Result<VkClient> {
    let credentials = match preset {
        Some(c) => c,
        None => match load_credentials(&config.token_file).await? {
            Some(c) => c,
            None => prompt_for_credentials(&config.app_id, &config.api_version).await?,
        },
    };

    let login = InteractiveLogin {
        http: http.clone(),
        config,
    };
    let (credentials, count) = validate(&login, credentials).await?;
    tracing::info!(user_id = %credentials.user_id, count, "Access token accepted");
    if let Err(e) = save_credentials(&config.token_file, &credentials).await {
        tracing::warn!(
            "Could not save token to {}: {}",
            config.token_file.display(),
            e
        );
    }

    Ok(VkClient::new(
        http,
        credentials,
        config.api_version.clone(),
        config.retry,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_authorize_url_carries_flow_params() {
        let url = authorize_url("4263245", "5.16");
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "4263245");
        assert_eq!(pairs["scope"], "audio");
        assert_eq!(pairs["redirect_uri"], OAUTH_REDIRECT_URI);
        assert_eq!(pairs["response_type"], "token");
        assert_eq!(pairs["v"], "5.16");
    }

    #[test]
    fn test_parse_redirect_fragment() {
        let creds = parse_redirect(
            "https://oauth.vk.com/blank.html#access_token=abc123&expires_in=86400&user_id=42\r\n",
        )
        .unwrap();
        assert_eq!(creds.token, "abc123");
        assert_eq!(creds.user_id, "42");
    }

    #[test]
    fn test_parse_redirect_missing_token() {
        let err = parse_redirect("https://oauth.vk.com/blank.html#error=access_denied").unwrap_err();
        assert!(matches!(err, AuthError::MissingField("access_token")));
    }

    #[test]
    fn test_parse_redirect_not_a_url() {
        assert!(matches!(
            parse_redirect("just some text").unwrap_err(),
            AuthError::InvalidRedirect(_)
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let debug = format!("{:?}", Credentials::new("hunter2", "7"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        save_credentials(&path, &Credentials::new("tok", "99")).await.unwrap();

        let loaded = load_credentials(&path).await.unwrap().unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.user_id, "99");
        assert!(loaded.saved_at.is_some());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_credentials(&dir.path().join("absent.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_credentials(&path).await.unwrap().is_none());
    }

    /// Accepts only `accepted`; every relogin hands out `fresh`.
    struct ScriptedLogin {
        accepted: Option<&'static str>,
        fresh: &'static str,
        checked: Mutex<Vec<String>>,
        relogins: AtomicUsize,
    }

    impl ScriptedLogin {
        fn new(accepted: Option<&'static str>, fresh: &'static str) -> Self {
            Self {
                accepted,
                fresh,
                checked: Mutex::new(Vec::new()),
                relogins: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Login for ScriptedLogin {
        async fn check(&self, credentials: &Credentials) -> Result<u64, VkError> {
            self.checked.lock().unwrap().push(credentials.token.clone());
            if Some(credentials.token.as_str()) == self.accepted {
                Ok(5)
            } else {
                Err(VkError::TokenExpired)
            }
        }

        async fn relogin(&self) -> anyhow::Result<Credentials> {
            self.relogins.fetch_add(1, Ordering::SeqCst);
            Ok(Credentials::new(self.fresh, "42"))
        }
    }

    #[tokio::test]
    async fn test_expired_token_replaced_by_relogin() {
        let login = ScriptedLogin::new(Some("fresh"), "fresh");
        let (credentials, count) = validate(&login, Credentials::new("stale", "42"))
            .await
            .unwrap();
        assert_eq!(credentials.token, "fresh");
        assert_eq!(count, 5);
        assert_eq!(*login.checked.lock().unwrap(), vec!["stale", "fresh"]);
        assert_eq!(login.relogins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_relogin_after_last_check() {
        let login = ScriptedLogin::new(None, "fresh");
        let err = validate(&login, Credentials::new("stale", "42"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::NoValidToken(MAX_TOKEN_ATTEMPTS))
        ));
        // Every token obtained was checked before giving up.
        assert_eq!(login.checked.lock().unwrap().len(), MAX_TOKEN_ATTEMPTS as usize);
        assert_eq!(
            login.relogins.load(Ordering::SeqCst),
            MAX_TOKEN_ATTEMPTS as usize - 1
        );
    }
}
