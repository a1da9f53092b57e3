use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// PagerDuty REST API configuration
pub const PAGERDUTY_API_BASE: &str = "https://api.pagerduty.com";
pub const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";
pub const USER_AGENT: &str = concat!("pd-runners/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "PAGERDUTY_API_URL";
pub const ENV_TOKEN: &str = "PAGERDUTY_TOKEN";
pub const ENV_CONFIG_DIR: &str = "PD_RUNNERS_CONFIG_DIR";
pub const ENV_LOG: &str = "PAGERDUTY_LOG";

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: PAGERDUTY_API_BASE.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct StoredCredentials {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Config {
    /// Resolve settings: explicit flags, then environment, then the credentials file.
    pub fn resolve(api_url: Option<String>, token: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        Self::resolve_with(api_url, token, timeout_secs, |name| std::env::var(name).ok())
    }

    /// Same as [`Config::resolve`] with an explicit environment lookup.
    /// The credentials file is only read when a flag or variable left something unset.
    pub fn resolve_with<F>(
        api_url: Option<String>,
        token: Option<String>,
        timeout_secs: Option<u64>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = api_url.or_else(|| non_empty(env(ENV_API_URL)));
        let token = token.or_else(|| non_empty(env(ENV_TOKEN)));

        let stored = if api_url.is_none() || token.is_none() {
            let path = creds_path_with(&env)?;
            if path.exists() {
                Some(load_credentials_from(&path)?)
            } else {
                None
            }
        } else {
            None
        };
        Ok(Self::merge(api_url, token, timeout_secs, stored))
    }

    fn merge(
        api_url: Option<String>,
        token: Option<String>,
        timeout_secs: Option<u64>,
        stored: Option<StoredCredentials>,
    ) -> Self {
        let (stored_token, stored_url) = match stored {
            Some(c) => (Some(c.token), c.api_url),
            None => (None, None),
        };
        Self {
            api_url: api_url
                .or(stored_url)
                .unwrap_or_else(|| PAGERDUTY_API_BASE.to_string()),
            token: token.or(stored_token),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn save_credentials(creds: &StoredCredentials) -> Result<PathBuf> {
    let path = creds_path()?;
    save_credentials_to(&path, creds)?;
    Ok(path)
}

pub fn save_credentials_to(path: &Path, creds: &StoredCredentials) -> Result<()> {
    let io_err = |source| Error::CredentialsIo { path: path.to_path_buf(), source };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(creds).map_err(Error::Encode)?;
    fs::write(path, json).map_err(io_err)?;
    Ok(())
}

pub fn load_credentials_from(path: &Path) -> Result<StoredCredentials> {
    let data = fs::read(path).map_err(|source| Error::CredentialsIo { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&data).map_err(|source| Error::CredentialsParse { path: path.to_path_buf(), source })
}

pub fn creds_path() -> Result<PathBuf> {
    creds_path_with(|name| std::env::var(name).ok())
}

fn creds_path_with<F: Fn(&str) -> Option<String>>(env: F) -> Result<PathBuf> {
    if let Some(dir) = non_empty(env(ENV_CONFIG_DIR)) {
        return Ok(PathBuf::from(dir).join("credentials.json"));
    }
    let base = dirs::config_dir().ok_or(Error::NoConfigDir)?;
    Ok(base.join("pd-runners").join("credentials.json"))
}
