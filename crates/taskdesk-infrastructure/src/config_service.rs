//! Configuration service implementation.
//!
//! Loads [`ClientConfig`] from `config.toml` under the Taskdesk root, applies
//! `TASKDESK_*` environment overrides and caches the result.

use crate::paths::TaskdeskPaths;
use crate::storage::{AtomicFile, FileFormat};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use taskdesk_core::config::ClientConfig;
use taskdesk_core::{Result, TaskdeskError};

pub const ENV_API_URL: &str = "TASKDESK_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "TASKDESK_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_SECS: &str = "TASKDESK_POLL_INTERVAL_SECS";
pub const ENV_CREDENTIALS_PATH: &str = "TASKDESK_CREDENTIALS_PATH";

/// Configuration service that loads and caches the client configuration.
#[derive(Clone)]
pub struct ConfigService {
    paths: TaskdeskPaths,
    file: Arc<AtomicFile<ClientConfig>>,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    pub fn new(paths: TaskdeskPaths) -> Self {
        let file = AtomicFile::new(paths.config_file(), FileFormat::Toml);
        Self {
            paths,
            file: Arc::new(file),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &TaskdeskPaths {
        &self.paths
    }

    /// Gets the configuration, loading it on first access.
    ///
    /// A missing file yields the defaults; the file is never created here.
    pub fn get_config(&self) -> Result<ClientConfig> {
        if let Ok(guard) = self.config.read() {
            if let Some(cached) = guard.as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_with(|key| std::env::var(key).ok())?;

        if let Ok(mut guard) = self.config.write() {
            *guard = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.config.write() {
            *guard = None;
        }
    }

    /// Reads the file and applies overrides from `lookup` without caching.
    pub fn load_with<F>(&self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.file.load()?.unwrap_or_default();
        apply_overrides(&mut config, lookup)?;
        config.validate()?;

        tracing::debug!(
            path = %self.file.path().display(),
            api_base_url = %config.api_base_url,
            "Loaded client configuration"
        );
        Ok(config)
    }

    /// Writes the default configuration. An existing file is kept unless
    /// `overwrite` is set.
    ///
    /// Returns the path of the config file and whether it was written.
    pub fn init_default(&self, overwrite: bool) -> Result<(PathBuf, bool)> {
        let path = self.file.path().to_path_buf();
        if path.exists() && !overwrite {
            return Ok((path, false));
        }
        self.file.save(&ClientConfig::default())?;
        self.invalidate_cache();
        tracing::info!(path = %path.display(), "Wrote default configuration");
        Ok((path, true))
    }

    /// Credentials file for `config`: the configured override or the default
    /// location under the Taskdesk root.
    pub fn credentials_path(&self, config: &ClientConfig) -> PathBuf {
        config
            .credentials_path
            .clone()
            .unwrap_or_else(|| self.paths.credentials_file())
    }
}

fn apply_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = value(ENV_API_URL) {
        config.api_base_url = url;
    }
    if let Some(raw) = value(ENV_TIMEOUT_SECS) {
        config.request_timeout_secs = parse_secs(ENV_TIMEOUT_SECS, &raw)?;
    }
    if let Some(raw) = value(ENV_POLL_INTERVAL_SECS) {
        config.notification_poll_interval_secs = parse_secs(ENV_POLL_INTERVAL_SECS, &raw)?;
    }
    if let Some(path) = value(ENV_CREDENTIALS_PATH) {
        config.credentials_path = Some(PathBuf::from(path));
    }
    Ok(())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| TaskdeskError::config(format!("{key} must be a whole number of seconds, got '{raw}'")))
}
