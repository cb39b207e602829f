//! Runtime settings.
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! environment variables. The file lives at `AUSDEX_CONFIG` if set, otherwise
//! at `{config_dir}/ausdex/config.toml`:
//!
//! ```toml
//! cache-dir = "/data/ausdex"
//! abs-base-url = "https://www.abs.gov.au/statistics/economy/price-indexes-and-inflation/consumer-price-index-australia"
//! download-retries = 3
//! request-timeout-secs = 30
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Overrides the cache directory
pub const CACHE_DIR_ENV: &str = "AUSDEX_CACHE_DIR";
/// Overrides the base URL of the ABS CPI release pages
pub const ABS_BASE_URL_ENV: &str = "AUSDEX_ABS_BASE_URL";
/// Points at an alternative configuration file
pub const CONFIG_ENV: &str = "AUSDEX_CONFIG";

/// Where the ABS publishes each quarterly CPI release
pub const DEFAULT_ABS_BASE_URL: &str = "https://www.abs.gov.au/statistics/economy/price-indexes-and-inflation/consumer-price-index-australia";
/// Attempts per download, including the first
pub const DEFAULT_DOWNLOAD_RETRIES: u32 = 5;
/// Per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const APP_DIR_NAME: &str = "ausdex";
const CONFIG_FILENAME: &str = "config.toml";

/// Contents of the optional configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SettingsFile {
    cache_dir: Option<PathBuf>,
    abs_base_url: Option<String>,
    download_retries: Option<u32>,
    request_timeout_secs: Option<u64>,
}

/// Resolved settings used by downloads and caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory for downloaded workbooks, datasets and figures
    pub cache_dir: PathBuf,
    /// Base URL of the ABS CPI release pages
    pub abs_base_url: String,
    /// Attempts per download, including the first
    pub download_retries: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Load settings from the configuration file and the process environment.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let file = match config_path(&env) {
            Some(path) => read_settings_file(&path)?,
            None => SettingsFile::default(),
        };
        Self::resolve(file, env)
    }

    /// Default settings rooted at an explicit cache directory.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            abs_base_url: DEFAULT_ABS_BASE_URL.to_string(),
            download_retries: DEFAULT_DOWNLOAD_RETRIES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    fn resolve(file: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cache_dir = match env(CACHE_DIR_ENV).map(PathBuf::from).or(file.cache_dir) {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };

        let mut settings = Self::with_cache_dir(cache_dir);
        if let Some(url) = env(ABS_BASE_URL_ENV).or(file.abs_base_url) {
            settings.abs_base_url = url;
        }
        if let Some(retries) = file.download_retries {
            if retries == 0 {
                return Err(Error::Config(
                    "download-retries must be at least 1".to_string(),
                ));
            }
            settings.download_retries = retries;
        }
        if let Some(timeout) = file.request_timeout_secs {
            settings.request_timeout_secs = timeout;
        }
        Ok(settings)
    }

    /// Path of `filename` inside the cache directory, creating the directory.
    ///
    /// The file itself may or may not exist.
    pub fn cached_path(&self, filename: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)?;
        Ok(self.cache_dir.join(filename))
    }
}

/// The user's cache directory (`~/.cache/ausdex` on Linux)
fn default_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| Error::Config("Could not determine a cache directory".to_string()))
}

fn config_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    env(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILENAME)))
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("Failed to read {}: {err}", path.display()))
    })?;
    toml::from_str(&contents)
        .map_err(|err| Error::Config(format!("Failed to parse {}: {err}", path.display())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let settings = Settings::resolve(SettingsFile::default(), env_from(&[])).unwrap();
        assert!(settings.cache_dir.ends_with(APP_DIR_NAME));
        assert_eq!(settings.abs_base_url, DEFAULT_ABS_BASE_URL);
        assert_eq!(settings.download_retries, DEFAULT_DOWNLOAD_RETRIES);
    }

    #[test]
    fn test_env_overrides_file() {
        let file: SettingsFile = toml::from_str(
            r#"
            cache-dir = "/from/file"
            abs-base-url = "http://file.example"
            download-retries = 2
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(
            file,
            env_from(&[(CACHE_DIR_ENV, "/from/env"), (ABS_BASE_URL_ENV, "http://env.example")]),
        )
        .unwrap();
        assert_eq!(settings.cache_dir, PathBuf::from("/from/env"));
        assert_eq!(settings.abs_base_url, "http://env.example");
        assert_eq!(settings.download_retries, 2);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let file: SettingsFile = toml::from_str("download-retries = 0").unwrap();
        let err = Settings::resolve(file, env_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "cache_size = 3\n").unwrap();
        assert!(matches!(read_settings_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let file = read_settings_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert!(file.cache_dir.is_none());
    }

    #[test]
    fn test_cached_path_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::with_cache_dir(temp_dir.path().join("nested").join("cache"));
        let path = settings.cached_path("640101-jun-2021.xls").unwrap();
        assert!(settings.cache_dir.is_dir());
        assert!(!path.exists());
        assert!(path.ends_with("640101-jun-2021.xls"));
    }
}
