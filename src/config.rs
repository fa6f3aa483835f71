//! Configuration file parser for `<config_dir>/lurk/config.toml` and the
//! on-disk layout of everything else lurk persists.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use crate::util::write_atomic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file rejected: {0}")]
    TooLarge(String),

    #[error("Could not determine the user's {0} directory")]
    NoHomeDir(&'static str),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings read from `config.toml`.
///
/// Every key is optional; omitted keys take the value from `Config::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instance used when neither `--url` nor a remembered instance exists.
    pub instance: Option<String>,

    /// Minutes between automatic topic refreshes.
    pub refresh_interval_minutes: u64,

    /// Pause between successive paginated requests.
    pub page_cooldown_ms: u64,

    /// Client-wide per-request timeout.
    pub request_timeout_secs: u64,

    /// Page cap for "load all".
    pub max_pages: usize,

    /// Encrypt the cookie file with a passphrase from `LURK_PASSPHRASE`.
    pub encrypt_session: bool,

    pub colors: ColorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: None,
            refresh_interval_minutes: 5,
            page_cooldown_ms: 500,
            request_timeout_secs: 10,
            max_pages: 10,
            encrypt_session: false,
            colors: ColorConfig::default(),
        }
    }
}

/// Hex colors for the UI roles, `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub title: String,
    pub item: String,
    pub selected: String,
    pub status: String,
    pub error: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            title: "#FF4444".to_string(),
            item: "#FF8888".to_string(),
            selected: "#FF0000".to_string(),
            status: "#CC0000".to_string(),
            error: "#FF0000".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "instance",
        "refresh_interval_minutes",
        "page_cooldown_ms",
        "request_timeout_secs",
        "max_pages",
        "encrypt_session",
        "colors",
    ];

    /// Read and parse `path`.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "{} bytes, limit is {}",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Where lurk keeps its files.
///
/// - config dir: `config.toml`, `cookies.txt`, `instance.txt`
/// - cache dir: `instances/<instance_key>/` and `logs/activity.log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Paths {
    pub fn new(config_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Platform defaults (`~/.config/lurk`, `~/.cache/lurk` on Linux).
    pub fn discover() -> Result<Self, ConfigError> {
        let config = dirs::config_dir().ok_or(ConfigError::NoHomeDir("config"))?;
        let cache = dirs::cache_dir().ok_or(ConfigError::NoHomeDir("cache"))?;
        Ok(Self::new(config.join("lurk"), cache.join("lurk")))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join("cookies.txt")
    }

    pub fn instance_file(&self) -> PathBuf {
        self.config_dir.join("instance.txt")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.join("instances")
    }

    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join("logs").join("activity.log")
    }

    /// Last instance that logged in successfully, if remembered.
    pub fn load_instance(&self) -> Option<String> {
        let path = self.instance_file();
        match std::fs::read_to_string(&path) {
            Ok(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read saved instance");
                None
            }
        }
    }

    pub fn save_instance(&self, base_url: &str) -> Result<(), ConfigError> {
        write_atomic(&self.instance_file(), base_url.as_bytes())?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.refresh_interval_minutes, 5);
        assert_eq!(config.page_cooldown_ms, 500);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.max_pages, 10);
        assert!(!config.encrypt_session);
        assert_eq!(config.colors.title, "#FF4444");
    }

    #[test]
    fn test_absent_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_blank_file_means_defaults() {
        let (_dir, path) = write_config("   \n  \n");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let (_dir, path) = write_config(
            r##"
instance = "meta.discourse.org"
page_cooldown_ms = 1200

[colors]
title = "#00FF00"
"##,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.instance.as_deref(), Some("meta.discourse.org"));
        assert_eq!(config.page_cooldown_ms, 1200);
        assert_eq!(config.refresh_interval_minutes, 5);
        assert_eq!(config.colors.title, "#00FF00");
        assert_eq!(config.colors.item, "#FF8888");
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let (_dir, path) = write_config("this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("not valid TOML"));
    }

    #[test]
    fn test_mistyped_value_is_parse_error() {
        let (_dir, path) = write_config("max_pages = \"many\"\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let (_dir, path) = write_config("max_pages = 3\ntotally_fake_key = 1\n");
        assert_eq!(Config::load(&path).unwrap().max_pages, 3);
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let (_dir, path) = write_config(&"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
    }

    #[test]
    fn test_paths_layout() {
        let paths = Paths::new("/cfg/lurk", "/cache/lurk");
        assert_eq!(paths.session_file(), PathBuf::from("/cfg/lurk/cookies.txt"));
        assert_eq!(paths.cache_root(), PathBuf::from("/cache/lurk/instances"));
        assert_eq!(
            paths.log_file(),
            PathBuf::from("/cache/lurk/logs/activity.log")
        );
    }

    #[test]
    fn test_instance_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("cfg"), dir.path().join("cache"));
        assert_eq!(paths.load_instance(), None);

        paths.save_instance("https://forum.example.com").unwrap();
        assert_eq!(
            paths.load_instance().as_deref(),
            Some("https://forum.example.com")
        );
    }
}
