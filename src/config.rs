//! Configuration module for mirrorwatch.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MW_` and use double underscores
//! to separate nested levels:
//! - `MW_WATCH__FEEDBACK_WINDOW_MS=2000` sets `watch.feedback_window_ms`
//! - `MW_NOTIFY__ENDPOINT=10.0.0.5:29324` sets `notify.endpoint`
//! - `MW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sink::{DEFAULT_MAX_DATAGRAM_BYTES, Endpoint};
use crate::watcher::BackendOptions;

/// Directory holding the settings file, searched for from the cwd upwards.
pub const CONFIG_DIR: &str = ".mirrorwatch";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "MW_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Watch backend and timing
    #[serde(default)]
    pub watch: WatchConfig,

    /// Where notifications are sent
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backend observes the filesystem.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// inotify on Linux, FSEvents / kqueue on macOS and the BSDs
    #[default]
    Native,
    /// Periodic stat polling
    Poll,
    /// Observe nothing
    Null,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Poll => "poll",
            BackendKind::Null => "null",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// How long a path stays suppressed after it was announced
    #[serde(default = "default_feedback_window_ms")]
    pub feedback_window_ms: u64,

    /// How long to gather events after the first one of a burst
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,

    /// Maximum wait between stop checks (also the poll backend interval)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    /// Remote listener, `host[:port]`
    #[serde(default)]
    pub endpoint: Endpoint,

    /// Upper bound on a single datagram payload
    #[serde(default = "default_max_datagram_bytes")]
    pub max_datagram_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Level for all modules without an explicit entry
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `mirrorwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_feedback_window_ms() -> u64 {
    1000
}
fn default_batch_window_ms() -> u64 {
    50
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_max_datagram_bytes() -> usize {
    DEFAULT_MAX_DATAGRAM_BYTES
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            notify: NotifyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            feedback_window_ms: default_feedback_window_ms(),
            batch_window_ms: default_batch_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            max_datagram_bytes: default_max_datagram_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchConfig {
    pub fn feedback_window(&self) -> Duration {
        Duration::from_millis(self.feedback_window_ms)
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            batch_window: Duration::from_millis(self.batch_window_ms),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// The settings file is looked up from the current directory upwards.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, plus defaults and environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscores
            // stay part of the field name
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.mirrorwatch` directory.
    /// Searches from current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save as a commented settings file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_commented_toml())
    }

    /// Write the default settings file under the current directory.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn init_config_file(force: bool) -> io::Result<PathBuf> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "{} already exists, use --force to overwrite",
                    config_path.display()
                ),
            ));
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }

    /// Render these settings as TOML with a comment on every key.
    pub fn to_commented_toml(&self) -> String {
        let quote = |s: &str| toml::Value::String(s.to_string()).to_string();

        let mut out = format!(
            r#"# mirrorwatch settings
#
# Any key can be overridden from the environment: prefix it with {ENV_PREFIX}
# and separate levels with a double underscore, e.g.
#   {ENV_PREFIX}WATCH__BACKEND=poll
#   {ENV_PREFIX}NOTIFY__ENDPOINT=10.0.0.5:29324

version = {version}

[watch]
# "native" (inotify, FSEvents or kqueue), "poll" or "null"
backend = {backend}
# How long an announced path stays suppressed
feedback_window_ms = {feedback_window_ms}
# How long to keep gathering after the first event of a burst
batch_window_ms = {batch_window_ms}
# Longest wait between stop checks, also the scan period of "poll"
poll_interval_ms = {poll_interval_ms}

[notify]
# Remote listener as host[:port]; `watch -c` takes precedence
endpoint = {endpoint}
# Larger batches are split over several datagrams
max_datagram_bytes = {max_datagram_bytes}

[logging]
# RUST_LOG takes precedence over this section
default = {default_level}

[logging.modules]
"#,
            version = self.version,
            backend = quote(self.watch.backend.as_str()),
            feedback_window_ms = self.watch.feedback_window_ms,
            batch_window_ms = self.watch.batch_window_ms,
            poll_interval_ms = self.watch.poll_interval_ms,
            endpoint = quote(&self.notify.endpoint.to_string()),
            max_datagram_bytes = self.notify.max_datagram_bytes,
            default_level = quote(&self.logging.default),
        );

        let mut modules: Vec<_> = self.logging.modules.iter().collect();
        modules.sort();
        if modules.is_empty() {
            out.push_str("# \"mirrorwatch::watcher\" = \"debug\"\n");
        }
        for (module, level) in modules {
            out.push_str(&format!("{} = {}\n", quote(module), quote(level)));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watch.backend, BackendKind::Native);
        assert_eq!(settings.watch.feedback_window(), Duration::from_secs(1));
        assert_eq!(settings.notify.endpoint.to_string(), "127.0.0.1:29324");
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[watch]
backend = "poll"
batch_window_ms = 25

[notify]
endpoint = "10.1.2.3:4000"
max_datagram_bytes = 1400

[logging]
default = "info"

[logging.modules]
"mirrorwatch::sink" = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.watch.backend, BackendKind::Poll);
        assert_eq!(settings.watch.batch_window_ms, 25);
        assert_eq!(settings.notify.endpoint.host, "10.1.2.3");
        assert_eq!(settings.notify.endpoint.port, 4000);
        assert_eq!(settings.notify.max_datagram_bytes, 1400);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["mirrorwatch::sink"], "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        // Only specify a few settings
        let toml_content = r#"
[notify]
endpoint = "buildbox"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified values, host only keeps the default port
        assert_eq!(settings.notify.endpoint.host, "buildbox");
        assert_eq!(settings.notify.endpoint.port, 29324);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watch.poll_interval_ms, 100);
        assert_eq!(settings.notify.max_datagram_bytes, DEFAULT_MAX_DATAGRAM_BYTES);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[notify]\nendpoint = \"host:port\"\n").unwrap();

        assert!(Settings::load_from(&config_path).is_err());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.backend = BackendKind::Null;
        settings.notify.endpoint = "[::1]:7000".parse().unwrap();

        settings
            .logging
            .modules
            .insert("mirrorwatch::sink".to_string(), "trace".to_string());

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.backend, BackendKind::Null);
        assert_eq!(loaded.notify.endpoint.host, "::1");
        assert_eq!(loaded.notify.endpoint.port, 7000);
        assert_eq!(loaded.logging.modules["mirrorwatch::sink"], "trace");
    }

    #[test]
    fn test_commented_defaults_parse_back() {
        let rendered = Settings::default().to_commented_toml();
        assert!(rendered.contains("MW_WATCH__BACKEND=poll"));
        assert!(rendered.contains("backend = \"native\""));

        let parsed: Settings = toml::from_str(&rendered).unwrap();
        let defaults = Settings::default();
        assert_eq!(parsed.version, defaults.version);
        assert_eq!(parsed.watch.backend, defaults.watch.backend);
        assert_eq!(parsed.watch.feedback_window_ms, 1000);
        assert_eq!(parsed.watch.batch_window_ms, 50);
        assert_eq!(parsed.watch.poll_interval_ms, 100);
        assert_eq!(parsed.notify.endpoint, defaults.notify.endpoint);
        assert_eq!(parsed.notify.max_datagram_bytes, DEFAULT_MAX_DATAGRAM_BYTES);
        assert_eq!(parsed.logging.default, "warn");
        assert!(parsed.logging.modules.is_empty());
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[watch]\nfeedback_window_ms = 1500\n").unwrap();

        unsafe {
            std::env::set_var("MW_WATCH__FEEDBACK_WINDOW_MS", "2500");
        }

        let settings = Settings::load_from(&config_path).unwrap();

        unsafe {
            std::env::remove_var("MW_WATCH__FEEDBACK_WINDOW_MS");
        }

        // Environment variable overrides config file
        assert_eq!(settings.watch.feedback_window_ms, 2500);
    }

    #[test]
    fn test_backend_options() {
        let watch = WatchConfig {
            poll_interval_ms: 0,
            batch_window_ms: 30,
            ..WatchConfig::default()
        };

        let options = watch.backend_options();
        assert_eq!(options.poll_interval, Duration::from_millis(1));
        assert_eq!(options.batch_window, Duration::from_millis(30));
    }
}
