use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Bound of the single event queue feeding the core loop.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Drop toggle/skip commands while one of the same kind is still queued.
    #[serde(default = "default_ignore_while_pending")]
    pub ignore_while_pending: bool,
    /// Tick period of the simulated engine's progress events.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            ignore_while_pending: default_ignore_while_pending(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file_name: default_log_file_name(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_ignore_while_pending() -> bool {
    true
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_log_file_name() -> String {
    "laud.log".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        platform::data_dir().join(&self.logging.file_name)
    }
}
