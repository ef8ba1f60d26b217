//! Configuration management for embedmpv
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables.

use crate::speed::{SpeedPresets, DEFAULT_PRESETS, MAX_SPEED};
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine backend configuration
    pub engine: EngineConfig,

    /// Playback speed configuration
    pub speed: SpeedConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Which engine backend a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// In-process simulated engine, no video output
    Headless,

    /// mpv child process driven over its JSON IPC socket
    MpvIpc,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend to use
    pub kind: EngineKind,

    /// Time a single command may take before the engine is declared unresponsive
    pub command_timeout_ms: u64,

    /// mpv backend settings
    pub mpv: MpvConfig,
}

/// mpv backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpvConfig {
    /// mpv executable
    pub binary: PathBuf,

    /// IPC socket path (per-process temp path when unset)
    pub socket_path: Option<PathBuf>,

    /// Hardware decoding mode passed as `--hwdec`
    pub hwdec: String,

    /// Native window id of the host surface, passed as `--wid`
    pub parent_window: Option<i64>,

    /// How long to wait for the IPC socket after spawning mpv
    pub connect_timeout_ms: u64,
}

/// Playback speed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Ascending preset set offered to the interface
    pub presets: Vec<f64>,

    /// Increment used by the faster/slower console commands
    pub step: f64,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Headless,
            command_timeout_ms: 5000,
            mpv: MpvConfig::default(),
        }
    }
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("mpv"),
            socket_path: None,
            hwdec: "auto".to_string(),
            parent_window: None,
            connect_timeout_ms: 2000,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            presets: DEFAULT_PRESETS.to_vec(),
            step: 0.25,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Command timeout as a Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl MpvConfig {
    /// Socket path to use, falling back to a per-process temp path
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("embedmpv-{}.sock", std::process::id()))
        })
    }

    /// Connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl SpeedConfig {
    /// Validated preset set
    pub fn presets(&self) -> Result<SpeedPresets> {
        SpeedPresets::new(self.presets.clone())
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/embedmpv/config.toml on Linux)
    /// 3. User config file (~/.config/embedmpv/config.toml on Linux)
    /// 4. Environment variables (EMBEDMPV_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file on top of the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| PlayerError::Config("Cannot determine user config path".to_string()))?;
        self.save_to(&path)
    }

    /// Save configuration to the given path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Merge a TOML file key by key over the current values
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        let overlay: toml::Value = toml::from_str(&contents).config_err("Failed to parse config file")?;

        let mut base = toml::Value::try_from(&*self).config_err("Failed to serialize config")?;
        merge_values(&mut base, overlay);
        *self = base.try_into::<Config>().config_err("Invalid config file")?;

        Ok(())
    }

    /// Apply `EMBEDMPV_*` overrides looked up through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("EMBEDMPV_ENGINE") {
            self.engine.kind = <EngineKind as clap::ValueEnum>::from_str(&kind, true)
                .map_err(|_| PlayerError::Config(format!("Invalid EMBEDMPV_ENGINE '{}'", kind)))?;
        }

        if let Some(timeout) = lookup("EMBEDMPV_COMMAND_TIMEOUT_MS") {
            self.engine.command_timeout_ms = timeout
                .parse()
                .map_err(|_| PlayerError::Config("Invalid EMBEDMPV_COMMAND_TIMEOUT_MS".to_string()))?;
        }

        if let Some(binary) = lookup("EMBEDMPV_MPV_BINARY") {
            self.engine.mpv.binary = PathBuf::from(binary);
        }

        if let Some(log_level) = lookup("EMBEDMPV_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.engine.command_timeout_ms == 0 {
            return Err(PlayerError::Config("Command timeout must be non-zero".to_string()));
        }

        self.speed.presets()?;

        if !(self.speed.step > 0.0 && self.speed.step <= MAX_SPEED) {
            return Err(PlayerError::Config(format!(
                "Speed step must be in (0, {}], got {}",
                MAX_SPEED, self.speed.step
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/embedmpv/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("embedmpv").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/embedmpv/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("embedmpv").join("config.toml"))
    }
}

/// Recursively overlay `overlay` onto `base`; tables merge, everything else replaces
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
