//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Focus and break lengths for each session mode
//! - App blocking defaults
//!
//! Configuration is stored at `~/.config/focusroom/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::session::{SessionConfig, SessionMode};

/// Focus/break lengths for one mode, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModesConfig {
    #[serde(default = "default_pomodoro")]
    pub pomodoro: ModeConfig,
    #[serde(default = "default_deep_work")]
    pub deep_work: ModeConfig,
    /// Flow sessions count up and are only ever ended by hand, so neither
    /// length is used.
    #[serde(default = "default_flow")]
    pub flow: ModeConfig,
    #[serde(default = "default_custom")]
    pub custom: ModeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ask for confirmation before a session can be canceled.
    #[serde(default)]
    pub deep_focus: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusroom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modes: ModesConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
}

// Default functions
fn default_pomodoro() -> ModeConfig {
    ModeConfig {
        focus_minutes: 25,
        break_minutes: 5,
    }
}
fn default_deep_work() -> ModeConfig {
    ModeConfig {
        focus_minutes: 90,
        break_minutes: 15,
    }
}
fn default_flow() -> ModeConfig {
    ModeConfig {
        focus_minutes: 0,
        break_minutes: 0,
    }
}
fn default_custom() -> ModeConfig {
    ModeConfig {
        focus_minutes: 45,
        break_minutes: 10,
    }
}
fn default_true() -> bool {
    true
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            pomodoro: default_pomodoro(),
            deep_work: default_deep_work(),
            flow: default_flow(),
            custom: default_custom(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deep_focus: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modes: ModesConfig::default(),
            blocking: BlockingConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn mode(&self, mode: SessionMode) -> ModeConfig {
        match mode {
            SessionMode::Pomodoro => self.modes.pomodoro,
            SessionMode::DeepWork => self.modes.deep_work,
            SessionMode::Flow => self.modes.flow,
            SessionMode::Custom => self.modes.custom,
        }
    }

    /// Session defaults for `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured durations are not a valid session.
    pub fn session_config(&self, mode: SessionMode) -> Result<SessionConfig, ValidationError> {
        let durations = self.mode(mode);
        let focus_seconds = if mode.counts_up() {
            0
        } else {
            u64::from(durations.focus_minutes) * 60
        };
        let config = SessionConfig::new(mode, focus_seconds, u64::from(durations.break_minutes) * 60)
            .with_app_blocking(self.blocking.enabled)
            .with_deep_focus(self.blocking.deep_focus || mode == SessionMode::DeepWork);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.modes.pomodoro, cfg.modes.pomodoro);
        assert_eq!(parsed.modes.flow.break_minutes, 0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[modes.pomodoro]\nfocus_minutes = 50\nbreak_minutes = 10\n").unwrap();
        assert_eq!(parsed.modes.pomodoro.focus_minutes, 50);
        assert_eq!(parsed.modes.deep_work.focus_minutes, 90);
        assert!(parsed.blocking.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("modes.pomodoro.focus_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("blocking.enabled").as_deref(), Some("true"));
        assert!(cfg.get("modes.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("modes.custom.focus_minutes", "30").unwrap();
        cfg.apply("blocking.deep_focus", "true").unwrap();
        assert_eq!(cfg.modes.custom.focus_minutes, 30);
        assert!(cfg.blocking.deep_focus);
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("modes.custom.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("blocking.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("modes.custom", "1"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn session_config_from_defaults() {
        let cfg = Config::default();
        let pomodoro = cfg.session_config(SessionMode::Pomodoro).unwrap();
        assert_eq!(pomodoro.focus_duration_seconds, 1500);
        assert_eq!(pomodoro.break_duration_seconds, 300);
        assert!(pomodoro.app_blocking_enabled);
        assert!(!pomodoro.is_deep_focus);

        assert!(cfg.session_config(SessionMode::DeepWork).unwrap().is_deep_focus);
        assert_eq!(cfg.session_config(SessionMode::Flow).unwrap().focus_duration_seconds, 0);
    }

    #[test]
    fn zero_minute_pomodoro_is_rejected() {
        let mut cfg = Config::default();
        cfg.apply("modes.pomodoro.focus_minutes", "0").unwrap();
        assert!(cfg.session_config(SessionMode::Pomodoro).is_err());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.modes.custom.break_minutes, 10);

        let mut changed = cfg.clone();
        changed.apply("modes.custom.break_minutes", "3").unwrap();
        changed.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.modes.custom.break_minutes, 3);
    }

    #[test]
    fn tick_cadence_is_not_configurable() {
        let mut cfg = Config::default();
        assert!(cfg.get("clock.tick_interval_ms").is_none());
        assert!(matches!(
            cfg.apply("clock.tick_interval_ms", "250"),
            Err(ConfigError::UnknownKey(_))
        ));

        // A leftover [clock] section is ignored on load.
        let parsed: Config = toml::from_str("[clock]\ntick_interval_ms = 250\n").unwrap();
        assert_eq!(parsed.modes.pomodoro.focus_minutes, 25);
    }

    #[test]
    fn flow_defaults_to_no_break() {
        let flow = Config::default().session_config(SessionMode::Flow).unwrap();
        assert_eq!(flow.break_duration_seconds, 0);
        assert!(!flow.offers_break());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "modes = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
