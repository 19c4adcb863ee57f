use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;
use crate::app::launch::LaunchParams;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiSettings {
    pub window_width: i32,
    pub window_height: i32,
    pub theme: String,
    pub font_size: i32,
    pub show_log_panel: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            window_width: 1180,
            window_height: 780,
            theme: "dark".to_string(),
            font_size: 13,
            show_log_panel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HdcSettings {
    pub command_path: String,
    pub command_timeout_secs: u64,
    pub detail_on_refresh: bool,
}

impl Default for HdcSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            command_timeout_secs: 10,
            detail_on_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSettings {
    pub max_history_size: usize,
    pub auto_save_history: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            max_history_size: 50,
            auto_save_history: true,
        }
    }
}

/// Snapshot of the launch form, persisted so a restart restores the last
/// session's inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchFormSettings {
    pub device_id: String,
    pub bundle_name: String,
    pub ability_name: String,
    pub pkg_name: String,
    pub version: String,
    pub uri: String,
    pub is_debug: bool,
    pub extra: String,
    pub entry: String,
    pub params_json: String,
}

impl Default for LaunchFormSettings {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            bundle_name: "com.extscreen.runtime".to_string(),
            ability_name: "EntryAbility".to_string(),
            pkg_name: "es.com.elsbharmony.tv".to_string(),
            version: "0.0.2".to_string(),
            uri: "assets:///vue".to_string(),
            is_debug: true,
            extra: "from=cmd".to_string(),
            entry: "Application".to_string(),
            params_json: String::new(),
        }
    }
}

impl LaunchFormSettings {
    pub fn launch_params(&self) -> LaunchParams {
        LaunchParams {
            pkg_name: self.pkg_name.clone(),
            version: self.version.clone(),
            uri: self.uri.clone(),
            is_debug: self.is_debug,
            extra: self.extra.clone(),
            entry: Some(self.entry.clone()),
            params_json: Some(self.params_json.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub hdc: HdcSettings,
    #[serde(default)]
    pub command: CommandSettings,
    #[serde(default)]
    pub form: LaunchFormSettings,
    #[serde(default)]
    pub command_history: Vec<String>,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ui: UiSettings::default(),
            hdc: HdcSettings::default(),
            command: CommandSettings::default(),
            form: LaunchFormSettings::default(),
            command_history: Vec::new(),
            output_path: String::new(),
            version: "0.3.2".to_string(),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("HDC_RUNNER_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".hdc_runner_config.json")
}

pub fn backup_config_path() -> PathBuf {
    config_path().with_extension("backup.json")
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), &backup_config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_value(value).unwrap_or_default();
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

pub fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.ui.window_width < 400 {
        config.ui.window_width = 1180;
    }
    if config.ui.window_height < 300 {
        config.ui.window_height = 780;
    }
    if !(8..=32).contains(&config.ui.font_size) {
        config.ui.font_size = 13;
    }
    if config.hdc.command_timeout_secs == 0 || config.hdc.command_timeout_secs > 600 {
        config.hdc.command_timeout_secs = 10;
    }
    if config.command.max_history_size == 0 {
        config.command.max_history_size = 50;
    }
    config
}

/// Clamps values and stamps the current app version before persisting.
pub fn normalize_config_for_save(config: AppConfig) -> AppConfig {
    let mut config = validate_config(config);
    config.version = env!("CARGO_PKG_VERSION").to_string();
    config
}

// Serializes tests that point HDC_RUNNER_CONFIG_PATH at a scratch file; the
// variable is process-global while test threads are not.
#[cfg(test)]
pub(crate) fn config_env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
        .lock()
        .expect("env lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clamps_invalid_values() {
        let mut config = AppConfig::default();
        config.ui.window_width = 100;
        config.ui.font_size = 2;
        config.hdc.command_timeout_secs = 0;
        config.command.max_history_size = 0;
        let validated = validate_config(config);
        assert_eq!(validated.ui.window_width, 1180);
        assert_eq!(validated.ui.font_size, 13);
        assert_eq!(validated.hdc.command_timeout_secs, 10);
        assert_eq!(validated.command.max_history_size, 50);
    }

    #[test]
    fn normalize_stamps_current_version() {
        let mut config = AppConfig::default();
        config.version = "0.0.1".to_string();
        let normalized = normalize_config_for_save(config);
        assert_eq!(normalized.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config =
            load_config_from_path(&dir.path().join("absent.json"), "trace-test").expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn saves_and_reloads_with_backup() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.json");
        let backup = dir.path().join("config.backup.json");

        let mut config = AppConfig::default();
        config.form.device_id = "127.0.0.1:5555".to_string();
        config.command_history.push("hdc list targets -v".to_string());
        save_config_to_path(&config, &path, &backup, "trace-test").expect("first save");
        assert!(!backup.exists());

        config.form.uri = "assets:///react".to_string();
        save_config_to_path(&config, &path, &backup, "trace-test").expect("second save");
        assert!(backup.exists());

        let loaded = load_config_from_path(&path, "trace-test").expect("load");
        assert_eq!(loaded.form.device_id, "127.0.0.1:5555");
        assert_eq!(loaded.form.uri, "assets:///react");
        assert_eq!(loaded.command_history.len(), 1);
    }

    #[test]
    fn backup_follows_config_path_override() {
        let _guard = config_env_lock();
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("override.json");
        std::env::set_var("HDC_RUNNER_CONFIG_PATH", &path);

        assert_eq!(backup_config_path(), dir.path().join("override.backup.json"));

        let mut config = AppConfig::default();
        save_config(&config, "trace-test").expect("first save");
        config.form.uri = "assets:///react".to_string();
        save_config(&config, "trace-test").expect("second save");
        assert!(dir.path().join("override.backup.json").exists());

        std::env::remove_var("HDC_RUNNER_CONFIG_PATH");
    }

    #[test]
    fn unknown_schema_degrades_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"ui\": 42}").expect("write");
        let config = load_config_from_path(&path, "trace-test").expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn form_defaults_produce_example_launch_params() {
        let params = LaunchFormSettings::default().launch_params();
        assert_eq!(params.pkg_name, "es.com.elsbharmony.tv");
        assert_eq!(params.version, "0.0.2");
        assert_eq!(params.uri, "assets:///vue");
        assert!(params.is_debug);
        assert_eq!(params.extra, "from=cmd");
        assert_eq!(params.entry.as_deref(), Some("Application"));
    }
}
