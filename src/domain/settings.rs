use crate::infrastructure::bluetooth::protocol;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "rpi_ble_app".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Peripheral discovery
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    #[serde(default = "default_requested_mtu")]
    pub requested_mtu: u16,

    // GATT identifiers
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_ip_uuid")]
    pub ble_ip_char_uuid: String,
    #[serde(default = "default_label_uuid")]
    pub ble_label_char_uuid: String,

    // UI
    #[serde(default = "default_false")]
    pub dark_mode: bool,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            scan_timeout_ms: default_scan_timeout_ms(),
            requested_mtu: default_requested_mtu(),
            ble_service_uuid: default_service_uuid(),
            ble_ip_char_uuid: default_ip_uuid(),
            ble_label_char_uuid: default_label_uuid(),
            dark_mode: false,
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    protocol::DEVICE_NAME.to_string()
}
fn default_scan_timeout_ms() -> u64 {
    protocol::SCAN_TIMEOUT_MS
}
fn default_requested_mtu() -> u16 {
    protocol::REQUESTED_MTU
}
fn default_service_uuid() -> String {
    protocol::SERVICE_UUID.to_string()
}
fn default_ip_uuid() -> String {
    protocol::IP_CHAR_UUID.to_string()
}
fn default_label_uuid() -> String {
    protocol::LABEL_CHAR_UUID.to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::at_path(settings_path))
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn at_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(path = %settings_path.display(), "Using default settings: {}", e);
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("RpiBleApp");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn set_dark_mode(&mut self, dark_mode: bool) -> anyhow::Result<()> {
        self.settings.dark_mode = dark_mode;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_peripheral() {
        let s = Settings::default();
        assert_eq!(s.device_name, "Rpi");
        assert_eq!(s.scan_timeout_ms, 5000);
        assert_eq!(s.requested_mtu, 75);
        assert_eq!(s.ble_service_uuid, "00000001-1000-2000-3000-111122223333");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{ "device_name": "Bench" }"#).unwrap();
        assert_eq!(s.device_name, "Bench");
        assert_eq!(s.scan_timeout_ms, 5000);
        assert_eq!(s.log_settings.rotation, "daily");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("rpi_ble_app_missing_settings_test.json");
        let _ = fs::remove_file(&path);
        let service = SettingsService::at_path(path);
        assert_eq!(service.get().device_name, "Rpi");
    }

    #[test]
    fn test_save_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "rpi_ble_app_settings_{}.json",
            std::process::id()
        ));
        let mut service = SettingsService::at_path(path.clone());
        service.set_dark_mode(true).unwrap();

        let reloaded = SettingsService::at_path(path.clone());
        assert!(reloaded.get().dark_mode);
        let _ = fs::remove_file(&path);
    }
}
