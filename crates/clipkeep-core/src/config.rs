use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ClipkeepError, Result};

/// Top-level configuration for clipkeep.
///
/// Loaded from `~/.clipkeep/config.toml` by default. Every section falls back
/// to its defaults, so a partial or empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipkeepConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl ClipkeepConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClipkeepConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    ///
    /// Writes a sibling `.tmp` file and renames it over `path`, so readers
    /// never see a half-written config.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ClipkeepError::Config(e.to_string()))?;
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Resolved data directory with a leading `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Path of the persisted history file.
    pub fn history_path(&self) -> PathBuf {
        self.data_dir().join("history.json")
    }

    /// Directory holding captured image blobs.
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir().join("images")
    }
}

/// Live configuration shared by the capture loop and the settings boundary.
///
/// Readers take a fresh snapshot each time they need a value, so a saved
/// change applies without a restart.
pub type SharedConfig = Arc<RwLock<ClipkeepConfig>>;

/// Wrap a configuration for sharing.
pub fn shared(config: ClipkeepConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

/// Snapshot of the live configuration.
pub fn snapshot(config: &SharedConfig) -> ClipkeepConfig {
    config
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replace the live configuration.
pub fn replace(config: &SharedConfig, next: ClipkeepConfig) {
    *config
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for the history file, images and the API token.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Port for the local HTTP boundary.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.clipkeep/data".to_string(),
            log_level: "info".to_string(),
            port: 3040,
        }
    }
}

/// Clipboard polling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Milliseconds between clipboard samples.
    pub interval_ms: u64,
    /// Characters kept in a text entry's preview, at most 100.
    pub preview_chars: usize,
    /// Whether clipboard images are captured at all.
    pub capture_images: bool,
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            preview_chars: crate::types::PREVIEW_CHARS,
            capture_images: true,
        }
    }
}

/// History retention configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Non-favorite entries kept after each capture.
    pub max_items: usize,
    /// Size of the page pushed to subscribers after a change.
    pub page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: 100,
            page_size: crate::types::DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Paste injection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteConfig {
    /// Program and arguments run after a paste to send the keystroke to the
    /// focused application. Empty disables injection.
    pub command: Vec<String>,
    /// Delay before the command runs, giving the window time to hide.
    pub delay_ms: u64,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            delay_ms: 100,
        }
    }
}

/// Presentation settings. Carried for the UI; the capture engine ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub start_at_login: bool,
    pub theme_color: String,
    pub shortcut: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            start_at_login: false,
            theme_color: "#3b82f6".to_string(),
            shortcut: "Ctrl+Shift+V".to_string(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ClipkeepConfig::default();
        assert_eq!(config.general.data_dir, "~/.clipkeep/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 3040);
        assert_eq!(config.capture.interval_ms, 1000);
        assert_eq!(config.capture.preview_chars, 100);
        assert!(config.capture.capture_images);
        assert_eq!(config.history.max_items, 100);
        assert_eq!(config.history.page_size, 50);
        assert!(config.paste.command.is_empty());
        assert_eq!(config.paste.delay_ms, 100);
        assert!(!config.ui.start_at_login);
        assert_eq!(config.ui.theme_color, "#3b82f6");
        assert_eq!(config.ui.shortcut, "Ctrl+Shift+V");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r##"
[general]
data_dir = "/custom/data"
log_level = "debug"
port = 4000

[capture]
interval_ms = 250
capture_images = false

[history]
max_items = 20

[paste]
command = ["python", "paste.py"]
delay_ms = 50

[ui]
theme_color = "#ff0000"
"##;
        let file = create_temp_config(content);
        let config = ClipkeepConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.port, 4000);
        assert_eq!(config.capture.interval_ms, 250);
        assert!(!config.capture.capture_images);
        assert_eq!(config.capture.preview_chars, 100);
        assert_eq!(config.history.max_items, 20);
        assert_eq!(config.history.page_size, 50);
        assert_eq!(config.paste.command, vec!["python", "paste.py"]);
        assert_eq!(config.paste.delay_ms, 50);
        assert_eq!(config.ui.theme_color, "#ff0000");
        assert_eq!(config.ui.shortcut, "Ctrl+Shift+V");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ClipkeepConfig::load(file.path()).unwrap();
        assert_eq!(config, ClipkeepConfig::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = ClipkeepConfig::load(file.path());
        assert!(matches!(result, Err(ClipkeepError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ClipkeepConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.history.max_items, 100);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = ClipkeepConfig::default();
        config.history.max_items = 7;
        config.paste.command = vec!["xdotool".into(), "key".into(), "ctrl+v".into()];
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = ClipkeepConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_save_replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[history]\nmax_items = 3\n").unwrap();

        let mut config = ClipkeepConfig::default();
        config.history.max_items = 9;
        config.save(&path).unwrap();

        assert_eq!(ClipkeepConfig::load(&path).unwrap().history.max_items, 9);
        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let mut config = ClipkeepConfig::default();
        config.general.data_dir = "/var/clipkeep".to_string();
        assert_eq!(config.history_path(), PathBuf::from("/var/clipkeep/history.json"));
        assert_eq!(config.images_dir(), PathBuf::from("/var/clipkeep/images"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        let expanded = expand_home("~/.clipkeep");
        assert!(expanded.ends_with(".clipkeep"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn test_shared_config_replace_is_visible_to_snapshots() {
        let live = shared(ClipkeepConfig::default());
        let reader = Arc::clone(&live);

        let mut next = snapshot(&live);
        next.history.max_items = 3;
        replace(&live, next);

        assert_eq!(snapshot(&reader).history.max_items, 3);
    }

    #[test]
    fn test_capture_interval_never_zero() {
        let capture = CaptureConfig {
            interval_ms: 0,
            ..CaptureConfig::default()
        };
        assert_eq!(capture.interval(), Duration::from_millis(1));
    }
}
