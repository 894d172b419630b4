//! Application configuration and well-known paths.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/shellbar/config.json`.
//! Every section is optional. A minimal `{}` file is valid and all sections
//! fall back to their compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "wallpaper": { "directory": "/home/me/Pictures/walls" },
//!   "style": { "reload_debounce_ms": 300 },
//!   "brightness": { "poll_interval_ms": 2000 },
//!   "audio": { "keybinds_path": "/home/me/.config/hypr/hyprland/keybinds.conf" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wallpaper: WallpaperConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub brightness: BrightnessConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Where wallpapers are picked from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallpaperConfig {
    /// Directory scanned for images.  Defaults to `~/Wallpapers`.
    pub directory: PathBuf,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            directory: home_dir().join("Wallpapers"),
        }
    }
}

/// Stylesheet handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// User stylesheet.  Defaults to `$XDG_CONFIG_HOME/shellbar/style.css`.
    pub css_path: PathBuf,
    /// Color file regenerated by matugen; a change triggers a reload.
    pub colors_path: PathBuf,
    /// Quiet period after the last color file change before reloading (ms).
    pub reload_debounce_ms: u64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            css_path: config_dir().join("style.css"),
            colors_path: home_dir().join(".cache").join("matugen").join("colors.css"),
            reload_debounce_ms: 300,
        }
    }
}

/// Periodic refresh of live system values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    /// How often brightness and the wallpaper list are re-read (ms).
    pub poll_interval_ms: u64,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
        }
    }
}

/// Volume ceiling handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Compositor keybinds file carrying the `--limit=` option.
    pub keybinds_path: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            keybinds_path: home_dir()
                .join(".config")
                .join("hypr")
                .join("hyprland")
                .join("keybinds.conf"),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

//  Paths

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn home_dir() -> PathBuf {
    env_dir("HOME").unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// `$XDG_CONFIG_HOME/shellbar`.
pub fn config_dir() -> PathBuf {
    env_dir("XDG_CONFIG_HOME")
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("shellbar")
}

/// `$XDG_CACHE_HOME/shellbar`.
pub fn cache_dir() -> PathBuf {
    env_dir("XDG_CACHE_HOME")
        .unwrap_or_else(|| home_dir().join(".cache"))
        .join("shellbar")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn layout_path() -> PathBuf {
    config_dir().join("bar-layout.json")
}

pub fn settings_path() -> PathBuf {
    cache_dir().join("settings.json")
}

/// Socket the daemon listens on.
pub fn socket_path() -> PathBuf {
    env_dir("XDG_RUNTIME_DIR")
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("shellbar.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "wallpaper": { "directory": "/srv/walls" },
            "style": {
                "css_path": "/etc/shellbar.css",
                "colors_path": "/tmp/colors.css",
                "reload_debounce_ms": 150
            },
            "brightness": { "poll_interval_ms": 500 },
            "audio": { "keybinds_path": "/tmp/keys.conf" }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.wallpaper.directory, PathBuf::from("/srv/walls"));
        assert_eq!(cfg.style.css_path, PathBuf::from("/etc/shellbar.css"));
        assert_eq!(cfg.style.reload_debounce_ms, 150);
        assert_eq!(cfg.brightness.poll_interval_ms, 500);
        assert_eq!(cfg.audio.keybinds_path, PathBuf::from("/tmp/keys.conf"));
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.style.reload_debounce_ms, 300);
        assert_eq!(cfg.brightness.poll_interval_ms, 2_000);
        assert!(cfg.wallpaper.directory.ends_with("Wallpapers"));
        assert!(cfg.style.colors_path.ends_with("matugen/colors.css"));
        assert!(cfg.audio.keybinds_path.ends_with("hypr/hyprland/keybinds.conf"));
    }

    #[test]
    fn deserialize_partial_style() {
        let cfg: Config = serde_json::from_str(r#"{ "style": { "reload_debounce_ms": 0 } }"#).unwrap();
        assert_eq!(cfg.style.reload_debounce_ms, 0);
        assert!(cfg.style.css_path.ends_with("shellbar/style.css"));
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "bar": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/shellbar/config.json")).unwrap_err();
        assert!(err.to_string().starts_with("config error: failed to read"));
    }

    #[test]
    fn well_known_files_live_in_app_dirs() {
        assert!(layout_path().ends_with("shellbar/bar-layout.json"));
        assert!(settings_path().ends_with("shellbar/settings.json"));
        assert!(socket_path().ends_with("shellbar.sock"));
    }
}
