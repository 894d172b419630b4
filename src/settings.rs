//! Persisted user settings.
//!
//! Settings live in a flat JSON object of string keys to primitive values
//! (`$XDG_CACHE_HOME/shellbar/settings.json`).  Every write is a
//! read-modify-write of a single key, so keys this version does not know
//! about survive untouched.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Cache key for the workspace indicator count.
pub const WORKSPACE_COUNT_KEY: &str = "workspaceCount";
/// Cache key for the notification popup timeout.
pub const NOTIFICATION_TIMEOUT_KEY: &str = "notificationTimeout";

/// Errors from validating or writing a setting.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Number of workspace indicators on the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkspaceCount(u32);

impl WorkspaceCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;
    pub const DEFAULT: WorkspaceCount = WorkspaceCount(5);

    pub fn new(value: u32) -> Result<Self, SettingsError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SettingsError::OutOfRange {
                name: "workspace count",
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for WorkspaceCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How long a notification popup stays visible, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NotificationTimeout(u32);

impl NotificationTimeout {
    pub const MIN: u32 = 1_000;
    pub const MAX: u32 = 30_000;
    pub const DEFAULT: NotificationTimeout = NotificationTimeout(5_000);

    pub fn new(millis: u32) -> Result<Self, SettingsError> {
        if (Self::MIN..=Self::MAX).contains(&millis) {
            Ok(Self(millis))
        } else {
            Err(SettingsError::OutOfRange {
                name: "notification timeout (ms)",
                value: millis,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn millis(self) -> u32 {
        self.0
    }
}

impl Default for NotificationTimeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Flat key/value settings file.
#[derive(Debug, Clone)]
pub struct SettingsCache {
    path: PathBuf,
}

impl SettingsCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The cache at `$XDG_CACHE_HOME/shellbar/settings.json`.
    pub fn default_location() -> Self {
        Self::new(crate::config::settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole object.  Anything unreadable counts as empty.
    fn read_map(&self) -> Map<String, Value> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!("settings cache {} unreadable: {}", self.path.display(), e);
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("settings cache {} is not a JSON object", self.path.display());
                Map::new()
            }
            Err(e) => {
                warn!("settings cache {} is malformed: {}", self.path.display(), e);
                Map::new()
            }
        }
    }

    /// Value stored under `key`, or `default` when the file, the key, or a
    /// value of the right type is missing.
    pub fn load_value<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read_map()
            .remove(key)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(default)
    }

    /// Store `value` under `key`, keeping every other key.
    pub fn store_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        let mut map = self.read_map();
        map.insert(key.to_string(), serde_json::to_value(value)?);

        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let contents = serde_json::to_string(&Value::Object(map))?;
        std::fs::write(&self.path, contents).map_err(io_err)
    }

    /// Persisted workspace count; invalid stored values fall back to the
    /// default.
    pub fn workspace_count(&self) -> WorkspaceCount {
        let raw = self.load_value(WORKSPACE_COUNT_KEY, WorkspaceCount::DEFAULT.get());
        WorkspaceCount::new(raw).unwrap_or_default()
    }

    pub fn set_workspace_count(&self, count: WorkspaceCount) -> Result<(), SettingsError> {
        self.store_value(WORKSPACE_COUNT_KEY, &count.get())
    }

    pub fn notification_timeout(&self) -> NotificationTimeout {
        let raw = self.load_value(NOTIFICATION_TIMEOUT_KEY, NotificationTimeout::DEFAULT.millis());
        NotificationTimeout::new(raw).unwrap_or_default()
    }

    pub fn set_notification_timeout(&self, timeout: NotificationTimeout) -> Result<(), SettingsError> {
        self.store_value(NOTIFICATION_TIMEOUT_KEY, &timeout.millis())
    }
}
