//! Live shell state.
//!
//! [`ShellState`] owns every reactive cell the shell's widgets bind to.  It is
//! constructed once in `main` and handed down by reference; cloning it clones
//! the *handles*, so all clones observe and mutate the same cells.

use crate::layout::BarLayout;
use crate::settings::{NotificationTimeout, SettingsCache, WorkspaceCount};
use crate::system::audio::VolumeLimit;
use crate::variable::Variable;
use std::path::PathBuf;

/// Visibility of the shell's toggleable windows.
#[derive(Debug, Clone)]
pub struct Windows {
    pub launcher: Variable<bool>,
    pub sidebar: Variable<bool>,
    pub power_menu: Variable<bool>,
    pub music_popup: Variable<bool>,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            launcher: Variable::new(false),
            sidebar: Variable::new(false),
            power_menu: Variable::new(false),
            music_popup: Variable::new(false),
        }
    }
}

/// Flip a boolean cell and return its new value.
pub fn toggle(cell: &Variable<bool>) -> bool {
    let next = !cell.get();
    cell.set(next);
    next
}

#[derive(Debug, Clone)]
pub struct ShellState {
    pub layout: Variable<BarLayout>,
    pub edit_mode: Variable<bool>,
    pub windows: Windows,
    pub workspace_count: Variable<WorkspaceCount>,
    pub notification_timeout: Variable<NotificationTimeout>,
    /// Display brightness as a fraction in `0.0..=1.0`.
    pub brightness: Variable<f64>,
    /// Maximum output volume.
    pub volume_limit: Variable<VolumeLimit>,
    /// Wallpaper images currently on disk.
    pub wallpapers: Variable<Vec<PathBuf>>,
}

impl ShellState {
    /// State seeded with `layout` and compiled-in defaults for everything
    /// else.
    pub fn new(layout: BarLayout) -> Self {
        Self {
            layout: Variable::new(layout),
            edit_mode: Variable::new(false),
            windows: Windows::default(),
            workspace_count: Variable::new(WorkspaceCount::default()),
            notification_timeout: Variable::new(NotificationTimeout::default()),
            brightness: Variable::new(0.0),
            volume_limit: Variable::new(VolumeLimit::default()),
            wallpapers: Variable::new(Vec::new()),
        }
    }

    /// State seeded from the persisted layout and settings.
    pub fn restore(layout: BarLayout, settings: &SettingsCache) -> Self {
        let state = Self::new(layout);
        state.workspace_count.set(settings.workspace_count());
        state.notification_timeout.set(settings.notification_timeout());
        state
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new(BarLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_viewing_with_windows_hidden() {
        let state = ShellState::default();
        assert!(!state.edit_mode.get());
        assert!(!state.windows.launcher.get());
        assert!(!state.windows.music_popup.get());
        assert_eq!(state.layout.get(), BarLayout::default());
    }

    #[test]
    fn clones_share_cells() {
        let a = ShellState::default();
        let b = a.clone();
        toggle(&b.windows.sidebar);
        assert!(a.windows.sidebar.get());
        assert!(!toggle(&a.windows.sidebar));
        assert!(!b.windows.sidebar.get());
    }

    #[test]
    fn restore_reads_settings() {
        let path = std::env::temp_dir().join(format!(
            "shellbar-state-test-{}/settings.json",
            std::process::id()
        ));
        let cache = SettingsCache::new(&path);
        cache.set_workspace_count(WorkspaceCount::new(3).unwrap()).unwrap();
        let state = ShellState::restore(BarLayout::empty(), &cache);
        assert_eq!(state.workspace_count.get().get(), 3);
        assert_eq!(state.notification_timeout.get(), NotificationTimeout::DEFAULT);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
