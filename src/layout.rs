//! Bar layout model and its JSON persistence.
//!
//! The bar is split into three [`Slot`]s, each holding an ordered list of
//! [`WidgetKind`] tags.  A tag appears in at most one slot at any time.
//!
//! # File format
//!
//! ```json
//! {
//!   "left": ["clock", "settings"],
//!   "center": ["workspaces"],
//!   "right": ["tray", "sidebar", "battery"]
//! }
//! ```

use crate::traits::LayoutStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Every widget the bar knows how to render.  The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Clock,
    Settings,
    Workspaces,
    Tray,
    Sidebar,
    Notifications,
    Battery,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 7] = [
        WidgetKind::Clock,
        WidgetKind::Settings,
        WidgetKind::Workspaces,
        WidgetKind::Tray,
        WidgetKind::Sidebar,
        WidgetKind::Notifications,
        WidgetKind::Battery,
    ];

    /// The tag used on disk and in drag payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Clock => "clock",
            WidgetKind::Settings => "settings",
            WidgetKind::Workspaces => "workspaces",
            WidgetKind::Tray => "tray",
            WidgetKind::Sidebar => "sidebar",
            WidgetKind::Notifications => "notifications",
            WidgetKind::Battery => "battery",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| LayoutError::UnknownWidget(s.to_string()))
    }
}

/// One of the three bar sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Center,
    Right,
}

impl Slot {
    /// Scan order used when looking a tag up.
    pub const ALL: [Slot; 3] = [Slot::Left, Slot::Center, Slot::Right];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Left => write!(f, "left"),
            Slot::Center => write!(f, "center"),
            Slot::Right => write!(f, "right"),
        }
    }
}

/// Which side of a target widget a dragged widget lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Before,
    After,
}

impl DropSide {
    /// Left half of the target → before, right half → after.
    pub fn from_pointer(x: f64, width: f64) -> Self {
        if x < width / 2.0 {
            DropSide::Before
        } else {
            DropSide::After
        }
    }
}

/// The three ordered widget lists of the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarLayout {
    left: Vec<WidgetKind>,
    center: Vec<WidgetKind>,
    right: Vec<WidgetKind>,
}

impl Default for BarLayout {
    fn default() -> Self {
        Self {
            left: vec![WidgetKind::Clock, WidgetKind::Settings],
            center: vec![WidgetKind::Workspaces],
            right: vec![WidgetKind::Tray, WidgetKind::Sidebar, WidgetKind::Battery],
        }
    }
}

impl BarLayout {
    /// Build a layout from explicit lists.  Duplicate tags keep their first
    /// occurrence in left → center → right order.
    pub fn new(left: Vec<WidgetKind>, center: Vec<WidgetKind>, right: Vec<WidgetKind>) -> Self {
        let mut layout = Self { left, center, right };
        layout.dedup();
        layout
    }

    /// An empty layout (no widgets anywhere).
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn slot(&self, slot: Slot) -> &[WidgetKind] {
        match slot {
            Slot::Left => &self.left,
            Slot::Center => &self.center,
            Slot::Right => &self.right,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<WidgetKind> {
        match slot {
            Slot::Left => &mut self.left,
            Slot::Center => &mut self.center,
            Slot::Right => &mut self.right,
        }
    }

    /// Find the slot and index holding `kind`.
    pub fn locate(&self, kind: WidgetKind) -> Option<(Slot, usize)> {
        Slot::ALL.into_iter().find_map(|slot| {
            self.slot(slot)
                .iter()
                .position(|k| *k == kind)
                .map(|idx| (slot, idx))
        })
    }

    pub fn contains(&self, kind: WidgetKind) -> bool {
        self.locate(kind).is_some()
    }

    /// Remove `kind` from the first slot containing it.
    pub fn remove(&mut self, kind: WidgetKind) -> Option<(Slot, usize)> {
        let (slot, idx) = self.locate(kind)?;
        self.slot_mut(slot).remove(idx);
        Some((slot, idx))
    }

    /// Move `kind` next to `target`.
    ///
    /// Returns `false` without touching the layout when `kind == target` or
    /// when `target` is not placed in any slot.
    pub fn move_next_to(&mut self, kind: WidgetKind, target: WidgetKind, side: DropSide) -> bool {
        if kind == target || !self.contains(target) {
            return false;
        }
        self.remove(kind);
        let Some((slot, idx)) = self.locate(target) else {
            return false;
        };
        let at = match side {
            DropSide::Before => idx,
            DropSide::After => idx + 1,
        };
        self.slot_mut(slot).insert(at, kind);
        true
    }

    /// Move `kind` to the end of `slot`.
    pub fn append(&mut self, kind: WidgetKind, slot: Slot) {
        self.remove(kind);
        self.slot_mut(slot).push(kind);
    }

    /// Tags not placed in any slot.
    pub fn unplaced(&self) -> Vec<WidgetKind> {
        WidgetKind::ALL
            .into_iter()
            .filter(|k| !self.contains(*k))
            .collect()
    }

    /// Drop repeated tags, keeping the first occurrence.  Returns how many
    /// were removed.
    fn dedup(&mut self) -> usize {
        let mut seen = Vec::with_capacity(WidgetKind::ALL.len());
        let mut removed = 0;
        for slot in Slot::ALL {
            self.slot_mut(slot).retain(|k| {
                if seen.contains(k) {
                    removed += 1;
                    false
                } else {
                    seen.push(*k);
                    true
                }
            });
        }
        removed
    }

    /// Parse a layout from JSON.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let mut layout: BarLayout = serde_json::from_str(json)?;
        let removed = layout.dedup();
        if removed > 0 {
            warn!("bar layout listed {} widget(s) more than once; kept first occurrence", removed);
        }
        Ok(layout)
    }

    /// Pretty-printed JSON as written to disk.
    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Errors from parsing or persisting a [`BarLayout`].
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown widget: {0:?}")]
    UnknownWidget(String),
}

/// [`LayoutStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonLayoutStore {
    path: PathBuf,
}

impl JsonLayoutStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the layout file.  An absent or malformed file yields the default
    /// layout.
    pub fn load_or_default(&self) -> BarLayout {
        if !self.path.exists() {
            info!("no bar layout at {}, using default", self.path.display());
            return BarLayout::default();
        }
        match self.load() {
            Ok(layout) => {
                info!("loaded bar layout from {}", self.path.display());
                layout
            }
            Err(e) => {
                warn!("failed to load bar layout: {}; using default", e);
                BarLayout::default()
            }
        }
    }

    fn load(&self) -> Result<BarLayout, LayoutError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| LayoutError::Io {
            path: self.path.clone(),
            source,
        })?;
        BarLayout::from_json(&contents)
    }
}

impl LayoutStore for JsonLayoutStore {
    type Error = LayoutError;

    fn save(&self, layout: &BarLayout) -> Result<(), LayoutError> {
        let io_err = |source| LayoutError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        std::fs::write(&self.path, layout.to_json()?).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use WidgetKind::*;

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_path(name: &str) -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "shellbar-layout-test-{}-{}/{}",
            std::process::id(),
            id,
            name
        ))
    }

    fn no_duplicates(layout: &BarLayout) -> bool {
        let all: Vec<_> = Slot::ALL
            .into_iter()
            .flat_map(|s| layout.slot(s).to_vec())
            .collect();
        WidgetKind::ALL
            .iter()
            .all(|k| all.iter().filter(|x| *x == k).count() <= 1)
    }

    #[test]
    fn widget_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Notifications).unwrap(), "\"notifications\"");
        assert_eq!("battery".parse::<WidgetKind>().unwrap(), Battery);
        assert!("volume".parse::<WidgetKind>().is_err());
    }

    #[test]
    fn drop_side_splits_at_half_width() {
        assert_eq!(DropSide::from_pointer(0.0, 40.0), DropSide::Before);
        assert_eq!(DropSide::from_pointer(19.9, 40.0), DropSide::Before);
        assert_eq!(DropSide::from_pointer(20.0, 40.0), DropSide::After);
        assert_eq!(DropSide::from_pointer(39.0, 40.0), DropSide::After);
    }

    #[test]
    fn move_before_target_in_other_slot() {
        let mut l = BarLayout::default();
        assert!(l.move_next_to(Battery, Clock, DropSide::Before));
        assert_eq!(l.slot(Slot::Left), &[Battery, Clock, Settings]);
        assert_eq!(l.slot(Slot::Right), &[Tray, Sidebar]);
    }

    #[test]
    fn move_after_target_in_same_slot() {
        let mut l = BarLayout::default();
        assert!(l.move_next_to(Tray, Battery, DropSide::After));
        assert_eq!(l.slot(Slot::Right), &[Sidebar, Battery, Tray]);
    }

    #[test]
    fn move_onto_self_is_noop() {
        let mut l = BarLayout::default();
        assert!(!l.move_next_to(Clock, Clock, DropSide::After));
        assert_eq!(l, BarLayout::default());
    }

    #[test]
    fn move_next_to_unplaced_target_keeps_layout() {
        let mut l = BarLayout::default();
        assert!(!l.move_next_to(Clock, Notifications, DropSide::Before));
        assert_eq!(l, BarLayout::default());
    }

    #[test]
    fn unplaced_widget_can_be_inserted() {
        let mut l = BarLayout::default();
        assert_eq!(l.unplaced(), vec![Notifications]);
        assert!(l.move_next_to(Notifications, Workspaces, DropSide::After));
        assert_eq!(l.slot(Slot::Center), &[Workspaces, Notifications]);
        assert!(l.unplaced().is_empty());
    }

    #[test]
    fn append_moves_to_end_of_slot() {
        let mut l = BarLayout::default();
        l.append(Clock, Slot::Center);
        assert_eq!(l.slot(Slot::Left), &[Settings]);
        assert_eq!(l.slot(Slot::Center), &[Workspaces, Clock]);
    }

    #[test]
    fn scripted_moves_never_duplicate() {
        let mut l = BarLayout::default();
        let moves = [
            (Clock, Battery, DropSide::After),
            (Battery, Clock, DropSide::After),
            (Tray, Workspaces, DropSide::Before),
            (Workspaces, Settings, DropSide::Before),
            (Sidebar, Tray, DropSide::After),
        ];
        for (kind, target, side) in moves {
            l.move_next_to(kind, target, side);
            assert!(no_duplicates(&l), "duplicate after moving {} next to {}", kind, target);
        }
        l.append(Tray, Slot::Left);
        l.append(Tray, Slot::Left);
        assert!(no_duplicates(&l));
    }

    #[test]
    fn from_json_keeps_first_duplicate() {
        let json = r#"{"left":["clock","tray"],"center":["clock"],"right":["tray","battery"]}"#;
        let l = BarLayout::from_json(json).unwrap();
        assert_eq!(l.slot(Slot::Left), &[Clock, Tray]);
        assert!(l.slot(Slot::Center).is_empty());
        assert_eq!(l.slot(Slot::Right), &[Battery]);
    }

    #[test]
    fn from_json_rejects_unknown_tag() {
        let json = r#"{"left":["volume"],"center":[],"right":[]}"#;
        assert!(BarLayout::from_json(json).is_err());
    }

    #[test]
    fn store_round_trips_file() {
        let path = tmp_path("bar-layout.json");
        let store = JsonLayoutStore::new(&path);
        let layout = BarLayout::new(vec![Tray], vec![Clock, Workspaces], vec![]);
        store.save(&layout).unwrap();
        assert_eq!(store.load_or_default(), layout);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_yields_default() {
        let store = JsonLayoutStore::new(tmp_path("absent.json"));
        assert_eq!(store.load_or_default(), BarLayout::default());
    }

    #[test]
    fn malformed_file_yields_default() {
        let path = tmp_path("bad.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonLayoutStore::new(&path);
        assert_eq!(store.load_or_default(), BarLayout::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
