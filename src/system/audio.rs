//! Output volume ceiling.
//!
//! The ceiling lives in the compositor keybinds file as the `--limit=<n>`
//! option of the volume-up binding, so the volume keys honour it.  Changing
//! it rewrites that option, reloads the compositor with `hyprctl reload` and
//! re-applies the current volume under the new limit through `wpctl`.

use super::{launch, query, SystemError};
use crate::traits::CommandRunner;
use log::debug;
use std::path::Path;

const SINK: &str = "@DEFAULT_AUDIO_SINK@";
const LIMIT_OPTION: &str = "--limit=";

/// Maximum volume as a multiple of 100 %.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct VolumeLimit(f64);

impl VolumeLimit {
    pub const MIN: f64 = 0.01;
    pub const MAX: f64 = 5.0;
    pub const DEFAULT: VolumeLimit = VolumeLimit(1.0);

    pub fn new(value: f64) -> Result<Self, SystemError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SystemError::OutOfRange {
                what: "volume limit",
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn from_percent(percent: u16) -> Result<Self, SystemError> {
        Self::new(f64::from(percent) / 100.0)
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u16 {
        (self.0 * 100.0).round() as u16
    }
}

impl Default for VolumeLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Byte range of the number following the first `--limit=`.
fn limit_span(contents: &str) -> Option<(usize, usize)> {
    let start = contents.find(LIMIT_OPTION)? + LIMIT_OPTION.len();
    let len = contents[start..]
        .bytes()
        .take_while(|b| b.is_ascii_digit() || *b == b'.')
        .count();
    (len > 0).then_some((start, start + len))
}

/// The first `--limit=` value in a keybinds file.
pub fn parse_limit(contents: &str) -> Option<f64> {
    let (start, end) = limit_span(contents)?;
    contents[start..end].parse().ok()
}

/// `contents` with the first `--limit=` value replaced by `limit`.
pub fn replace_limit(contents: &str, limit: VolumeLimit) -> Option<String> {
    let (start, end) = limit_span(contents)?;
    Some(format!("{}{}{}", &contents[..start], limit.get(), &contents[end..]))
}

/// The ceiling configured in `keybinds`.  Falls back to 100 % when the file
/// or the option is missing or out of range.
pub fn current_limit(keybinds: &Path) -> VolumeLimit {
    std::fs::read_to_string(keybinds)
        .map_err(|e| debug!("keybinds file {} unreadable: {}", keybinds.display(), e))
        .ok()
        .and_then(|contents| parse_limit(&contents))
        .and_then(|value| VolumeLimit::new(value).ok())
        .unwrap_or_default()
}

/// Current volume of the default sink, e.g. `0.45` for `Volume: 0.45`.
pub fn current_volume<R: CommandRunner + ?Sized>(runner: &R) -> Result<f64, SystemError> {
    let out = query(runner, "wpctl", &["get-volume", SINK])?;
    out.split_whitespace()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| SystemError::Parse {
            program: "wpctl get-volume".into(),
            output: out.clone(),
        })
}

/// Rewrite the ceiling in `keybinds`, reload the compositor and re-apply
/// the current volume under `limit`.
pub fn set_limit<R: CommandRunner + ?Sized>(
    runner: &R,
    keybinds: &Path,
    limit: VolumeLimit,
) -> Result<(), SystemError> {
    let io_err = |source| SystemError::Io {
        path: keybinds.to_path_buf(),
        source,
    };
    let contents = std::fs::read_to_string(keybinds).map_err(io_err)?;
    let updated = replace_limit(&contents, limit)
        .ok_or_else(|| SystemError::MissingLimit(keybinds.to_path_buf()))?;
    let volume = current_volume(runner)?.to_string();

    std::fs::write(keybinds, updated).map_err(io_err)?;
    launch(runner, "hyprctl", &["reload"])?;
    let limit = limit.get().to_string();
    launch(
        runner,
        "wpctl",
        &["set-volume", SINK, volume.as_str(), "--limit", limit.as_str()],
    )
}
