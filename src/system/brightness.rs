//! Display brightness through `brightnessctl`.

use super::{launch, query, SystemError};
use crate::traits::CommandRunner;

const PROGRAM: &str = "brightnessctl";

/// Fallback maximum when `brightnessctl max` is unusable.
const DEFAULT_MAX: u32 = 100;

fn parse_level(program_args: &str, raw: &str) -> Result<u32, SystemError> {
    raw.trim().parse().map_err(|_| SystemError::Parse {
        program: format!("{} {}", PROGRAM, program_args),
        output: raw.to_string(),
    })
}

/// The device's maximum raw brightness.  Falls back to `100` when the tool
/// reports nothing usable.
pub fn max_level<R: CommandRunner + ?Sized>(runner: &R) -> u32 {
    query(runner, PROGRAM, &["max"])
        .ok()
        .and_then(|out| parse_level("max", &out).ok())
        .filter(|max| *max > 0)
        .unwrap_or(DEFAULT_MAX)
}

/// Current brightness as a fraction of `max`, clamped to `0.0..=1.0`.
pub fn current<R: CommandRunner + ?Sized>(runner: &R, max: u32) -> Result<f64, SystemError> {
    let raw = parse_level("get", &query(runner, PROGRAM, &["get"])?)?;
    Ok((raw as f64 / max.max(1) as f64).clamp(0.0, 1.0))
}

/// Set brightness to `percent` (clamped to 100).  Fire-and-forget.
pub fn set_percent<R: CommandRunner + ?Sized>(runner: &R, percent: u8) -> Result<(), SystemError> {
    let arg = format!("{}%", percent.min(100));
    launch(runner, PROGRAM, &["set", arg.as_str()])
}

/// Fraction to whole percent, as shown to the user.
pub fn to_percent(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}
