//! Wrappers around the OS command-line tools the shell drives.
//!
//! Every tool is invoked through the [`CommandRunner`](crate::traits::CommandRunner)
//! trait, so the text parsing in this module is tested against canned
//! output and never needs the tools installed.
//!
//! Nothing outside this module should spawn `brightnessctl`, `iwctl`,
//! `awww`, `matugen`, `wpctl`, `hyprctl`, `hyprlock` or `systemctl`
//! directly.

pub mod audio;
pub mod brightness;
pub mod network;
pub mod power;
pub mod runner;
pub mod wallpaper;

use crate::traits::{CommandRunner, ProgramOutput};

/// Errors from invoking or parsing an OS tool.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with an error: {stderr}")]
    Failed { program: String, stderr: String },
    #[error("unexpected output from {program}: {output:?}")]
    Parse { program: String, output: String },
    #[error("{what} must be between {min} and {max}, got {value}")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("no --limit= option in {0}")]
    MissingLimit(std::path::PathBuf),
    #[error("unknown color scheme: {0:?}")]
    UnknownScheme(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run `program` to completion and return its stdout with ANSI escapes
/// stripped and surrounding whitespace trimmed.
pub(crate) fn query<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Result<String, SystemError> {
    let ProgramOutput {
        success,
        stdout,
        stderr,
    } = runner
        .output(program, args)
        .map_err(|source| SystemError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !success {
        return Err(SystemError::Failed {
            program: program.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(strip_ansi_escapes::strip_str(&stdout).trim().to_string())
}

/// Start `program` without waiting for it.
pub(crate) fn launch<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Result<(), SystemError> {
    runner
        .spawn(program, args)
        .map_err(|source| SystemError::Spawn {
            program: program.to_string(),
            source,
        })
}
