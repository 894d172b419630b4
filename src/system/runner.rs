//! [`CommandRunner`] backed by real child processes.

use crate::traits::{CommandRunner, ProgramOutput};
use log::debug;
use std::process::{Command, Stdio};

/// Spawns programs with [`std::process::Command`].
///
/// Fire-and-forget children are reaped on a short-lived thread so they never
/// linger as zombies.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn output(&self, program: &str, args: &[&str]) -> std::io::Result<ProgramOutput> {
        debug!("run {} {:?}", program, args);
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        Ok(ProgramOutput {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> std::io::Result<()> {
        debug!("spawn {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()?;
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}
