//! Core traits that decouple shellbar from the filesystem, the transport
//! that delivers commands, and the OS tools the shell drives.
//!
//! Every concrete backend (a JSON file, a Unix-socket listener, real child
//! processes, a test double, …) implements one of these traits.  The
//! [`Shell`](crate::shell::Shell) and the
//! [`LayoutEditor`](crate::editor::LayoutEditor) only depend on these
//! abstractions.

use crate::command::Request;
use crate::layout::BarLayout;
use std::sync::mpsc;

/// Somewhere a [`BarLayout`] can be persisted after every reorder.
pub trait LayoutStore {
    /// The error type produced by this store.
    type Error: std::error::Error + 'static;

    /// Overwrite the stored layout with `layout`.
    fn save(&self, layout: &BarLayout) -> Result<(), Self::Error>;
}

/// Captured result of running an external program to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramOutput {
    /// Whether the program exited with status 0.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Abstraction over spawning OS command-line tools.
///
/// The real implementation is
/// [`ProcessRunner`](crate::system::runner::ProcessRunner); tests substitute a
/// double that returns canned output.
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it to exit.
    fn output(&self, program: &str, args: &[&str]) -> std::io::Result<ProgramOutput>;

    /// Start `program` with `args` without waiting for it.
    fn spawn(&self, program: &str, args: &[&str]) -> std::io::Result<()>;
}

/// A source of [`Request`]s.
///
/// Implementations listen on some transport and forward parsed requests into
/// the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Request`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Request>) -> Result<(), Self::Error>;
}
