//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a [`ShellCommand`].
//!
//! # Wire format
//!
//! Requests are plain command lines:
//!
//! ```text
//! toggle-edit-mode
//! wifi-connect Cafe Guest --passphrase hunter2
//! ```
//!
//! Every request gets exactly one reply line: the reply text encoded as a
//! JSON string, so multi-line replies stay on one line.
//!
//! ```text
//! "ok - edit mode is now enabled"
//! "> home psk ****\n  other open **"
//! ```

use crate::command::{ParseCommandError, Request, ShellCommand};
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// How long a client waits for the main loop to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a connected client may stay silent before it is dropped.
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// A [`CommandSource`] that listens on a Unix stream socket.
///
/// Each accepted connection can send multiple newline-delimited commands.
/// When the connection closes, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
    read_timeout: Duration,
}

/// Errors produced by the Unix socket transport.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_timeout: CLIENT_READ_TIMEOUT,
        }
    }

    /// Drop clients that send nothing for `timeout`.  Connections are
    /// served one at a time, so this bounds how long an idle client can
    /// hold up the next one.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reply text for a line that failed to parse.
fn parse_error_reply(e: &ParseCommandError) -> String {
    match e {
        ParseCommandError::Unknown(_) => "unknown command".into(),
        other => format!("error: {}", other),
    }
}

/// Write `text` as one JSON-string line.
fn write_reply(stream: &mut UnixStream, text: &str) -> Result<(), UnixSocketError> {
    let encoded = serde_json::to_string(text)?;
    writeln!(stream, "{}", encoded)?;
    Ok(())
}

/// Serve one connection.  Returns `false` once the sink is closed.
fn serve(stream: UnixStream, sink: &mpsc::Sender<Request>) -> Result<bool, UnixSocketError> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let text = line?;
        if text.trim().is_empty() {
            continue;
        }
        let reply = match text.parse::<ShellCommand>() {
            Ok(cmd) => {
                debug!("received {:?}", cmd);
                let (request, rx) = Request::new(cmd);
                if sink.send(request).is_err() {
                    info!("sink closed, shutting down");
                    write_reply(&mut writer, "error: shell is shutting down")?;
                    return Ok(false);
                }
                rx.recv_timeout(REPLY_TIMEOUT)
                    .unwrap_or_else(|_| "error: no reply from shell".into())
            }
            Err(e) => {
                warn!("bad command: {:?}: {}", text, e);
                parse_error_reply(&e)
            }
        };
        write_reply(&mut writer, &reply)?;
    }
    Ok(true)
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Request>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    if let Err(e) = stream.set_read_timeout(Some(self.read_timeout)) {
                        warn!("cannot set client read timeout: {}", e);
                        continue;
                    }
                    match serve(stream, &sink) {
                        Ok(true) => debug!("client disconnected"),
                        Ok(false) => return Ok(()),
                        Err(UnixSocketError::Io(e))
                            if matches!(
                                e.kind(),
                                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                            ) =>
                        {
                            debug!("client idle for {:?}, dropped", self.read_timeout)
                        }
                        Err(e) => error!("client error: {}", e),
                    }
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::client::send_command;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("shellbar-test-{}-{}.sock", std::process::id(), id))
    }

    /// Start a listener plus a fake main loop that answers every request
    /// with `handled <command>`.  Returns the commands the loop saw.
    fn start(path: &Path) -> mpsc::Receiver<ShellCommand> {
        let (tx, rx) = mpsc::channel::<Request>();
        let (seen_tx, seen_rx) = mpsc::channel();

        let listen_path = path.to_path_buf();
        std::thread::spawn(move || {
            let mut listener =
                UnixSocketListener::new(&listen_path).with_read_timeout(Duration::from_millis(100));
            let _ = listener.run(tx);
        });
        std::thread::spawn(move || {
            for request in rx {
                let _ = seen_tx.send(request.command.clone());
                let text = format!("handled {}", request.command);
                request.respond(text);
            }
        });

        // Give the listener a moment to bind.
        std::thread::sleep(Duration::from_millis(150));
        seen_rx
    }

    #[test]
    fn commands_round_trip_with_replies() {
        let path = tmp_socket_path();
        let seen = start(&path);

        assert_eq!(send_command(&path, "toggle-edit-mode").unwrap(), "handled toggle-edit-mode");
        assert_eq!(send_command(&path, "RightSidebar").unwrap(), "handled RightSidebar");

        let cmds: Vec<ShellCommand> = seen.try_iter().collect();
        assert_eq!(cmds, vec![ShellCommand::ToggleEditMode, ShellCommand::ToggleSidebar]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_command_is_answered_without_reaching_the_shell() {
        let path = tmp_socket_path();
        let seen = start(&path);

        assert_eq!(send_command(&path, "make-coffee").unwrap(), "unknown command");
        assert!(send_command(&path, "workspaces lots").unwrap().starts_with("error: workspaces"));
        assert_eq!(seen.try_iter().count(), 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn silent_client_is_dropped_so_others_get_through() {
        let path = tmp_socket_path();
        let _seen = start(&path);

        let _idle = UnixStream::connect(&path).expect("connect");
        let started = std::time::Instant::now();
        assert_eq!(send_command(&path, "toggle").unwrap(), "handled toggle");
        assert!(started.elapsed() < Duration::from_secs(2));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn several_commands_on_one_connection() {
        let path = tmp_socket_path();
        let _seen = start(&path);

        let mut stream = UnixStream::connect(&path).expect("connect");
        writeln!(stream, "toggle").unwrap();
        writeln!(stream).unwrap();
        writeln!(stream, "music-popup").unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();

        let replies: Vec<String> = BufReader::new(stream)
            .lines()
            .map(|l| serde_json::from_str::<String>(&l.unwrap()).unwrap())
            .collect();
        assert_eq!(replies, vec!["handled toggle", "handled music-popup"]);

        let _ = std::fs::remove_file(&path);
    }
}
