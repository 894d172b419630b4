//! Client side of the socket protocol, used by `shellbar msg`.

use super::listener::UnixSocketError;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Send one command line to the daemon at `path` and return its reply.
pub fn send_command(path: &Path, command: &str) -> Result<String, UnixSocketError> {
    let mut stream = UnixStream::connect(path)?;
    writeln!(stream, "{}", command.trim())?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(UnixSocketError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "daemon closed the connection without replying",
        )));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}
