//! IPC over a Unix socket.
//!
//! Keybind helpers and scripts connect to the socket, send one command per
//! line and read one reply per line.  `shellbar msg <command>` is a thin
//! client over the same protocol.

pub mod client;
pub mod listener;
