//! Wireless networking through iwd's `iwctl`.
//!
//! `iwctl` has no machine-readable output, so its tables are parsed with
//! the same column heuristics a person would use: rows are split on runs of
//! two or more spaces, and a leading `>` marks the connected network.

use super::{launch, query, SystemError};
use crate::traits::CommandRunner;
use log::debug;
use std::fmt;

const PROGRAM: &str = "iwctl";

/// Station used when `iwctl device list` names none.
pub const FALLBACK_DEVICE: &str = "wlan0";

/// One row of `iwctl station <dev> get-networks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    pub name: String,
    pub connected: bool,
    /// `psk`, `open`, `8021x`, …; `unknown` when the column is missing.
    pub security: String,
    /// Star rating as printed by iwctl; `****` when the column is missing.
    pub signal: String,
}

impl WifiNetwork {
    pub fn is_open(&self) -> bool {
        self.security == "open"
    }
}

impl fmt::Display for WifiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            if self.connected { ">" } else { " " },
            self.name,
            self.security,
            self.signal
        )
    }
}

fn is_wireless_interface(word: &str) -> bool {
    ["wlan", "wlp", "wlo"].iter().any(|p| word.starts_with(p))
}

/// Pick the station interface out of `iwctl device list` output.
pub fn parse_device(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.contains("station"))
        .flat_map(|line| line.split_whitespace())
        .find(|word| is_wireless_interface(word))
        .map(str::to_string)
}

/// Split a table row on runs of two or more spaces.
fn columns(line: &str) -> Vec<&str> {
    let mut cols = Vec::new();
    let mut start = None;
    let mut spaces = 0;
    for (i, c) in line.char_indices() {
        if c == ' ' {
            spaces += 1;
            if spaces == 2 {
                if let Some(s) = start.take() {
                    // `i - 1` is the first of the two spaces.
                    cols.push(line[s..i - 1].trim());
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            spaces = 0;
        }
    }
    if let Some(s) = start {
        cols.push(line[s..].trim());
    }
    cols.retain(|c| !c.is_empty());
    cols
}

/// Parse `iwctl station <dev> get-networks` output.  Connected networks
/// sort first; the rest keep iwctl's order.
pub fn parse_networks(output: &str) -> Vec<WifiNetwork> {
    let mut networks: Vec<WifiNetwork> = output
        .lines()
        .filter(|line| {
            !line.trim().is_empty()
                && !line.contains("Network name")
                && !line.contains("----")
                && !line.contains("Available networks")
        })
        .filter_map(|line| {
            let trimmed = line.trim();
            let connected = trimmed.starts_with('>');
            let cols = columns(trimmed.trim_start_matches('>').trim());
            if cols.len() < 2 {
                debug!("skipping iwctl row {:?}", line);
                return None;
            }
            Some(WifiNetwork {
                name: cols[0].to_string(),
                connected,
                security: cols.get(1).copied().unwrap_or("unknown").to_string(),
                signal: cols.get(2).copied().unwrap_or("****").to_string(),
            })
        })
        .collect();
    networks.sort_by_key(|n| !n.connected);
    networks
}

/// Handle to the wireless station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    device: String,
}

impl Station {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Find the station through `iwctl device list`, falling back to
    /// [`FALLBACK_DEVICE`].
    pub fn discover<R: CommandRunner + ?Sized>(runner: &R) -> Self {
        let device = query(runner, PROGRAM, &["device", "list"])
            .ok()
            .and_then(|out| parse_device(&out))
            .unwrap_or_else(|| FALLBACK_DEVICE.to_string());
        Self { device }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Ask iwd to rescan.  Fire-and-forget; results show up in
    /// [`networks`](Self::networks) a moment later.
    pub fn scan<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<(), SystemError> {
        launch(runner, PROGRAM, &["station", self.device.as_str(), "scan"])
    }

    pub fn networks<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<Vec<WifiNetwork>, SystemError> {
        let out = query(runner, PROGRAM, &["station", self.device.as_str(), "get-networks"])?;
        Ok(parse_networks(&out))
    }

    pub fn connect<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        ssid: &str,
        passphrase: Option<&str>,
    ) -> Result<(), SystemError> {
        let mut args = vec!["station", self.device.as_str(), "connect", ssid];
        if let Some(pass) = passphrase {
            args.extend(["--passphrase", pass]);
        }
        launch(runner, PROGRAM, &args)
    }

    pub fn disconnect<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<(), SystemError> {
        launch(runner, PROGRAM, &["station", self.device.as_str(), "disconnect"])
    }
}
