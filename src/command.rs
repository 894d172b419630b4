//! The command surface of the shell.
//!
//! Commands arrive as plain strings, one per line, e.g. from a compositor
//! keybind running `shellbar msg toggle-edit-mode`.  [`ShellCommand`] parses
//! them and [`Request`] pairs a command with the channel its reply goes back
//! on.
//!
//! The five window toggles keep their historic wire names (`toggle`,
//! `RightSidebar`, `toggle-powermenu`, `toggle-edit-mode`, `music-popup`) so
//! existing keybinds keep working.

use crate::system::power::PowerAction;
use crate::system::wallpaper::ColorScheme;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc;

/// Every action the shell can perform on request.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Show or hide the application launcher.
    ToggleLauncher,
    /// Show or hide the right sidebar.
    ToggleSidebar,
    /// Show or hide the power menu.
    TogglePowerMenu,
    /// Switch the bar between viewing and editing.
    ToggleEditMode,
    /// Show or hide the music popup.
    ToggleMusicPopup,

    /// Print the current bar layout as JSON.
    ShowLayout,
    /// Restore and persist the default bar layout.
    ResetLayout,

    /// Set how many workspace indicators the bar shows (1..=10).
    SetWorkspaceCount(u32),
    /// Set how long notification popups stay up, in milliseconds.
    SetNotificationTimeout(u32),

    /// Report the display brightness as a percentage.
    GetBrightness,
    /// Set the display brightness to a percentage (0..=100).
    SetBrightness(u8),

    /// Ask the wireless station to rescan.
    WifiScan,
    /// List known wireless networks, connected first.
    WifiList,
    /// Connect to a network, optionally with a passphrase.
    WifiConnect {
        ssid: String,
        passphrase: Option<Passphrase>,
    },
    /// Disconnect the wireless station.
    WifiDisconnect,

    /// List wallpaper images.
    ListWallpapers,
    /// Set the wallpaper and regenerate colors from it.
    SetWallpaper(PathBuf),
    /// Regenerate colors from the current wallpaper with a new scheme.
    SetColorScheme(ColorScheme),

    /// Report the maximum output volume as a percentage.
    GetVolumeLimit,
    /// Set the maximum output volume as a percentage (1..=500).
    SetVolumeLimit(u16),

    /// Lock, hibernate, reboot or power off.
    Power(PowerAction),
}

/// A wireless passphrase.  Neither `Debug` nor `Display` reveal it.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret itself, for handing to `iwctl`.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Passphrase {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Why a command string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("unknown command")]
    Unknown(String),
    #[error("{command}: {reason}")]
    BadArgument { command: &'static str, reason: String },
}

fn bad(command: &'static str, reason: impl Into<String>) -> ParseCommandError {
    ParseCommandError::BadArgument {
        command,
        reason: reason.into(),
    }
}

fn parse_number<T: FromStr>(command: &'static str, arg: &str) -> Result<T, ParseCommandError> {
    if arg.is_empty() {
        return Err(bad(command, "missing argument"));
    }
    arg.parse()
        .map_err(|_| bad(command, format!("expected a number, got {:?}", arg)))
}

/// Split `connect` arguments into ssid and optional passphrase.  The ssid is
/// everything before `--passphrase`, so it may contain spaces.
fn parse_connect(rest: &str) -> Result<ShellCommand, ParseCommandError> {
    let (ssid, passphrase) = match rest.split_once("--passphrase") {
        Some((ssid, pass)) => {
            let pass = pass.trim();
            if pass.is_empty() {
                return Err(bad("wifi-connect", "--passphrase needs a value"));
            }
            (ssid.trim(), Some(Passphrase::new(pass)))
        }
        None => (rest.trim(), None),
    };
    if ssid.is_empty() {
        return Err(bad("wifi-connect", "missing network name"));
    }
    Ok(ShellCommand::WifiConnect {
        ssid: ssid.to_string(),
        passphrase,
    })
}

impl FromStr for ShellCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, rest) = match s.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (s, ""),
        };
        let cmd = match name {
            "toggle" => ShellCommand::ToggleLauncher,
            "RightSidebar" => ShellCommand::ToggleSidebar,
            "toggle-powermenu" => ShellCommand::TogglePowerMenu,
            "toggle-edit-mode" => ShellCommand::ToggleEditMode,
            "music-popup" => ShellCommand::ToggleMusicPopup,
            "layout" => ShellCommand::ShowLayout,
            "layout-reset" => ShellCommand::ResetLayout,
            "workspaces" => ShellCommand::SetWorkspaceCount(parse_number("workspaces", rest)?),
            "notification-timeout" => {
                ShellCommand::SetNotificationTimeout(parse_number("notification-timeout", rest)?)
            }
            "brightness" if rest.is_empty() => ShellCommand::GetBrightness,
            "brightness" => {
                let pct: u8 = parse_number("brightness", rest.trim_end_matches('%'))?;
                if pct > 100 {
                    return Err(bad("brightness", "percentage must be 0..=100"));
                }
                ShellCommand::SetBrightness(pct)
            }
            "wifi-scan" => ShellCommand::WifiScan,
            "wifi-list" => ShellCommand::WifiList,
            "wifi-connect" => parse_connect(rest)?,
            "wifi-disconnect" => ShellCommand::WifiDisconnect,
            "wallpapers" => ShellCommand::ListWallpapers,
            "wallpaper" if rest.is_empty() => return Err(bad("wallpaper", "missing path")),
            "wallpaper" => ShellCommand::SetWallpaper(PathBuf::from(rest)),
            "color-scheme" => ShellCommand::SetColorScheme(
                rest.parse()
                    .map_err(|e: crate::system::SystemError| bad("color-scheme", e.to_string()))?,
            ),
            "volume-limit" if rest.is_empty() => ShellCommand::GetVolumeLimit,
            "volume-limit" => {
                let pct: u16 = parse_number("volume-limit", rest.trim_end_matches('%'))?;
                if !(1..=500).contains(&pct) {
                    return Err(bad("volume-limit", "percentage must be 1..=500"));
                }
                ShellCommand::SetVolumeLimit(pct)
            }
            "lock" => ShellCommand::Power(PowerAction::Lock),
            "hibernate" => ShellCommand::Power(PowerAction::Hibernate),
            "reboot" => ShellCommand::Power(PowerAction::Reboot),
            "poweroff" => ShellCommand::Power(PowerAction::PowerOff),
            _ => return Err(ParseCommandError::Unknown(s.to_string())),
        };
        // Toggles and power actions take no arguments.
        if !rest.is_empty() && (cmd.is_toggle() || matches!(cmd, ShellCommand::Power(_))) {
            return Err(bad("toggle", format!("unexpected argument {:?}", rest)));
        }
        Ok(cmd)
    }
}

impl ShellCommand {
    /// Whether this command only flips a boolean.
    pub fn is_toggle(&self) -> bool {
        matches!(
            self,
            ShellCommand::ToggleLauncher
                | ShellCommand::ToggleSidebar
                | ShellCommand::TogglePowerMenu
                | ShellCommand::ToggleEditMode
                | ShellCommand::ToggleMusicPopup
        )
    }

    /// The exact line that parses back into this command.  Unlike
    /// `Display`, this includes the wifi passphrase.
    pub fn to_wire(&self) -> String {
        match self {
            ShellCommand::WifiConnect {
                ssid,
                passphrase: Some(p),
            } => format!("wifi-connect {} --passphrase {}", ssid, p.expose()),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellCommand::ToggleLauncher => write!(f, "toggle"),
            ShellCommand::ToggleSidebar => write!(f, "RightSidebar"),
            ShellCommand::TogglePowerMenu => write!(f, "toggle-powermenu"),
            ShellCommand::ToggleEditMode => write!(f, "toggle-edit-mode"),
            ShellCommand::ToggleMusicPopup => write!(f, "music-popup"),
            ShellCommand::ShowLayout => write!(f, "layout"),
            ShellCommand::ResetLayout => write!(f, "layout-reset"),
            ShellCommand::SetWorkspaceCount(n) => write!(f, "workspaces {}", n),
            ShellCommand::SetNotificationTimeout(ms) => write!(f, "notification-timeout {}", ms),
            ShellCommand::GetBrightness => write!(f, "brightness"),
            ShellCommand::SetBrightness(pct) => write!(f, "brightness {}", pct),
            ShellCommand::WifiScan => write!(f, "wifi-scan"),
            ShellCommand::WifiList => write!(f, "wifi-list"),
            ShellCommand::WifiConnect { ssid, passphrase: None } => write!(f, "wifi-connect {}", ssid),
            ShellCommand::WifiConnect { ssid, passphrase: Some(_) } => {
                write!(f, "wifi-connect {} --passphrase ***", ssid)
            }
            ShellCommand::WifiDisconnect => write!(f, "wifi-disconnect"),
            ShellCommand::ListWallpapers => write!(f, "wallpapers"),
            ShellCommand::SetWallpaper(path) => write!(f, "wallpaper {}", path.display()),
            ShellCommand::SetColorScheme(scheme) => write!(f, "color-scheme {}", scheme),
            ShellCommand::GetVolumeLimit => write!(f, "volume-limit"),
            ShellCommand::SetVolumeLimit(pct) => write!(f, "volume-limit {}", pct),
            ShellCommand::Power(action) => write!(f, "{}", action),
        }
    }
}

/// A command plus the channel its single reply line is sent on.
#[derive(Debug)]
pub struct Request {
    pub command: ShellCommand,
    pub reply: mpsc::Sender<String>,
}

impl Request {
    /// Wrap `command`, returning the receiving end of its reply channel.
    pub fn new(command: ShellCommand) -> (Self, mpsc::Receiver<String>) {
        let (reply, rx) = mpsc::channel();
        (Self { command, reply }, rx)
    }

    /// Send `text` back to the requester.  A requester that went away is
    /// not an error.
    pub fn respond(self, text: impl Into<String>) {
        let _ = self.reply.send(text.into());
    }
}
