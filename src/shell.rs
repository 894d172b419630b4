//! The orchestrator that ties state, layout editing, settings and OS tools
//! together.
//!
//! [`Shell`] owns the [`ShellState`] and reacts to [`ShellCommand`]s by
//! updating reactive cells, persisting settings and issuing calls through
//! the [`CommandRunner`] trait.

use crate::command::{Passphrase, Request, ShellCommand};
use crate::config::Config;
use crate::editor::LayoutEditor;
use crate::layout::{BarLayout, LayoutError};
use crate::settings::{NotificationTimeout, SettingsCache, SettingsError, WorkspaceCount};
use crate::state::{toggle, ShellState};
use crate::system::network::Station;
use crate::system::wallpaper::{self, ColorScheme};
use crate::system::audio::{self, VolumeLimit};
use crate::system::{brightness, power, SystemError};
use crate::traits::{CommandRunner, LayoutStore};
use log::{debug, info, warn};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Cache key for the last chosen color scheme.
const COLOR_SCHEME_KEY: &str = "colorScheme";

/// Possible errors from handling a command.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("no such file: {0}")]
    MissingFile(String),
}

/// Handles commands against the live shell state.
///
/// Generic over the layout store and the command runner so it can be driven
/// entirely by test doubles.
///
/// # Typical usage
///
/// ```ignore
/// let mut shell = Shell::new(state, editor, settings, ProcessRunner, config);
/// let reply = shell.handle(ShellCommand::ToggleEditMode)?;
/// ```
pub struct Shell<S: LayoutStore, R: CommandRunner> {
    state: ShellState,
    editor: Rc<LayoutEditor<S>>,
    settings: SettingsCache,
    runner: R,
    config: Config,
    station: Option<Station>,
    brightness_max: Option<u32>,
    color_scheme: ColorScheme,
}

impl<S: LayoutStore, R: CommandRunner> Shell<S, R> {
    /// Create a shell.  `editor` must have been built over `state.layout`
    /// and `state.edit_mode`.
    pub fn new(
        state: ShellState,
        editor: Rc<LayoutEditor<S>>,
        settings: SettingsCache,
        runner: R,
        config: Config,
    ) -> Self {
        let color_scheme = settings
            .load_value(COLOR_SCHEME_KEY, String::new())
            .parse::<ColorScheme>()
            .unwrap_or_default();
        state
            .volume_limit
            .set(audio::current_limit(&config.audio.keybinds_path));
        Self {
            state,
            editor,
            settings,
            runner,
            config,
            station: None,
            brightness_max: None,
            color_scheme,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn editor(&self) -> &Rc<LayoutEditor<S>> {
        &self.editor
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    /// Handle `request` and send the reply.  Errors become an
    /// `error: ...` reply; they never propagate.
    pub fn respond(&mut self, request: Request) {
        let reply = match self.handle(request.command.clone()) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: {}", request.command, e);
                format!("error: {}", e)
            }
        };
        request.respond(reply);
    }

    /// Execute one command and return its reply text.
    pub fn handle(&mut self, cmd: ShellCommand) -> Result<String, ShellError> {
        debug!("handle {:?}", cmd);
        match cmd {
            ShellCommand::ToggleLauncher => Ok(toggled(toggle(&self.state.windows.launcher), "launcher")),
            ShellCommand::ToggleSidebar => Ok(toggled(toggle(&self.state.windows.sidebar), "sidebar")),
            ShellCommand::TogglePowerMenu => {
                Ok(toggled(toggle(&self.state.windows.power_menu), "power menu"))
            }
            ShellCommand::ToggleMusicPopup => {
                Ok(toggled(toggle(&self.state.windows.music_popup), "music popup"))
            }
            ShellCommand::ToggleEditMode => {
                let editing = self.editor.toggle_edit_mode();
                Ok(format!(
                    "ok - edit mode is now {}",
                    if editing { "enabled" } else { "disabled" }
                ))
            }

            ShellCommand::ShowLayout => Ok(serde_json::to_string(&self.state.layout.get())
                .map_err(LayoutError::from)?),
            ShellCommand::ResetLayout => {
                self.editor.replace(BarLayout::default());
                info!("bar layout reset to default");
                Ok("ok".into())
            }

            ShellCommand::SetWorkspaceCount(n) => {
                let count = WorkspaceCount::new(n)?;
                self.settings.set_workspace_count(count)?;
                self.state.workspace_count.set(count);
                Ok(format!("ok - workspaces set to {}", n))
            }
            ShellCommand::SetNotificationTimeout(ms) => {
                let timeout = NotificationTimeout::new(ms)?;
                self.settings.set_notification_timeout(timeout)?;
                self.state.notification_timeout.set(timeout);
                Ok(format!("ok - notification timeout set to {}ms", ms))
            }

            ShellCommand::GetBrightness => {
                self.refresh_brightness()?;
                Ok(format!("{}%", brightness::to_percent(self.state.brightness.get())))
            }
            ShellCommand::SetBrightness(pct) => {
                brightness::set_percent(&self.runner, pct)?;
                self.state.brightness.set(f64::from(pct.min(100)) / 100.0);
                Ok("ok".into())
            }

            ShellCommand::WifiScan => {
                self.station().scan(&self.runner)?;
                Ok("ok".into())
            }
            ShellCommand::WifiList => {
                let networks = self.station().networks(&self.runner)?;
                if networks.is_empty() {
                    return Ok("no networks".into());
                }
                Ok(networks
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            ShellCommand::WifiConnect { ssid, passphrase } => {
                self.station()
                    .connect(&self.runner, &ssid, passphrase.as_ref().map(Passphrase::expose))?;
                info!("connecting to {:?}", ssid);
                Ok("ok".into())
            }
            ShellCommand::WifiDisconnect => {
                self.station().disconnect(&self.runner)?;
                Ok("ok".into())
            }

            ShellCommand::ListWallpapers => {
                self.refresh_wallpapers()?;
                let list = self.state.wallpapers.get();
                if list.is_empty() {
                    return Ok(format!("no wallpapers in {}", self.config.wallpaper.directory.display()));
                }
                Ok(list
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            ShellCommand::SetWallpaper(path) => {
                let path = if path.is_relative() {
                    self.config.wallpaper.directory.join(path)
                } else {
                    path
                };
                if !path.is_file() {
                    return Err(ShellError::MissingFile(path.display().to_string()));
                }
                wallpaper::apply(&self.runner, &path, self.color_scheme)?;
                info!("wallpaper {} applied with {}", path.display(), self.color_scheme);
                Ok("ok".into())
            }
            ShellCommand::SetColorScheme(scheme) => {
                wallpaper::regenerate_colors(&self.runner, scheme, None)?;
                self.color_scheme = scheme;
                self.settings.store_value(COLOR_SCHEME_KEY, scheme.as_str())?;
                Ok(format!("ok - color scheme is now {}", scheme))
            }

            ShellCommand::GetVolumeLimit => {
                let limit = audio::current_limit(&self.config.audio.keybinds_path);
                self.state.volume_limit.set(limit);
                Ok(format!("{}%", limit.percent()))
            }
            ShellCommand::SetVolumeLimit(pct) => {
                let limit = VolumeLimit::from_percent(pct)?;
                audio::set_limit(&self.runner, &self.config.audio.keybinds_path, limit)?;
                self.state.volume_limit.set(limit);
                Ok(format!("ok - volume limit set to {}%", pct))
            }

            ShellCommand::Power(action) => {
                self.state.windows.power_menu.set(false);
                power::perform(&self.runner, action)?;
                info!("power action: {}", action);
                Ok("ok".into())
            }
        }
    }

    /// Serve requests from `cmd_rx` until every sender is gone, calling
    /// [`tick`](Self::tick) at least every `poll_interval` however busy the
    /// channel is.
    pub fn run_blocking(&mut self, cmd_rx: &mpsc::Receiver<Request>, poll_interval: Duration) {
        let mut next_poll = Instant::now();
        loop {
            let now = Instant::now();
            if now >= next_poll {
                self.tick();
                next_poll = now + poll_interval;
            }
            match cmd_rx.recv_timeout(next_poll.saturating_duration_since(Instant::now())) {
                Ok(request) => self.respond(request),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Re-read values that change outside the shell.  Failures are logged
    /// and leave the previous values in place.
    pub fn tick(&mut self) {
        if let Err(e) = self.refresh_brightness() {
            debug!("brightness refresh failed: {}", e);
        }
        if let Err(e) = self.refresh_wallpapers() {
            debug!("wallpaper refresh failed: {}", e);
        }
    }

    fn refresh_brightness(&mut self) -> Result<(), SystemError> {
        let max = match self.brightness_max {
            Some(max) => max,
            None => {
                let max = brightness::max_level(&self.runner);
                self.brightness_max = Some(max);
                max
            }
        };
        let level = brightness::current(&self.runner, max)?;
        self.state.brightness.set(level);
        Ok(())
    }

    fn refresh_wallpapers(&mut self) -> Result<(), SystemError> {
        let list = wallpaper::list(&self.config.wallpaper.directory)?;
        let before = self.state.wallpapers.with(Vec::len);
        if self.state.wallpapers.set(list) {
            info!(
                "wallpapers changed: {} -> {}",
                before,
                self.state.wallpapers.with(Vec::len)
            );
        }
        Ok(())
    }

    /// The wireless station, discovered on first use.
    fn station(&mut self) -> Station {
        let runner = &self.runner;
        self.station
            .get_or_insert_with(|| {
                let station = Station::discover(runner);
                info!("using wireless station {}", station.device());
                station
            })
            .clone()
    }
}

fn toggled(visible: bool, what: &str) -> String {
    debug!("{} {}", what, if visible { "shown" } else { "hidden" });
    "ok".into()
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Slot, WidgetKind};
    use crate::system::testing::FakeRunner;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    #[derive(Debug, Default, Clone)]
    struct RecorderStore {
        saves: Rc<RefCell<Vec<BarLayout>>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl LayoutStore for RecorderStore {
        type Error = RecorderErr;

        fn save(&self, layout: &BarLayout) -> Result<(), RecorderErr> {
            self.saves.borrow_mut().push(layout.clone());
            Ok(())
        }
    }

    struct Fixture {
        shell: Shell<RecorderStore, FakeRunner>,
        store: RecorderStore,
        dir: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn fixture(runner: FakeRunner) -> Fixture {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("shellbar-shell-test-{}-{}", std::process::id(), id));
        let walls = dir.join("walls");
        std::fs::create_dir_all(&walls).unwrap();

        let mut config = Config::default();
        config.wallpaper.directory = walls;
        config.audio.keybinds_path = dir.join("keybinds.conf");

        let state = ShellState::default();
        let store = RecorderStore::default();
        let editor = Rc::new(LayoutEditor::new(
            state.layout.clone(),
            state.edit_mode.clone(),
            store.clone(),
        ));
        let settings = SettingsCache::new(dir.join("settings.json"));
        Fixture {
            shell: Shell::new(state, editor, settings, runner, config),
            store,
            dir,
        }
    }

    #[test]
    fn window_toggles_flip_state() {
        let mut f = fixture(FakeRunner::default());
        assert_eq!(f.shell.handle(ShellCommand::ToggleLauncher).unwrap(), "ok");
        assert!(f.shell.state().windows.launcher.get());
        f.shell.handle(ShellCommand::ToggleLauncher).unwrap();
        assert!(!f.shell.state().windows.launcher.get());
        f.shell.handle(ShellCommand::TogglePowerMenu).unwrap();
        f.shell.handle(ShellCommand::ToggleMusicPopup).unwrap();
        f.shell.handle(ShellCommand::ToggleSidebar).unwrap();
        let w = &f.shell.state().windows;
        assert!(w.power_menu.get() && w.music_popup.get() && w.sidebar.get());
    }

    #[test]
    fn edit_mode_reply_reports_new_state() {
        let mut f = fixture(FakeRunner::default());
        assert_eq!(
            f.shell.handle(ShellCommand::ToggleEditMode).unwrap(),
            "ok - edit mode is now enabled"
        );
        assert!(f.shell.editor().is_editing());
        assert_eq!(
            f.shell.handle(ShellCommand::ToggleEditMode).unwrap(),
            "ok - edit mode is now disabled"
        );
    }

    #[test]
    fn reset_layout_persists_default() {
        let mut f = fixture(FakeRunner::default());
        f.shell
            .state()
            .layout
            .set(BarLayout::new(vec![WidgetKind::Battery], vec![], vec![]));
        f.shell.handle(ShellCommand::ResetLayout).unwrap();
        assert_eq!(f.shell.state().layout.get(), BarLayout::default());
        assert_eq!(*f.store.saves.borrow(), vec![BarLayout::default()]);
    }

    #[test]
    fn editor_drop_is_visible_through_shell_state() {
        let mut f = fixture(FakeRunner::default());
        f.shell.handle(ShellCommand::ToggleEditMode).unwrap();
        let editor = Rc::clone(f.shell.editor());
        editor.begin_drag(WidgetKind::Clock);
        assert!(editor.drop_on_zone(Slot::Center));
        let json = f.shell.handle(ShellCommand::ShowLayout).unwrap();
        assert_eq!(
            json,
            r#"{"left":["settings"],"center":["workspaces","clock"],"right":["tray","sidebar","battery"]}"#
        );
    }

    #[test]
    fn workspace_count_validated_and_persisted() {
        let mut f = fixture(FakeRunner::default());
        assert!(f.shell.handle(ShellCommand::SetWorkspaceCount(0)).is_err());
        assert_eq!(f.shell.state().workspace_count.get(), WorkspaceCount::DEFAULT);
        f.shell.handle(ShellCommand::SetWorkspaceCount(9)).unwrap();
        assert_eq!(f.shell.state().workspace_count.get().get(), 9);
        assert_eq!(SettingsCache::new(f.dir.join("settings.json")).workspace_count().get(), 9);
    }

    #[test]
    fn notification_timeout_validated() {
        let mut f = fixture(FakeRunner::default());
        assert!(f.shell.handle(ShellCommand::SetNotificationTimeout(40_000)).is_err());
        f.shell.handle(ShellCommand::SetNotificationTimeout(8_000)).unwrap();
        assert_eq!(f.shell.state().notification_timeout.get().millis(), 8_000);
    }

    #[test]
    fn brightness_round_trip() {
        let runner = FakeRunner::default()
            .with("brightnessctl max", "200")
            .with("brightnessctl get", "50");
        let mut f = fixture(runner);
        assert_eq!(f.shell.handle(ShellCommand::GetBrightness).unwrap(), "25%");
        f.shell.handle(ShellCommand::SetBrightness(80)).unwrap();
        assert_eq!(f.shell.state().brightness.get(), 0.8);
    }

    #[test]
    fn wifi_list_discovers_station_once() {
        let runner = FakeRunner::default()
            .with("iwctl device list", "  wlan1   xx   on   phy0   station")
            .with(
                "iwctl station wlan1 get-networks",
                "  Network name    Security   Signal\n  > home   psk   ****\n  other   open   **",
            );
        let mut f = fixture(runner);
        let out = f.shell.handle(ShellCommand::WifiList).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("> home"));
        f.shell.handle(ShellCommand::WifiDisconnect).unwrap();
        let calls = f.shell.runner.calls.borrow();
        assert_eq!(calls.iter().filter(|c| *c == "iwctl device list").count(), 1);
    }

    #[test]
    fn system_failure_becomes_error_reply() {
        let mut f = fixture(FakeRunner::default());
        let (req, rx) = Request::new(ShellCommand::GetBrightness);
        f.shell.respond(req);
        assert!(rx.recv().unwrap().starts_with("error: failed to run brightnessctl"));
    }

    #[test]
    fn wallpapers_listed_and_applied() {
        let mut f = fixture(FakeRunner::default());
        let walls = f.dir.join("walls");
        std::fs::write(walls.join("sea.png"), b"x").unwrap();
        let out = f.shell.handle(ShellCommand::ListWallpapers).unwrap();
        assert!(out.ends_with("sea.png"));
        assert_eq!(f.shell.state().wallpapers.get().len(), 1);

        f.shell
            .handle(ShellCommand::SetWallpaper(PathBuf::from("sea.png")))
            .unwrap();
        assert_eq!(f.shell.runner.spawned.borrow().len(), 1);
        assert!(matches!(
            f.shell.handle(ShellCommand::SetWallpaper(PathBuf::from("none.png"))),
            Err(ShellError::MissingFile(_))
        ));
    }

    #[test]
    fn color_scheme_is_remembered() {
        let runner = FakeRunner::default().with(
            "awww query",
            "eDP-1: 1920x1080, scale: 1, currently displaying: image: /w/a.png",
        );
        let mut f = fixture(runner);
        assert_eq!(f.shell.color_scheme(), ColorScheme::TonalSpot);
        f.shell
            .handle(ShellCommand::SetColorScheme(ColorScheme::Monochrome))
            .unwrap();
        assert_eq!(f.shell.color_scheme(), ColorScheme::Monochrome);
        let cache = SettingsCache::new(f.dir.join("settings.json"));
        assert_eq!(cache.load_value(COLOR_SCHEME_KEY, String::new()), "scheme-monochrome");
    }

    #[test]
    fn power_action_hides_menu_and_spawns() {
        let mut f = fixture(FakeRunner::default());
        f.shell.handle(ShellCommand::TogglePowerMenu).unwrap();
        f.shell
            .handle(ShellCommand::Power(power::PowerAction::Reboot))
            .unwrap();
        assert!(!f.shell.state().windows.power_menu.get());
        assert_eq!(*f.shell.runner.spawned.borrow(), vec!["systemctl reboot".to_string()]);
    }

    #[test]
    fn volume_limit_read_and_written() {
        let runner = FakeRunner::default().with("wpctl get-volume @DEFAULT_AUDIO_SINK@", "Volume: 0.50");
        let mut f = fixture(runner);
        let keybinds = f.dir.join("keybinds.conf");
        std::fs::write(&keybinds, "binde = , XF86AudioRaiseVolume, exec, wpctl set-volume --limit=1.0 @DEFAULT_AUDIO_SINK@ 5%+\n").unwrap();

        assert_eq!(f.shell.handle(ShellCommand::GetVolumeLimit).unwrap(), "100%");
        assert!(f.shell.handle(ShellCommand::SetVolumeLimit(600)).is_err());
        f.shell.handle(ShellCommand::SetVolumeLimit(150)).unwrap();
        assert_eq!(f.shell.state().volume_limit.get().percent(), 150);
        assert_eq!(f.shell.handle(ShellCommand::GetVolumeLimit).unwrap(), "150%");
    }

    #[test]
    fn busy_channel_does_not_starve_refresh() {
        let mut f = fixture(FakeRunner::default());
        let (tx, rx) = mpsc::channel();
        let sender = std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(150);
            while Instant::now() < deadline {
                let (req, _reply) = Request::new(ShellCommand::ShowLayout);
                if tx.send(req).is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
        });
        f.shell.run_blocking(&rx, Duration::from_millis(20));
        sender.join().unwrap();

        let refreshes = f
            .shell
            .runner
            .calls
            .borrow()
            .iter()
            .filter(|c| *c == "brightnessctl get")
            .count();
        assert!(refreshes >= 3, "only {} refreshes", refreshes);
    }

    #[test]
    fn tick_tolerates_missing_tools() {
        let mut f = fixture(FakeRunner::default());
        f.shell.state().brightness.set(0.3);
        f.shell.tick();
        assert_eq!(f.shell.state().brightness.get(), 0.3);
    }
}
