//! Entry point for the **shellbar** daemon and its command client.
//!
//! * `shellbar` starts the daemon: it restores the layout and settings,
//!   listens on the command socket and processes commands on the main thread.
//! * `shellbar msg <command...>` sends one command to a running daemon and
//!   prints the reply.
//!
//! When the `bar-gtk` feature is enabled the main thread runs the GLib main
//! loop (GTK4 requires it) and polls the command channel from there.
//! Without the feature, a blocking loop is used and state changes are logged.

use log::{error, info};
use shellbar::command::Request;
use shellbar::config::{self, Config};
use shellbar::editor::LayoutEditor;
use shellbar::ipc::client::send_command;
use shellbar::ipc::listener::UnixSocketListener;
use shellbar::layout::JsonLayoutStore;
use shellbar::settings::SettingsCache;
use shellbar::shell::Shell;
use shellbar::state::ShellState;
use shellbar::system::runner::ProcessRunner;
use shellbar::traits::{CommandRunner, CommandSource, LayoutStore};
use std::rc::Rc;
use std::sync::mpsc;

/// Try to load the config from `$XDG_CONFIG_HOME/shellbar/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config::config_path();
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("msg") => run_client(&args[1..]),
        Some(other) => {
            eprintln!("unknown argument {:?}\nusage: shellbar [msg <command...>]", other);
            std::process::exit(2);
        }
        None => run_daemon(),
    }
}

/// `shellbar msg <command...>`.
fn run_client(words: &[String]) {
    if words.is_empty() {
        eprintln!("usage: shellbar msg <command...>");
        std::process::exit(2);
    }
    let path = config::socket_path();
    match send_command(&path, &words.join(" ")) {
        Ok(reply) => println!("{}", reply),
        Err(e) => {
            eprintln!("failed to reach shellbar at {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Normal daemon mode.
fn run_daemon() {
    let config = load_config();

    let store = JsonLayoutStore::new(config::layout_path());
    let layout = store.load_or_default();
    let settings = SettingsCache::default_location();
    let state = ShellState::restore(layout, &settings);
    info!(
        "restored layout from {} ({} workspaces)",
        store.path().display(),
        state.workspace_count.get().get()
    );

    let editor = Rc::new(LayoutEditor::new(
        state.layout.clone(),
        state.edit_mode.clone(),
        store,
    ));
    let shell = Shell::new(state, editor, settings, ProcessRunner, config.clone());

    let (cmd_tx, cmd_rx) = mpsc::channel::<Request>();
    spawn_command_sources(cmd_tx);

    start_event_loop(shell, cmd_rx, config);
}

//  Event loops

#[cfg(feature = "bar-gtk")]
fn start_event_loop<S, R>(shell: Shell<S, R>, cmd_rx: mpsc::Receiver<Request>, config: Config)
where
    S: LayoutStore + 'static,
    R: CommandRunner + 'static,
{
    shellbar::bar::gtk::run_main_loop(shell, cmd_rx, config);
}

#[cfg(not(feature = "bar-gtk"))]
fn start_event_loop<S: LayoutStore, R: CommandRunner>(
    mut shell: Shell<S, R>,
    cmd_rx: mpsc::Receiver<Request>,
    config: Config,
) {
    use std::time::Duration;

    let state = shell.state().clone();
    let _subscriptions = [
        state.edit_mode.subscribe(|on| info!("edit mode: {}", on)),
        state.layout.subscribe(|layout| info!("layout: {:?}", layout)),
        state.windows.launcher.subscribe(|v| info!("launcher visible: {}", v)),
        state.windows.sidebar.subscribe(|v| info!("sidebar visible: {}", v)),
        state.windows.power_menu.subscribe(|v| info!("power menu visible: {}", v)),
        state.windows.music_popup.subscribe(|v| info!("music popup visible: {}", v)),
    ];

    let poll_interval = Duration::from_millis(config.brightness.poll_interval_ms.max(100));
    info!("shellbar running (headless)");
    shell.run_blocking(&cmd_rx, poll_interval);
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Request>) {
    let path = config::socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
