//! Entry point for the **maxwm** window manager.
//!
//! Connects to the X server, takes over the root window and runs the event
//! loop on the main thread.  Status lines for an external bar are printed on
//! stdout from a background thread, one line per state change.

use log::{error, info};
use maxwm::config::Config;
use maxwm::launcher::ProcessLauncher;
use maxwm::manager::Manager;
use maxwm::status::StatusLine;
use maxwm::x11::X11Wm;
use std::sync::mpsc;

/// Resolve the config directory (`$XDG_CONFIG_HOME/maxwm`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("maxwm")
}

/// Try to load the config from `$XDG_CONFIG_HOME/maxwm/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no usable config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();

    let (wm, mut events) = match X11Wm::connect() {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut manager = match Manager::new(wm, ProcessLauncher::new(), &config) {
        Ok(m) => m,
        Err(e) => {
            error!("failed to set up: {}", e);
            std::process::exit(1);
        }
    };

    let (status_tx, status_rx) = mpsc::channel::<StatusLine>();
    spawn_status_printer(status_rx);
    manager.set_status_sink(status_tx);

    manager.autostart(&config.autostart);

    if let Err(e) = manager.run(&mut events) {
        error!("lost the X connection: {}", e);
        std::process::exit(1);
    }
    info!("exiting");
}

//  Helpers

fn spawn_status_printer(rx: mpsc::Receiver<StatusLine>) {
    std::thread::spawn(move || {
        for line in rx {
            println!("{}", line);
        }
    });
}
