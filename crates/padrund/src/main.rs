mod cli;

use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::unbounded;

use padrun_hid::{scan_devices, ReportSource};
use padrun_profile::Mappings;
use padrund::{
    logging, print_error, print_info, print_warning, Runner, SessionSlot,
};

use crate::cli::{Cli, Command};

#[cfg(windows)]
use padrun_keysend::{SendInputSynth as Synth, WinForegroundProbe as Probe};
#[cfg(not(windows))]
use padrun_keysend::{NoopProbe as Probe, NoopSynth as Synth};

const DEFAULT_MAPPINGS_FILE: &str = "mappings.yaml";

fn main() {
    let cli = Cli::parse();
    logging::setup(cli.verbose, cli.no_color);

    match cli.command {
        Command::Devices => list_devices(),
        Command::Run { exe, mappings, device } => run(exe, mappings, device),
    }
}

fn list_devices() {
    let list = match scan_devices() {
        Ok(list) => list,
        Err(e) => {
            print_error!("device scan failed: {e}");
            return;
        }
    };
    if list.is_empty() {
        print_info!("no gamepads attached");
        return;
    }
    for (i, info) in list.infos().iter().enumerate() {
        let serial = info.serial.as_deref().unwrap_or("-");
        print_info!("{i}: {} {} (serial {serial})", info.vendor, info.product);
    }
}

fn run(exe: PathBuf, mappings_path: Option<PathBuf>, device: Option<usize>) {
    let mappings = load_mappings(mappings_path.as_deref());
    let source = open_device(device);

    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("failed to set Ctrl+C handler");

    let mut runner = Runner::new(
        exe,
        &mappings,
        source,
        Synth::default(),
        Probe::default(),
        SessionSlot::new(),
        stop_rx,
    );
    if let Err(e) = runner.start() {
        print_error!("{e}");
    }
}

/// Loads the mappings file leniently; anything unreadable degrades to the
/// default tables so the game still launches.
fn load_mappings(path: Option<&Path>) -> Mappings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_MAPPINGS_FILE);
            if !default.exists() {
                return Mappings::default();
            }
            default
        }
    };
    match Mappings::load(&path) {
        Ok(loaded) => {
            for issue in &loaded.issues {
                print_warning!("{}: {issue}", path.display());
            }
            loaded.mappings
        }
        Err(e) => {
            print_error!(
                "failed to load {}, using default mappings: {e}",
                path.display()
            );
            Mappings::default()
        }
    }
}

/// Resolves the configured gamepad. Every failure degrades to "no gamepad".
fn open_device(index: Option<usize>) -> Option<Box<dyn ReportSource>> {
    let list = match scan_devices() {
        Ok(list) => list,
        Err(e) => {
            print_warning!("device scan failed, continuing without gamepad: {e}");
            return None;
        }
    };
    if list.is_empty() {
        print_warning!("no gamepads attached, continuing without gamepad");
        return None;
    }
    let index = index.unwrap_or(0);
    match list.open(index) {
        Ok(source) => {
            if let Ok(info) = list.info(index) {
                print_info!("using gamepad {index}: {} {}", info.vendor, info.product);
            }
            Some(source)
        }
        Err(e) => {
            print_warning!("failed to open gamepad {index}, continuing without gamepad: {e}");
            None
        }
    }
}
