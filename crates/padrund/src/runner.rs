use std::path::PathBuf;
use std::process::Command;

use colored::Colorize;
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use thiserror::Error;

use padrun_hid::{GamepadMonitor, MonitorEvent, ReportSource};
use padrun_keysend::{ForegroundProbe, KeySynth};
use padrun_profile::Mappings;
use padrun_virtual::{VirtualChange, VirtualPad, VirtualReport};

use crate::injector::KeyInjector;
use crate::session::SessionSlot;
use crate::{print_debug, print_error, print_info};

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Another runner currently owns the session slot.
    #[error("a game is already running")]
    AlreadyRunning,
    #[error("failed to launch the game: {0}")]
    Launch(#[from] std::io::Error),
}

/// Launches the game and drives the gamepad-to-keyboard pipeline until the
/// game exits.
///
/// Gamepad problems never block the launch: a missing or faulted device
/// leaves the runner with keyboard-only (inert) gamepad support.
pub struct Runner<S, P> {
    entry: PathBuf,
    chain: Option<(Box<dyn ReportSource>, VirtualPad)>,
    injector: KeyInjector<S, P>,
    session: SessionSlot,
    stop_rx: Receiver<()>,
    closed_tx: Sender<()>,
    closed_rx: Receiver<()>,
    running: bool,
}

impl<S: KeySynth, P: ForegroundProbe> Runner<S, P> {
    /// Builds the pipeline around an optional opened device. The compiled
    /// key table is fixed for the life of the runner.
    pub fn new(
        entry: PathBuf,
        mappings: &Mappings,
        device: Option<Box<dyn ReportSource>>,
        synth: S,
        probe: P,
        session: SessionSlot,
        stop_rx: Receiver<()>,
    ) -> Self {
        let chain = device.and_then(|source| match source.caps() {
            Ok(caps) => {
                let map = mappings.gamepad.for_device(caps.button_count());
                Some((source, VirtualPad::new(map)))
            }
            Err(e) => {
                print_error!("gamepad capabilities unavailable, continuing without gamepad: {e}");
                None
            }
        });
        let (closed_tx, closed_rx) = unbounded();
        Self {
            entry,
            chain,
            injector: KeyInjector::new(mappings, synth, probe, 0),
            session,
            stop_rx,
            closed_tx,
            closed_rx,
            running: false,
        }
    }

    /// Fires once per completed run, after monitoring has stopped.
    pub fn closed_events(&self) -> Receiver<()> {
        self.closed_rx.clone()
    }

    /// Launches the game and blocks in the event loop until it exits or a
    /// stop is requested. Calling again while running is a no-op; a
    /// concurrent session elsewhere fails fast.
    pub fn start(&mut self) -> Result<(), RunnerError> {
        if self.running {
            return Ok(());
        }
        let Some(_guard) = self.session.acquire() else {
            return Err(RunnerError::AlreadyRunning);
        };
        self.running = true;
        let result = self.run();
        self.running = false;
        let _ = self.closed_tx.send(());
        result
    }

    fn run(&mut self) -> Result<(), RunnerError> {
        let mut command = Command::new(&self.entry);
        if let Some(dir) = self.entry.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        let mut child = command.spawn()?;
        self.injector.set_pid(child.id());
        print_info!("launched {} (pid {})", self.entry.display(), child.id());

        let (exit_tx, exit_rx) = unbounded();
        std::thread::spawn(move || {
            let status = child.wait();
            let _ = exit_tx.send(status);
        });

        let mut monitor = GamepadMonitor::new();
        let mut pad = None;
        let mut events: Receiver<MonitorEvent> = never();
        let mut deferred: Receiver<VirtualChange> = never();
        // the source is consumed by the monitor; a later run is keyboard-only
        if let Some((source, virtual_pad)) = self.chain.take() {
            events = monitor.subscribe();
            deferred = virtual_pad.deferred_events();
            match monitor.start(source) {
                Ok(()) => pad = Some(virtual_pad),
                Err(e) => {
                    print_error!("gamepad monitoring unavailable, continuing without gamepad: {e}");
                    events = never();
                    deferred = never();
                }
            }
        }

        let mut report = VirtualReport::default();
        loop {
            select! {
                recv(exit_rx) -> status => {
                    match status {
                        Ok(Ok(code)) => {
                            print_info!("game exited: {code}");
                        }
                        Ok(Err(e)) => {
                            print_error!("failed to reap the game process: {e}");
                        }
                        Err(_) => {}
                    }
                    break;
                }
                recv(self.stop_rx) -> _ => {
                    print_info!("stop requested, leaving the game running");
                    break;
                }
                recv(events) -> msg => {
                    match msg {
                        Ok(MonitorEvent::Change(change)) => {
                            if let Some(pad) = pad.as_mut() {
                                if pad.process(&change, &mut report) {
                                    self.injector.inject(&report);
                                }
                            }
                        }
                        Ok(MonitorEvent::Fault(e)) => {
                            print_error!("gamepad fault, continuing without gamepad: {e}");
                        }
                        // the channel stays open but silent after a stop
                        Ok(MonitorEvent::Stopped) | Err(_) => {
                            print_debug!("gamepad monitoring stopped");
                        }
                    }
                }
                recv(deferred) -> msg => {
                    if let (Ok(change), Some(pad)) = (msg, pad.as_mut()) {
                        pad.apply_deferred(change, &mut report);
                        self.injector.inject(&report);
                    }
                }
            }
        }

        monitor.stop();
        Ok(())
    }
}
