use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{HidError, Result};
use crate::report::{ButtonStates, ChangeReport, Frame, FrameDecoder, HAT_IDLE};
use crate::source::{Interrupt, ReadStatus, ReportSource};

/// Event delivered to monitor subscribers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The gamepad state changed; carries the exact deltas.
    Change(ChangeReport),
    /// The poll loop hit an unrecoverable device error and is shutting down.
    Fault(HidError),
    /// The poll loop exited. Always the last event on a subscription.
    Stopped,
}

/// Subscription endpoint of a [`GamepadMonitor`].
pub type ChangeReceiver = Receiver<MonitorEvent>;

struct Shared {
    running: AtomicBool,
    snapshot: Mutex<(ButtonStates, u16)>,
    subscribers: Mutex<Vec<Sender<MonitorEvent>>>,
}

impl Shared {
    fn broadcast(&self, event: &MonitorEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Polling loop around one opened gamepad.
///
/// Owns a dedicated thread that blocks on device reads and fans decoded
/// deltas out to subscribers over channels, so consumers pick events up on
/// whatever thread they drain their receiver. [`stop`] interrupts an
/// in-flight read and joins the thread; the device handle closes when the
/// consumed [`ReportSource`] is dropped at loop exit.
///
/// [`stop`]: GamepadMonitor::stop
pub struct GamepadMonitor {
    shared: Arc<Shared>,
    interrupter: Option<Box<dyn Interrupt>>,
    thread: Option<JoinHandle<()>>,
}

impl GamepadMonitor {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                snapshot: Mutex::new((ButtonStates::new(0), HAT_IDLE)),
                subscribers: Mutex::new(Vec::new()),
            }),
            interrupter: None,
            thread: None,
        }
    }

    /// Registers a subscriber. Valid before or after [`start`]; events that
    /// fired before subscribing are not replayed.
    ///
    /// [`start`]: GamepadMonitor::start
    pub fn subscribe(&self) -> ChangeReceiver {
        let (tx, rx) = unbounded();
        self.shared.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Spawns the poll thread over `source`.
    ///
    /// Capability parsing happens here so descriptor problems surface
    /// synchronously. The source is consumed; a stopped monitor cannot be
    /// restarted, open a fresh device instead.
    pub fn start(&mut self, mut source: Box<dyn ReportSource>) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let caps = source.caps()?;
        {
            let mut snap = self.shared.snapshot.lock().unwrap();
            *snap = (ButtonStates::new(caps.button_count()), HAT_IDLE);
        }
        self.interrupter = Some(source.interrupter());
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("pad-monitor".into())
            .spawn(move || {
                let mut decoder = FrameDecoder::new(&caps);
                let mut frame = Frame::default();
                let mut report = ChangeReport::default();
                while shared.running.load(Ordering::SeqCst) {
                    match source.read_frame(&mut frame) {
                        Ok(ReadStatus::Report) => {
                            if decoder.apply(&frame, &mut report) {
                                {
                                    let mut snap =
                                        shared.snapshot.lock().unwrap();
                                    snap.0.copy_from(decoder.states());
                                    snap.1 = decoder.hat();
                                }
                                shared.broadcast(&MonitorEvent::Change(
                                    report.clone(),
                                ));
                            }
                        }
                        Ok(ReadStatus::Cancelled) => break,
                        Err(e) => {
                            shared.broadcast(&MonitorEvent::Fault(e));
                            break;
                        }
                    }
                }
                shared.running.store(false, Ordering::SeqCst);
                shared.broadcast(&MonitorEvent::Stopped);
            })
            .map_err(|e| HidError::Device(e.to_string()))?;
        self.thread = Some(handle);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Pressed-set snapshot as of the last dispatched change.
    pub fn pressed(&self) -> ButtonStates {
        self.shared.snapshot.lock().unwrap().0.clone()
    }

    /// Hat mask snapshot as of the last dispatched change.
    pub fn hat(&self) -> u16 {
        self.shared.snapshot.lock().unwrap().1
    }

    /// Stops the poll loop and joins the thread. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(interrupter) = self.interrupter.take() {
            interrupter.interrupt();
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Default for GamepadMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GamepadMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
