//! One run of the enforcement loop on its own thread.
//!
//! An activation opens the default capture device, caches the maximum of its
//! range, and sets the level to that maximum once per tick until it is told
//! to stop or the device goes away.

use crate::audio::{AudioError, CaptureProvider, CaptureVolume};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why an activation ended.
#[derive(Debug)]
pub enum ActivationEnd {
    /// The stop flag was observed.
    Stopped,

    /// The device could not be opened or disappeared mid-run.
    DeviceUnavailable(AudioError),
}

/// Sent by an activation thread when it ends.
#[derive(Debug)]
pub struct ActivationReport {
    /// Generation of the activation that ended
    pub generation: u64,

    /// Number of level-set calls issued
    pub ticks: u64,

    pub end: ActivationEnd,
}

/// Signal to stop an activation
#[derive(Debug, Clone, Copy)]
pub struct StopActivation;

/// Handle on a running (or finished) activation thread.
pub struct Activation {
    generation: u64,
    stop_tx: Sender<StopActivation>,
    thread: Option<JoinHandle<()>>,
}

impl Activation {
    /// Spawn a new activation thread.
    pub fn spawn<P: CaptureProvider>(
        generation: u64,
        provider: Arc<P>,
        tick_interval: Duration,
        reports: Sender<ActivationReport>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<StopActivation>(1);

        let thread = thread::Builder::new()
            .name(format!("mic-enforcer-{}", generation))
            .spawn(move || {
                let (ticks, end) = run_loop(provider.as_ref(), tick_interval, &stop_rx);
                match &end {
                    ActivationEnd::Stopped => {
                        info!(generation, ticks, "enforcement stopped");
                    }
                    ActivationEnd::DeviceUnavailable(e) => {
                        error!(generation, ticks, error = %e, "enforcement ended, device unavailable");
                    }
                }
                // The controller may already be gone during shutdown.
                let _ = reports.send(ActivationReport {
                    generation,
                    ticks,
                    end,
                });
            })?;

        Ok(Self {
            generation,
            stop_tx,
            thread: Some(thread),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ask the loop to stop. Returns immediately.
    pub fn signal_stop(&self) {
        // A full channel already carries a stop
        let _ = self.stop_tx.try_send(StopActivation);
    }

    /// Signal stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.signal_stop();
            if thread.join().is_err() {
                error!(generation = self.generation, "enforcement thread panicked");
            }
        }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of an activation. Returns the number of ticks issued and why it ended.
///
/// The handle is dropped before this returns. A stop message, or the stop
/// sender going away, ends the loop.
pub fn run_loop<P: CaptureProvider>(
    provider: &P,
    tick_interval: Duration,
    stop_rx: &Receiver<StopActivation>,
) -> (u64, ActivationEnd) {
    let device = match provider.open_default_capture() {
        Ok(device) => device,
        Err(e) => return (0, ActivationEnd::DeviceUnavailable(e)),
    };

    let range = match device.volume_range() {
        Ok(range) => range,
        Err(e) => return (0, ActivationEnd::DeviceUnavailable(e)),
    };
    let target = range.target();
    debug!(%range, target, "capture device opened");

    let mut ticks = 0u64;
    while let Err(TryRecvError::Empty) = stop_rx.try_recv() {
        ticks += 1;
        match device.set_level(target) {
            Ok(()) => {}
            Err(e) if e.is_device_lost() => {
                return (ticks, ActivationEnd::DeviceUnavailable(e));
            }
            Err(e) => {
                warn!(tick = ticks, error = %e, "level set failed, retrying next tick");
            }
        }
        match stop_rx.recv_timeout(tick_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(StopActivation) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    (ticks, ActivationEnd::Stopped)
}
