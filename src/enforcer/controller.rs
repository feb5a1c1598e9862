//! Toggle state machine around the enforcement loop.
//!
//! The controller owns the running activation. It is driven from the UI
//! thread through [`Controller::toggle`] and [`Controller::quit`], and it
//! pushes label changes and errors back through a [`ControlSurface`].

use super::activation::{Activation, ActivationEnd, ActivationReport};
use super::EnforcerError;
use crate::audio::CaptureProvider;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Label shown on the toggle control while enforcement runs.
pub const LABEL_STOP: &str = "Stop";

/// Label shown on the toggle control while enforcement is stopped.
pub const LABEL_START: &str = "Start";

/// Receives state notifications from the controller.
pub trait ControlSurface {
    /// Enforcement entered `status`. The toggle control shows
    /// [`Status::toggle_label`].
    fn show_status(&mut self, status: Status);

    /// Tell the user something went wrong. Never fatal.
    fn report_error(&mut self, error: &EnforcerError);
}

/// Externally visible enforcement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Stopped,
}

impl Status {
    /// Label of the action the toggle control would perform.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Status::Running => LABEL_STOP,
            Status::Stopped => LABEL_START,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Running => write!(f, "running"),
            Status::Stopped => write!(f, "stopped"),
        }
    }
}

enum EnforcementState {
    Running(Activation),
    Stopped,
}

/// Owns the enforcement activation and sequences start/stop.
pub struct Controller<P: CaptureProvider, S: ControlSurface> {
    provider: Arc<P>,
    surface: S,
    tick_interval: Duration,
    state: EnforcementState,
    /// Previous activation, stopping or finished, joined before the next start
    retiring: Option<Activation>,
    next_generation: u64,
    reports_tx: Sender<ActivationReport>,
    reports_rx: Receiver<ActivationReport>,
    quit: bool,
}

impl<P: CaptureProvider, S: ControlSurface> Controller<P, S> {
    /// Create the controller and start enforcing immediately.
    pub fn start(provider: P, surface: S, tick_interval: Duration) -> Self {
        let (reports_tx, reports_rx) = unbounded();
        let mut controller = Self {
            provider: Arc::new(provider),
            surface,
            tick_interval,
            state: EnforcementState::Stopped,
            retiring: None,
            next_generation: 1,
            reports_tx,
            reports_rx,
            quit: false,
        };
        controller.activate();
        controller
    }

    /// Current state, after applying any activation endings.
    pub fn status(&mut self) -> Status {
        self.drain_reports();
        self.current_status()
    }

    /// Flip between running and stopped. Ignored after [`quit`](Self::quit).
    pub fn toggle(&mut self) -> Status {
        if self.quit {
            return Status::Stopped;
        }
        self.drain_reports();

        match std::mem::replace(&mut self.state, EnforcementState::Stopped) {
            EnforcementState::Running(activation) => {
                info!(generation = activation.generation(), "stopping enforcement");
                activation.signal_stop();
                self.retire(activation);
                self.surface.show_status(Status::Stopped);
            }
            EnforcementState::Stopped => {
                self.activate();
            }
        }

        self.current_status()
    }

    /// Stop enforcement and wait for the loop to exit. Idempotent.
    pub fn quit(&mut self) {
        if self.quit {
            return;
        }
        self.quit = true;
        info!("quitting, stopping enforcement");

        if let EnforcementState::Running(activation) =
            std::mem::replace(&mut self.state, EnforcementState::Stopped)
        {
            activation.join();
        }
        if let Some(previous) = self.retiring.take() {
            previous.join();
        }
        self.drain_reports();
        self.surface.show_status(Status::Stopped);
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn current_status(&self) -> Status {
        match self.state {
            EnforcementState::Running(_) => Status::Running,
            EnforcementState::Stopped => Status::Stopped,
        }
    }

    /// Spawn a new activation after the previous one has fully exited.
    fn activate(&mut self) {
        if let Some(previous) = self.retiring.take() {
            debug!(generation = previous.generation(), "joining previous activation");
            previous.join();
        }
        // Endings of joined activations are stale from here on.
        self.drain_reports();

        let generation = self.next_generation;
        self.next_generation += 1;

        match Activation::spawn(
            generation,
            Arc::clone(&self.provider),
            self.tick_interval,
            self.reports_tx.clone(),
        ) {
            Ok(activation) => {
                info!(generation, interval_ms = self.tick_interval.as_millis() as u64, "enforcement started");
                self.state = EnforcementState::Running(activation);
                self.surface.show_status(Status::Running);
            }
            Err(e) => {
                let err = EnforcerError::SpawnFailed(e);
                warn!(error = %err, "could not start enforcement");
                self.state = EnforcementState::Stopped;
                self.surface.show_status(Status::Stopped);
                self.surface.report_error(&err);
            }
        }
    }

    fn retire(&mut self, activation: Activation) {
        if let Some(previous) = self.retiring.replace(activation) {
            previous.join();
        }
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.reports_rx.try_recv() {
            self.apply_report(report);
        }
    }

    /// Apply one activation ending.
    ///
    /// A device loss from the current activation stops enforcement. One
    /// from the activation the user just stopped is still reported, but the
    /// state is already `Stopped`. Endings of activations joined by a later
    /// start are dropped.
    fn apply_report(&mut self, report: ActivationReport) {
        let current = match &self.state {
            EnforcementState::Running(activation) => activation.generation() == report.generation,
            EnforcementState::Stopped => false,
        };
        let retiring = self
            .retiring
            .as_ref()
            .is_some_and(|activation| activation.generation() == report.generation);

        let ActivationEnd::DeviceUnavailable(cause) = report.end else {
            return;
        };
        let err = EnforcerError::DeviceUnavailable(cause);

        if current {
            if let EnforcementState::Running(activation) =
                std::mem::replace(&mut self.state, EnforcementState::Stopped)
            {
                self.retire(activation);
            }
            self.surface.show_status(Status::Stopped);
            self.surface.report_error(&err);
        } else if retiring {
            debug!(generation = report.generation, "device lost while stopping");
            self.surface.report_error(&err);
        } else {
            debug!(generation = report.generation, "ignoring report from joined activation");
        }
    }
}

impl<P: CaptureProvider, S: ControlSurface> Drop for Controller<P, S> {
    fn drop(&mut self) {
        self.quit();
    }
}
