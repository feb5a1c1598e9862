//! Enforcement of the maximum capture level.
//!
//! [`Controller`] is the toggle state machine; each start spawns an
//! [`Activation`] that runs the fixed-interval loop on its own thread.

pub mod activation;
pub mod controller;

pub use activation::{Activation, ActivationEnd, ActivationReport};
pub use controller::{ControlSurface, Controller, Status, LABEL_START, LABEL_STOP};

use crate::audio::AudioError;
use thiserror::Error;

/// Errors surfaced to the control surface.
#[derive(Debug, Error)]
pub enum EnforcerError {
    #[error("Microphone unavailable, enforcement stopped: {0}")]
    DeviceUnavailable(#[source] AudioError),

    #[error("Failed to start enforcement thread: {0}")]
    SpawnFailed(#[source] std::io::Error),
}
