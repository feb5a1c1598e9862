//! Capture device data models.
//!
//! Defines the volume range reported by a capture endpoint and the errors
//! the volume backend can raise.

use thiserror::Error;

/// Decibel range reported by a capture endpoint.
///
/// Read once when an activation opens the device and kept for the whole
/// activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRange {
    /// Lowest level in dB (e.g. -40.0)
    pub min_db: f32,

    /// Highest level in dB (typically 0.0 or a small positive boost)
    pub max_db: f32,

    /// Step size in dB, 0.0 if the device did not report one
    pub step_db: f32,
}

impl VolumeRange {
    /// Create a range without step information.
    pub fn new(min_db: f32, max_db: f32) -> Self {
        Self {
            min_db,
            max_db,
            step_db: 0.0,
        }
    }

    /// The level the enforcement loop pins the device to.
    pub fn target(&self) -> f32 {
        self.max_db
    }
}

impl std::fmt::Display for VolumeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}dB..{:.1}dB", self.min_db, self.max_db)?;
        if self.step_db > 0.0 {
            write!(f, " (step {:.2}dB)", self.step_db)?;
        }
        Ok(())
    }
}

/// Audio backend error types.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No capture device, access denied, or the device went away.
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single level-set call was refused. Retried on the next tick.
    #[error("Volume change rejected: {0}")]
    SetRejected(String),

    #[cfg(windows)]
    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] windows::core::Error),
}

impl AudioError {
    /// True if the error means the current device handle is unusable.
    pub fn is_device_lost(&self) -> bool {
        match self {
            AudioError::DeviceUnavailable(_) => true,
            AudioError::SetRejected(_) => false,
            #[cfg(windows)]
            AudioError::ComInitFailed(_) => true,
        }
    }
}
