//! Audio module for the capture endpoint volume.
//!
//! Exposes the volume backend traits used by the enforcement loop and, on
//! Windows, their Core Audio implementation.

pub mod device;
#[cfg(windows)]
pub mod enumerator;
pub mod volume;

pub use device::{AudioError, VolumeRange};
#[cfg(windows)]
pub use enumerator::{ComGuard, WindowsCaptureProvider};
pub use volume::{CaptureProvider, CaptureVolume};
