//! Mic Volume Enforcer - Library
//!
//! A system tray utility that keeps the default Windows microphone pinned at
//! its maximum capture level.
//!
//! ## Features
//!
//! - Background loop that re-applies the maximum level every tick
//! - Start/Stop toggle from the control window or the tray menu
//! - Stops cleanly and reports when the microphone disappears
//! - Run at Windows startup option

#[cfg(windows)]
pub mod app;
pub mod audio;
pub mod config;
pub mod enforcer;
pub mod platform;
pub mod ui;

#[cfg(windows)]
pub use app::AppState;
pub use audio::{AudioError, CaptureProvider, CaptureVolume, VolumeRange};
pub use config::{ConfigError, EnforcerConfig};
pub use enforcer::{ControlSurface, Controller, EnforcerError, Status};
pub use platform::StartupError;
pub use ui::SurfaceState;
