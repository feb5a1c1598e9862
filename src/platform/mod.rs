//! Platform-specific module for Windows utilities.
//!
//! Startup registration, native dialogs and tray icon rendering.

#[cfg(windows)]
pub mod dialog;
pub mod icons;
pub mod registry;

#[cfg(windows)]
pub use registry::StartupRegistration;
pub use registry::StartupError;
