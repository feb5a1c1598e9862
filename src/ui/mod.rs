//! UI module for the system tray and control window.
//!
//! The tray and window are Windows-only; the state they render is plain
//! data so it can be built and checked anywhere.

#[cfg(windows)]
pub mod tray;
#[cfg(windows)]
pub mod window;

#[cfg(windows)]
pub use tray::{TrayError, TrayManager, TrayState};
#[cfg(windows)]
pub use window::{ControlWindow, WindowAction};

use crate::audio::CaptureProvider;
use crate::config::APP_NAME;
use crate::enforcer::{ControlSurface, Controller, EnforcerError, Status};

/// Events from the system tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    /// Left-click on the icon or "Show Window"
    ShowWindow,

    /// The Start/Stop menu item
    Toggle,

    /// The "Run at Windows startup" item was clicked
    StartupToggled,

    /// The "Quit" menu item
    Quit,
}

/// Work left for the shell after a tray event reached the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEffect {
    None,
    ShowWindow,
    FlipStartup,
    /// The controller has quit; the process should end.
    Exit,
}

/// Apply a tray event to the controller.
///
/// Runs on the tray's thread whether or not the window is drawing frames,
/// so Start/Stop and Quit never wait for the window.
pub fn dispatch_tray_event<P, S>(controller: &mut Controller<P, S>, event: TrayEvent) -> ShellEffect
where
    P: CaptureProvider,
    S: ControlSurface,
{
    match event {
        TrayEvent::ShowWindow => ShellEffect::ShowWindow,
        TrayEvent::Toggle => {
            controller.toggle();
            ShellEffect::None
        }
        TrayEvent::StartupToggled => ShellEffect::FlipStartup,
        TrayEvent::Quit => {
            controller.quit();
            ShellEffect::Exit
        }
    }
}

/// Everything the control window needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlView {
    pub toggle_label: &'static str,
    pub startup_enabled: bool,
    pub status_line: String,
    pub error: Option<String>,
}

/// Tooltip for the tray icon.
pub fn tooltip_text(status: Status, device_error: bool) -> String {
    match (status, device_error) {
        (Status::Running, _) => format!("{} - running", APP_NAME),
        (Status::Stopped, true) => format!("{} - device unavailable", APP_NAME),
        (Status::Stopped, false) => format!("{} - stopped", APP_NAME),
    }
}

/// Control surface state shared by the window and the tray.
///
/// Records what the controller asked for; the UI loop picks up the changes
/// once per frame with [`take_changed`](Self::take_changed).
#[derive(Debug)]
pub struct SurfaceState {
    status: Status,
    error: Option<String>,
    changed: bool,
}

impl SurfaceState {
    pub fn new() -> Self {
        Self {
            status: Status::Running,
            error: None,
            changed: false,
        }
    }

    pub fn label(&self) -> &'static str {
        self.status.toggle_label()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once after any label or error change.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Build the window view for the current state.
    pub fn view(&self, status: Status, startup_enabled: bool) -> ControlView {
        ControlView {
            toggle_label: self.label(),
            startup_enabled,
            status_line: format!("Enforcement {}", status),
            error: self.error.clone(),
        }
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSurface for SurfaceState {
    fn show_status(&mut self, status: Status) {
        self.status = status;
        // A successful start clears any previous device error
        if status == Status::Running {
            self.error = None;
        }
        self.changed = true;
    }

    fn report_error(&mut self, error: &EnforcerError) {
        self.error = Some(error.to_string());
        self.changed = true;
    }
}
