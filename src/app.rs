//! Application state and lifecycle management.
//!
//! The controller, tray icon and startup registration live in a `Shell`
//! owned by the UI thread. Tray events are handled when they arrive, and a
//! thread timer polls for activation endings, so both keep working while the
//! window is hidden and egui draws no frames. The eframe app only renders the
//! control window.

use crate::audio::WindowsCaptureProvider;
use crate::config::{EnforcerConfig, APP_NAME, WINDOW_TITLE};
use crate::enforcer::{Controller, Status};
use crate::platform::{dialog, StartupError, StartupRegistration};
use crate::ui::{
    dispatch_tray_event, tooltip_text, ControlWindow, ShellEffect, SurfaceState, TrayError,
    TrayEvent, TrayManager, TrayState, WindowAction,
};
use eframe::egui::{self, ViewportCommand};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{error, info, warn};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    KillTimer, SetForegroundWindow, SetTimer, ShowWindow, SW_SHOW,
};

/// How often the shell polls for activation endings.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything that must keep running while the window is hidden.
struct Shell {
    controller: Controller<WindowsCaptureProvider, SurfaceState>,
    tray: TrayManager,
    startup: StartupRegistration,
    startup_enabled: bool,
    ctx: egui::Context,
    /// Raw HWND of the control window
    hwnd: Option<isize>,
    poll_timer: usize,
}

impl Shell {
    fn new(ctx: &egui::Context, hwnd: Option<isize>, config: &EnforcerConfig) -> Result<Self, TrayError> {
        let controller = Controller::start(
            WindowsCaptureProvider::new(),
            SurfaceState::new(),
            config.tick_interval,
        );

        let startup = StartupRegistration::new(APP_NAME);
        let startup_enabled = startup.is_enabled();

        let mut tray = TrayManager::new();
        tray.create(
            TrayState {
                tooltip: tooltip_text(Status::Running, false),
                running: true,
                startup_enabled,
            },
            |_| pump(),
        )?;

        let poll_timer = unsafe {
            SetTimer(
                HWND::default(),
                0,
                STATUS_POLL_INTERVAL.as_millis() as u32,
                Some(poll_timer_proc),
            )
        };
        if poll_timer == 0 {
            warn!("status poll timer unavailable, tray refreshes with the window only");
        }

        info!(startup_enabled, "application initialized");

        Ok(Self {
            controller,
            tray,
            startup,
            startup_enabled,
            ctx: ctx.clone(),
            hwnd,
            poll_timer,
        })
    }

    /// Handle pending tray events and push controller changes to the tray.
    fn pump(&mut self) {
        while let Some(event) = self.tray.try_next_event() {
            self.handle_tray_event(event);
        }
        let status = self.controller.status();
        self.sync_tray(status);
    }

    fn handle_tray_event(&mut self, event: TrayEvent) {
        match dispatch_tray_event(&mut self.controller, event) {
            ShellEffect::None => {}
            ShellEffect::ShowWindow => self.show_window(),
            ShellEffect::FlipStartup => self.set_startup(!self.startup_enabled),
            ShellEffect::Exit => {
                self.shutdown();
                // A hidden window never processes a close command.
                std::process::exit(0);
            }
        }
    }

    fn handle_window_action(&mut self, action: WindowAction) {
        match action {
            WindowAction::Toggle => {
                self.controller.toggle();
            }
            WindowAction::SetStartup(enabled) => self.set_startup(enabled),
            WindowAction::Quit => {
                self.shutdown();
                self.ctx.send_viewport_cmd(ViewportCommand::Close);
            }
        }
    }

    fn show_window(&self) {
        if let Some(hwnd) = self.hwnd {
            let hwnd = HWND(hwnd as *mut _);
            unsafe {
                let _ = ShowWindow(hwnd, SW_SHOW);
                let _ = SetForegroundWindow(hwnd);
            }
        }
        self.ctx.send_viewport_cmd(ViewportCommand::Visible(true));
        self.ctx.request_repaint();
    }

    fn set_startup(&mut self, enabled: bool) {
        match self.startup.set_enabled(enabled) {
            Ok(()) => self.startup_enabled = enabled,
            Err(StartupError::PermissionDenied) => {
                warn!("startup registration denied");
                dialog::show_error("Permission Denied", &StartupError::PermissionDenied.to_string());
            }
            Err(e) => {
                error!(error = %e, "startup registration failed");
                dialog::show_error(WINDOW_TITLE, &e.to_string());
            }
        }
        // The check item flips itself on click; realign it with the registry.
        self.tray.set_startup_checked(self.startup_enabled);
        self.ctx.request_repaint();
    }

    /// Push controller changes to the tray and the window.
    fn sync_tray(&mut self, status: Status) {
        if !self.controller.surface_mut().take_changed() {
            return;
        }
        let device_error = self.controller.surface().error().is_some();
        if let Err(e) = self.tray.set_running(status == Status::Running) {
            warn!(error = %e, "failed to update tray icon");
        }
        if let Err(e) = self.tray.set_tooltip(&tooltip_text(status, device_error)) {
            warn!(error = %e, "failed to update tray tooltip");
        }
        self.ctx.request_repaint();
    }

    fn shutdown(&mut self) {
        if self.controller.is_quit() {
            return;
        }
        if self.poll_timer != 0 {
            unsafe {
                let _ = KillTimer(HWND::default(), self.poll_timer);
            }
        }
        self.controller.quit();
        self.tray.destroy();
        info!("shut down");
    }
}

thread_local! {
    static SHELL: RefCell<Option<Rc<RefCell<Shell>>>> = const { RefCell::new(None) };
}

/// Run `f` on the shell unless it is missing or already borrowed further up
/// the stack. Events left unhandled stay queued for the next pump.
fn with_shell<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Shell) -> R,
{
    SHELL.with(|shell| {
        let shell = shell.borrow().clone()?;
        let mut shell = shell.try_borrow_mut().ok()?;
        Some(f(&mut shell))
    })
}

fn pump() {
    with_shell(Shell::pump);
}

unsafe extern "system" fn poll_timer_proc(_hwnd: HWND, _msg: u32, _id: usize, _time: u32) {
    pump();
}

/// The eframe side: draws the control window over the shared shell.
pub struct AppState {
    shell: Rc<RefCell<Shell>>,
    window: ControlWindow,
}

impl AppState {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &EnforcerConfig) -> Result<Self, TrayError> {
        let hwnd = match cc.window_handle().map(|handle| handle.as_raw()) {
            Ok(RawWindowHandle::Win32(handle)) => Some(handle.hwnd.get()),
            _ => {
                warn!("no Win32 window handle, tray cannot reopen a hidden window");
                None
            }
        };

        let shell = Rc::new(RefCell::new(Shell::new(&cc.egui_ctx, hwnd, config)?));
        SHELL.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&shell)));

        Ok(Self {
            shell,
            window: ControlWindow::new(),
        })
    }
}

impl eframe::App for AppState {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut shell = self.shell.borrow_mut();
        shell.pump();

        if ctx.input(|i| i.viewport().close_requested()) && !shell.controller.is_quit() {
            // Closing the window only hides it
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            ctx.send_viewport_cmd(ViewportCommand::Visible(false));
        }

        let status = shell.controller.status();
        let view = shell.controller.surface().view(status, shell.startup_enabled);
        self.window.show(ctx, &view);
        for action in self.window.take_actions() {
            shell.handle_window_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shell.borrow_mut().shutdown();
        SHELL.with(|slot| slot.borrow_mut().take());
    }
}

/// Run the application until the user quits.
pub fn run(config: EnforcerConfig) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([400.0, 180.0])
            .with_resizable(false)
            .with_visible(config.show_window),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            let app = AppState::new(cc, &config)?;
            Ok(Box::new(app))
        }),
    )
}
