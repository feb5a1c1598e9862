//! System tray icon management.
//!
//! Manages the tray icon, its tooltip, and the context menu. Clicks and
//! menu selections arrive through `tray-icon`'s event handlers and are
//! forwarded as [`TrayEvent`]s.

use super::TrayEvent;
use crate::enforcer::Status;
use crate::platform::icons;
use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem},
    MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent,
};

/// Tray service error types.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Failed to create tray icon: {0}")]
    CreateFailed(String),

    #[error("Failed to load icon resource: {0}")]
    IconLoadFailed(String),

    #[error("Tray icon not initialized")]
    NotInitialized,

    #[error("Failed to create menu: {0}")]
    MenuFailed(String),
}

/// Initial state for the tray icon.
#[derive(Debug, Clone)]
pub struct TrayState {
    pub tooltip: String,
    pub running: bool,
    pub startup_enabled: bool,
}

#[derive(Clone)]
struct MenuIds {
    show: MenuId,
    toggle: MenuId,
    startup: MenuId,
    quit: MenuId,
}

impl MenuIds {
    fn classify(&self, id: &MenuId) -> Option<TrayEvent> {
        if id == &self.show {
            Some(TrayEvent::ShowWindow)
        } else if id == &self.toggle {
            Some(TrayEvent::Toggle)
        } else if id == &self.startup {
            Some(TrayEvent::StartupToggled)
        } else if id == &self.quit {
            Some(TrayEvent::Quit)
        } else {
            None
        }
    }
}

/// System tray manager.
pub struct TrayManager {
    tray_icon: Option<TrayIcon>,
    event_receiver: Receiver<TrayEvent>,
    event_sender: Sender<TrayEvent>,
    toggle_item: Option<MenuItem>,
    startup_item: Option<CheckMenuItem>,
}

impl TrayManager {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            tray_icon: None,
            event_receiver: receiver,
            event_sender: sender,
            toggle_item: None,
            startup_item: None,
        }
    }

    /// Create and show the tray icon.
    ///
    /// `wake` is called with every forwarded event, from the thread that
    /// delivered it, so a sleeping or hidden UI loop can react.
    pub fn create<W>(&mut self, initial_state: TrayState, wake: W) -> Result<(), TrayError>
    where
        W: Fn(TrayEvent) + Clone + Send + Sync + 'static,
    {
        let icon = icons::tray_icon(initial_state.running).map_err(TrayError::IconLoadFailed)?;

        let menu = Menu::new();

        let show_item = MenuItem::new("Show Window", true, None);
        let toggle_item = MenuItem::new(toggle_text(initial_state.running), true, None);
        let startup_item = CheckMenuItem::new(
            "Run at Windows startup",
            true,
            initial_state.startup_enabled,
            None,
        );
        let quit_item = MenuItem::new("Quit", true, None);

        menu.append(&show_item)
            .and_then(|_| menu.append(&toggle_item))
            .and_then(|_| menu.append(&PredefinedMenuItem::separator()))
            .and_then(|_| menu.append(&startup_item))
            .and_then(|_| menu.append(&PredefinedMenuItem::separator()))
            .and_then(|_| menu.append(&quit_item))
            .map_err(|e| TrayError::MenuFailed(e.to_string()))?;

        let ids = MenuIds {
            show: show_item.id().clone(),
            toggle: toggle_item.id().clone(),
            startup: startup_item.id().clone(),
            quit: quit_item.id().clone(),
        };

        let sender = self.event_sender.clone();
        let menu_wake = wake.clone();
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            if let Some(tray_event) = ids.classify(&event.id) {
                let _ = sender.send(tray_event);
                menu_wake(tray_event);
            }
        }));

        let sender = self.event_sender.clone();
        TrayIconEvent::set_event_handler(Some(move |event: TrayIconEvent| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                let _ = sender.send(TrayEvent::ShowWindow);
                wake(TrayEvent::ShowWindow);
            }
        }));

        let tray_icon = TrayIconBuilder::new()
            .with_icon(icon)
            .with_tooltip(&initial_state.tooltip)
            .with_menu(Box::new(menu))
            .with_menu_on_left_click(false)
            .build()
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;

        self.tray_icon = Some(tray_icon);
        self.toggle_item = Some(toggle_item);
        self.startup_item = Some(startup_item);

        Ok(())
    }

    /// Next pending tray event, if any.
    pub fn try_next_event(&self) -> Option<TrayEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Reflect the enforcement state in the icon and toggle item.
    pub fn set_running(&mut self, running: bool) -> Result<(), TrayError> {
        let icon = icons::tray_icon(running).map_err(TrayError::IconLoadFailed)?;
        let tray = self.tray_icon.as_mut().ok_or(TrayError::NotInitialized)?;
        tray.set_icon(Some(icon))
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;
        if let Some(item) = &self.toggle_item {
            item.set_text(toggle_text(running));
        }
        Ok(())
    }

    /// Update the tooltip text.
    pub fn set_tooltip(&mut self, text: &str) -> Result<(), TrayError> {
        let tray = self.tray_icon.as_mut().ok_or(TrayError::NotInitialized)?;
        tray.set_tooltip(Some(text))
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;
        Ok(())
    }

    /// Update the "Run at Windows startup" checkmark.
    pub fn set_startup_checked(&mut self, checked: bool) {
        if let Some(item) = &self.startup_item {
            item.set_checked(checked);
        }
    }

    /// Remove the tray icon and detach the event handlers.
    pub fn destroy(&mut self) {
        MenuEvent::set_event_handler(None::<fn(MenuEvent)>);
        TrayIconEvent::set_event_handler(None::<fn(TrayIconEvent)>);
        self.toggle_item = None;
        self.startup_item = None;
        self.tray_icon = None;
    }
}

impl Default for TrayManager {
    fn default() -> Self {
        Self::new()
    }
}

fn toggle_text(running: bool) -> &'static str {
    let status = if running {
        Status::Running
    } else {
        Status::Stopped
    };
    status.toggle_label()
}
