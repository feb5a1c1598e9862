//! Control window implementation using eframe/egui.
//!
//! Shows the Start/Stop toggle, the startup checkbox and the Quit button.

use super::ControlView;
use eframe::egui;

/// Actions that can be triggered from the control window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Toggle,
    SetStartup(bool),
    Quit,
}

/// Control window state.
#[derive(Default)]
pub struct ControlWindow {
    actions: Vec<WindowAction>,
}

impl ControlWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the window content.
    pub fn show(&mut self, ctx: &egui::Context, view: &ControlView) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);

            let toggle = egui::Button::new(view.toggle_label)
                .min_size(egui::vec2(ui.available_width(), 32.0));
            if ui.add(toggle).clicked() {
                self.actions.push(WindowAction::Toggle);
            }

            ui.add_space(6.0);
            ui.vertical_centered(|ui| {
                let mut startup = view.startup_enabled;
                if ui
                    .checkbox(&mut startup, "Run at Windows startup")
                    .changed()
                {
                    self.actions.push(WindowAction::SetStartup(startup));
                }

                ui.label(&view.status_line);
                if let Some(error) = &view.error {
                    ui.colored_label(egui::Color32::RED, error);
                }
            });

            ui.add_space(10.0);
            let quit = egui::Button::new(egui::RichText::new("Quit").color(egui::Color32::WHITE))
                .fill(egui::Color32::from_rgb(200, 40, 40))
                .min_size(egui::vec2(ui.available_width(), 28.0));
            if ui.add(quit).clicked() {
                self.actions.push(WindowAction::Quit);
            }
        });
    }

    /// Take all pending actions.
    pub fn take_actions(&mut self) -> Vec<WindowAction> {
        std::mem::take(&mut self.actions)
    }
}
