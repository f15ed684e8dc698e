// src/gui/components/tabs.rs
//
// Sheet tabs. Switching re-reads the sheet from the store; nothing is cached.

use eframe::egui;

use crate::gui::app::{App, View};

pub fn draw(ui: &mut egui::Ui, app: &mut App) {
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        for view in View::ALL {
            let selected = app.view == view;
            if ui.selectable_label(selected, view.title()).clicked() && !selected {
                tracing::debug!(from = ?app.view, to = ?view, "tab switch");
                app.view = view;
                app.reload_view();
            }
        }

        if app.view == View::History {
            ui.separator();
            if ui.checkbox(&mut app.history_wide, "Per member").changed() {
                app.reload_view();
            }
        }

        ui.separator();
        ui.label(format!("{} rows", app.grid.rows.len()));
    });
}
