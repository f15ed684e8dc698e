// src/gui/components/data_table.rs
//
// Draws one sheet. Purely a view over the grid.

use eframe::egui::{self, Align, Layout, RichText, TextWrapMode};
use egui_extras::{Column, TableBuilder};

use crate::gui::app::View;
use crate::roster::history::is_level_column;
use crate::store::Grid;

fn is_numeric_column(header: &str) -> bool {
    header == "Level" || is_level_column(header)
}

fn width_for(header: &str) -> f32 {
    match header {
        "Name" => 180.0,
        "Rank" | "Vocation" => 110.0,
        "Joining Date" | "Left Date" | "Reason" => 100.0,
        "Column" => 170.0,
        h if is_level_column(h) => 150.0,
        _ => 70.0,
    }
}

pub fn draw(ui: &mut egui::Ui, view: View, grid: &Grid) {
    if grid.headers.is_empty() {
        ui.label("Nothing stored yet. Press Track to take the first snapshot.");
        return;
    }

    let cols = grid.headers.len();
    let numeric: Vec<bool> = grid.headers.iter().map(|h| is_numeric_column(h)).collect();

    // Reserve space for scroll bars instead of drawing over the last column.
    ui.style_mut().spacing.scroll.floating = false;

    let avail_h = ui.available_height();
    egui::ScrollArea::new([true, false])
        .id_salt("sheet_hscroll")
        .min_scrolled_height(avail_h)
        .max_height(avail_h)
        .show(ui, |ui| {
            let mut table = TableBuilder::new(ui)
                .striped(true)
                .min_scrolled_height(0.0)
                // New column set (a snapshot was added) → fresh widths.
                .id_salt(("sheet_table", view.title(), cols));
            for h in &grid.headers {
                table = table.column(Column::initial(width_for(h)).resizable(true).clip(true).at_least(20.0));
            }

            table
                .header(24.0, |mut header| {
                    for (ci, h) in grid.headers.iter().enumerate() {
                        header.col(|ui| {
                            ui.style_mut().wrap_mode = Some(TextWrapMode::Extend);
                            let label = egui::Label::new(RichText::new(h).strong()).selectable(false);
                            if numeric[ci] {
                                ui.centered_and_justified(|ui| {
                                    ui.add(label);
                                });
                            } else {
                                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                                    ui.add(label);
                                });
                            }
                        });
                    }
                })
                .body(|body| {
                    body.rows(20.0, grid.rows.len(), |mut row| {
                        let Some(data) = grid.rows.get(row.index()) else {
                            return;
                        };
                        for ci in 0..cols {
                            let cell = data.get(ci).map(|s| s.as_str()).unwrap_or("");
                            row.col(|ui| {
                                ui.style_mut().wrap_mode = Some(TextWrapMode::Extend);
                                if numeric[ci] {
                                    ui.centered_and_justified(|ui| {
                                        ui.label(cell);
                                    });
                                } else {
                                    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                                        ui.label(cell);
                                    });
                                }
                            });
                        }
                    });
                });
        });
}
