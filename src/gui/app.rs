// src/gui/app.rs
use std::{
    error::Error,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use eframe::egui;

use crate::{
    config::{consts::CONFIG_FILE, options::TrackerOptions},
    roster::LevelHistory,
    runner::{RunSummary, Tracker},
    store::{Grid, SheetStore},
};

use super::progress::GuiProgress;

pub fn run(options: eframe::NativeOptions) -> Result<(), Box<dyn Error>> {
    let config_path = PathBuf::from(CONFIG_FILE);
    let tracker_options = TrackerOptions::load(&config_path)?;
    crate::log::init(&tracker_options.log_path(), false, false)?;

    eframe::run_native(
        "Guild Tracker",
        options,
        Box::new(move |_cc| Ok(Box::new(App::new(tracker_options, config_path)))),
    )?;
    Ok(())
}

/// Which stored sheet the table shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Roster,
    Archive,
    History,
}

impl View {
    pub const ALL: [View; 3] = [View::Roster, View::Archive, View::History];

    pub fn title(self) -> &'static str {
        match self {
            View::Roster => "Roster",
            View::Archive => "Archive",
            View::History => "History",
        }
    }
}

pub struct App {
    pub options: TrackerOptions,
    config_path: PathBuf,

    // guild field UX (applied to options on Track)
    pub guild_text: String,

    pub view: View,
    /// History as one row per member instead of one row per observation.
    pub history_wide: bool,
    pub grid: Grid,

    pub status: Arc<Mutex<String>>,
    pub last_summary: Option<RunSummary>,
}

impl App {
    pub fn new(options: TrackerOptions, config_path: PathBuf) -> Self {
        let guild_text = options.guild.clone();
        let mut app = Self {
            options,
            config_path,
            guild_text,
            view: View::Roster,
            history_wide: true,
            grid: Grid::default(),
            status: Arc::new(Mutex::new(s!("Idle"))),
            last_summary: None,
        };
        app.reload_view();
        tracing::info!(guild = %app.options.guild, sheet_id = %app.options.sheet_id, "gui started");
        app
    }

    pub fn set_status<T: Into<String>>(&self, msg: T) {
        if let Ok(mut s) = self.status.lock() {
            *s = msg.into();
        }
    }

    pub fn status_text(&self) -> String {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn sheet_for(&self, view: View) -> String {
        match view {
            View::Roster => self.options.main_sheet_name(),
            View::Archive => self.options.archive_sheet_name(),
            View::History => self.options.history_sheet_name(),
        }
    }

    /// Re-read the current view's sheet from the store.
    pub fn reload_view(&mut self) {
        let sheet = self.sheet_for(self.view);
        match self.options.store().read_grid(&self.options.sheet_id, &sheet) {
            Ok(Some(g)) if self.view == View::History && self.history_wide => {
                self.grid = LevelHistory::from_rows(&g.to_rows()).to_wide_grid();
            }
            Ok(Some(g)) => self.grid = g,
            Ok(None) => {
                self.grid = Grid::default();
                tracing::debug!(%sheet, "sheet not created yet");
            }
            Err(e) => {
                self.grid = Grid::default();
                tracing::error!(%sheet, error = %e, "could not read sheet");
                self.set_status(format!("Could not read {sheet}: {e}"));
            }
        }
    }

    /// One tracking run, on the UI thread.
    pub fn track(&mut self) {
        self.options.set_guild(&self.guild_text);
        let tracker = Tracker::from_options(&self.options);
        let mut store = self.options.store();
        let fetcher = self.options.http_fetcher();
        let mut progress = GuiProgress::new(self.status.clone());

        match tracker.run(&fetcher, &mut store, &mut progress) {
            Ok(summary) => {
                self.set_status(summary.to_string());
                self.last_summary = Some(summary);
            }
            Err(e) => {
                tracing::error!(error = %e, "run failed");
                self.set_status(format!("Run failed: {e}"));
            }
        }

        // Remember the guild for next start.
        if let Err(e) = self.options.save(&self.config_path) {
            tracing::warn!(error = %e, "could not save options");
        }
        self.reload_view();
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label("Guild:");
                ui.add(egui::TextEdit::singleline(&mut self.guild_text).desired_width(220.0));
                let can_track = !self.guild_text.trim().is_empty();
                if ui.add_enabled(can_track, egui::Button::new("Track")).clicked() {
                    self.track();
                }
                if ui.button("Reload").clicked() {
                    self.reload_view();
                }
                ui.separator();
                ui.label(format!("Sheet: {}", self.options.sheet_id));
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.status_text());
            if let Some(s) = &self.last_summary {
                if !s.joined.is_empty() {
                    ui.label(format!("Joined: {}", s.joined.join(", ")));
                }
                if !s.departed.is_empty() {
                    ui.label(format!("Departed: {}", s.departed.join(", ")));
                }
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            super::components::tabs::draw(ui, self);
            ui.separator();
            super::components::data_table::draw(ui, self.view, &self.grid);
        });
    }
}
