// src/roster/history.rs
//
// Level history as a normalized series of (name, column, level) observations.
// The main sheet's `Level_*` columns are a projection of this: one column per
// run, one row per member. Keeping the series separate means the wide sheet can
// be rebuilt, and departed members' history survives in the history sheet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::{Grid, Row};

use super::types::MemberRecord;

/// Header prefix of snapshot columns in the main sheet.
pub const LEVEL_PREFIX: &str = "Level_";

pub const HISTORY_HEADERS: [&str; 3] = ["Name", "Column", "Level"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelObservation {
    pub name: String,
    pub column: String,
    pub level: String,
}

impl LevelObservation {
    pub fn to_row(&self) -> Row {
        vec![self.name.clone(), self.column.clone(), self.level.clone()]
    }
}

pub fn is_level_column(header: &str) -> bool {
    header.starts_with(LEVEL_PREFIX)
}

#[derive(Clone, Debug, Default)]
pub struct LevelHistory {
    /// Snapshot columns, first-seen order.
    columns: Vec<String>,
    /// Members, first-seen order.
    names: Vec<String>,
    levels: HashMap<String, HashMap<String, String>>,
    log: Vec<LevelObservation>,
}

impl LevelHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the snapshot columns of a main sheet. Repeated headers are read
    /// once (first occurrence); empty cells are not observations. Columns are
    /// registered even when every cell is empty.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut h = Self::new();
        let name_col = 1;

        let mut level_cols: Vec<(usize, &str)> = Vec::new();
        for (ci, header) in grid.headers.iter().enumerate() {
            if is_level_column(header) && !level_cols.iter().any(|&(_, c)| c == header.as_str()) {
                level_cols.push((ci, header.as_str()));
                h.register_column(header);
            }
        }

        for row in &grid.rows {
            let name = row.get(name_col).map(|s| s.as_str()).unwrap_or("");
            if name.is_empty() {
                continue;
            }
            for &(ci, column) in &level_cols {
                if let Some(level) = row.get(ci).filter(|c| !c.is_empty()) {
                    h.observe(name, column, level);
                }
            }
        }
        h
    }

    /// Read a history sheet (`Name, Column, Level`). A leading header row is
    /// skipped; short rows are padded.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut h = Self::new();
        for (i, row) in rows.iter().enumerate() {
            if i == 0 && row.iter().map(|s| s.as_str()).eq(HISTORY_HEADERS) {
                continue;
            }
            let cell = |ix: usize| row.get(ix).map(|s| s.as_str()).unwrap_or("");
            if cell(0).is_empty() || cell(1).is_empty() {
                continue;
            }
            h.observe(cell(0), cell(1), cell(2));
        }
        h
    }

    fn register_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(s!(column));
        }
    }

    /// Record one cell. A later observation of the same (name, column) replaces
    /// the earlier value.
    pub fn observe(&mut self, name: &str, column: &str, level: &str) {
        self.register_column(column);
        if !self.levels.contains_key(name) {
            self.names.push(s!(name));
        }
        self.levels
            .entry(s!(name))
            .or_default()
            .insert(s!(column), s!(level));
        self.log.push(LevelObservation {
            name: s!(name),
            column: s!(column),
            level: s!(level),
        });
    }

    /// Record one run: every member's level under `column`. Returns the new
    /// observations in member order.
    pub fn record(&mut self, column: &str, members: &[&MemberRecord]) -> Vec<LevelObservation> {
        let start = self.log.len();
        self.register_column(column);
        for m in members {
            self.observe(&m.name, column, &m.level);
        }
        self.log[start..].to_vec()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn level(&self, name: &str, column: &str) -> Option<&str> {
        self.levels.get(name)?.get(column).map(|s| s.as_str())
    }

    /// Every observation in the order it was made.
    pub fn observations(&self) -> &[LevelObservation] {
        &self.log
    }

    pub fn to_rows(&self) -> Vec<Row> {
        self.log.iter().map(LevelObservation::to_row).collect()
    }

    /// Wide row for `name`: `base` cells followed by one cell per column
    /// (empty where the member was not observed).
    pub fn project_row(&self, mut base: Row, name: &str, columns: &[String]) -> Row {
        base.reserve(columns.len());
        for column in columns {
            base.push(s!(self.level(name, column).unwrap_or("")));
        }
        base
    }

    /// `Name, <columns...>` pivot over everyone ever observed.
    pub fn to_wide_grid(&self) -> Grid {
        let mut headers = vec![s!("Name")];
        headers.extend(self.columns.iter().cloned());
        let rows = self
            .names
            .iter()
            .map(|n| self.project_row(vec![n.clone()], n, &self.columns))
            .collect();
        Grid { headers, rows }
    }
}
