// src/store.rs
//
// Sheets: a header row plus data rows of string cells, kept per spreadsheet id.
// `CsvSheetStore` is the on-disk backend (one CSV file per sheet); `MemoryStore`
// backs tests and dry runs.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::sanitize::sanitize_sheet_name;
use crate::csv::{SEP, parse_rows};
use crate::error::StoreError;
use crate::file::{append_rows, ensure_directory, write_rows_atomic};

pub type Row = Vec<String>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Row,
    pub rows: Vec<Row>,
}

impl Grid {
    pub fn new(headers: Row) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// First row is the header row. `None` for an empty sheet.
    pub fn from_rows(mut rows: Vec<Row>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let headers = rows.remove(0);
        Some(Self { headers, rows })
    }

    pub fn to_rows(&self) -> Vec<Row> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.headers.clone());
        out.extend(self.rows.iter().cloned());
        out
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Held for the duration of one read-modify-write. Dropping it releases the lock.
#[derive(Debug)]
pub struct StoreLock {
    path: Option<PathBuf>,
}

impl StoreLock {
    pub fn noop() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(p) = self.path.take() {
            if let Err(e) = fs::remove_file(&p) {
                tracing::warn!(path = %p.display(), error = %e, "could not release store lock");
            }
        }
    }
}

pub trait SheetStore {
    fn read_grid(&self, sheet_id: &str, sheet: &str) -> Result<Option<Grid>, StoreError>;

    /// Replace the whole sheet, creating it if needed.
    fn write_grid(&mut self, sheet_id: &str, sheet: &str, grid: &Grid) -> Result<(), StoreError>;

    /// Append below the existing rows. The sheet must exist.
    fn append_rows(&mut self, sheet_id: &str, sheet: &str, rows: &[Row]) -> Result<(), StoreError>;

    fn lock(&self, _sheet_id: &str) -> Result<StoreLock, StoreError> {
        Ok(StoreLock::noop())
    }

    fn describe(&self) -> String {
        s!("store")
    }
}

/* ---------------- CSV files ---------------- */

/// `<root>/<sheet_id>/<sheet>.csv`
#[derive(Clone, Debug)]
pub struct CsvSheetStore {
    root: PathBuf,
}

pub const LOCK_FILE: &str = ".lock";

impl CsvSheetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sheet_dir(&self, sheet_id: &str) -> PathBuf {
        self.root.join(sanitize_sheet_name(sheet_id))
    }

    pub fn sheet_path(&self, sheet_id: &str, sheet: &str) -> PathBuf {
        self.sheet_dir(sheet_id)
            .join(join!(&sanitize_sheet_name(sheet), ".csv"))
    }
}

impl SheetStore for CsvSheetStore {
    fn read_grid(&self, sheet_id: &str, sheet: &str) -> Result<Option<Grid>, StoreError> {
        let path = self.sheet_path(sheet_id, sheet);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        Ok(Grid::from_rows(parse_rows(&text, SEP)))
    }

    fn write_grid(&mut self, sheet_id: &str, sheet: &str, grid: &Grid) -> Result<(), StoreError> {
        let path = self.sheet_path(sheet_id, sheet);
        write_rows_atomic(&path, &grid.to_rows(), SEP)?;
        tracing::debug!(path = %path.display(), rows = grid.rows.len(), "wrote sheet");
        Ok(())
    }

    fn append_rows(&mut self, sheet_id: &str, sheet: &str, rows: &[Row]) -> Result<(), StoreError> {
        let path = self.sheet_path(sheet_id, sheet);
        if !path.is_file() {
            return Err(StoreError::MissingSheet {
                sheet_id: s!(sheet_id),
                sheet: s!(sheet),
            });
        }
        append_rows(&path, rows, SEP)?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "appended rows");
        Ok(())
    }

    fn lock(&self, sheet_id: &str) -> Result<StoreLock, StoreError> {
        let dir = self.sheet_dir(sheet_id);
        ensure_directory(&dir)?;
        let path = dir.join(LOCK_FILE);
        match create_lock(&path) {
            Err(StoreError::Locked(_)) if lock_is_stale(&path) => {
                tracing::warn!(path = %path.display(), "removing stale store lock");
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                create_lock(&path)
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("csv store at {}", self.root.display())
    }
}

fn create_lock(path: &Path) -> Result<StoreLock, StoreError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut f) => {
            // Holder's pid, read back by `lock_is_stale`.
            let _ = writeln!(f, "{}", std::process::id());
            Ok(StoreLock { path: Some(path.to_path_buf()) })
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::Locked(path.to_path_buf())),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// The recorded holder is no longer running. A lock without a readable pid
/// (still being written, or edited by hand) counts as held.
fn lock_is_stale(path: &Path) -> bool {
    let Ok(text) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(pid) = text.trim().parse::<u32>() else {
        return false;
    };
    pid != std::process::id() && holder_gone(pid)
}

#[cfg(target_os = "linux")]
fn holder_gone(pid: u32) -> bool {
    !Path::new("/proc").join(pid.to_string()).exists()
}

// No cheap liveness check elsewhere; the lock stays until removed by hand.
#[cfg(not(target_os = "linux"))]
fn holder_gone(_pid: u32) -> bool {
    false
}

/* ---------------- In memory ---------------- */

#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: HashMap<(String, String), Grid>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, sheet_id: &str, sheet: &str, grid: Grid) -> Self {
        self.sheets.insert((s!(sheet_id), s!(sheet)), grid);
        self
    }

    pub fn grid(&self, sheet_id: &str, sheet: &str) -> Option<&Grid> {
        self.sheets.get(&(s!(sheet_id), s!(sheet)))
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable(s!("writes disabled")));
        }
        Ok(())
    }
}

impl SheetStore for MemoryStore {
    fn read_grid(&self, sheet_id: &str, sheet: &str) -> Result<Option<Grid>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable(s!("reads disabled")));
        }
        Ok(self.grid(sheet_id, sheet).cloned())
    }

    fn write_grid(&mut self, sheet_id: &str, sheet: &str, grid: &Grid) -> Result<(), StoreError> {
        self.check_write()?;
        self.sheets.insert((s!(sheet_id), s!(sheet)), grid.clone());
        Ok(())
    }

    fn append_rows(&mut self, sheet_id: &str, sheet: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.check_write()?;
        match self.sheets.get_mut(&(s!(sheet_id), s!(sheet))) {
            Some(g) => {
                g.rows.extend(rows.iter().cloned());
                Ok(())
            }
            None => Err(StoreError::MissingSheet {
                sheet_id: s!(sheet_id),
                sheet: s!(sheet),
            }),
        }
    }

    fn describe(&self) -> String {
        s!("memory store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rows_round_trip() {
        let rows = vec![row!["Name", "Level"], row!["Ann", "10"]];
        let g = Grid::from_rows(rows.clone()).unwrap();
        assert_eq!(g.headers, row!["Name", "Level"]);
        assert_eq!(g.to_rows(), rows);
        assert_eq!(g.column("Level"), Some(1));
        assert_eq!(g.cell(0, 1), "10");
        assert_eq!(g.cell(5, 5), "");
        assert!(Grid::from_rows(Vec::new()).is_none());
    }

    #[test]
    fn memory_append_needs_sheet() {
        let mut st = MemoryStore::new();
        let err = st.append_rows("id", "Archive", &[row!["x"]]).unwrap_err();
        assert!(matches!(err, StoreError::MissingSheet { .. }));

        st.write_grid("id", "Archive", &Grid::new(row!["h"])).unwrap();
        st.append_rows("id", "Archive", &[row!["x"]]).unwrap();
        assert_eq!(st.grid("id", "Archive").map(|g| g.rows.len()), Some(1));
    }

    #[test]
    fn memory_failure_switches() {
        let mut st = MemoryStore::new();
        st.fail_reads = true;
        assert!(st.read_grid("id", "s").is_err());
        st.fail_writes = true;
        assert!(st.write_grid("id", "s", &Grid::default()).is_err());
    }
}
