// src/file.rs
//
// File-level helpers under the store: directories, whole-sheet writes through a
// temp file, appends, and the JSON fallback dumps written when the store cannot
// take a run.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::sanitize::sanitize_sheet_name;
use crate::csv::write_row;
use crate::error::StoreError;
use crate::roster::MemberRecord;
use crate::store::Row;

pub fn ensure_directory(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() && !dir.is_dir() {
        return Err(StoreError::io(
            dir,
            io::Error::other(format!("path exists but is not a directory: {}", dir.display())),
        ));
    }
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

/// Write all rows to `<path>.tmp`, then rename over `path`. A failure part-way
/// leaves the previous file untouched.
pub fn write_rows_atomic(path: &Path, rows: &[Row], sep: char) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let tmp = path.with_extension("csv.tmp");

    let written = (|| -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&tmp)?);
        for row in rows {
            write_row(&mut out, row, sep)?;
        }
        out.flush()?;
        out.get_ref().sync_all()
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

/// Append rows to an existing file.
pub fn append_rows(path: &Path, rows: &[Row], sep: char) -> Result<(), StoreError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        write_row(&mut out, row, sep).map_err(|e| StoreError::io(path, e))?;
    }
    out.flush().map_err(|e| StoreError::io(path, e))
}

/* ---------------- Fallback dumps ---------------- */

/// An unreconciled scrape, kept when the store could not be read or written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackDump {
    pub guild: String,
    pub sheet_id: String,
    pub scraped_at: NaiveDateTime,
    /// Why the store was bypassed.
    pub reason: String,
    pub members: Vec<MemberRecord>,
}

impl FallbackDump {
    /// `<guild>_<YYYYmmdd_HHMMSS>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.json",
            sanitize_sheet_name(&self.guild),
            self.scraped_at.format("%Y%m%d_%H%M%S")
        )
    }
}

pub fn write_fallback(dir: &Path, dump: &FallbackDump) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(dump.file_name());
    let json = serde_json::to_string_pretty(dump).map_err(io::Error::other)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn read_fallback(path: &Path) -> Result<FallbackDump, crate::error::TrackerError> {
    let text = fs::read_to_string(path).map_err(|source| crate::error::TrackerError::Fallback {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
