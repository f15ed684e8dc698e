// tests/runner_fallback.rs
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use guild_tracker::config::options::TrackerOptions;
use guild_tracker::error::{FetchError, StoreError, TrackerError};
use guild_tracker::file::read_fallback;
use guild_tracker::progress::NullProgress;
use guild_tracker::runner::{Persisted, Tracker};
use guild_tracker::specs::guild::{FileFetcher, PageFetcher};
use guild_tracker::store::{CsvSheetStore, Grid, MemoryStore, Row, SheetStore};

struct Text(String);

impl PageFetcher for Text {
    fn fetch_guild_table(&self, _guild: &str) -> Result<String, FetchError> {
        Ok(self.0.clone())
    }
}

struct Blocked;

impl PageFetcher for Blocked {
    fn fetch_guild_table(&self, _guild: &str) -> Result<String, FetchError> {
        Err(FetchError::Blocked("just a moment".into()))
    }
}

/// Memory store that refuses to overwrite one sheet while `failing` is set.
struct RefusesSheet {
    inner: MemoryStore,
    sheet: String,
    failing: bool,
}

impl SheetStore for RefusesSheet {
    fn read_grid(&self, sheet_id: &str, sheet: &str) -> Result<Option<Grid>, StoreError> {
        self.inner.read_grid(sheet_id, sheet)
    }

    fn write_grid(&mut self, sheet_id: &str, sheet: &str, grid: &Grid) -> Result<(), StoreError> {
        if self.failing && sheet == self.sheet {
            return Err(StoreError::Unavailable(format!("{sheet} refused")));
        }
        self.inner.write_grid(sheet_id, sheet, grid)
    }

    fn append_rows(&mut self, sheet_id: &str, sheet: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.inner.append_rows(sheet_id, sheet, rows)
    }
}

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .unwrap()
}

fn roster(names: &[&str]) -> Text {
    let mut raw = String::from("Rank Name Vocation Level Joining Date\nMember\n");
    for (i, n) in names.iter().enumerate() {
        raw.push_str(&format!("{n} Sorcerer {} Apr 0{} 2024\n", 100 + i, i + 1));
    }
    Text(raw)
}

fn options(dir: &Path) -> TrackerOptions {
    TrackerOptions {
        store_dir: dir.join("store"),
        fallback_dir: dir.join("fallback"),
        ..TrackerOptions::default()
    }
}

#[test]
fn fetch_errors_abort_without_touching_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::from_options(&options(dir.path()));
    let mut store = MemoryStore::new();

    let err = tracker.run(&Blocked, &mut store, &mut NullProgress).unwrap_err();
    assert!(matches!(err, TrackerError::Fetch(FetchError::Blocked(_))));
    assert!(store.grid(&tracker.sheet_id, &tracker.main_sheet).is_none());
    assert!(!dir.path().join("fallback").exists());
}

#[test]
fn unreadable_store_falls_back_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::from_options(&options(dir.path()));
    let mut store = MemoryStore::new();
    store.fail_reads = true;

    let summary = tracker
        .run_at(&roster(&["Ann", "Bob"]), &mut store, &mut NullProgress, at(1))
        .unwrap();

    let Persisted::Fallback { path, reason } = &summary.persisted else {
        panic!("expected fallback, got {:?}", summary.persisted);
    };
    assert!(reason.contains("reads disabled"));
    assert_eq!(summary.joined.len(), 2);

    let dump = read_fallback(path).unwrap();
    assert_eq!(dump.scraped_at, at(1));
    assert_eq!(dump.members.len(), 2);
    assert!(store.grid(&tracker.sheet_id, &tracker.main_sheet).is_none());
}

#[test]
fn failed_write_falls_back_and_replay_stores_it() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::from_options(&options(dir.path()));
    let mut store = MemoryStore::new();
    store.fail_writes = true;

    let summary = tracker
        .run_at(&roster(&["Ann", "Bob"]), &mut store, &mut NullProgress, at(1))
        .unwrap();
    let Persisted::Fallback { path, .. } = summary.persisted else {
        panic!("expected fallback");
    };

    store.fail_writes = false;
    let replayed = tracker.replay(&path, &mut store, &mut NullProgress).unwrap();
    assert_eq!(replayed.persisted, Persisted::Store);
    assert_eq!(replayed.level_column, "Level_01/05/2024_12:30:00");

    let main = store.grid(&tracker.sheet_id, &tracker.main_sheet).unwrap();
    assert_eq!(main.rows.len(), 2);
    assert_eq!(main.headers.last().map(|s| s.as_str()), Some("Level_01/05/2024_12:30:00"));
}

#[test]
fn replay_refuses_another_guilds_dump() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    store.fail_reads = true;
    let summary = Tracker::from_options(&options(dir.path()))
        .run_at(&roster(&["Ann"]), &mut store, &mut NullProgress, at(1))
        .unwrap();
    let Persisted::Fallback { path, .. } = summary.persisted else {
        panic!("expected fallback");
    };

    let mut other = options(dir.path());
    other.set_guild("Someone Else");
    let err = Tracker::from_options(&other)
        .replay(&path, &mut MemoryStore::new(), &mut NullProgress)
        .unwrap_err();
    assert!(matches!(err, TrackerError::Config(_)));
}

#[test]
fn csv_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let tracker = Tracker::from_options(&opts);
    let mut store = CsvSheetStore::new(&opts.store_dir);

    let first = tracker
        .run_at(&roster(&["Ann", "Bob", "Cy"]), &mut store, &mut NullProgress, at(1))
        .unwrap();
    assert_eq!(first.persisted, Persisted::Store);
    assert_eq!(first.joined.len(), 3);

    let second = tracker
        .run_at(&roster(&["Ann", "Cy"]), &mut store, &mut NullProgress, at(2))
        .unwrap();
    assert_eq!(second.departed, vec!["Bob".to_string()]);
    assert_eq!(second.archived, 1);

    let main = store.read_grid(&opts.sheet_id, &opts.main_sheet_name()).unwrap().unwrap();
    assert_eq!(main.headers.len(), 8);
    assert_eq!(main.rows.len(), 2);

    let archive = store.read_grid(&opts.sheet_id, &opts.archive_sheet_name()).unwrap().unwrap();
    assert_eq!(archive.headers[6], "Left Date");
    assert_eq!(archive.rows.len(), 1);
    assert_eq!(archive.rows[0][1], "Bob");
    assert_eq!(archive.rows[0][7], "Left Guild");

    let history = store.read_grid(&opts.sheet_id, &opts.history_sheet_name()).unwrap().unwrap();
    assert_eq!(history.headers, vec!["Name", "Column", "Level"]);
    assert_eq!(history.rows.len(), 5);

    // Lock released after each run.
    assert!(!store.sheet_dir(&opts.sheet_id).join(".lock").exists());
}

#[test]
fn held_lock_sends_run_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let tracker = Tracker::from_options(&opts);
    let mut store = CsvSheetStore::new(&opts.store_dir);

    let _other_run = store.lock(&opts.sheet_id).unwrap();
    let summary = tracker
        .run_at(&roster(&["Ann"]), &mut store, &mut NullProgress, at(1))
        .unwrap();
    assert!(summary.is_fallback());
    assert!(store.read_grid(&opts.sheet_id, &opts.main_sheet_name()).unwrap().is_none());
}

#[test]
fn saved_page_through_file_fetcher() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("guild.html");
    fs::write(
        &page,
        "<html><table><tr><td>Rank</td><td>Name</td><td>Vocation</td></tr>\
         <tr><td>Leader</td><td>Ann</td><td>Druid</td><td>90</td><td>Jan 01 2020</td></tr></table></html>",
    )
    .unwrap();

    let opts = options(dir.path());
    let mut store = MemoryStore::new();
    let summary = Tracker::from_options(&opts)
        .run_at(&FileFetcher::new(&page), &mut store, &mut NullProgress, at(1))
        .unwrap();
    assert_eq!(summary.members, 1);
    let main = store.grid(&opts.sheet_id, &opts.main_sheet_name()).unwrap();
    assert_eq!(main.rows[0][0], "Leader");
    assert_eq!(main.rows[0][4], "90");
}

#[test]
fn replay_after_failed_main_write_adds_nothing_twice() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::from_options(&options(dir.path()));
    let (id, main, archive, history) = (
        tracker.sheet_id.clone(),
        tracker.main_sheet.clone(),
        tracker.archive_sheet.clone(),
        tracker.history_sheet.clone(),
    );
    let mut store = RefusesSheet {
        inner: MemoryStore::new(),
        sheet: main.clone(),
        failing: false,
    };

    let first = tracker
        .run_at(&roster(&["Ann", "Bob"]), &mut store, &mut NullProgress, at(1))
        .unwrap();
    assert_eq!(first.persisted, Persisted::Store);

    // Archive and history land, the main sheet does not.
    store.failing = true;
    let failed = tracker
        .run_at(&roster(&["Ann"]), &mut store, &mut NullProgress, at(2))
        .unwrap();
    let Persisted::Fallback { path, .. } = failed.persisted else {
        panic!("expected fallback");
    };
    assert_eq!(store.inner.grid(&id, &archive).unwrap().rows.len(), 1);
    assert_eq!(store.inner.grid(&id, &history).unwrap().rows.len(), 3);
    assert_eq!(store.inner.grid(&id, &main).unwrap().rows.len(), 2);

    store.failing = false;
    let replayed = tracker.replay(&path, &mut store, &mut NullProgress).unwrap();
    assert_eq!(replayed.persisted, Persisted::Store);
    assert_eq!(replayed.departed, vec!["Bob".to_string()]);
    assert_eq!(replayed.archived, 0);

    assert_eq!(store.inner.grid(&id, &archive).unwrap().rows.len(), 1);
    let history_rows = &store.inner.grid(&id, &history).unwrap().rows;
    assert_eq!(history_rows.len(), 3);
    assert_eq!(history_rows[2], vec!["Ann".to_string(), "Level_02/05/2024_12:30:00".to_string(), "100".to_string()]);

    let main_grid = store.inner.grid(&id, &main).unwrap();
    assert_eq!(main_grid.rows.len(), 1);
    assert_eq!(main_grid.headers.len(), 8);
}
