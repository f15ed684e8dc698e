// src/runner.rs
//
// One tracking run: fetch → parse → reconcile → persist, with the store lock held
// across the read-modify-write. When the store cannot be read or written, the
// scraped members go to a JSON fallback file instead and nothing is half-applied
// to the main sheet.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::config::options::TrackerOptions;
use crate::error::{StoreError, TrackerError};
use crate::file::{FallbackDump, read_fallback, write_fallback};
use crate::progress::{Progress, Stage};
use crate::roster::history::{HISTORY_HEADERS, LevelHistory, LevelObservation};
use crate::roster::reconcile::archive_headers;
use crate::roster::{MemberRecord, Reconciler, Reconciliation, parse};
use crate::specs::guild::PageFetcher;
use crate::store::{Grid, SheetStore, StoreLock};

/// Where a run's result ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Persisted {
    Store,
    Fallback { path: PathBuf, reason: String },
}

/// Summary of what a run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub guild: String,
    pub level_column: String,
    pub members: usize,
    pub joined: Vec<String>,
    pub departed: Vec<String>,
    pub archived: usize,
    pub persisted: Persisted,
}

impl RunSummary {
    pub fn is_fallback(&self) -> bool {
        matches!(self.persisted, Persisted::Fallback { .. })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} members, {} joined, {} departed, {} archived ({})",
            self.guild,
            self.members,
            self.joined.len(),
            self.departed.len(),
            self.archived,
            self.level_column
        )?;
        match &self.persisted {
            Persisted::Store => Ok(()),
            Persisted::Fallback { path, reason } => {
                write!(f, "; store unavailable ({reason}), saved to {}", path.display())
            }
        }
    }
}

/// What a run reads back before reconciling. The lock is held until this is dropped.
struct StoredState {
    _lock: StoreLock,
    main: Option<Grid>,
    archive: Option<Grid>,
    history: LevelHistory,
}

/// Sheet layout and policies for one guild.
#[derive(Clone, Debug)]
pub struct Tracker {
    pub guild: String,
    pub sheet_id: String,
    pub main_sheet: String,
    pub archive_sheet: String,
    pub history_sheet: String,
    pub fallback_dir: PathBuf,
    pub reconciler: Reconciler,
}

impl Tracker {
    pub fn from_options(o: &TrackerOptions) -> Self {
        Self {
            guild: o.guild.clone(),
            sheet_id: o.sheet_id.clone(),
            main_sheet: o.main_sheet_name(),
            archive_sheet: o.archive_sheet_name(),
            history_sheet: o.history_sheet_name(),
            fallback_dir: o.fallback_dir.clone(),
            reconciler: o.reconcile,
        }
    }

    pub fn run<S: SheetStore + ?Sized>(
        &self,
        fetcher: &dyn PageFetcher,
        store: &mut S,
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, TrackerError> {
        self.run_at(fetcher, store, progress, chrono::Local::now().naive_local())
    }

    pub fn run_at<S: SheetStore + ?Sized>(
        &self,
        fetcher: &dyn PageFetcher,
        store: &mut S,
        progress: &mut dyn Progress,
        now: NaiveDateTime,
    ) -> Result<RunSummary, TrackerError> {
        progress.begin(Stage::ALL.len());
        let result = self.fetch_and_track(fetcher, store, progress, now);
        progress.finish();
        result
    }

    fn fetch_and_track<S: SheetStore + ?Sized>(
        &self,
        fetcher: &dyn PageFetcher,
        store: &mut S,
        progress: &mut dyn Progress,
        now: NaiveDateTime,
    ) -> Result<RunSummary, TrackerError> {
        progress.log(&format!("Fetching {} ({})", self.guild, fetcher.describe()));
        let text = fetcher.fetch_guild_table(&self.guild)?;
        progress.stage_done(Stage::Fetch);

        let members = parse(&text);
        progress.log(&format!("Parsed {} members", members.len()));
        progress.stage_done(Stage::Parse);

        self.track(&members, now, store, progress)
    }

    /// Reconcile a fallback dump into the store, as of the dump's scrape time.
    pub fn replay<S: SheetStore + ?Sized>(
        &self,
        path: &Path,
        store: &mut S,
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, TrackerError> {
        let dump = read_fallback(path)?;
        if dump.guild != self.guild || dump.sheet_id != self.sheet_id {
            return Err(TrackerError::Config(format!(
                "dump is for {} in {}, tracker is set up for {} in {}",
                dump.guild, dump.sheet_id, self.guild, self.sheet_id
            )));
        }
        progress.begin(2);
        progress.log(&format!(
            "Replaying {} members scraped {}",
            dump.members.len(),
            dump.scraped_at
        ));
        let result = self.track(&dump.members, dump.scraped_at, store, progress);
        progress.finish();
        result
    }

    /// Reconcile `members` against the store and persist, or fall back.
    fn track<S: SheetStore + ?Sized>(
        &self,
        members: &[MemberRecord],
        now: NaiveDateTime,
        store: &mut S,
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, TrackerError> {
        // An empty scrape would mark the whole guild as departed.
        if members.is_empty() {
            return Err(TrackerError::EmptyRoster(self.guild.clone()));
        }

        let state = match self.read_state(store) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "store unreadable, reconciling against empty state");
                let rec = self.reconciler.reconcile_at(members, None, None, now);
                progress.stage_done(Stage::Reconcile);
                return self.fall_back(members, now, &rec, &e, progress);
            }
        };

        let rec = self
            .reconciler
            .reconcile_at(members, state.main.as_ref(), state.archive.as_ref(), now);
        progress.log(&format!(
            "{} joined, {} continuing, {} departed",
            rec.joined.len(),
            rec.continuing.len(),
            rec.departed.len()
        ));
        progress.stage_done(Stage::Reconcile);

        if let Err(e) = self.persist(store, &rec, &state) {
            tracing::error!(error = %e, "store write failed");
            return self.fall_back(members, now, &rec, &e, progress);
        }
        progress.stage_done(Stage::Persist);

        let summary = self.summary(&rec, Persisted::Store);
        tracing::info!(%summary, "run stored");
        progress.log(&summary.to_string());
        Ok(summary)
    }

    fn read_state<S: SheetStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<StoredState, StoreError> {
        let lock = store.lock(&self.sheet_id)?;
        let main = store.read_grid(&self.sheet_id, &self.main_sheet)?;
        let archive = store.read_grid(&self.sheet_id, &self.archive_sheet)?;
        let history = store
            .read_grid(&self.sheet_id, &self.history_sheet)?
            .map(|g| LevelHistory::from_rows(&g.to_rows()))
            .unwrap_or_default();
        if main.is_none() {
            tracing::info!(sheet = %self.main_sheet, "no previous roster, first run");
        }
        Ok(StoredState { _lock: lock, main, archive, history })
    }

    /// Archive first, then history, then the main sheet. If a later step fails,
    /// a rerun or replay of the same scrape re-detects the departures and the
    /// archive check skips them; history rows already stored for the same
    /// (name, column) are skipped the same way.
    fn persist<S: SheetStore + ?Sized>(
        &self,
        store: &mut S,
        rec: &Reconciliation,
        state: &StoredState,
    ) -> Result<(), StoreError> {
        let id = self.sheet_id.as_str();

        if state.archive.is_none() {
            store.write_grid(id, &self.archive_sheet, &Grid::new(archive_headers()))?;
        }
        if !rec.archive_rows.is_empty() {
            store.append_rows(id, &self.archive_sheet, &rec.archive_rows)?;
        }

        let history_rows: Vec<_> = rec
            .observations
            .iter()
            .filter(|o| state.history.level(&o.name, &o.column).is_none())
            .map(LevelObservation::to_row)
            .collect();
        if history_rows.len() < rec.observations.len() {
            tracing::debug!(
                skipped = rec.observations.len() - history_rows.len(),
                "history rows already stored"
            );
        }
        match store.append_rows(id, &self.history_sheet, &history_rows) {
            Err(StoreError::MissingSheet { .. }) => {
                let mut g = Grid::new(HISTORY_HEADERS.iter().map(|h| s!(*h)).collect());
                g.rows = history_rows;
                store.write_grid(id, &self.history_sheet, &g)?;
            }
            other => other?,
        }

        store.write_grid(id, &self.main_sheet, &rec.grid)
    }

    fn fall_back(
        &self,
        members: &[MemberRecord],
        now: NaiveDateTime,
        rec: &Reconciliation,
        cause: &StoreError,
        progress: &mut dyn Progress,
    ) -> Result<RunSummary, TrackerError> {
        let dump = FallbackDump {
            guild: self.guild.clone(),
            sheet_id: self.sheet_id.clone(),
            scraped_at: now,
            reason: cause.to_string(),
            members: members.to_vec(),
        };
        let path = write_fallback(&self.fallback_dir, &dump).map_err(|source| TrackerError::Fallback {
            path: self.fallback_dir.join(dump.file_name()),
            source,
        })?;
        tracing::warn!(path = %path.display(), "scrape saved to fallback file");

        let summary = self.summary(rec, Persisted::Fallback { path, reason: dump.reason });
        progress.log(&summary.to_string());
        Ok(summary)
    }

    fn summary(&self, rec: &Reconciliation, persisted: Persisted) -> RunSummary {
        RunSummary {
            guild: self.guild.clone(),
            level_column: rec.level_column.clone(),
            members: rec.grid.rows.len(),
            joined: rec.joined.clone(),
            departed: rec.departed.clone(),
            archived: rec.archive_rows.len(),
            persisted,
        }
    }
}
