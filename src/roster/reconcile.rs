// src/roster/reconcile.rs
//
// Current roster + previously stored main sheet → next main sheet, archive rows,
// and this run's level observations. Pure: the clock is the only input that does
// not come from the arguments, and `reconcile_at` takes that too.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::store::{Grid, Row};

use super::history::{LEVEL_PREFIX, LevelHistory, LevelObservation};
use super::types::MemberRecord;

pub const BASE_HEADERS: [&str; 6] = ["Rank", "Name", "Title", "Vocation", "Level", "Joining Date"];
pub const ARCHIVE_HEADERS: [&str; 8] = [
    "Rank",
    "Name",
    "Title",
    "Vocation",
    "Level",
    "Joining Date",
    "Left Date",
    "Reason",
];
pub const LEFT_REASON: &str = "Left Guild";

const COL_RANK: usize = 0;
const COL_NAME: usize = 1;
const COL_TITLE: usize = 2;
const COL_VOCATION: usize = 3;
const COL_LEVEL: usize = 4;
const COL_JOINED: usize = 5;

const COLUMN_TIME_FORMAT: &str = "%d/%m/%Y_%H:%M:%S";
const LEFT_DATE_FORMAT: &str = "%d/%m/%Y";

/// What to do when one scrape lists the same name twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later record supplies the values; the row stays where the name first appeared.
    #[default]
    LastWins,
    KeepFirst,
}

/// When a departure counts as already archived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    /// Same name and same joining date. A member who returns gets a new joining
    /// date, so leaving again is a new archive row.
    #[default]
    PerEpisode,
    /// Same name, ever.
    OncePerName,
}

impl ArchivePolicy {
    fn key(self, row: &[String]) -> (String, String) {
        let name = s!(cell(row, COL_NAME));
        match self {
            ArchivePolicy::PerEpisode => (name, s!(cell(row, COL_JOINED))),
            ArchivePolicy::OncePerName => (name, s!()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciler {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    #[serde(default)]
    pub archive: ArchivePolicy,
}

/// Everything one run produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    /// Overwrites the main sheet.
    pub grid: Grid,
    /// Appended to the archive sheet.
    pub archive_rows: Vec<Row>,
    pub level_column: String,
    pub joined: Vec<String>,
    pub continuing: Vec<String>,
    pub departed: Vec<String>,
    /// Appended to the history sheet.
    pub observations: Vec<LevelObservation>,
}

pub fn level_column_name(now: NaiveDateTime) -> String {
    join!(LEVEL_PREFIX, &now.format(COLUMN_TIME_FORMAT).to_string())
}

pub fn left_date(now: NaiveDateTime) -> String {
    now.format(LEFT_DATE_FORMAT).to_string()
}

pub fn base_headers() -> Row {
    BASE_HEADERS.iter().map(|h| s!(*h)).collect()
}

pub fn archive_headers() -> Row {
    ARCHIVE_HEADERS.iter().map(|h| s!(*h)).collect()
}

/// Reconcile with the default policies at the local wall-clock time.
pub fn reconcile(current: &[MemberRecord], previous: Option<&Grid>, archive: Option<&Grid>) -> Reconciliation {
    Reconciler::default().reconcile(current, previous, archive)
}

fn cell(row: &[String], ix: usize) -> &str {
    row.get(ix).map(|s| s.as_str()).unwrap_or("")
}

/// First six cells of a stored row, padded.
fn base_cells(row: &[String]) -> Row {
    (0..BASE_HEADERS.len()).map(|i| s!(cell(row, i))).collect()
}

impl Reconciler {
    pub fn new(duplicates: DuplicatePolicy, archive: ArchivePolicy) -> Self {
        Self { duplicates, archive }
    }

    pub fn reconcile(&self, current: &[MemberRecord], previous: Option<&Grid>, archive: Option<&Grid>) -> Reconciliation {
        self.reconcile_at(current, previous, archive, chrono::Local::now().naive_local())
    }

    pub fn reconcile_at(
        &self,
        current: &[MemberRecord],
        previous: Option<&Grid>,
        archive: Option<&Grid>,
        now: NaiveDateTime,
    ) -> Reconciliation {
        let level_column = level_column_name(now);

        // Previous rows by name. A name stored twice resolves to its last row.
        let mut prev_order: Vec<&str> = Vec::new();
        let mut prev_by_name: HashMap<&str, &Row> = HashMap::new();
        let mut history = LevelHistory::new();
        if let Some(grid) = previous {
            for row in &grid.rows {
                let name = cell(row, COL_NAME);
                if name.is_empty() {
                    continue;
                }
                if prev_by_name.insert(name, row).is_none() {
                    prev_order.push(name);
                }
            }
            history = LevelHistory::from_grid(grid);
        }

        let mut headers = base_headers();
        headers.extend(history.columns().iter().cloned());
        if !headers.iter().any(|h| *h == level_column) {
            headers.push(level_column.clone());
        }

        let resolved = self.resolve_duplicates(current);
        let observations = history.record(&level_column, &resolved);

        let level_columns = &headers[BASE_HEADERS.len()..];
        let mut rows = Vec::with_capacity(resolved.len());
        let mut joined = Vec::new();
        let mut continuing = Vec::new();

        for m in &resolved {
            let base = match prev_by_name.get(m.name.as_str()) {
                Some(prev) => {
                    let mut base = base_cells(prev);
                    base[COL_RANK] = m.rank.to_string();
                    base[COL_NAME] = m.name.clone();
                    base[COL_TITLE] = m.title.clone();
                    base[COL_VOCATION] = m.vocation.to_string();
                    base[COL_JOINED] = m.joining_date.clone();
                    continuing.push(m.name.clone());
                    base
                }
                None => {
                    joined.push(m.name.clone());
                    let mut base = vec![s!(); BASE_HEADERS.len()];
                    base[COL_RANK] = m.rank.to_string();
                    base[COL_NAME] = m.name.clone();
                    base[COL_TITLE] = m.title.clone();
                    base[COL_VOCATION] = m.vocation.to_string();
                    // The only write of the base level.
                    base[COL_LEVEL] = m.level.clone();
                    base[COL_JOINED] = m.joining_date.clone();
                    base
                }
            };
            rows.push(history.project_row(base, &m.name, level_columns));
        }

        let current_names: HashSet<&str> = resolved.iter().map(|m| m.name.as_str()).collect();
        let departed_rows: Vec<&Row> = prev_order
            .iter()
            .filter(|n| !current_names.contains(*n))
            .filter_map(|n| prev_by_name.get(n).copied())
            .collect();
        let departed: Vec<String> = departed_rows.iter().map(|r| s!(cell(r, COL_NAME))).collect();

        let archive_rows = self.archive_rows(&departed_rows, archive, now);

        tracing::debug!(
            column = %level_column,
            joined = joined.len(),
            continuing = continuing.len(),
            departed = departed.len(),
            archived = archive_rows.len(),
            "reconciled roster"
        );

        Reconciliation {
            grid: Grid { headers, rows },
            archive_rows,
            level_column,
            joined,
            continuing,
            departed,
            observations,
        }
    }

    /// One record per name, in first-appearance order.
    fn resolve_duplicates<'a>(&self, current: &'a [MemberRecord]) -> Vec<&'a MemberRecord> {
        let mut order: Vec<&'a MemberRecord> = Vec::with_capacity(current.len());
        let mut slot: HashMap<&'a str, usize> = HashMap::new();
        for m in current {
            match slot.get(m.name.as_str()) {
                None => {
                    slot.insert(m.name.as_str(), order.len());
                    order.push(m);
                }
                Some(&i) => {
                    tracing::warn!(name = %m.name, policy = ?self.duplicates, "duplicate name in scrape");
                    if self.duplicates == DuplicatePolicy::LastWins {
                        order[i] = m;
                    }
                }
            }
        }
        order
    }

    fn archive_rows(&self, departed: &[&Row], archive: Option<&Grid>, now: NaiveDateTime) -> Vec<Row> {
        let mut seen: HashSet<(String, String)> = archive
            .map(|g| g.rows.iter().map(|r| self.archive.key(r)).collect())
            .unwrap_or_default();

        let today = left_date(now);
        let mut out = Vec::new();
        for prev in departed {
            if !seen.insert(self.archive.key(prev)) {
                tracing::debug!(name = cell(prev, COL_NAME), "departure already archived");
                continue;
            }
            let mut row = base_cells(prev);
            row.push(today.clone());
            row.push(s!(LEFT_REASON));
            out.push(row);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::roster::types::{Rank, Vocation};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    fn member(name: &str, level: &str) -> MemberRecord {
        MemberRecord {
            rank: Rank::Member,
            name: s!(name),
            title: s!(),
            vocation: Vocation::Knight,
            level: s!(level),
            joining_date: s!("Jan 01 2020"),
        }
    }

    #[test]
    fn column_label_and_left_date_formats() {
        assert_eq!(level_column_name(at(7, 5, 3)), "Level_09/03/2024_07:05:03");
        assert_eq!(left_date(at(7, 5, 3)), "09/03/2024");
    }

    #[test]
    fn first_run_marks_everyone_joined() {
        let r = Reconciler::default().reconcile_at(&[member("A", "10"), member("B", "20")], None, None, at(10, 0, 0));
        assert_eq!(r.joined, vec![s!("A"), s!("B")]);
        assert!(r.continuing.is_empty() && r.departed.is_empty() && r.archive_rows.is_empty());
        assert_eq!(r.grid.headers.len(), 7);
        assert_eq!(r.grid.rows[0], row!["Member", "A", "", "Knight", "10", "Jan 01 2020", "10"]);
        assert_eq!(r.observations.len(), 2);
    }

    #[test]
    fn continuing_row_keeps_extra_level_columns_by_header() {
        // A stray non-level column sits between the base fields and the snapshots.
        let prev = Grid::from_rows(vec![
            row!["Rank", "Name", "Title", "Vocation", "Level", "Joining Date", "Notes", "Level_01/01/2024_10:00:00"],
            row!["Member", "A", "", "Knight", "5", "Jan 01 2020", "note", "7"],
        ])
        .unwrap();
        let r = Reconciler::default().reconcile_at(&[member("A", "9")], Some(&prev), None, at(10, 0, 0));
        assert_eq!(
            r.grid.headers[6..],
            [s!("Level_01/01/2024_10:00:00"), s!("Level_09/03/2024_10:00:00")]
        );
        assert_eq!(r.grid.rows[0], row!["Member", "A", "", "Knight", "5", "Jan 01 2020", "7", "9"]);
    }

    #[test]
    fn same_second_rerun_overwrites_the_column() {
        let first = Reconciler::default().reconcile_at(&[member("A", "10")], None, None, at(10, 0, 0));
        let again = Reconciler::default().reconcile_at(&[member("A", "11")], Some(&first.grid), None, at(10, 0, 0));
        assert_eq!(again.grid.headers.len(), 7);
        assert_eq!(again.grid.rows[0][6], "11");
        assert_eq!(again.grid.rows[0][4], "10");
    }

    #[test]
    fn last_wins_keeps_first_position() {
        let mut b2 = member("B", "99");
        b2.vocation = Vocation::Druid;
        let current = [member("B", "1"), member("A", "2"), b2];
        let r = Reconciler::default().reconcile_at(&current, None, None, at(10, 0, 0));
        assert_eq!(r.grid.rows.len(), 2);
        assert_eq!(r.grid.rows[0][1], "B");
        assert_eq!(r.grid.rows[0][3], "Druid");
        assert_eq!(r.grid.rows[0][4], "99");
    }

    #[test]
    fn keep_first_ignores_later_duplicates() {
        let current = [member("B", "1"), member("B", "99")];
        let rec = Reconciler::new(DuplicatePolicy::KeepFirst, ArchivePolicy::default());
        let r = rec.reconcile_at(&current, None, None, at(10, 0, 0));
        assert_eq!(r.grid.rows.len(), 1);
        assert_eq!(r.grid.rows[0][4], "1");
        assert_eq!(r.observations.len(), 1);
    }

    #[test]
    fn departed_short_row_is_padded_into_archive() {
        let prev = Grid::from_rows(vec![base_headers(), row!["Officer", "Gone"]]).unwrap();
        let r = Reconciler::default().reconcile_at(&[member("A", "1")], Some(&prev), None, at(10, 0, 0));
        assert_eq!(r.departed, vec![s!("Gone")]);
        assert_eq!(
            r.archive_rows,
            vec![row!["Officer", "Gone", "", "", "", "", "09/03/2024", "Left Guild"]]
        );
    }

    #[test]
    fn archive_policies_differ_on_return() {
        let archive = Grid::from_rows(vec![
            archive_headers(),
            row!["Member", "B", "", "Knight", "20", "Jan 01 2020", "01/02/2024", "Left Guild"],
        ])
        .unwrap();
        // B came back with a new joining date and left again.
        let prev = Grid::from_rows(vec![
            base_headers(),
            row!["Member", "B", "", "Knight", "20", "Mar 01 2024", ""],
        ])
        .unwrap();
        let current = [member("A", "1")];

        let per_episode = Reconciler::default().reconcile_at(&current, Some(&prev), Some(&archive), at(10, 0, 0));
        assert_eq!(per_episode.archive_rows.len(), 1);
        assert_eq!(per_episode.archive_rows[0][5], "Mar 01 2024");

        let once = Reconciler::new(DuplicatePolicy::default(), ArchivePolicy::OncePerName);
        let legacy = once.reconcile_at(&current, Some(&prev), Some(&archive), at(10, 0, 0));
        assert!(legacy.archive_rows.is_empty());
        assert_eq!(legacy.departed, vec![s!("B")]);
    }

    #[test]
    fn rows_without_names_are_ignored() {
        let prev = Grid::from_rows(vec![base_headers(), row!["Member", "", "", "Knight", "3", ""]]).unwrap();
        let r = Reconciler::default().reconcile_at(&[member("A", "1")], Some(&prev), None, at(10, 0, 0));
        assert!(r.departed.is_empty());
        assert!(r.archive_rows.is_empty());
    }
}
