// src/config/options.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::core::sanitize::sanitize_sheet_name;
use crate::error::TrackerError;
use crate::roster::Reconciler;
use crate::specs::guild::HttpFetcher;
use crate::store::CsvSheetStore;

/// Everything a run needs to know. Loaded from JSON, overridden by CLI flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub guild: String,
    /// Spreadsheet the sheets live in (a directory under `store_dir`).
    pub sheet_id: String,
    pub store_dir: PathBuf,
    pub fallback_dir: PathBuf,
    /// Sheet name overrides; derived from the guild name when unset.
    pub main_sheet: Option<String>,
    pub archive_sheet: Option<String>,
    pub history_sheet: Option<String>,
    pub reconcile: Reconciler,
    pub fetch: FetchOptions,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            guild: s!(DEFAULT_GUILD),
            sheet_id: s!(DEFAULT_SHEET_ID),
            store_dir: PathBuf::from(STORE_DIR),
            fallback_dir: PathBuf::from(STORE_DIR).join(FALLBACK_SUBDIR),
            main_sheet: None,
            archive_sheet: None,
            history_sheet: None,
            reconcile: Reconciler::default(),
            fetch: FetchOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: s!(GUILD_URL_BASE),
            timeout_secs: HTTP_TIMEOUT_SECS,
            user_agent: s!(USER_AGENT),
        }
    }
}

impl TrackerOptions {
    /// Missing file → defaults.
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(TrackerError::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), TrackerError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TrackerError::Config(format!("{}: {e}", parent.display())))?;
        }
        fs::write(path, json).map_err(|e| TrackerError::Config(format!("{}: {e}", path.display())))
    }

    /// Switch guild; sheet overrides belonged to the old one.
    pub fn set_guild(&mut self, guild: &str) {
        let guild = guild.trim();
        if guild != self.guild {
            self.guild = s!(guild);
            self.main_sheet = None;
            self.archive_sheet = None;
            self.history_sheet = None;
        }
    }

    pub fn main_sheet_name(&self) -> String {
        self.main_sheet
            .clone()
            .unwrap_or_else(|| sanitize_sheet_name(&self.guild))
    }

    pub fn archive_sheet_name(&self) -> String {
        self.archive_sheet
            .clone()
            .unwrap_or_else(|| join!(&self.main_sheet_name(), ARCHIVE_SUFFIX))
    }

    pub fn history_sheet_name(&self) -> String {
        self.history_sheet
            .clone()
            .unwrap_or_else(|| join!(&self.main_sheet_name(), HISTORY_SUFFIX))
    }

    pub fn log_path(&self) -> PathBuf {
        self.store_dir.join(LOG_FILE)
    }

    pub fn store(&self) -> CsvSheetStore {
        CsvSheetStore::new(&self.store_dir)
    }

    pub fn http_fetcher(&self) -> HttpFetcher {
        HttpFetcher::new(
            &self.fetch.base_url,
            &self.fetch.user_agent,
            Duration::from_secs(self.fetch.timeout_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::ArchivePolicy;

    #[test]
    fn default_sheet_names_follow_guild() {
        let o = TrackerOptions::default();
        assert_eq!(o.main_sheet_name(), "Resonance_Remain");
        assert_eq!(o.archive_sheet_name(), "Resonance_Remain_Archive");
        assert_eq!(o.history_sheet_name(), "Resonance_Remain_History");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let o: TrackerOptions =
            serde_json::from_str(r#"{ "guild": "Other Guild", "reconcile": { "archive": "once_per_name" } }"#).unwrap();
        assert_eq!(o.guild, "Other Guild");
        assert_eq!(o.sheet_id, DEFAULT_SHEET_ID);
        assert_eq!(o.reconcile.archive, ArchivePolicy::OncePerName);
        assert_eq!(o.fetch.timeout_secs, HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn load_missing_then_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join(CONFIG_FILE);
        let mut o = TrackerOptions::load(&path).unwrap();
        assert_eq!(o, TrackerOptions::default());

        o.main_sheet = Some(s!("Custom"));
        o.set_guild("New Guild");
        assert_eq!(o.main_sheet, None);
        o.save(&path).unwrap();
        assert_eq!(TrackerOptions::load(&path).unwrap().guild, "New Guild");
    }
}
