// src/specs/guild.rs
//
// Guild page → member table text.
//
// Output shape: one line per `<tr>`, cells joined by tabs, tags stripped and
// entities decoded. The first line is the table's header row. Rank cells are
// only filled on the first member of each rank group; later rows start with an
// empty cell, which the parser reads as "same rank as above".

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::html::{element_blocks_ci, inner_after_open_tag, strip_tags, to_lower};
use crate::core::net::{HttpConfig, http_get};
use crate::core::sanitize::{normalize_entities, normalize_ws};
use crate::error::FetchError;

const NOT_FOUND_MARKERS: [&str; 2] = ["guild not found", "does not exist"];
const BLOCKED_MARKERS: [&str; 6] = [
    "cloudflare",
    "attention required",
    "just a moment",
    "access denied",
    "blocked",
    "forbidden",
];

/// Source of a guild's member table text.
pub trait PageFetcher {
    fn fetch_guild_table(&self, guild: &str) -> Result<String, FetchError>;

    fn describe(&self) -> String {
        s!("fetcher")
    }
}

/* ---------------- HTTP ---------------- */

pub struct HttpFetcher {
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn url_for(&self, guild: &str) -> String {
        guild_url(&self.base_url, guild)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_guild_table(&self, guild: &str) -> Result<String, FetchError> {
        let url = self.url_for(guild);
        let cfg = HttpConfig {
            user_agent: &self.user_agent,
            timeout: self.timeout,
        };
        let body = http_get(&url, &cfg)?;
        tracing::debug!(bytes = body.len(), "fetched guild page");
        classify_page(&body)
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}

/// Base URL + guild name, form-encoded (`Resonance Remain` → `Resonance+Remain`).
pub fn guild_url(base: &str, guild: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(guild.trim().as_bytes()).collect();
    join!(base, &encoded)
}

/* ---------------- Files ---------------- */

/// Saved page or pre-flattened text. Ignores the guild name.
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageFetcher for FileFetcher {
    fn fetch_guild_table(&self, _guild: &str) -> Result<String, FetchError> {
        let text = fs::read_to_string(&self.path)?;
        if looks_like_html(&text) {
            classify_page(&text)
        } else {
            Ok(text)
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

fn looks_like_html(text: &str) -> bool {
    let lc = to_lower(text);
    lc.contains("<html") || lc.contains("<!doctype") || lc.contains("<table")
}

/* ---------------- Page classification ---------------- */

/// Member table text if the page has one; otherwise why not.
/// Markers are only consulted when no member table is present, so a normal
/// page mentioning e.g. a CDN in a script tag still parses.
pub fn classify_page(body: &str) -> Result<String, FetchError> {
    if let Some(text) = member_table_text(body) {
        return Ok(text);
    }
    let lc = to_lower(body);
    if let Some(m) = NOT_FOUND_MARKERS.iter().find(|m| lc.contains(*m)) {
        return Err(FetchError::NotFound(s!(*m)));
    }
    if let Some(m) = BLOCKED_MARKERS.iter().find(|m| lc.contains(*m)) {
        return Err(FetchError::Blocked(s!(*m)));
    }
    Err(FetchError::TableMissing)
}

/// Flattened text of the member table: among innermost tables mentioning
/// `Vocation`, the one with the most rows (earliest on a tie).
pub fn member_table_text(html: &str) -> Option<String> {
    let tables = element_blocks_ci(html, "table");

    let leaf = |s: usize, e: usize| !tables.iter().any(|&(s2, e2, _)| s2 > s && e2 <= e);

    let mut best: Option<(usize, &str)> = None;
    for &(s, e, _) in &tables {
        if !leaf(s, e) {
            continue;
        }
        let table = &html[s..e];
        if !to_lower(table).contains("vocation") {
            continue;
        }
        let rows = element_blocks_ci(table, "tr").len();
        if best.is_none_or(|(n, _)| rows > n) {
            best = Some((rows, table));
        }
    }

    let (rows, table) = best?;
    tracing::debug!(rows, "selected member table");
    Some(flatten_table(table))
}

/// `<tr>` → line, `<td>`/`<th>` → tab-separated cells. Rows with no text are dropped.
pub fn flatten_table(table: &str) -> String {
    let mut out = String::new();
    for (s, e, _) in element_blocks_ci(table, "tr") {
        let tr = &table[s..e];
        let mut cells: Vec<(usize, usize)> = element_blocks_ci(tr, "td")
            .into_iter()
            .chain(element_blocks_ci(tr, "th"))
            .map(|(cs, ce, _)| (cs, ce))
            .collect();
        cells.sort_unstable();

        let texts: Vec<String> = cells
            .iter()
            .map(|&(cs, ce)| cell_text(&tr[cs..ce]))
            .collect();
        if texts.iter().all(|t| t.is_empty()) {
            continue;
        }
        out.push_str(&texts.join("\t"));
        out.push('\n');
    }
    out
}

fn cell_text(block: &str) -> String {
    // Strip first so decoded `&lt;` cannot be mistaken for a tag.
    normalize_ws(&normalize_entities(&strip_tags(inner_after_open_tag(block))))
}
