// src/roster/parser.rs
//
// Flattened member table text → member records.
//
// Input is one table as text: one table row per line, cells separated by
// whitespace. The first line is the table header. Ranks come from section
// header lines ("Officer"), from an inline prefix on the data line
// ("Officer Jane Doe Druid ..."), or, when the page emits neither, from the
// member's position in the list.

use crate::core::sanitize::normalize_ws;

use super::types::{MemberRecord, Rank, Vocation};

/// Leaders at the top of an unranked list.
pub const LEADER_SLOTS: usize = 2;
pub const VICE_LEADER_SLOTS: usize = 6;
pub const OFFICER_SLOTS: usize = 7;
pub const HIGH_MEMBER_SLOTS: usize = 15;

/// name + vocation + level + one more field, at the very least.
const MIN_TOKENS: usize = 4;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rank for the `index`-th member line (0-based) when the source carries no rank
/// markers at all.
pub fn positional_rank(index: usize) -> Rank {
    let tiers = [
        (LEADER_SLOTS, Rank::Leader),
        (VICE_LEADER_SLOTS, Rank::ViceLeader),
        (OFFICER_SLOTS, Rank::Officer),
        (HIGH_MEMBER_SLOTS, Rank::HighMember),
    ];
    let mut upper = 0usize;
    for (slots, rank) in tiers {
        upper += slots;
        if index < upper {
            return rank;
        }
    }
    Rank::Member
}

/// A line that looked like a member row, with the rank it was assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    line_index: usize,
    line: String,
    rank: Rank,
}

/// State threaded through the line fold.
#[derive(Debug, Default)]
struct Scan {
    current_rank: Option<Rank>,
    buffered: Vec<Candidate>,
}

/// Parse one flattened table. Never fails: lines that do not yield a member are
/// skipped, and the result keeps table order. Duplicate names are passed through.
pub fn parse(raw: &str) -> Vec<MemberRecord> {
    let scan = raw
        .lines()
        .enumerate()
        .skip(1) // header
        .filter(|(_, line)| !line.trim().is_empty())
        .fold(Scan::default(), scan_line);

    let mut members = Vec::with_capacity(scan.buffered.len());
    for c in scan.buffered {
        match extract_member(&c.line, c.rank) {
            Some(m) => members.push(m),
            None => tracing::trace!(line = c.line_index, text = %c.line, "skipped unparseable line"),
        }
    }
    tracing::debug!(members = members.len(), "parsed roster text");
    members
}

fn scan_line(mut scan: Scan, (line_index, raw_line): (usize, &str)) -> Scan {
    let line = normalize_ws(raw_line);

    // Section header: sets the rank for what follows, is not a member itself.
    if let Some(rank) = Rank::from_label(&line) {
        scan.current_rank = Some(rank);
        return scan;
    }

    let line_rank = Rank::from_line_prefix(&line);
    if line_rank.is_some() {
        scan.current_rank = line_rank;
    }

    if !is_plausible_member_line(&line) {
        return scan;
    }

    let rank = line_rank
        .or(scan.current_rank)
        .unwrap_or_else(|| positional_rank(scan.buffered.len()));

    scan.buffered.push(Candidate { line_index, line, rank });
    scan
}

/// Cheap pre-filter: a vocation name somewhere, or a number that could be a level.
fn is_plausible_member_line(line: &str) -> bool {
    Vocation::ALL.iter().any(|v| line.contains(v.phrase()))
        || line
            .split_whitespace()
            .any(|t| t.len() >= 2 && is_numeric(t))
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Pull one member out of a single line already assigned `rank`.
///
/// Fields are positional around the vocation phrase: everything before it is the
/// name, the first number after it is the level, and the first month abbreviation
/// after it (with two more tokens) is the joining date. A trailing number that is
/// not the level (e.g. a guild-points column placed first) would be taken as the
/// level; the page layout does not do this today.
pub fn extract_member(line: &str, rank: Rank) -> Option<MemberRecord> {
    let body = line
        .strip_prefix(rank.label())
        .and_then(|rest| rest.strip_prefix(' '))
        .unwrap_or(line);

    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let (at, vocation) = find_vocation(&tokens)?;

    let name = tokens[..at].join(" ");
    if name.is_empty() {
        return None;
    }

    let rest = &tokens[at + vocation.word_count()..];
    let level = rest
        .iter()
        .find(|t| is_numeric(t))
        .map(|t| s!(*t))
        .unwrap_or_default();

    Some(MemberRecord {
        rank,
        name,
        title: s!(),
        vocation,
        level,
        joining_date: find_joining_date(rest).unwrap_or_default(),
    })
}

/// First vocation phrase, scanning left to right; longest phrase wins at a position.
fn find_vocation(tokens: &[&str]) -> Option<(usize, Vocation)> {
    for i in 0..tokens.len() {
        for v in Vocation::ALL {
            let n = v.word_count();
            if i + n <= tokens.len() && v.phrase().split(' ').eq(tokens[i..i + n].iter().copied()) {
                return Some((i, v));
            }
        }
    }
    None
}

fn find_joining_date(tokens: &[&str]) -> Option<String> {
    tokens
        .iter()
        .enumerate()
        .find(|&(i, t)| MONTHS.contains(t) && i + 2 < tokens.len())
        .map(|(i, t)| format!("{} {} {}", t, tokens[i + 1], tokens[i + 2]))
}
