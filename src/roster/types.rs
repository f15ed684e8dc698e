// src/roster/types.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Guild rank, highest first. `Ord` follows the guild hierarchy (Leader < Member
/// in sort order, so sorting puts leaders on top).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Leader,
    #[serde(rename = "Vice Leader")]
    ViceLeader,
    Officer,
    #[serde(rename = "High Member")]
    HighMember,
    Member,
}

impl Rank {
    pub const ALL: [Rank; 5] = [
        Rank::Leader,
        Rank::ViceLeader,
        Rank::Officer,
        Rank::HighMember,
        Rank::Member,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Rank::Leader => "Leader",
            Rank::ViceLeader => "Vice Leader",
            Rank::Officer => "Officer",
            Rank::HighMember => "High Member",
            Rank::Member => "Member",
        }
    }

    /// Exact label match (section header lines).
    pub fn from_label(s: &str) -> Option<Rank> {
        Rank::ALL.into_iter().find(|r| r.label() == s)
    }

    /// `"<label> ..."` prefix on a data line. Longest label wins.
    pub fn from_line_prefix(line: &str) -> Option<Rank> {
        let mut found: Option<Rank> = None;
        for r in Rank::ALL {
            let label = r.label();
            let hit = line.len() > label.len()
                && line.starts_with(label)
                && line[label.len()..].starts_with(' ');
            if hit && found.is_none_or(|f| f.label().len() < label.len()) {
                found = Some(r);
            }
        }
        found
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rank {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::from_label(s.trim()).ok_or_else(|| format!("unknown rank: {s}"))
    }
}

/// Character class. Promoted classes are two-word phrases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vocation {
    Knight,
    #[serde(rename = "Elite Knight")]
    EliteKnight,
    Paladin,
    #[serde(rename = "Royal Paladin")]
    RoyalPaladin,
    Sorcerer,
    #[serde(rename = "Master Sorcerer")]
    MasterSorcerer,
    Druid,
    #[serde(rename = "Elder Druid")]
    ElderDruid,
    Monk,
    #[serde(rename = "Exalted Monk")]
    ExaltedMonk,
    None,
}

impl Vocation {
    /// Two-word phrases first so a scan trying phrases in order matches the
    /// longest one at each position.
    pub const ALL: [Vocation; 11] = [
        Vocation::EliteKnight,
        Vocation::RoyalPaladin,
        Vocation::MasterSorcerer,
        Vocation::ElderDruid,
        Vocation::ExaltedMonk,
        Vocation::Knight,
        Vocation::Paladin,
        Vocation::Sorcerer,
        Vocation::Druid,
        Vocation::Monk,
        Vocation::None,
    ];

    pub fn phrase(self) -> &'static str {
        match self {
            Vocation::Knight => "Knight",
            Vocation::EliteKnight => "Elite Knight",
            Vocation::Paladin => "Paladin",
            Vocation::RoyalPaladin => "Royal Paladin",
            Vocation::Sorcerer => "Sorcerer",
            Vocation::MasterSorcerer => "Master Sorcerer",
            Vocation::Druid => "Druid",
            Vocation::ElderDruid => "Elder Druid",
            Vocation::Monk => "Monk",
            Vocation::ExaltedMonk => "Exalted Monk",
            Vocation::None => "None",
        }
    }

    /// Number of whitespace tokens in the phrase.
    pub fn word_count(self) -> usize {
        self.phrase().split(' ').count()
    }

    pub fn from_phrase(s: &str) -> Option<Vocation> {
        Vocation::ALL.into_iter().find(|v| v.phrase() == s)
    }
}

impl fmt::Display for Vocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// One guild member as seen in a single scrape.
///
/// `name` is the identity key across scrapes. There is no stable id on the page,
/// so a rename looks like one member leaving and another joining, and two members
/// sharing a name collapse into one row (see `reconcile::DuplicatePolicy`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub rank: Rank,
    pub name: String,
    pub title: String,
    pub vocation: Vocation,
    pub level: String,
    pub joining_date: String,
}
