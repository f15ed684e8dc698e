// src/roster/mod.rs
//
// Roster text → members → reconciled sheets.

pub mod history;
pub mod parser;
pub mod reconcile;
pub mod types;

pub use history::{LevelHistory, LevelObservation};
pub use parser::{extract_member, parse, positional_rank};
pub use reconcile::{ArchivePolicy, DuplicatePolicy, Reconciler, Reconciliation, reconcile};
pub use types::{MemberRecord, Rank, Vocation};
