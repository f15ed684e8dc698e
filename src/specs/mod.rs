// src/specs/mod.rs
//! # Page specs
//!
//! Page-specific knowledge: where the member table lives in the guild page and
//! how to flatten it into the line-per-row text the roster parser reads.
//!
//! ## What lives here
//! - **Fetchers** (`PageFetcher`): HTTP for the live page, files for saved pages
//!   and hand-edited text.
//! - **Table selection**: the guild page nests layout tables; the member table is
//!   the innermost table that mentions `Vocation` and has the most rows.
//! - **Page classification**: "guild not found" and bot-wall pages become typed
//!   errors instead of empty rosters.
//!
//! ## What does **not** live here
//! - Parsing member lines (`roster::parser`).
//! - Reconciliation and persistence (`roster::reconcile`, `runner`, `store`).
//!
//! ## Typical call chain
//! ```text
//! runner → specs::guild::PageFetcher::fetch_guild_table()
//!        → roster::parse() → roster::Reconciler → store
//! ```
//!
//! Specs are testable offline against saved HTML (see `FileFetcher`).
pub mod guild;
