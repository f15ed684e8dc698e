// src/lib.rs

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod csv;
pub mod error;
pub mod file;
pub mod log;
pub mod progress;
pub mod roster;
pub mod runner;
pub mod specs;
pub mod store;

pub mod gui;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{FetchError, StoreError, TrackerError};
