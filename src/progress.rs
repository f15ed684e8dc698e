// src/progress.rs
use std::fmt;

/// Steps of one tracking run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    Reconcile,
    Persist,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Parse, Stage::Reconcile, Stage::Persist];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Reconcile => "reconcile",
            Stage::Persist => "persist",
        })
    }
}

/// Lightweight progress reporting for a tracking run.
/// Frontends (GUI/CLI) implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the number of stages.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    fn stage_done(&mut self, _stage: Stage) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Collects everything it is told; handy in tests and for the GUI status log.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub lines: Vec<String>,
    pub stages: Vec<Stage>,
    pub finished: bool,
}

impl Progress for RecordingProgress {
    fn log(&mut self, msg: &str) {
        self.lines.push(s!(msg));
    }

    fn stage_done(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
