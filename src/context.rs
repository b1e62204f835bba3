//! Per-invocation build memory (§3 `BuildContext`, §9 design note).
//!
//! Threaded explicitly through the analyzer and the builders rather than
//! hidden in ambient/global state, per the design note in spec §9: "Model
//! this by passing the `BuildContext` explicitly down the call chain."

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Tracks output files that were rewritten (or touched) during this walk but
/// whose *content* was byte-identical to what was already on disk. Stores
/// the file's mtime from *before* the rewrite, so the analyzer can pretend
/// the file never changed when deciding downstream staleness.
#[derive(Debug, Default)]
pub struct BuildContext {
    unchanged_outputs: HashMap<PathBuf, SystemTime>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unchanged(&mut self, path: impl Into<PathBuf>, prior_mtime: SystemTime) {
        self.unchanged_outputs.insert(path.into(), prior_mtime);
    }

    pub fn prior_mtime(&self, path: &Path) -> Option<SystemTime> {
        self.unchanged_outputs.get(path).copied()
    }
}
