//! Watcher (C8, spec §4.8).
//!
//! Translates file-system events into targeted re-analysis of affected
//! projects, or a full graph reconstruction when a configuration file
//! itself changes. The file-system watcher library is an opaque event
//! source (spec §1); this module only maps its events back onto projects.

use crate::{
    compiler::CompilerService,
    config::WatchKind,
    context::BuildContext,
    error::{BuildError, Result},
    graph::{Graph, GraphBuilder},
    orchestrate::{walk, BuildOptions},
    path::ProjectId,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// How long [`WatchSession::tick`] blocks waiting for an event before
/// returning control to the caller, so a Ctrl+C handler gets a chance to
/// flip its shutdown flag between ticks (spec §4.8 "close every active
/// watcher ... on interrupt").
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a raw debounced file event maps to.
enum Reaction {
    FullRebuild,
    Targeted,
    Ignored,
}

/// Owns the current graph, the active debounced watcher, and the set of
/// paths it watches — reinstalled wholesale on every full rebuild (spec
/// §4.8 "close every active watcher, rebuild graph, reinstall").
pub struct WatchSession {
    roots: Vec<ProjectId>,
    graph: Graph,
    debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
    rx: mpsc::Receiver<DebounceEventResult>,
    config_paths: HashSet<PathBuf>,
    watched_dirs: Vec<(PathBuf, RecursiveMode)>,
    watched_files: HashSet<PathBuf>,
}

impl WatchSession {
    /// Builds the initial graph from `roots` and installs watchers per spec
    /// §4.8.
    pub fn start(roots: Vec<ProjectId>) -> Result<Self> {
        let graph = GraphBuilder::new().build(&roots)?;
        let (tx, rx) = mpsc::channel();
        let debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            // Swallowed if the receiver was already dropped (session shutting
            // down); nothing else can be done with a watcher-thread error here.
            let _ = tx.send(result);
        })
        .map_err(BuildError::Notify)?;

        let mut session = Self {
            roots,
            graph,
            debouncer,
            rx,
            config_paths: HashSet::new(),
            watched_dirs: Vec::new(),
            watched_files: HashSet::new(),
        };
        session.install_watchers()?;
        Ok(session)
    }

    fn install_watchers(&mut self) -> Result<()> {
        self.config_paths.clear();
        self.watched_dirs.clear();
        self.watched_files.clear();

        for id in self.graph.references.projects().chain(self.graph.configs.keys()) {
            self.config_paths.insert(id.as_path().to_path_buf());
            self.debouncer.watcher().watch(id.as_path(), RecursiveMode::NonRecursive).ok();
        }

        for config in self.graph.configs.values() {
            for (dir, kind) in &config.wildcard_directories {
                let mode = match kind {
                    WatchKind::Recursive => RecursiveMode::Recursive,
                    WatchKind::Flat => RecursiveMode::NonRecursive,
                };
                if self.debouncer.watcher().watch(dir, mode).is_ok() {
                    self.watched_dirs.push((dir.clone(), mode));
                }
            }

            for input in &config.input_files {
                let covered = self
                    .watched_dirs
                    .iter()
                    .any(|(dir, mode)| covers(dir, *mode, input));
                if !covered && self.debouncer.watcher().watch(input, RecursiveMode::NonRecursive).is_ok()
                {
                    self.watched_files.insert(input.clone());
                }
            }
        }

        Ok(())
    }

    fn reaction_for(&self, path: &Path) -> Reaction {
        if self.config_paths.contains(path) {
            return Reaction::FullRebuild;
        }
        if self.watched_files.contains(path) {
            return Reaction::Targeted;
        }
        if self.watched_dirs.iter().any(|(dir, mode)| covers(dir, *mode, path)) {
            return Reaction::Targeted;
        }
        Reaction::Ignored
    }

    /// Waits up to [`POLL_INTERVAL`] for the next (debounced, coalesced)
    /// batch of events, reacts to it, and returns. Call in a loop to stay
    /// resident; a timeout with nothing to react to is not an error, it's
    /// just a chance for the caller to check whether it should stop.
    pub fn tick(&mut self, compiler: &dyn CompilerService, context: &mut BuildContext) -> Result<()> {
        let batch = match self.rx.recv_timeout(POLL_INTERVAL) {
            Ok(batch) => batch,
            Err(mpsc::RecvTimeoutError::Timeout) => return Ok(()),
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()), // watcher channel closed, nothing to do
        };

        let events = match batch {
            Ok(events) => events,
            Err(errors) => {
                for e in errors {
                    warn!("watch error: {e}");
                }
                return Ok(());
            }
        };

        let mut full_rebuild = false;
        let mut targeted = false;
        for event in &events {
            for path in &event.paths {
                match self.reaction_for(path) {
                    Reaction::FullRebuild => full_rebuild = true,
                    Reaction::Targeted => targeted = true,
                    Reaction::Ignored => {}
                }
            }
        }

        if full_rebuild {
            info!("configuration changed, rebuilding dependency graph");
            self.graph = GraphBuilder::new().build(&self.roots)?;
            self.install_watchers()?;
            walk(&self.graph, compiler, context, BuildOptions::default())?;
        } else if targeted {
            debug!("source change detected, re-running build walk");
            walk(&self.graph, compiler, context, BuildOptions::default())?;
        }

        Ok(())
    }

    /// Closes every active watcher and consumes the session (spec §4.8: "on
    /// interrupt, close every active watcher before exiting"). Called once
    /// the CLI's Ctrl+C handler has asked the watch loop to stop.
    pub fn close(self) {
        info!("shutting down watch session, closing {} watched path(s)", self.watched_dirs.len() + self.watched_files.len() + self.config_paths.len());
        drop(self.debouncer);
    }
}

/// Whether `dir` (watched with `mode`) covers `path`.
fn covers(dir: &Path, mode: RecursiveMode, path: &Path) -> bool {
    match path.strip_prefix(dir) {
        Ok(rest) => mode == RecursiveMode::Recursive || rest.components().count() <= 1,
        Err(_) => false,
    }
}
