//! Utilities for creating and testing project workspaces (spec §8's
//! end-to-end scenarios), gated behind the `project-util` feature the way
//! the rest of this crate's test-workspace helpers are.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// A throwaway directory tree containing one or more `project.json` files,
/// for driving the orchestrator end-to-end in tests without touching the
/// real filesystem outside of a tempdir.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Self {
        Self { dir: tempfile::Builder::new().prefix("buildorch-").tempdir().expect("tempdir") }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Writes `content` at `relative`, creating parent directories as
    /// needed.
    pub fn write(&self, relative: impl AsRef<Path>, content: impl AsRef<str>) -> &Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content.as_ref()).expect("write file");
        self
    }

    /// Copies an entire fixture directory tree into this workspace at
    /// `relative`, for seeding multi-project scenarios from a single
    /// checked-in fixture.
    pub fn copy_fixture(&self, fixture: &Path, relative: impl AsRef<Path>) -> &Self {
        let dest = self.path(relative);
        fs::create_dir_all(&dest).expect("create dest dir");
        let mut options = fs_extra::dir::CopyOptions::new();
        options.content_only = true;
        fs_extra::dir::copy(fixture, &dest, &options).expect("copy fixture tree");
        self
    }

    /// A short random suffix, useful for disambiguating sibling project
    /// directories generated in a loop within one test.
    pub fn random_suffix() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..6).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect()
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
