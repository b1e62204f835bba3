//! Path canonicalization (C1).
//!
//! Every project is identified by a [`ProjectId`]: the canonical absolute path
//! to its configuration file. Two `ProjectId`s are equal iff their normalized
//! absolute paths are equal, so they can be used directly as map/set keys.

use crate::error::{BuildError, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// The on-disk file name of a project's configuration file.
pub const PROJECT_FILE_NAME: &str = "project.json";

/// A canonical, absolute path to a project's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(PathBuf);

impl ProjectId {
    /// Resolves `path` relative to the current working directory, canonicalizes
    /// it, and — if it names a directory — appends [`PROJECT_FILE_NAME`].
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let canonical = dunce::canonicalize(&absolute)
            .map_err(|source| BuildError::ReadConfig { path: absolute.clone(), source })?;

        let canonical =
            if canonical.is_dir() { canonical.join(PROJECT_FILE_NAME) } else { canonical };

        Ok(Self(normalize(&canonical)))
    }

    /// Builds a `ProjectId` from a path that is already known to be canonical
    /// (used when deriving a reference target's id from a parent project's
    /// directory, before the target file is known to exist).
    pub fn from_canonical(path: PathBuf) -> Self {
        Self(normalize(&path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// The directory containing this project's configuration file.
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or(Path::new("."))
    }

    /// A forward-slash form suitable for diagnostics, stable across platforms.
    pub fn display_slash(&self) -> String {
        path_slash::PathExt::to_slash_lossy(self.0.as_path()).into_owned()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_slash())
    }
}

impl AsRef<Path> for ProjectId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Uppercases a single-letter drive prefix (`c:\foo` -> `C:\foo`) so that
/// case-variant drive letters compare equal on Windows; a no-op elsewhere.
fn normalize(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        let mut fixed = String::with_capacity(s.len());
        fixed.push(bytes[0].to_ascii_uppercase() as char);
        fixed.push_str(&s[1..]);
        PathBuf::from(fixed)
    } else {
        path.to_path_buf()
    }
}

/// Resolves a reference target (as written in a project's `references`
/// array) to the [`ProjectId`] it names, relative to `from_dir`. Does not
/// require the target to exist on disk — existence is checked when the
/// target's own config is parsed. A target that's already an existing
/// directory always gets the project-file suffix appended, even if its name
/// contains a literal `.` (e.g. `../lib.v2`); the extension check is only a
/// fallback for targets that don't exist yet.
pub fn resolve_reference_target(from_dir: &Path, target: &Path) -> PathBuf {
    let joined = if target.is_absolute() { target.to_path_buf() } else { from_dir.join(target) };
    if joined.is_dir() || joined.extension().is_none() {
        joined.join(PROJECT_FILE_NAME)
    } else {
        joined
    }
}
