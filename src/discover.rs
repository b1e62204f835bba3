//! Root discovery (spec §6 CLI surface).
//!
//! Resolves the CLI's positional arguments and `--project` flags into a
//! deduplicated, ordered list of root [`ProjectId`]s, ahead of graph
//! construction (C3).

use crate::{
    error::Result,
    path::{ProjectId, PROJECT_FILE_NAME},
};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Resolves CLI-supplied positional arguments and explicit `--project`
/// values into root ids.
///
/// - A path naming a file or an existing directory resolves directly
///   (`ProjectId::resolve` appends [`PROJECT_FILE_NAME`] for directories).
/// - A path that resolves to neither is treated as a glob pattern and
///   expanded; matches recurse into directories for `project.json`.
/// - With no arguments and no roots: falls back to `./project.json` if
///   present, else a full recursive scan of the current directory.
pub fn discover_roots(positional: &[PathBuf], projects: &[PathBuf]) -> Result<Vec<ProjectId>> {
    let mut ordered = Vec::new();
    let mut seen = BTreeSet::new();

    let mut push = |id: ProjectId| {
        if seen.insert(id.as_path().to_path_buf()) {
            ordered.push(id);
        }
    };

    let mut explicit = Vec::new();
    explicit.extend(projects.iter().cloned());
    explicit.extend(positional.iter().cloned());

    if explicit.is_empty() {
        if Path::new(PROJECT_FILE_NAME).is_file() {
            push(ProjectId::resolve(PROJECT_FILE_NAME)?);
        } else {
            for id in scan_recursive(Path::new("."))? {
                push(id);
            }
        }
        return Ok(ordered);
    }

    for path in explicit {
        if path.is_file() {
            push(ProjectId::resolve(&path)?);
        } else if path.is_dir() {
            for id in scan_recursive(&path)? {
                push(id);
            }
        } else {
            let pattern = path.to_string_lossy();
            let mut matched_any = false;
            for entry in glob::glob(&pattern)? {
                let entry = entry.map_err(|e| crate::error::BuildError::msg(e.to_string()))?;
                matched_any = true;
                if entry.is_dir() {
                    for id in scan_recursive(&entry)? {
                        push(id);
                    }
                } else {
                    push(ProjectId::resolve(&entry)?);
                }
            }
            if !matched_any {
                // Not a file, directory, or glob match: let `ProjectId::resolve`
                // produce the canonical "missing config" error.
                push(ProjectId::resolve(&path)?);
            }
        }
    }

    Ok(ordered)
}

/// Recursively scans `dir` for every [`PROJECT_FILE_NAME`], depth-first.
fn scan_recursive(dir: &Path) -> Result<Vec<ProjectId>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(std::result::Result::ok) {
        if entry.file_name() == PROJECT_FILE_NAME {
            found.push(ProjectId::resolve(entry.path())?);
        }
    }
    Ok(found)
}
