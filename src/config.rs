//! Project configuration model and parser (§3, §6).
//!
//! The parser is a thin, deliberately simple JSON reader: spec.md treats the
//! configuration-file format as an external collaborator's responsibility,
//! so this module does only what's needed to produce a [`ProjectConfig`] —
//! no `extends`-style inheritance, no compiler-option validation beyond the
//! one invariant the orchestrator itself depends on (`outFile`/`outDir`
//! mutual exclusivity).

use crate::{
    error::{BuildError, Result},
    path::{ProjectId, PROJECT_FILE_NAME},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Whether a wildcard directory is watched recursively or only at its top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    Recursive,
    Flat,
}

/// A declared dependency edge to another project, optionally requesting
/// concatenation into a single bundle (§3 `references`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub path: PathBuf,
    #[serde(default)]
    pub prepend: bool,
}

/// The raw, on-disk shape of a project's configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProjectConfig {
    files: Vec<PathBuf>,
    include: Vec<String>,
    exclude: Vec<String>,
    references: Vec<Reference>,
    out_dir: Option<PathBuf>,
    out_file: Option<PathBuf>,
    root_dir: Option<PathBuf>,
    declaration: bool,
    /// Whether declaration emission strips internal (non-exported) members.
    /// See SPEC_FULL.md §8 — conservatively disables pseudo-build.
    strip_internal: bool,
    wildcard_directories: BTreeMap<PathBuf, WatchKind>,
}

/// A fully resolved project configuration: the structured description the
/// orchestrator works with from here on.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// The directory containing this project's configuration file.
    pub root_dir_of_config: PathBuf,
    /// Ordered, deduplicated absolute source paths.
    pub input_files: Vec<PathBuf>,
    pub references: Vec<Reference>,
    pub out_dir: Option<PathBuf>,
    pub out_file: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
    pub declaration: bool,
    pub strip_internal: bool,
    pub wildcard_directories: BTreeMap<PathBuf, WatchKind>,
}

impl ProjectConfig {
    /// Parses the project file named by `id`.
    pub fn parse(id: &ProjectId) -> Result<Self> {
        let path = id.as_path();
        let raw: RawProjectConfig = crate::utils::read_json_file(path)?;
        let config_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        if raw.out_file.is_some() && raw.out_dir.is_some() {
            return Err(BuildError::ConflictingEmitMode(path.to_path_buf()));
        }

        let input_files = resolve_input_files(&config_dir, &raw)?;

        if raw.out_file.is_none() && raw.out_dir.is_none() && !input_files.is_empty() {
            return Err(BuildError::MissingOutDir(path.to_path_buf()));
        }

        let resolve_dir = |p: Option<PathBuf>| p.map(|p| abs(&config_dir, &p));

        Ok(Self {
            root_dir_of_config: config_dir,
            input_files,
            references: raw.references,
            out_dir: resolve_dir(raw.out_dir),
            out_file: raw.out_file.map(|p| abs(&config_dir, &p)),
            root_dir: raw.root_dir,
            declaration: raw.declaration,
            strip_internal: raw.strip_internal,
            wildcard_directories: raw.wildcard_directories,
        })
    }

    /// `true` for a "solution" aggregator: zero inputs, never stale, never
    /// emits anything (spec §3, §9 "Open question — zero-input projects").
    pub fn is_solution(&self) -> bool {
        self.input_files.is_empty()
    }

    /// The effective root used to rebase input files under `out_dir`.
    pub fn effective_root_dir(&self) -> PathBuf {
        if let Some(root) = &self.root_dir {
            abs(&self.root_dir_of_config, root)
        } else {
            self.root_dir_of_config.clone()
        }
    }

    /// Resolves each reference's declared path to the [`ProjectId`] it names,
    /// relative to this project's own directory.
    pub fn resolved_references(&self) -> Vec<(ProjectId, bool)> {
        self.references
            .iter()
            .map(|r| {
                let target = crate::path::resolve_reference_target(&self.root_dir_of_config, &r.path);
                (ProjectId::from_canonical(target), r.prepend)
            })
            .collect()
    }
}

fn abs(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn resolve_input_files(config_dir: &Path, raw: &RawProjectConfig) -> Result<Vec<PathBuf>> {
    use std::collections::BTreeSet;

    let mut seen = BTreeSet::new();
    let mut ordered = Vec::new();
    let mut push = |p: PathBuf| {
        if seen.insert(p.clone()) {
            ordered.push(p);
        }
    };

    for file in &raw.files {
        push(abs(config_dir, file));
    }

    if !raw.include.is_empty() {
        let excluded = build_exclude_set(config_dir, &raw.exclude)?;
        for pattern in &raw.include {
            let full_pattern = abs(config_dir, Path::new(pattern));
            for entry in glob::glob(&full_pattern.to_string_lossy())? {
                let path = entry.map_err(|e| BuildError::msg(e.to_string()))?;
                if path.is_file() && !excluded.contains(&path) {
                    push(path);
                }
            }
        }
    }

    Ok(ordered)
}

fn build_exclude_set(
    config_dir: &Path,
    exclude: &[String],
) -> Result<std::collections::BTreeSet<PathBuf>> {
    let mut excluded = std::collections::BTreeSet::new();
    for pattern in exclude {
        let full_pattern = abs(config_dir, Path::new(pattern));
        for entry in glob::glob(&full_pattern.to_string_lossy())? {
            if let Ok(path) = entry {
                excluded.insert(path);
            }
        }
    }
    Ok(excluded)
}

/// `true` if `dir` contains a [`PROJECT_FILE_NAME`].
pub fn directory_has_project_file(dir: &Path) -> bool {
    dir.join(PROJECT_FILE_NAME).is_file()
}
