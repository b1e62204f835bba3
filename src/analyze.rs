//! Up-to-date analyzer (C5, spec §4.5).
//!
//! Classifies a project into one of six status outcomes relative to its own
//! inputs, the outputs of upstream (referenced) projects, and the prior-build
//! memory recorded in [`BuildContext`].

use crate::{
    config::ProjectConfig,
    context::BuildContext,
    error::Result,
    path::ProjectId,
    resolve::{declaration_outputs, expected_outputs, js_outputs},
    utils::modified_time,
};
use std::{collections::HashSet, path::PathBuf, time::SystemTime};

/// The six-way classification produced by the analyzer (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpToDateStatus {
    /// An input file is missing or the project's config failed to parse.
    Unbuildable,
    /// No action needed.
    UpToDate { newest_input: SystemTime },
    /// Upstream outputs changed mtimes but not semantic content; a cheap
    /// touch-forward suffices instead of a real compile.
    PseudoUpToDate { newest_input: SystemTime },
    /// An expected output is absent.
    Missing { path: PathBuf },
    OutOfDate {
        newer_input: PathBuf,
        newer_input_time: SystemTime,
        older_output: PathBuf,
        older_output_time: SystemTime,
    },
    /// A referenced project has not yet been (re)built during this walk, so
    /// this project's staleness relative to it cannot yet be trusted.
    OlderThanDependency { dep_project: ProjectId },
}

impl UpToDateStatus {
    /// Whether this status means "no compiler invocation needed" absent
    /// `--force`.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, UpToDateStatus::UpToDate { .. } | UpToDateStatus::PseudoUpToDate { .. })
    }
}

/// Per-project input used by the analyzer: its own config plus the resolved
/// references it depends on (each needing its `ProjectId` and `ProjectConfig`
/// so declaration/`.js` outputs can be enumerated).
pub struct AnalyzerInputs<'a> {
    pub config: &'a ProjectConfig,
    pub references: &'a [(ProjectId, ProjectConfig, bool)],
}

/// Classifies `project` per spec §4.5.
///
/// `needs_build` is the set of projects already determined — earlier in the
/// same walk, which proceeds deepest-layer-first — to require a build this
/// run. It lets a dry run (where no file is actually touched) still mark
/// downstream consumers `OlderThanDependency` instead of misreading stale
/// upstream mtimes as fresh (spec §4.6 point 3).
pub fn analyze(
    inputs: &AnalyzerInputs<'_>,
    needs_build: &HashSet<ProjectId>,
    context: &BuildContext,
) -> Result<UpToDateStatus> {
    let config = inputs.config;

    if config.is_solution() {
        return Ok(UpToDateStatus::UpToDate { newest_input: SystemTime::UNIX_EPOCH });
    }

    // Step 1: gather own inputs.
    let mut newest_input = SystemTime::UNIX_EPOCH;
    for input in &config.input_files {
        match modified_time(input) {
            Some(t) => newest_input = newest_input.max(t),
            None => return Ok(UpToDateStatus::Unbuildable),
        }
    }

    // Step 2/3: enumerate and stat expected outputs.
    let outputs = expected_outputs(config)?;
    let mut oldest: Option<(SystemTime, &PathBuf)> = None;
    for output in &outputs {
        match modified_time(output) {
            None => return Ok(UpToDateStatus::Missing { path: output.clone() }),
            Some(t) => oldest = Some(oldest.map_or((t, output), |(o, p)| if t < o { (t, output) } else { (o, p) })),
        }
    }
    let (mut oldest_output, mut oldest_output_path) = oldest
        .map(|(t, p)| (t, p.clone()))
        .unwrap_or_else(|| (SystemTime::UNIX_EPOCH, PathBuf::new()));

    if newest_input > oldest_output {
        if let Some(newer) = config.input_files.iter().find(|f| modified_time(f) == Some(newest_input)) {
            return Ok(UpToDateStatus::OutOfDate {
                newer_input: newer.clone(),
                newer_input_time: newest_input,
                older_output: oldest_output_path,
                older_output_time: oldest_output,
            });
        }
    }

    // Step 4/5: reconcile upstream reference outputs.
    let mut used_pseudo_timestamp = false;
    let mut newest_pseudo_input = SystemTime::UNIX_EPOCH;

    for (dep_id, dep_config, _prepend) in inputs.references {
        if needs_build.contains(dep_id) {
            return Ok(UpToDateStatus::OlderThanDependency { dep_project: dep_id.clone() });
        }

        let mut upstream_files = declaration_outputs(dep_config)?;
        if config.out_file.is_some() {
            upstream_files.extend(js_outputs(dep_config)?);
        }

        for file in upstream_files {
            let current_mtime = match modified_time(&file) {
                Some(t) => t,
                None => return Ok(UpToDateStatus::Missing { path: file }),
            };

            if let Some(prior) = context.prior_mtime(&file) {
                if oldest_output >= prior {
                    used_pseudo_timestamp = true;
                    newest_pseudo_input = newest_pseudo_input.max(current_mtime);
                    continue;
                }
            }

            if current_mtime > newest_input {
                newest_input = current_mtime;
                if newest_input > oldest_output {
                    return Ok(UpToDateStatus::OutOfDate {
                        newer_input: file,
                        newer_input_time: newest_input,
                        older_output: oldest_output_path,
                        older_output_time: oldest_output,
                    });
                }
            }
        }
    }

    // Kept reachable for future extension (e.g. richer diagnostics);
    // silence unused-assignment lints on the final values.
    let _ = (&mut oldest_output, &mut oldest_output_path);

    if used_pseudo_timestamp {
        Ok(UpToDateStatus::PseudoUpToDate { newest_input: newest_input.max(newest_pseudo_input) })
    } else {
        Ok(UpToDateStatus::UpToDate { newest_input })
    }
}
