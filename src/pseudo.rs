//! Pseudo-builder (C7, spec §4.7).
//!
//! Advances output timestamps — and, for concatenated `outFile` bundles,
//! surgically rewrites the on-disk bundle — without reinvoking the
//! compiler. Used when the analyzer determines upstream content is
//! byte-identical to what this project last consumed.

use crate::{
    config::ProjectConfig,
    context::BuildContext,
    error::Result,
    path::ProjectId,
    resolve::{declaration_outputs, expected_outputs},
    utils::{change_extension, modified_time},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, time::SystemTime};

/// Sidecar persisted next to an `outFile` bundle that uses `prepend`
/// references (spec §3 `BundleDescriptor`, §6 persisted state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDescriptor {
    /// Byte offset of this project's own emitted content within the bundle.
    pub original_offset: u64,
    /// Total bundle byte length.
    pub total_length: u64,
}

/// The sidecar path for a bundle: its `.js` extension replaced with
/// `.bundle_info` (spec §6).
pub fn sidecar_path(out_file: &Path) -> std::path::PathBuf {
    change_extension(out_file, "bundle_info")
}

/// Whether pseudo-building `config` is even admissible. Conservatively
/// refuses `prepend` + `stripInternal` combinations (spec §9 open question).
pub fn can_pseudo_build(config: &ProjectConfig) -> bool {
    let has_prepend = config.references.iter().any(|r| r.prepend);
    !(has_prepend && config.strip_internal)
}

/// Attempts to pseudo-build `config` without invoking the compiler.
///
/// `upstream_configs` must contain a parsed [`ProjectConfig`] for every
/// project `config` references (the orchestrator/graph builder already has
/// these cached; a reparse is permitted per spec but not performed here).
///
/// Returns `Ok(true)` on success, `Ok(false)` if pseudo-building is not
/// possible and the caller should fall back to a full compile. Never
/// returns an error for a recoverable inconsistency (spec §7).
pub fn try_pseudo_build(
    _id: &ProjectId,
    config: &ProjectConfig,
    upstream_configs: &HashMap<ProjectId, ProjectConfig>,
    context: &mut BuildContext,
) -> Result<bool> {
    if !can_pseudo_build(config) {
        return Ok(false);
    }

    let resolved = config.resolved_references();
    let has_prepend = resolved.iter().any(|(_, prepend)| *prepend);

    if has_prepend {
        concatenated_branch(config, &resolved, upstream_configs, context)
    } else {
        touch_forward_branch(config, context)
    }
}

fn concatenated_branch(
    config: &ProjectConfig,
    resolved: &[(ProjectId, bool)],
    upstream_configs: &HashMap<ProjectId, ProjectConfig>,
    context: &mut BuildContext,
) -> Result<bool> {
    let Some(out_file) = config.out_file.as_ref() else { return Ok(false) };
    let sidecar = sidecar_path(out_file);

    if !out_file.is_file() || !sidecar.is_file() {
        warn!(bundle = %out_file.display(), "cannot pseudo-build: bundle or sidecar missing");
        return Ok(false);
    }

    let descriptor: BundleDescriptor = crate::utils::read_json_file(&sidecar)?;
    let bundle_bytes = fs::read(out_file)?;
    if bundle_bytes.len() as u64 != descriptor.total_length {
        warn!(
            bundle = %out_file.display(),
            recorded = descriptor.total_length,
            actual = bundle_bytes.len(),
            "cannot pseudo-build: sidecar length mismatch"
        );
        return Ok(false);
    }

    let offset = descriptor.original_offset as usize;
    if offset > bundle_bytes.len() {
        warn!(bundle = %out_file.display(), "cannot pseudo-build: sidecar offset out of range");
        return Ok(false);
    }
    let own_contribution = bundle_bytes[offset..].to_vec();

    let mut accumulator = Vec::new();
    for (dep_id, _prepend) in resolved {
        let Some(dep_config) = upstream_configs.get(dep_id) else {
            warn!(project = %dep_id, "cannot pseudo-build: upstream config not available");
            return Ok(false);
        };
        let Some(dep_out_file) = dep_config.out_file.as_ref() else {
            warn!(project = %dep_id, "cannot pseudo-build: upstream has no outFile to concatenate");
            return Ok(false);
        };
        if !dep_out_file.is_file() {
            return Ok(false);
        }
        accumulator.extend(fs::read(dep_out_file)?);
    }

    let new_offset = accumulator.len() as u64;
    accumulator.extend(&own_contribution);
    let new_total = accumulator.len() as u64;

    fs::write(out_file, &accumulator)?;
    crate::utils::write_json_file(
        &BundleDescriptor { original_offset: new_offset, total_length: new_total },
        &sidecar,
    )?;

    if config.declaration {
        for decl in declaration_outputs(config)? {
            touch(&decl, context)?;
        }
    }

    Ok(true)
}

fn touch_forward_branch(config: &ProjectConfig, context: &mut BuildContext) -> Result<bool> {
    for output in expected_outputs(config)? {
        if !output.is_file() {
            return Ok(false);
        }
        touch(&output, context)?;
    }
    Ok(true)
}

/// Advances `path`'s mtime to now, recording its prior mtime in `context` so
/// downstream analyzers treat the change as semantically identical.
fn touch(path: &Path, context: &mut BuildContext) -> Result<()> {
    let prior = modified_time(path).unwrap_or(SystemTime::UNIX_EPOCH);
    context.record_unchanged(path.to_path_buf(), prior);
    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}
