//! Output-path resolver (C4, spec §4.4).
//!
//! Given a project's configuration, enumerates the artifact paths it would
//! emit. Pure and side-effect free: never touches the filesystem.

use crate::{
    config::ProjectConfig,
    error::{BuildError, Result},
    utils::{change_extension, is_declaration_file},
};
use std::path::PathBuf;

/// The full set of outputs a project is expected to produce, in a stable
/// order (declaration outputs last, matching `outFile`'s own pairing of
/// bundle + `.d.ts`).
pub fn expected_outputs(config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    if config.is_solution() {
        return Ok(Vec::new());
    }

    if let Some(out_file) = &config.out_file {
        let mut outputs = vec![out_file.clone()];
        if config.declaration {
            outputs.push(change_extension(out_file, "d.ts"));
        }
        return Ok(outputs);
    }

    let out_dir = config
        .out_dir
        .as_ref()
        .ok_or_else(|| BuildError::MissingOutDir(config.root_dir_of_config.clone()))?;
    let root_dir = config.effective_root_dir();

    let mut outputs = Vec::new();
    for input in &config.input_files {
        if is_declaration_file(input) {
            continue;
        }
        let relative = input.strip_prefix(&root_dir).unwrap_or(input);
        let js_out = change_extension(&out_dir.join(relative), "js");
        outputs.push(js_out.clone());
        if config.declaration {
            outputs.push(change_extension(&js_out, "d.ts"));
        }
    }
    Ok(outputs)
}

/// The subset of a project's outputs that are declaration (`.d.ts`) files —
/// the only surface downstream projects consume (spec §4.5 step 4).
pub fn declaration_outputs(config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    Ok(expected_outputs(config)?.into_iter().filter(|p| is_declaration_file(p)).collect())
}

/// The subset of a project's outputs that are `.js` emits — consumed by
/// downstream `outFile` concatenation (spec §4.5 step 4 parenthetical).
pub fn js_outputs(config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    Ok(expected_outputs(config)?.into_iter().filter(|p| !is_declaration_file(p)).collect())
}
