//! Small, pure filesystem and path helpers shared across modules.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Reads and deserializes a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|source| crate::error::BuildError::ReadConfig { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
        .map_err(|source| crate::error::BuildError::ParseConfig { path: path.to_path_buf(), source })
}

/// Serializes `value` as pretty JSON and writes it to `path`, creating parent
/// directories as needed.
pub fn write_json_file<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir_all(path)?;
    let content = serde_json::to_vec_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Creates the parent directory of `path`, recursively, if it doesn't exist.
pub fn create_parent_dir_all(path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Replaces a path's final extension (e.g. `foo/bar.ts` -> `foo/bar.js`).
pub fn change_extension(path: &Path, new_ext: &str) -> PathBuf {
    path.with_extension(new_ext.trim_start_matches('.'))
}

/// Returns `true` if `path`'s extension is `.d.ts`-equivalent, i.e. this
/// crate's declaration-file suffix (`.d.ts` is kept verbatim — it is the
/// spec's own vocabulary for the typed-interface output).
pub fn is_declaration_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".d.ts")
}

/// Reads the last-modified time of `path` as a `SystemTime`, if it exists.
pub fn modified_time(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// blake3 content hash of a file's bytes, used only to decide whether a
/// freshly emitted declaration output is byte-identical to what's already on
/// disk (§4.5/§4.6's `unchangedOutputs` bookkeeping) — not a cache key.
pub fn content_hash(bytes: &[u8]) -> blake3::Hash {
    blake3::hash(bytes)
}
