//! The external compiler collaborator (spec §1 "deliberately out of scope",
//! §4.6).
//!
//! The compiler itself is an opaque service: this crate never parses or
//! type-checks source, it only defines the contract the orchestrator drives
//! it through and writes whatever bytes the service hands back.

use crate::{config::ProjectConfig, error::Result, path::ProjectId};
use std::path::PathBuf;

/// One file the compiler wants written, plus enough metadata for the
/// orchestrator to apply spec §4.6's emit rules (skip declaration writes on
/// declaration diagnostics, detect byte-identical declaration rewrites).
#[derive(Debug, Clone)]
pub struct Emit {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub is_declaration: bool,
}

/// A diagnostic emitted by the compiler for a single project build.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub is_error: bool,
    /// Declaration-emit diagnostics suppress only `.d.ts` writes (spec §7);
    /// syntactic/option diagnostics suppress the whole emit.
    pub blocks_declaration_emit: bool,
    pub blocks_all_emit: bool,
}

/// The result of invoking the compiler once for a single project.
#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub emits: Vec<Emit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn has_fatal_diagnostics(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error && d.blocks_all_emit)
    }

    pub fn suppresses_declaration_emit(&self) -> bool {
        self.diagnostics.iter().any(|d| d.blocks_declaration_emit)
    }
}

/// The contract the build orchestrator drives an external compiler through.
///
/// Implementations of this crate's CLI shell out to (or link) a real
/// compiler; tests use an in-memory fake that just echoes transformed
/// source, which is enough to exercise every up-to-date/pseudo-build
/// interaction the orchestrator cares about.
pub trait CompilerService {
    /// Compiles `project`, returning the files it would write and any
    /// diagnostics produced. Must not write to disk itself — the
    /// orchestrator applies spec §4.6's write rules uniformly across
    /// whatever service is plugged in.
    fn compile(&self, project: &ProjectId, config: &ProjectConfig) -> Result<CompileResult>;
}

/// A [`CompilerService`] that shells out to an external compiler process
/// once per project (spec §1: "the compiler itself: treated as an opaque
/// service producing emits and diagnostics").
///
/// The process is invoked as `<command> <project-config-path>` and is
/// expected to write a [`WireCompileResult`] as JSON on stdout. Exiting
/// non-zero without valid JSON is treated as a single fatal diagnostic
/// (nothing is written; the next walk reclassifies the project as
/// `OutOfDate`, per spec §5 "no rollback").
pub struct ShellCompiler {
    pub command: PathBuf,
    pub extra_args: Vec<String>,
}

impl ShellCompiler {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self { command: command.into(), extra_args: Vec::new() }
    }
}

/// The JSON wire contract a `ShellCompiler` subprocess must emit on stdout.
#[derive(Debug, serde::Deserialize)]
struct WireCompileResult {
    #[serde(default)]
    emits: Vec<WireEmit>,
    #[serde(default)]
    diagnostics: Vec<WireDiagnostic>,
}

#[derive(Debug, serde::Deserialize)]
struct WireEmit {
    path: PathBuf,
    contents: String,
    #[serde(default)]
    is_declaration: bool,
}

#[derive(Debug, serde::Deserialize)]
struct WireDiagnostic {
    message: String,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    blocks_declaration_emit: bool,
    #[serde(default)]
    blocks_all_emit: bool,
}

impl CompilerService for ShellCompiler {
    fn compile(&self, project: &ProjectId, _config: &ProjectConfig) -> Result<CompileResult> {
        let output = std::process::Command::new(&self.command)
            .args(&self.extra_args)
            .arg(project.as_path())
            .output()
            .map_err(crate::error::BuildError::Io)?;

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).into_owned();
            return Ok(CompileResult {
                emits: Vec::new(),
                diagnostics: vec![Diagnostic {
                    message: if message.is_empty() {
                        format!("compiler process exited with {}", output.status)
                    } else {
                        message
                    },
                    is_error: true,
                    blocks_declaration_emit: true,
                    blocks_all_emit: true,
                }],
            });
        }

        let wire: WireCompileResult = serde_json::from_slice(&output.stdout)?;
        Ok(CompileResult {
            emits: wire
                .emits
                .into_iter()
                .map(|e| Emit { path: e.path, contents: e.contents.into_bytes(), is_declaration: e.is_declaration })
                .collect(),
            diagnostics: wire
                .diagnostics
                .into_iter()
                .map(|d| Diagnostic {
                    message: d.message,
                    is_error: d.is_error,
                    blocks_declaration_emit: d.blocks_declaration_emit,
                    blocks_all_emit: d.blocks_all_emit,
                })
                .collect(),
        })
    }
}

#[cfg(any(test, feature = "project-util"))]
pub mod fake {
    //! An in-memory [`CompilerService`] for tests: for every non-declaration
    //! input it emits a `.js` transform, and for declaration-enabled
    //! projects a `.d.ts` whose content is a pure function of the input's
    //! exported surface — letting tests control whether an edit changes
    //! emitted declaration bytes.
    use super::*;
    use crate::resolve::expected_outputs;
    use std::{cell::RefCell, collections::HashMap, fs};

    /// Maps an input path to the declaration text it should produce,
    /// letting tests simulate "edit changes implementation but not the
    /// public interface".
    #[derive(Default)]
    pub struct FakeCompiler {
        pub declaration_overrides: RefCell<HashMap<PathBuf, String>>,
    }

    impl FakeCompiler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_declaration(&self, input: impl Into<PathBuf>, text: impl Into<String>) {
            self.declaration_overrides.borrow_mut().insert(input.into(), text.into());
        }
    }

    impl CompilerService for FakeCompiler {
        fn compile(&self, _project: &ProjectId, config: &ProjectConfig) -> Result<CompileResult> {
            let outputs = expected_outputs(config)?;
            let mut emits = Vec::new();
            for output in outputs {
                let is_declaration = crate::utils::is_declaration_file(&output);
                let contents = if is_declaration {
                    let matching_input = config.input_files.first().cloned().unwrap_or_default();
                    self.declaration_overrides
                        .borrow()
                        .get(&matching_input)
                        .cloned()
                        .unwrap_or_else(|| "export {};\n".to_string())
                        .into_bytes()
                } else {
                    let mut combined = Vec::new();
                    for input in &config.input_files {
                        if let Ok(bytes) = fs::read(input) {
                            combined.extend(bytes);
                        }
                    }
                    combined
                };
                emits.push(Emit { path: output, contents, is_declaration });
            }
            Ok(CompileResult { emits, diagnostics: Vec::new() })
        }
    }
}
