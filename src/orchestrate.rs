//! Build orchestrator (C6, spec §4.6).
//!
//! Walks a [`BuildQueue`] from the deepest layer to the roots, classifying
//! each project with the analyzer and dispatching to the compiler or the
//! pseudo-builder. Non-destructive: the queue itself is only read.

use crate::{
    analyze::{analyze, AnalyzerInputs, UpToDateStatus},
    compiler::CompilerService,
    config::ProjectConfig,
    context::BuildContext,
    error::Result,
    graph::Graph,
    path::ProjectId,
    pseudo::try_pseudo_build,
    resolve::expected_outputs,
    utils::{create_parent_dir_all, modified_time},
};
use rayon::prelude::*;
use std::collections::HashSet;

/// Flags controlling a single walk (spec §6 CLI surface).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub dry: bool,
    pub force: bool,
}

/// What the orchestrator decided — and, if it ran, did — for one project.
#[derive(Debug, Clone)]
pub enum ProjectOutcome {
    UpToDate,
    Compiled { diagnostics_count: usize },
    PseudoBuilt,
    DryPlanned { would: PlannedAction },
    Unbuildable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Compile,
    PseudoBuild,
}

/// Result of a full walk: per-project outcomes in the order they were
/// visited (deepest layer first), plus whether the walk completed or was
/// halted by a fatal error.
///
/// Each entry carries the analyzer's [`UpToDateStatus`] alongside the
/// [`ProjectOutcome`] so callers can print the single-line reason spec §7
/// requires ("out-of-date, missing output, pseudo-rebuild, etc.") instead of
/// just the action taken.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub outcomes: Vec<(ProjectId, UpToDateStatus, ProjectOutcome)>,
    pub halted_at: Option<ProjectId>,
}

impl WalkReport {
    pub fn succeeded(&self) -> bool {
        self.halted_at.is_none()
    }
}

/// Runs one build walk over `graph` using `compiler`. Returns `Ok` whether
/// or not the walk completed — a halted walk is reported via
/// [`WalkReport::halted_at`], not an `Err`, matching spec §7's "the build
/// callback returns a boolean signifying keep going" propagation style.
pub fn walk(
    graph: &Graph,
    compiler: &dyn CompilerService,
    context: &mut BuildContext,
    options: BuildOptions,
) -> Result<WalkReport> {
    let mut report = WalkReport::default();
    let mut needs_build: HashSet<ProjectId> = HashSet::new();

    'layers: for layer in graph.queue.build_order() {
        // Projects within a layer never reference each other (the graph
        // builder only ever places a reference in a strictly deeper layer),
        // so `needs_build` is stable for the whole layer and analysis can
        // run concurrently; dispatch still happens one project at a time
        // since it mutates `context` and must preserve fatal short-circuit
        // order (spec §5: "implementations may parallelize within a layer
        // but must preserve per-project atomicity").
        let ro_context: &BuildContext = &*context;
        let per_project: Vec<(&ProjectId, &ProjectConfig, Vec<(ProjectId, ProjectConfig, bool)>, Result<UpToDateStatus>)> =
            layer
                .par_iter()
                .map(|id| {
                    let config =
                        graph.configs.get(id).expect("graph configs cover every queued project");
                    let references: Vec<(ProjectId, ProjectConfig, bool)> = config
                        .resolved_references()
                        .into_iter()
                        .filter_map(|(ref_id, prepend)| {
                            graph.configs.get(&ref_id).map(|c| (ref_id, c.clone(), prepend))
                        })
                        .collect();
                    let inputs = AnalyzerInputs { config, references: &references };
                    let status = analyze(&inputs, &needs_build, ro_context);
                    (id, config, references, status)
                })
                .collect();

        for (id, config, references, status) in per_project {
            let status = status?;

            if matches!(status, UpToDateStatus::Unbuildable) {
                report.outcomes.push((id.clone(), status, ProjectOutcome::Unbuildable));
                report.halted_at = Some(id.clone());
                break 'layers;
            }

            if !status.is_up_to_date() {
                needs_build.insert(id.clone());
            }

            let outcome = dispatch(id, config, &status, &references, compiler, context, options)?;
            let halts = matches!(outcome, ProjectOutcome::Unbuildable);
            report.outcomes.push((id.clone(), status, outcome));

            if halts {
                // A fatal compiler diagnostic (spec §4.6 point 2 / §6: "Return
                // value per project to the walker is `false` iff the project
                // produced a fatal error... A `false` halts the whole build").
                report.halted_at = Some(id.clone());
                break 'layers;
            }
        }
    }

    Ok(report)
}

fn dispatch(
    id: &ProjectId,
    config: &ProjectConfig,
    status: &UpToDateStatus,
    references: &[(ProjectId, ProjectConfig, bool)],
    compiler: &dyn CompilerService,
    context: &mut BuildContext,
    options: BuildOptions,
) -> Result<ProjectOutcome> {
    if status.is_up_to_date() && !options.force {
        info!(project = %id, "up to date");
        return Ok(ProjectOutcome::UpToDate);
    }

    match status {
        UpToDateStatus::PseudoUpToDate { .. } if !options.force => {
            if options.dry {
                return Ok(ProjectOutcome::DryPlanned { would: PlannedAction::PseudoBuild });
            }
            let upstream_configs =
                references.iter().map(|(rid, rconfig, _)| (rid.clone(), rconfig.clone())).collect();
            if try_pseudo_build(id, config, &upstream_configs, context)? {
                info!(project = %id, "pseudo-build: touched outputs forward");
                return Ok(ProjectOutcome::PseudoBuilt);
            }
            info!(project = %id, "pseudo-build not possible, falling back to full compile");
            full_compile(id, config, compiler, context, options)
        }
        _ => {
            if options.dry {
                return Ok(ProjectOutcome::DryPlanned { would: PlannedAction::Compile });
            }
            full_compile(id, config, compiler, context, options)
        }
    }
}

fn full_compile(
    id: &ProjectId,
    config: &ProjectConfig,
    compiler: &dyn CompilerService,
    context: &mut BuildContext,
    _options: BuildOptions,
) -> Result<ProjectOutcome> {
    info!(project = %id, "compiling");
    let result = compiler.compile(id, config)?;

    if result.has_fatal_diagnostics() {
        for d in &result.diagnostics {
            error!(project = %id, "{}", d.message);
        }
        return Ok(ProjectOutcome::Unbuildable);
    }

    let suppress_declaration = result.suppresses_declaration_emit();

    for emit in &result.emits {
        if emit.is_declaration && suppress_declaration {
            continue;
        }

        create_parent_dir_all(&emit.path)?;

        if emit.is_declaration {
            let identical = std::fs::read(&emit.path)
                .map(|existing| crate::utils::content_hash(&existing) == crate::utils::content_hash(&emit.contents))
                .unwrap_or(false);
            if identical {
                if let Some(prior) = modified_time(&emit.path) {
                    context.record_unchanged(emit.path.clone(), prior);
                }
            }
        }

        std::fs::write(&emit.path, &emit.contents)?;
    }

    for d in &result.diagnostics {
        if d.is_error {
            warn!(project = %id, "{}", d.message);
        } else {
            debug!(project = %id, "{}", d.message);
        }
    }

    // Enumerated outputs not actually emitted by the compiler (e.g. a
    // declaration suppressed above) are left untouched; the next walk will
    // reclassify this project via the analyzer, per spec §5 "no rollback".
    let _ = expected_outputs(config);

    Ok(ProjectOutcome::Compiled { diagnostics_count: result.diagnostics.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::fake::FakeCompiler, graph::GraphBuilder};
    use std::fs;

    fn write(dir: &std::path::Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    #[test]
    fn cold_build_compiles_missing_projects_in_order() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        fs::create_dir_all(root.path().join("b")).unwrap();
        write(&root.path().join("a"), "a.ts", "const a = 1;");
        write(&root.path().join("a"), "project.json", r#"{"files": ["a.ts"], "outDir": "dist"}"#);
        write(&root.path().join("b"), "b.ts", "const b = 2;");
        write(
            &root.path().join("b"),
            "project.json",
            r#"{"files": ["b.ts"], "outDir": "dist", "references": [{"path": "../a"}]}"#,
        );

        let b_id = ProjectId::resolve(root.path().join("b")).unwrap();
        let graph = GraphBuilder::new().build(&[b_id]).unwrap();

        let compiler = FakeCompiler::new();
        let mut context = BuildContext::new();
        let report = walk(&graph, &compiler, &mut context, BuildOptions::default()).unwrap();

        assert!(report.succeeded());
        assert!(root.path().join("a/dist/a.js").is_file());
        assert!(root.path().join("b/dist/b.js").is_file());
        assert_eq!(
            report.outcomes.iter().filter(|(_, _, o)| matches!(o, ProjectOutcome::Compiled { .. })).count(),
            2
        );
    }

    #[test]
    fn second_walk_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        write(&root.path().join("a"), "a.ts", "const a = 1;");
        write(&root.path().join("a"), "project.json", r#"{"files": ["a.ts"], "outDir": "dist"}"#);

        let id = ProjectId::resolve(root.path().join("a")).unwrap();
        let graph = GraphBuilder::new().build(&[id]).unwrap();
        let compiler = FakeCompiler::new();
        let mut context = BuildContext::new();

        walk(&graph, &compiler, &mut context, BuildOptions::default()).unwrap();
        let second = walk(&graph, &compiler, &mut BuildContext::new(), BuildOptions::default()).unwrap();

        assert!(second
            .outcomes
            .iter()
            .all(|(_, _, o)| matches!(o, ProjectOutcome::UpToDate)));
    }

    #[test]
    fn dry_run_on_missing_output_plans_without_writing() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        write(&root.path().join("a"), "a.ts", "const a = 1;");
        write(&root.path().join("a"), "project.json", r#"{"files": ["a.ts"], "outDir": "dist"}"#);

        let id = ProjectId::resolve(root.path().join("a")).unwrap();
        let graph = GraphBuilder::new().build(&[id]).unwrap();
        let compiler = FakeCompiler::new();
        let mut context = BuildContext::new();

        let report =
            walk(&graph, &compiler, &mut context, BuildOptions { dry: true, force: false }).unwrap();

        assert!(!root.path().join("a/dist/a.js").is_file());
        assert!(report
            .outcomes
            .iter()
            .all(|(_, _, o)| matches!(o, ProjectOutcome::DryPlanned { .. })));
    }

    #[test]
    fn force_recompiles_up_to_date_project() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        write(&root.path().join("a"), "a.ts", "const a = 1;");
        write(&root.path().join("a"), "project.json", r#"{"files": ["a.ts"], "outDir": "dist"}"#);

        let id = ProjectId::resolve(root.path().join("a")).unwrap();
        let graph = GraphBuilder::new().build(&[id]).unwrap();
        let compiler = FakeCompiler::new();
        let mut context = BuildContext::new();

        walk(&graph, &compiler, &mut context, BuildOptions::default()).unwrap();
        let forced =
            walk(&graph, &compiler, &mut context, BuildOptions { dry: false, force: true }).unwrap();

        assert!(forced
            .outcomes
            .iter()
            .any(|(_, _, o)| matches!(o, ProjectOutcome::Compiled { .. })));
    }

    /// A [`crate::compiler::CompilerService`] that reports a fatal diagnostic
    /// for one chosen project and otherwise behaves like [`FakeCompiler`],
    /// for exercising the walk's halt-on-fatal-error path.
    struct FailingCompiler {
        fails: ProjectId,
        inner: FakeCompiler,
    }

    impl crate::compiler::CompilerService for FailingCompiler {
        fn compile(
            &self,
            project: &ProjectId,
            config: &crate::config::ProjectConfig,
        ) -> Result<crate::compiler::CompileResult> {
            if *project == self.fails {
                return Ok(crate::compiler::CompileResult {
                    emits: Vec::new(),
                    diagnostics: vec![crate::compiler::Diagnostic {
                        message: "simulated fatal error".to_string(),
                        is_error: true,
                        blocks_declaration_emit: true,
                        blocks_all_emit: true,
                    }],
                });
            }
            self.inner.compile(project, config)
        }
    }

    #[test]
    fn fatal_compile_error_halts_the_walk_before_downstream_projects() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        fs::create_dir_all(root.path().join("b")).unwrap();
        write(&root.path().join("a"), "a.ts", "const a = 1;");
        write(&root.path().join("a"), "project.json", r#"{"files": ["a.ts"], "outDir": "dist"}"#);
        write(&root.path().join("b"), "b.ts", "const b = 2;");
        write(
            &root.path().join("b"),
            "project.json",
            r#"{"files": ["b.ts"], "outDir": "dist", "references": [{"path": "../a"}]}"#,
        );

        let a_id = ProjectId::resolve(root.path().join("a")).unwrap();
        let b_id = ProjectId::resolve(root.path().join("b")).unwrap();
        let graph = GraphBuilder::new().build(&[b_id.clone()]).unwrap();

        let compiler = FailingCompiler { fails: a_id.clone(), inner: FakeCompiler::new() };
        let mut context = BuildContext::new();
        let report = walk(&graph, &compiler, &mut context, BuildOptions::default()).unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.halted_at.as_ref(), Some(&a_id));
        assert!(report.outcomes.iter().any(|(id, _, o)| *id == a_id
            && matches!(o, ProjectOutcome::Unbuildable)));
        assert!(
            report.outcomes.iter().all(|(id, _, _)| *id != b_id),
            "downstream project B must never be attempted once A fails fatally"
        );
        assert!(!root.path().join("b/dist/b.js").is_file());
    }
}
