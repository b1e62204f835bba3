//! `buildorch` CLI (spec §6).

use buildorch::{
    compiler::ShellCompiler,
    discover::discover_roots,
    graph::GraphBuilder,
    orchestrate::{walk, BuildOptions, ProjectOutcome},
    viz::to_dot,
    watch::WatchSession,
    BuildContext, UpToDateStatus,
};
use clap::Parser;
use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

#[derive(Parser, Debug)]
#[command(name = "buildorch", about = "Incremental, dependency-aware build orchestrator")]
struct Cli {
    /// Project config files or directories to scan.
    paths: Vec<PathBuf>,

    /// Adds a root project (may repeat).
    #[arg(short = 'p', long = "project")]
    project: Vec<PathBuf>,

    /// Plan only; do not compile or touch files.
    #[arg(short = 'd', long = "dry")]
    dry: bool,

    /// Rebuild all projects even when up-to-date.
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Stay resident and react to file-system changes.
    #[arg(short = 'w', long = "watch")]
    watch: bool,

    /// Emit a DOT-format dependency graph and exit. `--viz=deep` also
    /// labels `prepend` edges.
    #[arg(long = "viz", num_args = 0..=1, default_missing_value = "shallow")]
    viz: Option<String>,

    /// The compiler process buildorch invokes for each stale project
    /// (spec §1: compiler is an opaque external collaborator).
    #[arg(long = "compiler", default_value = "buildorch-compile")]
    compiler: PathBuf,

    #[arg(long, short = 'v')]
    verbose: bool,

    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(cli: Cli) -> buildorch::Result<bool> {
    let roots = discover_roots(&cli.paths, &cli.project)?;
    if roots.is_empty() {
        eprintln!("no project files found");
        return Ok(false);
    }

    if let Some(mode) = &cli.viz {
        let graph = GraphBuilder::new().build(&roots)?;
        let dot = to_dot(&graph, mode == "deep");
        std::fs::write("project-graph.dot", &dot)?;
        let rendered = std::process::Command::new("dot")
            .args(["-Tsvg", "project-graph.dot", "-o", "project-graph.svg"])
            .status();
        match rendered {
            Ok(status) if status.success() => {}
            _ => eprintln!("wrote project-graph.dot (install graphviz's `dot` to render an svg)"),
        }
        return Ok(true);
    }

    let compiler = ShellCompiler::new(cli.compiler);
    let options = BuildOptions { dry: cli.dry, force: cli.force };

    let graph = GraphBuilder::new().build(&roots)?;
    let mut context = BuildContext::new();
    let report = walk(&graph, &compiler, &mut context, options)?;
    print_report(&report);

    if !report.succeeded() {
        return Ok(false);
    }

    if cli.watch {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| buildorch::BuildError::msg(format!("failed to set Ctrl-C handler: {e}")))?;

        let mut session = WatchSession::start(roots)?;
        while !shutdown.load(Ordering::SeqCst) {
            session.tick(&compiler, &mut context)?;
        }
        session.close();
    }

    Ok(true)
}

fn print_report(report: &buildorch::WalkReport) {
    use yansi::Paint;

    for (id, status, outcome) in &report.outcomes {
        let reason = status_reason(status);
        let line = match outcome {
            ProjectOutcome::UpToDate => "up to date".green().to_string(),
            ProjectOutcome::Compiled { diagnostics_count } => {
                format!("compiled ({reason}, {diagnostics_count} diagnostics)").cyan().to_string()
            }
            ProjectOutcome::PseudoBuilt => {
                format!("pseudo-build: touched outputs forward ({reason})").cyan().to_string()
            }
            ProjectOutcome::DryPlanned { would } => {
                format!("would {would:?}: {reason}").yellow().to_string()
            }
            ProjectOutcome::Unbuildable => format!("unbuildable: {reason}").red().to_string(),
        };
        println!("{id}: {line}");
    }
}

/// Renders the analyzer's classification as the single-line reason spec §7
/// requires per project transition ("out-of-date, missing output,
/// pseudo-rebuild, etc.").
fn status_reason(status: &UpToDateStatus) -> String {
    match status {
        UpToDateStatus::Unbuildable => "input file missing or unparseable".to_string(),
        UpToDateStatus::UpToDate { .. } => "up to date".to_string(),
        UpToDateStatus::PseudoUpToDate { .. } => {
            "upstream output changed mtime but not content".to_string()
        }
        UpToDateStatus::Missing { path } => format!("output missing: {}", path.display()),
        UpToDateStatus::OutOfDate { newer_input, older_output, .. } => {
            format!("{} is newer than {}", newer_input.display(), older_output.display())
        }
        UpToDateStatus::OlderThanDependency { dep_project } => {
            format!("older than dependency {dep_project}")
        }
    }
}
