#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod error;

pub mod path;
pub mod refmap;
pub mod config;
pub mod graph;
pub mod resolve;
pub mod context;
pub mod analyze;
pub mod compiler;
pub mod orchestrate;
pub mod pseudo;
pub mod watch;
pub mod discover;
pub mod viz;
mod utils;

/// Utilities for creating and testing (temporary) project workspaces.
#[cfg(feature = "project-util")]
pub mod project_util;

pub use analyze::UpToDateStatus;
pub use compiler::{CompileResult, CompilerService, Diagnostic, Emit};
pub use config::{ProjectConfig, Reference, WatchKind};
pub use context::BuildContext;
pub use error::{BuildError, Result};
pub use graph::{BuildQueue, Graph, GraphBuilder};
pub use orchestrate::{walk, BuildOptions, PlannedAction, ProjectOutcome, WalkReport};
pub use path::ProjectId;
pub use pseudo::{try_pseudo_build, BundleDescriptor};
pub use refmap::ReferenceMap;
pub use watch::WatchSession;
