//! Dependency graph visualizer (`--viz`, spec §6).
//!
//! A trivial DOT writer; rendering the `.dot` source to an image is left to
//! an external renderer (`dot -Tsvg`), which this crate shells out to.

use crate::{graph::Graph, path::ProjectId};
use std::fmt::Write as _;

/// Renders `graph` as a DOT digraph, one node per project and one edge per
/// reference (parent -> child, i.e. build-order direction).
///
/// `deep` mirrors `--viz=deep`: when set, edges carry a `prepend` label so a
/// reader can tell concatenated references apart from ordinary ones.
pub fn to_dot(graph: &Graph, deep: bool) -> String {
    let mut out = String::new();
    out.push_str("digraph project_graph {\n");
    out.push_str("  rankdir=LR;\n");

    for id in graph.configs.keys() {
        writeln!(out, "  {:?};", node_name(id)).unwrap();
    }

    for (id, config) in &graph.configs {
        for (target, prepend) in config.resolved_references() {
            if deep && prepend {
                writeln!(out, "  {:?} -> {:?} [label=\"prepend\"];", node_name(id), node_name(&target))
                    .unwrap();
            } else {
                writeln!(out, "  {:?} -> {:?};", node_name(id), node_name(&target)).unwrap();
            }
        }
    }

    out.push_str("}\n");
    out
}

fn node_name(id: &ProjectId) -> String {
    id.display_slash()
}
