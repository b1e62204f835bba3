//! Dependency-graph discovery and build-order computation (C3, spec §4.3).

use crate::{
    config::ProjectConfig,
    error::{BuildError, Result},
    path::ProjectId,
    refmap::ReferenceMap,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// An ordered sequence of layers, each an unordered set of project ids. The
/// last layer holds projects with no further references; the first layer
/// holds roots. Walking last-to-first yields a valid topological build order.
#[derive(Debug, Clone, Default)]
pub struct BuildQueue {
    layers: Vec<BTreeSet<ProjectId>>,
}

impl BuildQueue {
    /// Iterates layers from the deepest dependency to the roots — the valid
    /// build order.
    pub fn build_order(&self) -> impl Iterator<Item = &BTreeSet<ProjectId>> {
        self.layers.iter().rev()
    }

    pub fn layers(&self) -> &[BTreeSet<ProjectId>] {
        &self.layers
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.layers.iter().any(|l| l.contains(id))
    }

    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discovers the full transitive set of projects reachable from `roots` and
/// computes a layered build order plus the bidirectional reference map.
///
/// Parsing is cached in the returned map so callers (the orchestrator, the
/// watcher) can reuse configs without reparsing.
pub struct GraphBuilder {
    configs: HashMap<ProjectId, ProjectConfig>,
}

pub struct Graph {
    pub queue: BuildQueue,
    pub references: ReferenceMap,
    pub configs: HashMap<ProjectId, ProjectConfig>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self { configs: HashMap::new() }
    }

    /// Builds the graph from a set of root project ids (already canonical).
    pub fn build(mut self, roots: &[ProjectId]) -> Result<Graph> {
        let mut queue = BuildQueue::default();
        let mut references = ReferenceMap::new();
        let mut on_stack = HashSet::new();

        for root in roots {
            self.visit(root, 0, &mut queue, &mut references, &mut on_stack)?;
        }

        compact(&mut queue.layers);

        Ok(Graph { queue, references, configs: self.configs })
    }

    fn get_or_parse(&mut self, id: &ProjectId) -> Result<&ProjectConfig> {
        if !self.configs.contains_key(id) {
            let config = ProjectConfig::parse(id)
                .map_err(|_| BuildError::UnresolvedReference(id.as_path().to_path_buf()))?;
            self.configs.insert(id.clone(), config);
        }
        Ok(self.configs.get(id).expect("just inserted"))
    }

    fn visit(
        &mut self,
        id: &ProjectId,
        depth: usize,
        queue: &mut BuildQueue,
        references: &mut ReferenceMap,
        on_stack: &mut HashSet<ProjectId>,
    ) -> Result<()> {
        if on_stack.contains(id) {
            return Err(BuildError::Cycle(id.clone()));
        }

        if queue.layers.len() <= depth {
            queue.layers.resize_with(depth + 1, BTreeSet::new);
        }
        queue.layers[depth].insert(id.clone());

        on_stack.insert(id.clone());

        let resolved = self.get_or_parse(id)?.resolved_references();
        for (target, _prepend) in resolved {
            references.add_reference(target.clone(), id.clone());
            self.visit(&target, depth + 1, queue, references, on_stack)?;
        }

        on_stack.remove(id);
        Ok(())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a project from layer *i* if it also appears in any layer *j > i*
/// — the rightmost (deepest) occurrence wins.
fn compact(layers: &mut [BTreeSet<ProjectId>]) {
    for i in 0..layers.len() {
        let (earlier, later) = layers.split_at_mut(i + 1);
        let current = &mut earlier[i];
        for deeper in later.iter() {
            current.retain(|id| !deeper.contains(id));
        }
    }
}
