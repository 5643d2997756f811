// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::dag::pipeline::Pipeline;
use crate::tasks::TaskKind;

/// Edges of a pipeline in both directions, keyed by [`TaskKind`].
///
/// Acyclicity is checked by [`Pipeline::validate`]; this only keeps the
/// adjacency the scheduler walks.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    deps: BTreeMap<TaskKind, Vec<TaskKind>>,
    dependents: BTreeMap<TaskKind, Vec<TaskKind>>,
}

impl DagGraph {
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut graph = DagGraph::default();
        for node in pipeline.nodes() {
            graph.deps.insert(node.kind, node.after.clone());
            graph.dependents.entry(node.kind).or_default();
        }
        for node in pipeline.nodes() {
            for dep in &node.after {
                graph.dependents.entry(*dep).or_default().push(node.kind);
            }
        }
        graph
    }

    /// Every task in the pipeline, in `TaskKind` order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskKind> + '_ {
        self.deps.keys().copied()
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.deps.contains_key(&kind)
    }

    pub fn dependencies_of(&self, kind: TaskKind) -> &[TaskKind] {
        self.deps.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents_of(&self, kind: TaskKind) -> &[TaskKind] {
        self.dependents.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `kind` followed by everything that transitively waits for it.
    pub fn downstream_of(&self, kind: TaskKind) -> Vec<TaskKind> {
        let mut seen = vec![kind];
        let mut cursor = 0;
        while cursor < seen.len() {
            for next in self.dependents_of(seen[cursor]) {
                if !seen.contains(next) {
                    seen.push(*next);
                }
            }
            cursor += 1;
        }
        seen
    }
}
