// src/dag/pipeline.rs

//! Fixed task compositions.
//!
//! A [`Pipeline`] is the static shape of one CLI invocation: which tasks
//! take part and which ones must finish before others start.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::cli::TaskArg;
use crate::errors::{AssetpipeError, Result};
use crate::tasks::TaskKind;
use crate::types::Env;

/// One task in a pipeline plus the tasks it waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineNode {
    pub kind: TaskKind,
    pub after: Vec<TaskKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: &'static str,
    nodes: Vec<PipelineNode>,
    /// Nodes that are not started at launch; only watch triggers run them.
    on_change: Vec<TaskKind>,
}

impl Pipeline {
    pub fn new(name: &'static str, nodes: Vec<PipelineNode>) -> Self {
        Self {
            name,
            nodes,
            on_change: Vec::new(),
        }
    }

    /// Add `kinds` as independent nodes that run only when the source watcher
    /// triggers them.
    pub fn with_on_change(mut self, kinds: impl IntoIterator<Item = TaskKind>) -> Self {
        for kind in kinds {
            if !self.contains(kind) {
                self.nodes.push(PipelineNode {
                    kind,
                    after: Vec::new(),
                });
            }
            self.on_change.push(kind);
        }
        self
    }

    /// `clean`, then the five asset tasks in parallel.
    pub fn build() -> Self {
        let mut nodes = vec![PipelineNode {
            kind: TaskKind::Clean,
            after: Vec::new(),
        }];
        nodes.extend(TaskKind::ASSET_TASKS.into_iter().map(|kind| PipelineNode {
            kind,
            after: vec![TaskKind::Clean],
        }));
        Self::new("build", nodes)
    }

    /// The five asset tasks in parallel, then `watch` and `serve` once all
    /// of them have finished.
    pub fn dev_default() -> Self {
        let mut nodes: Vec<PipelineNode> = TaskKind::ASSET_TASKS
            .into_iter()
            .map(|kind| PipelineNode {
                kind,
                after: Vec::new(),
            })
            .collect();
        for kind in [TaskKind::Watch, TaskKind::Serve] {
            nodes.push(PipelineNode {
                kind,
                after: TaskKind::ASSET_TASKS.to_vec(),
            });
        }
        Self::new("default", nodes)
    }

    /// A pipeline with a single node.
    pub fn single(kind: TaskKind) -> Self {
        Self::new(
            kind.as_str(),
            vec![PipelineNode {
                kind,
                after: Vec::new(),
            }],
        )
    }

    /// `watch` on its own: the watcher starts at once and every asset task
    /// waits for a matching source change.
    pub fn watch_only() -> Self {
        Self::single(TaskKind::Watch).with_on_change(TaskKind::ASSET_TASKS)
    }

    /// Dev `scripts`: bundle once, then stay resident and re-bundle whenever
    /// a script source changes.
    pub fn dev_scripts() -> Self {
        Self::new(
            "scripts",
            vec![
                PipelineNode {
                    kind: TaskKind::Scripts,
                    after: Vec::new(),
                },
                PipelineNode {
                    kind: TaskKind::Watch,
                    after: vec![TaskKind::Scripts],
                },
            ],
        )
    }

    pub fn for_task(task: TaskArg, env: Env) -> Self {
        match task {
            TaskArg::Default => Self::dev_default(),
            TaskArg::Build => Self::build(),
            TaskArg::Clean => Self::single(TaskKind::Clean),
            TaskArg::Watch => Self::watch_only(),
            TaskArg::Serve => Self::single(TaskKind::Serve),
            TaskArg::Scripts if env.is_dev() => Self::dev_scripts(),
            TaskArg::Scripts => Self::single(TaskKind::Scripts),
            TaskArg::Styles => Self::single(TaskKind::Styles),
            TaskArg::Templates => Self::single(TaskKind::Templates),
            TaskArg::Images => Self::single(TaskKind::Images),
            TaskArg::Sprites => Self::single(TaskKind::Sprites),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.nodes.iter().any(|n| n.kind == kind)
    }

    /// Tasks with no dependencies that are started at launch.
    pub fn roots(&self) -> Vec<TaskKind> {
        self.nodes
            .iter()
            .filter(|n| n.after.is_empty() && !self.on_change.contains(&n.kind))
            .map(|n| n.kind)
            .collect()
    }

    /// Asset tasks the source watcher may re-run in this pipeline.
    pub fn watched_tasks(&self) -> Vec<TaskKind> {
        TaskKind::ASSET_TASKS
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Whether any node never completes (the runtime must not exit on idle).
    pub fn has_long_lived(&self) -> bool {
        self.nodes.iter().any(|n| n.kind.is_long_lived())
    }

    /// Check references and acyclicity; returns a topological order.
    pub fn validate(&self) -> Result<Vec<TaskKind>> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<TaskKind, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.kind);
        }
        for node in &self.nodes {
            for dep in &node.after {
                if !self.contains(*dep) {
                    return Err(AssetpipeError::TaskNotFound(format!(
                        "{dep} (required by {})",
                        node.kind
                    )));
                }
                graph.add_edge(*dep, node.kind, ());
            }
        }

        toposort(&graph, None)
            .map_err(|cycle| AssetpipeError::DagCycle(cycle.node_id().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[TaskKind], kind: TaskKind) -> usize {
        order.iter().position(|k| *k == kind).unwrap()
    }

    #[test]
    fn build_orders_clean_first() {
        let pipeline = Pipeline::build();
        let order = pipeline.validate().unwrap();
        assert_eq!(order[0], TaskKind::Clean);
        assert_eq!(order.len(), 6);
        assert_eq!(pipeline.roots(), vec![TaskKind::Clean]);
        assert!(!pipeline.has_long_lived());
    }

    #[test]
    fn default_puts_watch_and_serve_after_every_asset_task() {
        let pipeline = Pipeline::dev_default();
        let order = pipeline.validate().unwrap();
        for asset in TaskKind::ASSET_TASKS {
            assert!(position(&order, asset) < position(&order, TaskKind::Watch));
            assert!(position(&order, asset) < position(&order, TaskKind::Serve));
        }
        assert_eq!(pipeline.roots().len(), 5);
        assert!(pipeline.has_long_lived());
    }

    #[test]
    fn single_task_pipelines_have_one_root() {
        let pipeline = Pipeline::for_task(TaskArg::Styles, Env::Dev);
        assert_eq!(pipeline.roots(), vec![TaskKind::Styles]);
        assert_eq!(pipeline.name(), "styles");
    }

    #[test]
    fn standalone_watch_starts_only_the_watcher() {
        let pipeline = Pipeline::for_task(TaskArg::Watch, Env::Dev);
        pipeline.validate().unwrap();
        assert_eq!(pipeline.roots(), vec![TaskKind::Watch]);
        assert_eq!(pipeline.watched_tasks(), TaskKind::ASSET_TASKS.to_vec());
        assert!(pipeline.has_long_lived());
    }

    #[test]
    fn dev_scripts_stays_resident_and_prod_scripts_exits() {
        let dev = Pipeline::for_task(TaskArg::Scripts, Env::Dev);
        let order = dev.validate().unwrap();
        assert_eq!(order, vec![TaskKind::Scripts, TaskKind::Watch]);
        assert_eq!(dev.roots(), vec![TaskKind::Scripts]);
        assert_eq!(dev.watched_tasks(), vec![TaskKind::Scripts]);
        assert!(dev.has_long_lived());

        let prod = Pipeline::for_task(TaskArg::Scripts, Env::Prod);
        assert!(!prod.has_long_lived());
        assert_eq!(prod.roots(), vec![TaskKind::Scripts]);
    }

    #[test]
    fn cycles_are_rejected() {
        let pipeline = Pipeline::new(
            "broken",
            vec![
                PipelineNode {
                    kind: TaskKind::Styles,
                    after: vec![TaskKind::Scripts],
                },
                PipelineNode {
                    kind: TaskKind::Scripts,
                    after: vec![TaskKind::Styles],
                },
            ],
        );
        assert!(matches!(pipeline.validate(), Err(AssetpipeError::DagCycle(_))));
    }

    #[test]
    fn unknown_dependencies_are_rejected() {
        let pipeline = Pipeline::new(
            "dangling",
            vec![PipelineNode {
                kind: TaskKind::Watch,
                after: vec![TaskKind::Styles],
            }],
        );
        assert!(matches!(
            pipeline.validate(),
            Err(AssetpipeError::TaskNotFound(_))
        ));
    }
}
