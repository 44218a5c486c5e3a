// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::dag::TaskSpec;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must be done before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// Adjacency view of the (already filtered and validated) task graph.
///
/// Scheduling does not walk this structure; it is kept for diagnostics,
/// dry-run output and graph export.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    /// Task names in registration order.
    order: Vec<String>,
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    /// Build the graph from task specs.
    ///
    /// Assumes every `run_after` entry names a spec in `specs`.
    pub fn from_specs(specs: &[TaskSpec]) -> Self {
        let mut nodes: HashMap<String, DagNode> = HashMap::new();
        let mut order = Vec::with_capacity(specs.len());

        for spec in specs {
            order.push(spec.name.clone());
            nodes.insert(
                spec.name.clone(),
                DagNode {
                    deps: spec.run_after.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        for spec in specs {
            for dep in &spec.run_after {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(spec.name.clone());
                }
            }
        }

        Self { order, nodes }
    }

    /// All task names, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task (its `run_after`).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `(dependency, dependent)` pairs, grouped by dependent in registration order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.tasks()
            .flat_map(|task| {
                self.dependencies_of(task)
                    .iter()
                    .map(move |dep| (dep.as_str(), task))
            })
            .collect()
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph tasks {\n");
        for task in self.tasks() {
            let _ = writeln!(out, "    \"{task}\";");
        }
        for (dep, task) in self.edges() {
            let _ = writeln!(out, "    \"{dep}\" -> \"{task}\";");
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, after: &[&str]) -> TaskSpec {
        TaskSpec::new(name).after(after.iter().copied())
    }

    #[test]
    fn dependents_and_edges_follow_run_after() {
        let graph = DagGraph::from_specs(&[
            spec("a", &[]),
            spec("b", &[]),
            spec("c", &["a", "b"]),
        ]);

        assert_eq!(graph.dependents_of("a"), &["c".to_string()]);
        assert_eq!(graph.dependencies_of("c").len(), 2);
        assert_eq!(graph.edges(), vec![("a", "c"), ("b", "c")]);

        let dot = graph.to_dot();
        assert!(dot.contains("\"a\" -> \"c\";"));
        assert!(dot.contains("\"b\" -> \"c\";"));
    }
}
