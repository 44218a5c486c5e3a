// src/dag/validate.rs

//! Graph-build validation, run once before anything is scheduled.

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::TaskSpec;
use crate::errors::{Result, TaskstackError};

pub fn validate_specs(specs: &[TaskSpec]) -> Result<()> {
    validate_unique_names(specs)?;
    validate_caps(specs)?;
    validate_dependencies(specs)?;
    validate_acyclic(specs)?;
    Ok(())
}

fn validate_unique_names(specs: &[TaskSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(TaskstackError::DuplicateTask(spec.name.clone()));
        }
    }
    Ok(())
}

fn validate_caps(specs: &[TaskSpec]) -> Result<()> {
    for spec in specs {
        if spec.max_concurrent == Some(0) {
            return Err(TaskstackError::ConfigError(format!(
                "task '{}' has max_concurrent = 0; it must be >= 1",
                spec.name
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(specs: &[TaskSpec]) -> Result<()> {
    let names: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();

    for spec in specs {
        for dep in &spec.run_after {
            if dep == &spec.name {
                return Err(TaskstackError::SelfDependency(spec.name.clone()));
            }
            if !names.contains(dep.as_str()) {
                return Err(TaskstackError::MissingDependency {
                    task: spec.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_acyclic(specs: &[TaskSpec]) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for spec in specs {
        graph.add_node(spec.name.as_str());
    }
    for spec in specs {
        for dep in &spec.run_after {
            graph.add_edge(dep.as_str(), spec.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskstackError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
