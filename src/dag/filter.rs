// src/dag/filter.rs

//! Subnet filtering: run only the part of the graph whose task names match.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::dag::TaskSpec;
use crate::errors::{Result, TaskstackError};

/// Compiled list of task-name patterns. Empty means "keep everything".
#[derive(Debug, Clone, Default)]
pub struct SubnetFilter {
    patterns: Vec<Regex>,
}

impl SubnetFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| TaskstackError::InvalidFilter {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// A name is kept if it matches at least one pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Keep matching specs and drop dependency edges that leave the subnet.
    ///
    /// A dependency outside the subnet counts as already satisfied.
    pub fn apply(&self, specs: &[TaskSpec]) -> Vec<TaskSpec> {
        if self.is_empty() {
            return specs.to_vec();
        }

        let kept: HashSet<&str> = specs
            .iter()
            .filter(|s| self.matches(&s.name))
            .map(|s| s.name.as_str())
            .collect();

        specs
            .iter()
            .filter(|s| kept.contains(s.name.as_str()))
            .map(|s| {
                let run_after: Vec<_> = s
                    .run_after
                    .iter()
                    .filter(|dep| kept.contains(dep.as_str()))
                    .cloned()
                    .collect();
                if run_after.len() != s.run_after.len() {
                    debug!(
                        task = %s.name,
                        dropped = s.run_after.len() - run_after.len(),
                        "dependencies outside subnet treated as satisfied"
                    );
                }
                TaskSpec {
                    name: s.name.clone(),
                    run_after,
                    max_concurrent: s.max_concurrent,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_matching_tasks_and_prunes_outside_edges() {
        let specs = vec![
            TaskSpec::new("import:users"),
            TaskSpec::new("import:articles").after(["import:users", "export:x"]),
            TaskSpec::new("export:x"),
        ];
        let filter = SubnetFilter::new(&["^import:"]).unwrap();
        let kept = filter.apply(&specs);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].name, "import:articles");
        assert_eq!(kept[1].run_after, vec!["import:users".to_string()]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = SubnetFilter::new(&["("]).unwrap_err();
        assert!(matches!(err, TaskstackError::InvalidFilter { pattern, .. } if pattern == "("));
    }
}
