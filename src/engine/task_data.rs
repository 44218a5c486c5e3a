// src/engine/task_data.rs

//! Parent-side progress record of one task, rebuilt from protocol lines.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::dag::{StackedTask, TaskStatus};
use crate::engine::TaskName;
use crate::protocol::{self, Fields};

#[derive(Debug, Clone, Serialize)]
pub struct TaskData {
    name: TaskName,
    count: u64,
    current: u64,
    duration: f64,
    estimated: f64,
    memory_usage: u64,
    memory_peak: u64,
    code_errors_count: u64,
    extra: IndexMap<String, String>,
    status: TaskStatus,
    start_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
}

impl TaskData {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            current: 0,
            duration: 0.0,
            estimated: 0.0,
            memory_usage: 0,
            memory_peak: 0,
            code_errors_count: 0,
            extra: IndexMap::new(),
            status: TaskStatus::Stacked,
            start_at: None,
            finished_at: None,
        }
    }

    /// Merge one parsed protocol line.
    ///
    /// Reserved keys overwrite their counters, except `code_errors_count`
    /// which accumulates. Everything else lands in `extra`, sanitized.
    pub fn fill(&mut self, fields: &Fields) {
        for (key, value) in fields {
            match key.as_str() {
                protocol::COUNT => self.set_int(key, value, |d, v| d.count = v),
                protocol::CURRENT => self.set_int(key, value, |d, v| d.current = v),
                protocol::DURATION => self.set_float(key, value, |d, v| d.duration = v),
                protocol::ESTIMATED => self.set_float(key, value, |d, v| d.estimated = v),
                protocol::MEMORY_USAGE => self.set_int(key, value, |d, v| d.memory_usage = v),
                protocol::MEMORY_PEAK => self.set_int(key, value, |d, v| d.memory_peak = v),
                protocol::CODE_ERRORS_COUNT => {
                    self.set_int(key, value, |d, v| d.code_errors_count += v)
                }
                _ => {
                    self.extra.insert(key.clone(), protocol::sanitize(value));
                }
            }
        }
    }

    pub fn add_code_errors(&mut self, count: u64) {
        self.code_errors_count += count;
    }

    /// Copy lifecycle status and timestamps from the scheduler node.
    pub fn sync(&mut self, task: &StackedTask) {
        self.status = task.status();
        self.start_at = task.start_at();
        self.finished_at = task.finished_at();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn estimated(&self) -> f64 {
        self.estimated
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn memory_peak(&self) -> u64 {
        self.memory_peak
    }

    pub fn code_errors_count(&self) -> u64 {
        self.code_errors_count
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_at(&self) -> Option<DateTime<Local>> {
        self.start_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(|s| s.as_str())
    }

    /// Numeric extra counter such as `success`/`skip`/`error`; 0 if absent.
    pub fn extra_count(&self, key: &str) -> u64 {
        self.extra(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn all_extra(&self) -> &IndexMap<String, String> {
        &self.extra
    }

    /// Percentage done, derived on demand.
    pub fn progress(&self) -> f64 {
        if self.count > 0 {
            self.current as f64 / self.count as f64 * 100.0
        } else {
            0.0
        }
    }

    fn set_int(&mut self, key: &str, value: &str, apply: impl FnOnce(&mut Self, u64)) {
        let value = value.trim();
        let parsed = value
            .parse::<u64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(|f| f.max(0.0) as u64));
        match parsed {
            Some(v) => apply(self, v),
            None => warn!(task = %self.name, key, value, "non-numeric value for numeric key; ignored"),
        }
    }

    fn set_float(&mut self, key: &str, value: &str, apply: impl FnOnce(&mut Self, f64)) {
        match value.trim().parse::<f64>() {
            Ok(v) => apply(self, v),
            Err(_) => warn!(task = %self.name, key, value, "non-numeric value for numeric key; ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_line;

    #[test]
    fn reserved_keys_are_numeric_and_rest_goes_to_extra() {
        let mut data = TaskData::new("a");
        data.fill(&parse_line("count:10;current:3;duration:5.0;estimated:16.5;memory_usage:100;memory_peak:200;success:3;message:  two\twords ").unwrap());

        assert_eq!(data.count(), 10);
        assert_eq!(data.current(), 3);
        assert_eq!(data.duration(), 5.0);
        assert_eq!(data.estimated(), 16.5);
        assert_eq!(data.memory_usage(), 100);
        assert_eq!(data.memory_peak(), 200);
        assert_eq!(data.extra_count("success"), 3);
        assert_eq!(data.extra_count("skip"), 0);
        assert_eq!(data.extra("message"), Some("two words"));
        assert!((data.progress() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn code_errors_accumulate() {
        let mut data = TaskData::new("a");
        data.fill(&parse_line("code_errors_count:2").unwrap());
        data.fill(&parse_line("code_errors_count:1").unwrap());
        data.add_code_errors(4);
        assert_eq!(data.code_errors_count(), 7);
    }

    #[test]
    fn progress_is_zero_without_count() {
        let mut data = TaskData::new("a");
        data.fill(&parse_line("current:4").unwrap());
        assert_eq!(data.progress(), 0.0);
    }

    #[test]
    fn bad_numbers_keep_previous_value() {
        let mut data = TaskData::new("a");
        data.fill(&parse_line("count:5;current:2").unwrap());
        data.fill(&parse_line("count:lots;current:3").unwrap());
        assert_eq!(data.count(), 5);
        assert_eq!(data.current(), 3);
    }
}
