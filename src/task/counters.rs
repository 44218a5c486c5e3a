// src/task/counters.rs

use crate::protocol::Fields;
use crate::task::TaskResult;

/// Running success/skip/error tallies of a task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResultCounters {
    pub success: u64,
    pub skip: u64,
    pub error: u64,
}

impl ResultCounters {
    pub fn record<T>(&mut self, result: &TaskResult<T>) {
        match result {
            TaskResult::Success { .. } => self.success += 1,
            TaskResult::Skip { .. } => self.skip += 1,
            TaskResult::Error { .. } => self.error += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.skip + self.error
    }

    /// `success`/`skip`/`error` extra fields for a progress line.
    pub fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("success".into(), self.success.to_string());
        fields.insert("skip".into(), self.skip.to_string());
        fields.insert("error".into(), self.error.to_string());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_variant() {
        let mut counters = ResultCounters::default();
        counters.record(&TaskResult::success());
        counters.record(&TaskResult::<()>::skip("dup"));
        counters.record(&TaskResult::<()>::error("bad"));
        counters.record(&TaskResult::success());

        assert_eq!(counters, ResultCounters { success: 2, skip: 1, error: 1 });
        assert_eq!(counters.total(), 4);
        assert_eq!(counters.fields()["success"], "2");
    }
}
