use serde::Serialize;

use super::record::TestRecord;

/// Aggregate snapshot of one test run.
///
/// `passed` and `failed` come from the binary's own banner lines; `total_tests`
/// and `total_duration_ms` are derived from the parsed records. The two sources
/// are kept side by side and never reconciled here. Totals are widened to
/// `u128` so no combination of `u64` durations or banner counts can overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u128,
    pub records: Vec<TestRecord>,
}

/// Records parsed vs. the counts the binary reported about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub parsed: usize,
    pub reported: u128,
}

impl Summary {
    pub fn build(records: Vec<TestRecord>, passed: usize, failed: usize) -> Self {
        let total_duration_ms = records.iter().map(|r| u128::from(r.duration_ms)).sum();
        Self {
            total_tests: records.len(),
            passed,
            failed,
            skipped: 0,
            total_duration_ms,
            records,
        }
    }

    /// The only signal that decides the exit status.
    pub fn overall_failed(&self) -> bool {
        self.failed > 0
    }

    pub fn count_mismatch(&self) -> Option<CountMismatch> {
        let reported = self.passed as u128 + self.failed as u128;
        (reported != self.total_tests as u128).then_some(CountMismatch {
            parsed: self.total_tests,
            reported,
        })
    }
}
