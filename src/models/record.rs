use serde::Serialize;

use super::status::TestStatus;

/// One executed test, as reported by a single transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub suite: String,
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
}

impl TestRecord {
    pub fn new(
        suite: impl Into<String>,
        name: impl Into<String>,
        status: TestStatus,
        duration_ms: u64,
    ) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
            status,
            duration_ms,
        }
    }

    /// `Suite.Name`, used for display.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.suite, self.name)
    }
}
