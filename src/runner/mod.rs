pub mod gtest;
pub mod transcript;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::RunError;

/// What a successful build left behind.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Build output lines mentioning `warning:`.
    pub warnings: Vec<String>,
}

/// Captured output of one finished test-binary run.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
}

/// Adapter for a particular build system / test binary pairing.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Compile the test binary.
    async fn build(&self) -> Result<BuildReport, RunError>;

    /// Execute the test binary to completion, passing `filter` through untouched.
    async fn run(&self, filter: Option<&str>) -> Result<RunOutput, RunError>;

    /// Display name for this runner (e.g., "Google Test").
    fn name(&self) -> &str;
}

/// Construct the runner for the given build directory.
pub fn detect(build_dir: PathBuf, config: &Config, timeout: Duration) -> Box<dyn TestRunner> {
    Box::new(gtest::GtestRunner::new(build_dir, config).with_timeout(timeout))
}
