use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Ways a run can end without producing a report.
///
/// Each one maps to its own exit code so scripts can tell "tests failed"
/// apart from "the tests never ran".
#[derive(Debug, Error)]
pub enum RunError {
    #[error("build directory '{}' does not exist", .0.display())]
    BuildDirMissing(PathBuf),

    #[error("build tool '{0}' not found")]
    BuildToolMissing(String),

    #[error("build failed (exit code {code})")]
    BuildFailed { code: i32, log: String },

    #[error("test executable not found at {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("tests timed out after {} seconds", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(action: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| RunError::Io { action, source }
    }

    /// Follow-up advice printed under the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            RunError::BuildDirMissing(dir) => {
                let dir = dir.display();
                Some(format!("Run: mkdir {dir} && cd {dir} && cmake .."))
            }
            RunError::BuildToolMissing(_) => Some("Install it or set build.command in tally.toml".into()),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::BuildDirMissing(_) => 3,
            RunError::BuildToolMissing(_) | RunError::BuildFailed { .. } => 4,
            RunError::ExecutableNotFound(_) => 5,
            RunError::Io { .. } => 6,
            RunError::TimedOut(_) => 124,
        }
    }
}
