use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, de::Error as _};

pub const FILE_NAME: &str = "tally.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub test: TestConfig,
}

/// Overrides the build step.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// Full build command line, split with shell quoting rules.
    /// Example: "cmake --build build --parallel 8"
    /// Defaults to `cmake --build <build-dir>`.
    #[serde(default, deserialize_with = "command_line")]
    pub command: Option<Vec<String>>,
}

/// Controls how the test binary is invoked.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// File name of the test binary inside the build directory.
    pub executable: String,
    /// Extra arguments appended after the filter.
    pub args: Vec<String>,
    /// Upper bound on the whole test run.
    pub timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            executable: "tree_tests".into(),
            args: Vec::new(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load `tally.toml` from the workspace root, falling back to defaults if absent or invalid.
    pub fn load(workspace: &Path) -> Self {
        let path = workspace.join(FILE_NAME);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match Self::parse(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), ?config, "loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config: {e:#}");
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| format!("invalid {FILE_NAME}"))
    }
}

fn command_line<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    let argv = shell_words::split(&raw).map_err(D::Error::custom)?;
    if argv.is_empty() {
        return Err(D::Error::custom("build command is empty"));
    }
    Ok(Some(argv))
}
