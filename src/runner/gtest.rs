use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::RunError;

use super::{BuildReport, RunOutput, TestRunner};

/// Guard that kills the child process (and its entire process group) on drop.
struct ChildGuard {
    child: Option<Child>,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        #[cfg(unix)]
        let pgid = child.id();
        Self {
            child: Some(child),
            #[cfg(unix)]
            pgid,
        }
    }

    async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await,
            None => Err(std::io::Error::other("child already released")),
        }
    }

    /// The child exited on its own; nothing left to kill.
    fn release(&mut self) {
        self.child = None;
        #[cfg(unix)]
        {
            self.pgid = None;
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        // Kill the entire process group so anything the test binary forked goes too.
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        // Fallback / non-Unix: kill just the direct child.
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
    }
}

/// CMake-built Google Test binary.
pub struct GtestRunner {
    build_dir: PathBuf,
    /// Where the build command runs: the build directory's parent.
    project_root: PathBuf,
    build_command: Vec<String>,
    executable: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl GtestRunner {
    pub fn new(build_dir: PathBuf, config: &Config) -> Self {
        let build_command = config.build.command.clone().unwrap_or_else(|| {
            vec![
                "cmake".into(),
                "--build".into(),
                build_dir.to_string_lossy().into_owned(),
            ]
        });
        let project_root = match build_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            build_dir,
            project_root,
            build_command,
            executable: config.test.executable.clone(),
            extra_args: config.test.args.clone(),
            timeout: Duration::from_secs(config.test.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<build>/<exe>`, or the first `<build>/**/<exe>` for multi-config layouts.
    fn find_executable(&self) -> Option<PathBuf> {
        let direct = self.build_dir.join(&self.executable);
        if direct.is_file() {
            return Some(direct);
        }
        let pattern = format!(
            "{}/**/{}",
            glob::Pattern::escape(&self.build_dir.to_string_lossy()),
            glob::Pattern::escape(&self.executable)
        );
        glob::glob(&pattern)
            .ok()?
            .flatten()
            .find(|path| path.is_file())
    }
}

#[async_trait]
impl TestRunner for GtestRunner {
    async fn build(&self) -> Result<BuildReport, RunError> {
        let Some((program, args)) = self.build_command.split_first() else {
            return Err(RunError::BuildToolMissing(String::new()));
        };
        tracing::debug!(command = ?self.build_command, cwd = ?self.project_root, "building");

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RunError::BuildToolMissing(program.clone()),
                _ => RunError::io("run build command")(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(status = %output.status, "build finished");

        if !output.status.success() {
            let log = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(RunError::BuildFailed {
                code: output.status.code().unwrap_or(-1),
                log: log.trim_end().to_string(),
            });
        }

        // Ninja and Make forward compiler diagnostics on stdout, so look at both.
        let warnings = stdout
            .lines()
            .chain(stderr.lines())
            .filter(|line| line.to_lowercase().contains("warning:"))
            .map(str::to_owned)
            .collect();

        Ok(BuildReport { warnings })
    }

    async fn run(&self, filter: Option<&str>) -> Result<RunOutput, RunError> {
        let executable = self
            .find_executable()
            .ok_or_else(|| RunError::ExecutableNotFound(self.build_dir.join(&self.executable)))?;
        let executable = executable
            .canonicalize()
            .map_err(RunError::io("resolve test executable"))?;

        let mut cmd = Command::new(&executable);
        if let Some(filter) = filter {
            cmd.arg(format!("--gtest_filter={filter}"));
        }
        cmd.args(&self.extra_args);

        tracing::debug!(cmd = ?cmd.as_std(), cwd = ?self.build_dir, timeout = ?self.timeout, "running tests");

        // Own process group, so a timeout can take out anything the binary spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }

        let mut child = cmd
            .current_dir(&self.build_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RunError::io("launch test executable"))?;

        let stdout = child.stdout.take().map(|pipe| tokio::spawn(read_all(pipe)));
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(read_all(pipe)));

        // The child stays in the guard so it is killed on every early exit,
        // including the timeout below.
        let mut guard = ChildGuard::new(child);

        let finished = tokio::time::timeout(self.timeout, async {
            let status = guard
                .wait()
                .await
                .map_err(RunError::io("wait for test executable"))?;
            Ok::<_, RunError>(RunOutput {
                stdout: collect(stdout).await?,
                stderr: collect(stderr).await?,
                exit_code: status.code(),
            })
        })
        .await;

        match finished {
            Ok(Ok(output)) => {
                guard.release();
                tracing::debug!(exit_code = ?output.exit_code, "test executable finished");
                Ok(output)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(path = %executable.display(), "test run exceeded {:?}, killing", self.timeout);
                drop(guard);
                Err(RunError::TimedOut(self.timeout))
            }
        }
    }

    fn name(&self) -> &str {
        "Google Test"
    }
}

async fn read_all(mut pipe: impl AsyncRead + Unpin) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn collect(task: Option<JoinHandle<std::io::Result<String>>>) -> Result<String, RunError> {
    let Some(task) = task else {
        return Ok(String::new());
    };
    task.await
        .map_err(std::io::Error::other)
        .and_then(|read| read)
        .map_err(RunError::io("read test output"))
}
