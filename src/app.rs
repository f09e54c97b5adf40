use std::fmt::Display;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::error::RunError;
use crate::models::Summary;
use crate::report::{self, Report, Theme, theme};
use crate::runner::{RunOutput, TestRunner, transcript};

const RULE_WIDTH: usize = 70;

/// Per-invocation switches, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub build_dir: PathBuf,
    pub filter: Option<String>,
    pub no_build: bool,
    pub verbose: bool,
    pub json: bool,
}

/// Where progress and errors are written. In JSON mode stdout carries only the
/// JSON document, so progress moves to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    theme: Theme,
    color: bool,
    json: bool,
}

impl Console {
    pub fn new(color: bool, json: bool) -> Self {
        Self {
            theme: Theme::new(color),
            color,
            json,
        }
    }

    fn line(&self, text: impl Display) {
        if self.json {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }

    pub fn error(&self, err: &RunError) {
        eprintln!("{}", self.theme.paint(format!("Error: {err}"), theme::RED));
        if let Some(hint) = err.hint() {
            eprintln!("{hint}");
        }
    }
}

/// A run that got as far as producing a report.
#[derive(Debug)]
pub struct Outcome {
    pub summary: Summary,
    pub report: Report,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a Summary,
    overall_failed: bool,
}

/// Build, run, parse, report.
pub async fn run(
    runner: &dyn TestRunner,
    opts: &Options,
    console: &Console,
) -> Result<Outcome, RunError> {
    if !opts.build_dir.is_dir() {
        return Err(RunError::BuildDirMissing(opts.build_dir.clone()));
    }

    if !opts.no_build {
        build(runner, opts, console).await?;
    }

    let style = console.theme;
    console.line("");
    console.line(style.paint(format!("Running tests ({})...", runner.name()), theme::BLUE));
    if let Some(filter) = &opts.filter {
        console.line(style.paint(format!("Filter: {filter}"), theme::TEAL));
    }

    let output = runner.run(opts.filter.as_deref()).await?;
    if opts.verbose {
        echo_output(&output, console);
    }

    let parsed = transcript::parse(&output.stdout);
    let summary = Summary::build(parsed.records, parsed.passed, parsed.failed);
    tracing::debug!(
        records = summary.total_tests,
        passed = summary.passed,
        failed = summary.failed,
        "parsed transcript"
    );
    if let Some(mismatch) = summary.count_mismatch() {
        tracing::warn!(
            parsed = mismatch.parsed,
            reported = mismatch.reported,
            "parsed test count differs from the reported totals"
        );
    }
    if let Some(code) = output.exit_code
        && code != 0
        && !summary.overall_failed()
    {
        tracing::warn!(code, "test executable exited non-zero without reporting failures");
    }

    let report = report::render(&summary, console.color);
    if opts.json {
        let doc = JsonReport {
            summary: &summary,
            overall_failed: report.failed,
        };
        // Written through the serializer, not `Value`, so u128 totals survive.
        let doc = serde_json::to_string_pretty(&doc)
            .map_err(|e| RunError::io("encode JSON summary")(e.into()))?;
        println!("{doc}");
    } else {
        print!("{}", report.text);
    }

    Ok(Outcome { summary, report })
}

async fn build(runner: &dyn TestRunner, opts: &Options, console: &Console) -> Result<(), RunError> {
    let style = console.theme;
    console.line(style.paint("Building tests...", theme::BLUE));

    let start = Instant::now();
    let result = runner.build().await;
    let elapsed = report::seconds(start.elapsed().as_millis());

    match result {
        Ok(build) if build.warnings.is_empty() => {
            console.line(style.paint(format!("✓ Build succeeded ({elapsed}s)"), theme::GREEN));
        }
        Ok(build) => {
            console.line(style.paint(
                format!(
                    "✓ Build succeeded with {} warning(s) ({elapsed}s)",
                    build.warnings.len()
                ),
                theme::YELLOW,
            ));
            if opts.verbose {
                for warning in &build.warnings {
                    console.line(format!("  {warning}"));
                }
            }
        }
        Err(err) => {
            console.line(style.paint(format!("✗ Build failed ({elapsed}s)"), theme::RED));
            if let RunError::BuildFailed { log, .. } = &err {
                eprintln!("{log}");
            }
            return Err(err);
        }
    }
    Ok(())
}

fn echo_output(output: &RunOutput, console: &Console) {
    let rule = console.theme.paint("=".repeat(RULE_WIDTH), theme::TEAL);
    console.line("");
    console.line(&rule);
    console.line(output.stdout.trim_end());
    if !output.stderr.is_empty() {
        console.line(output.stderr.trim_end());
    }
    console.line(&rule);
    console.line("");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestStatus;
    use crate::runner::BuildReport;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    const PASSING: &str = "[       OK ] Tree.Insert (4 ms)\n[       OK ] Tree.Remove (6 ms)\n[  PASSED  ] 2 tests.\n";
    const FAILING: &str = "[       OK ] Tree.Insert (4 ms)\n[  FAILED  ] Tree.Remove (6 ms)\n[  PASSED  ] 1 test.\n[  FAILED  ] 1 test, listed below:\n";

    #[derive(Default)]
    struct FakeRunner {
        transcript: &'static str,
        fail_build: bool,
        time_out: bool,
        built: AtomicBool,
        runs: AtomicUsize,
        filter: Mutex<Option<String>>,
    }

    #[async_trait]
    impl TestRunner for FakeRunner {
        async fn build(&self) -> Result<BuildReport, RunError> {
            self.built.store(true, Ordering::SeqCst);
            if self.fail_build {
                return Err(RunError::BuildFailed {
                    code: 2,
                    log: "tree.cpp:1: error: oops".into(),
                });
            }
            Ok(BuildReport {
                warnings: vec!["tree.cpp:9: warning: unused".into()],
            })
        }

        async fn run(&self, filter: Option<&str>) -> Result<RunOutput, RunError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            *self.filter.lock().unwrap() = filter.map(str::to_owned);
            if self.time_out {
                return Err(RunError::TimedOut(Duration::from_secs(120)));
            }
            Ok(RunOutput {
                stdout: self.transcript.into(),
                stderr: String::new(),
                exit_code: Some(0),
            })
        }

        fn name(&self) -> &str {
            "Fake"
        }
    }

    fn options(dir: &tempfile::TempDir) -> Options {
        Options {
            build_dir: dir.path().to_path_buf(),
            filter: None,
            no_build: false,
            verbose: true,
            json: false,
        }
    }

    const CONSOLE: Console = Console {
        theme: Theme::new(false),
        color: false,
        json: false,
    };

    #[tokio::test]
    async fn passing_run_builds_then_reports() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner {
            transcript: PASSING,
            ..Default::default()
        };

        let outcome = run(&runner, &options(&dir), &CONSOLE).await.unwrap();

        assert!(runner.built.load(Ordering::SeqCst));
        assert!(!outcome.report.failed);
        assert_eq!(outcome.summary.total_tests, 2);
        assert_eq!(outcome.summary.total_duration_ms, 10);
    }

    #[tokio::test]
    async fn failing_run_marks_report_failed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner {
            transcript: FAILING,
            ..Default::default()
        };

        let outcome = run(&runner, &options(&dir), &CONSOLE).await.unwrap();

        assert!(outcome.report.failed);
        let failed: Vec<String> = outcome
            .summary
            .records
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
            .map(|r| r.full_name())
            .collect();
        assert_eq!(failed, vec!["Tree.Remove"]);
    }

    #[tokio::test]
    async fn no_build_skips_the_build_and_filter_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner {
            transcript: PASSING,
            ..Default::default()
        };
        let opts = Options {
            no_build: true,
            filter: Some("*Insert*".into()),
            ..options(&dir)
        };

        run(&runner, &opts, &CONSOLE).await.unwrap();

        assert!(!runner.built.load(Ordering::SeqCst));
        assert_eq!(runner.filter.lock().unwrap().as_deref(), Some("*Insert*"));
    }

    #[tokio::test]
    async fn build_failure_stops_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner {
            fail_build: true,
            ..Default::default()
        };

        let err = run(&runner, &options(&dir), &CONSOLE).await.unwrap_err();

        assert!(matches!(err, RunError::BuildFailed { code: 2, .. }));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn timeout_is_not_a_test_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner {
            time_out: true,
            ..Default::default()
        };

        let err = run(&runner, &options(&dir), &CONSOLE).await.unwrap_err();

        assert!(matches!(err, RunError::TimedOut(_)));
        assert_eq!(err.exit_code(), 124);
    }

    #[tokio::test]
    async fn missing_build_dir_is_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::default();
        let opts = Options {
            build_dir: dir.path().join("build"),
            ..options(&dir)
        };

        let err = run(&runner, &opts, &CONSOLE).await.unwrap_err();

        assert!(matches!(err, RunError::BuildDirMissing(_)));
        assert!(!runner.built.load(Ordering::SeqCst));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn json_report_keeps_totals_beyond_u64() {
        let records = vec![
            crate::models::TestRecord::new("S", "a", TestStatus::Passed, u64::MAX),
            crate::models::TestRecord::new("S", "b", TestStatus::Passed, 1),
        ];
        let summary = Summary::build(records, 2, 0);
        let doc = serde_json::to_string(&JsonReport {
            summary: &summary,
            overall_failed: false,
        })
        .unwrap();
        assert!(doc.contains("\"total_duration_ms\":18446744073709551616"));
    }

    #[tokio::test]
    async fn empty_output_is_a_clean_pass() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::default();
        let opts = Options {
            json: true,
            ..options(&dir)
        };

        let outcome = run(&runner, &opts, &Console::new(false, true)).await.unwrap();

        assert!(!outcome.report.failed);
        assert_eq!(outcome.summary, Summary::build(Vec::new(), 0, 0));
    }
}
