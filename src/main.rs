mod app;
mod config;
mod error;
mod logging;
mod models;
mod report;
mod runner;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::tty::IsTty;

use app::{Console, Options};
use config::Config;

/// Build and run a C++ Google Test binary, then summarise the results.
///
/// Exit status: 0 all passed, 1 tests failed, 3 build directory missing,
/// 4 build failed, 5 test executable not found, 6 launch error, 124 timed out.
#[derive(Parser)]
#[command(name = "tally", version)]
#[command(after_help = "EXAMPLES:
    tally                          Build and run all tests
    tally --filter \"*OEIS*\"        Run only OEIS tests
    tally --no-build               Skip build, just run tests
    tally --verbose                Show detailed output")]
struct Cli {
    /// Build directory
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Google Test filter pattern (e.g. "*OEIS*")
    #[arg(long)]
    filter: Option<String>,

    /// Skip building, just run tests
    #[arg(long)]
    no_build: bool,

    /// Show build warnings and the raw test output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Give up on the test run after this many seconds (overrides tally.toml)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("warning: {e:#}");
    }

    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::load(&workspace);
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(config.test.timeout_secs));

    let console = Console::new(color_enabled(cli.no_color), cli.json);
    let options = Options {
        build_dir: cli.build_dir,
        filter: cli.filter,
        no_build: cli.no_build,
        verbose: cli.verbose,
        json: cli.json,
    };

    let runner = runner::detect(options.build_dir.clone(), &config, timeout);
    match app::run(runner.as_ref(), &options, &console).await {
        Ok(outcome) => {
            tracing::debug!(
                tests = outcome.summary.total_tests,
                failed = outcome.report.failed,
                "run complete"
            );
            if outcome.report.failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            tracing::debug!(?err, "run aborted");
            console.error(&err);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Colour only when asked for, allowed by `NO_COLOR`, and going to a terminal.
fn color_enabled(no_color: bool) -> bool {
    let env_off = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    !no_color && !env_off && io::stdout().is_tty()
}
