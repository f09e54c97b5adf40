pub mod theme;

use crate::models::{Summary, TestRecord, TestStatus};

pub use theme::Theme;

const RULE_WIDTH: usize = 70;
const NAME_WIDTH: usize = 50;
const SLOWEST_LIMIT: usize = 5;
const SECONDS_WIDTH: usize = 6;

/// Rendered report plus the status that drives the exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub failed: bool,
}

/// Render `summary` as a human-readable report.
///
/// Output is a pure function of the inputs; `color` only adds styling escapes
/// and never changes which lines appear.
pub fn render(summary: &Summary, color: bool) -> Report {
    let style = Theme::new(color);
    let failed = summary.overall_failed();
    let rule = style.bold("=".repeat(RULE_WIDTH));

    let mut lines = vec![
        rule.clone(),
        style.bold("Test Summary"),
        rule.clone(),
        String::new(),
    ];

    let status = if failed {
        TestStatus::Failed
    } else {
        TestStatus::Passed
    };
    lines.push(style.paint(
        format!("{} Total: {} tests", status.icon(), summary.total_tests),
        status.color(),
    ));
    lines.push(format!(
        "  {}",
        style.paint(format!("Passed: {}", summary.passed), theme::GREEN)
    ));
    let failed_color = if failed { theme::RED } else { theme::OVERLAY0 };
    lines.push(format!(
        "  {}",
        style.paint(format!("Failed: {}", summary.failed), failed_color)
    ));

    lines.push(String::new());
    lines.push(style.paint(
        format!("Duration: {}s total", seconds(summary.total_duration_ms)),
        theme::TEAL,
    ));

    if !summary.records.is_empty() {
        lines.push(String::new());
        lines.push(style.bold("Slowest tests:"));
        let rows: Vec<(String, String)> = slowest(&summary.records)
            .into_iter()
            .map(|r| (fit_name(&r.full_name()), seconds(r.duration_ms.into())))
            .collect();
        let width = rows
            .iter()
            .map(|(_, secs)| secs.len())
            .max()
            .unwrap_or(0)
            .max(SECONDS_WIDTH);
        for (name, secs) in rows {
            lines.push(format!("  {name} {secs:>width$}s"));
        }
    }

    if failed {
        lines.push(String::new());
        lines.push(style.paint_bold("Failed tests:", theme::RED));
        for record in summary
            .records
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
        {
            lines.push(format!(
                "  {}",
                style.paint(
                    format!("{} {}", TestStatus::Failed.icon(), record.full_name()),
                    theme::RED
                )
            ));
        }
    }

    if let Some(mismatch) = summary.count_mismatch() {
        lines.push(String::new());
        lines.push(style.paint(
            format!(
                "Note: parsed {} test results but the run reported {} (passed + failed)",
                mismatch.parsed, mismatch.reported
            ),
            theme::YELLOW,
        ));
    }

    lines.push(String::new());
    lines.push(rule);
    lines.push(String::new());

    let mut text = lines.join("\n");
    text.push('\n');
    Report { text, failed }
}

/// Up to five records, longest first; equal durations keep transcript order.
fn slowest(records: &[TestRecord]) -> Vec<&TestRecord> {
    let mut sorted: Vec<&TestRecord> = records.iter().collect();
    // sort_by is stable
    sorted.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    sorted.truncate(SLOWEST_LIMIT);
    sorted
}

/// Milliseconds as seconds with one decimal.
pub fn seconds(ms: u128) -> String {
    format!("{:.1}", ms as f64 / 1000.0)
}

/// Dot-lead a name to the column width, cutting it short with `…` if needed.
fn fit_name(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let mut cut: String = name.chars().take(NAME_WIDTH - 1).collect();
        cut.push('…');
        cut
    } else {
        format!("{:.<width$}", name, width = NAME_WIDTH)
    }
}
