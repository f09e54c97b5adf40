//! Grammar for the Google Test console transcript.
//!
//! Everything that knows the shape of the binary's output lives in [`parse`];
//! aggregation and rendering only ever see [`Transcript`].

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{TestRecord, TestStatus};

/// `[       OK ] Suite.Name (12 ms)` / `[  FAILED  ] Suite.Name (12 ms)`
static TEST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s+(OK|FAILED)\s+\]\s+(\w+)\.(\w+)\s+\((\d+)\s+ms\)").unwrap()
});

/// `[  PASSED  ] 22 tests.`
static PASSED_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s+PASSED\s+\]\s+(\d+)\s+tests?").unwrap());

/// `[  FAILED  ] 2 tests, listed below:`
static FAILED_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s+FAILED\s+\]\s+(\d+)\s+tests?").unwrap());

/// Result of one pass over a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Per-test records, in the order their lines appeared.
    pub records: Vec<TestRecord>,
    /// Count from the last `[ PASSED ]` banner, 0 if none.
    pub passed: usize,
    /// Count from the last `[ FAILED ]` banner, 0 if none.
    pub failed: usize,
}

/// Parse the complete stdout of a finished test binary.
///
/// Never fails: lines that match nothing are skipped, and an empty or
/// unrecognisable transcript yields no records and zero counts.
pub fn parse(raw: &str) -> Transcript {
    let mut transcript = Transcript::default();

    for line in raw.lines() {
        let line = strip_ansi(line);

        if let Some(record) = parse_test_line(&line) {
            transcript.records.push(record);
        }
        // Banners may be repeated (e.g. a duplicated log); the last one wins.
        if let Some(count) = banner_count(&PASSED_BANNER, &line) {
            transcript.passed = count;
        }
        if let Some(count) = banner_count(&FAILED_BANNER, &line) {
            transcript.failed = count;
        }
    }

    transcript
}

fn parse_test_line(line: &str) -> Option<TestRecord> {
    let caps = TEST_LINE.captures(line)?;
    let status = match &caps[1] {
        "OK" => TestStatus::Passed,
        "FAILED" => TestStatus::Failed,
        _ => return None,
    };
    let duration_ms = caps[4].parse().ok()?;
    Some(TestRecord::new(&caps[2], &caps[3], status, duration_ms))
}

fn banner_count(pattern: &Regex, line: &str) -> Option<usize> {
    pattern.captures(line)?[1].parse().ok()
}

/// Strip ANSI escape sequences from a line.
pub(crate) fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until we hit a letter (end of escape sequence)
            for c2 in chars.by_ref() {
                if c2.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
