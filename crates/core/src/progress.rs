//! Best-effort progress extraction from converter output lines.
//!
//! The converter prints free text such as
//! `[download]  42.7% of 3.41MiB at 1.20MiB/s ETA 00:02`. Nothing about the
//! format is guaranteed, so [`parse`] only looks for two things: a percentage
//! and the audio extraction phase marker. A line matching neither is simply
//! not a signal.

use std::sync::LazyLock;

use regex::Regex;

/// Pattern for a 1-3 digit percentage with an optional fractional part.
const PERCENT_PATTERN: &str = r"(\d{1,3}(?:\.\d+)?)%";

/// Case-insensitive keyword announcing the post-download extraction step.
const EXTRACTION_KEYWORD: &str = "extracting audio";

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PERCENT_PATTERN).expect("valid regex"));

/// A named phase transition recognised in converter output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The download finished and the audio track is being extracted.
    Extracting,
}

/// A progress indication extracted from a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Whole percent in `0..=100`.
    Percent(u8),
    Phase(Phase),
}

/// Parse one line of converter output.
///
/// A percentage takes precedence over the phase keyword when a line carries
/// both.
pub fn parse(line: &str) -> Option<Signal> {
    if let Some(percent) = parse_percent(line) {
        return Some(Signal::Percent(percent));
    }

    if line.to_lowercase().contains(EXTRACTION_KEYWORD) {
        return Some(Signal::Phase(Phase::Extracting));
    }

    None
}

/// Extract the first percentage in `line`, clamped to `0..=100` and
/// truncated to a whole number.
pub fn parse_percent(line: &str) -> Option<u8> {
    let captures = PERCENT_RE.captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(0.0, 100.0).trunc() as u8)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
