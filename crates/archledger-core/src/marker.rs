//! `MAJOR_DECISION:` marker extraction.
//!
//! A marker is one line of the form
//! `MAJOR_DECISION: <category> | <key> | <summary>`, with surrounding
//! whitespace ignored. Lines that start with the prefix but do not fit the
//! grammar are surfaced as [`MarkerIssue`]s instead of being dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const MARKER_PREFIX: &str = "MAJOR_DECISION:";

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(
            r"^MAJOR_DECISION:\s*(?P<category>[^|\s][^|]*?)\s*\|\s*(?P<key>[^|\s][^|]*?)\s*\|\s*(?P<summary>\S.*?)\s*$",
        )
        .unwrap()
    })
}

// ---------------------------------------------------------------------------
// DecisionMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMarker {
    pub category: String,
    pub key: String,
    pub summary: String,
}

impl fmt::Display for DecisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.category, self.key, self.summary)
    }
}

// ---------------------------------------------------------------------------
// MarkerIssue
// ---------------------------------------------------------------------------

/// A line carrying the marker prefix that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerIssue {
    pub line: String,
}

impl fmt::Display for MarkerIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid MAJOR_DECISION grammar: {}", self.line)
    }
}

// ---------------------------------------------------------------------------
// MarkerScan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerScan {
    pub markers: Vec<DecisionMarker>,
    pub issues: Vec<MarkerIssue>,
}

impl MarkerScan {
    fn extend(&mut self, other: MarkerScan) {
        self.markers.extend(other.markers);
        self.issues.extend(other.issues);
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Match a single line against the marker grammar. The line is trimmed first.
pub fn parse_marker_line(line: &str) -> Option<DecisionMarker> {
    let caps = marker_re().captures(line.trim())?;
    Some(DecisionMarker {
        category: caps["category"].trim().to_string(),
        key: caps["key"].trim().to_string(),
        summary: caps["summary"].trim().to_string(),
    })
}

/// Scan `text` line by line, keeping markers in document order.
pub fn parse_markers(text: &str) -> MarkerScan {
    let mut scan = MarkerScan::default();
    for raw in text.lines() {
        let line = raw.trim();
        if !line.starts_with(MARKER_PREFIX) {
            continue;
        }
        match parse_marker_line(line) {
            Some(marker) => scan.markers.push(marker),
            None => scan.issues.push(MarkerIssue {
                line: line.to_string(),
            }),
        }
    }
    scan
}

/// Scan several documents in the given order and concatenate the results.
pub fn parse_markers_in(texts: &[&str]) -> MarkerScan {
    let mut scan = MarkerScan::default();
    for text in texts {
        scan.extend(parse_markers(text));
    }
    scan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
