//! Review gate evaluation.
//!
//! The gate combines pillar scores, decision markers and the decision index
//! into a single verdict. Every rule runs; the verdict passes only when no
//! rule produced an issue.

use crate::baseline::MissingArtifact;
use crate::decision::DecisionIndex;
use crate::marker::{DecisionMarker, MarkerScan};
use crate::pillar::{Pillar, PillarIssue, PillarReport, PillarScore};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// GateThresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateThresholds {
    #[serde(default = "default_max_needs_work")]
    pub max_needs_work: u32,
    #[serde(default)]
    pub allow_fail_pillars: bool,
}

fn default_max_needs_work() -> u32 {
    2
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            max_needs_work: default_max_needs_work(),
            allow_fail_pillars: false,
        }
    }
}

// ---------------------------------------------------------------------------
// GateIssue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateIssue {
    FailPillars { count: usize },
    TooManyNeedsWork { count: usize, max: u32 },
    MalformedMarker { line: String },
    MissingPillarSection { pillar: Pillar },
    MissingScore { pillar: Pillar },
    UnmappedMarker { category: String, key: String, summary: String },
    MissingArtifact { artifact: MissingArtifact },
}

impl From<&PillarIssue> for GateIssue {
    fn from(issue: &PillarIssue) -> Self {
        match *issue {
            PillarIssue::MissingSection(pillar) => GateIssue::MissingPillarSection { pillar },
            PillarIssue::MissingScore(pillar) => GateIssue::MissingScore { pillar },
        }
    }
}

impl From<&DecisionMarker> for GateIssue {
    fn from(marker: &DecisionMarker) -> Self {
        GateIssue::UnmappedMarker {
            category: marker.category.clone(),
            key: marker.key.clone(),
            summary: marker.summary.clone(),
        }
    }
}

impl fmt::Display for GateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateIssue::FailPillars { count } => write!(
                f,
                "Gate failure: {count} pillar(s) scored Fail. Use --allow-fail-pillars to override."
            ),
            GateIssue::TooManyNeedsWork { count, max } => write!(
                f,
                "Gate failure: Needs Work count ({count}) exceeds max ({max})."
            ),
            GateIssue::MalformedMarker { line } => {
                write!(f, "Invalid MAJOR_DECISION grammar: {line}")
            }
            GateIssue::MissingPillarSection { pillar } => {
                write!(f, "Missing WA pillar section: {pillar}")
            }
            GateIssue::MissingScore { pillar } => write!(f, "Missing score for pillar: {pillar}"),
            GateIssue::UnmappedMarker {
                category,
                key,
                summary,
            } => write!(
                f,
                "Missing ADR mapping for MAJOR_DECISION key '{key}' ({category} | {summary})."
            ),
            GateIssue::MissingArtifact { artifact } => write!(f, "{artifact}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GateVerdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateResult {
    Pass,
    Fail,
}

impl GateResult {
    pub fn as_str(self) -> &'static str {
        match self {
            GateResult::Pass => "pass",
            GateResult::Fail => "fail",
        }
    }
}

impl fmt::Display for GateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub result: GateResult,
    pub issues: Vec<GateIssue>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.result == GateResult::Pass
    }

    /// Issues rendered as the one-line messages stored in the manifest.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Everything the gate looks at. `missing` lists required documents the
/// caller could not find, in the order they should be reported.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub pillars: &'a PillarReport,
    pub markers: &'a MarkerScan,
    pub index: &'a DecisionIndex,
    pub thresholds: GateThresholds,
    pub missing: &'a [MissingArtifact],
}

/// Evaluate the gate.
///
/// Issue order is fixed: score thresholds, then malformed markers, then
/// pillar section/score gaps, then unmapped markers in discovery order, then
/// missing artifacts. Same input, same verdict.
pub fn evaluate(input: &GateInput<'_>) -> GateVerdict {
    let mut issues = Vec::new();

    let fail_count = input.pillars.count(PillarScore::Fail);
    if fail_count > 0 && !input.thresholds.allow_fail_pillars {
        issues.push(GateIssue::FailPillars { count: fail_count });
    }

    let needs_work = input.pillars.count(PillarScore::NeedsWork);
    if needs_work > input.thresholds.max_needs_work as usize {
        issues.push(GateIssue::TooManyNeedsWork {
            count: needs_work,
            max: input.thresholds.max_needs_work,
        });
    }

    issues.extend(input.markers.issues.iter().map(|i| GateIssue::MalformedMarker {
        line: i.line.clone(),
    }));
    issues.extend(input.pillars.issues.iter().map(GateIssue::from));

    // Every occurrence is checked, so a key repeated across documents is
    // reported once per occurrence.
    issues.extend(
        input
            .markers
            .markers
            .iter()
            .filter(|m| !input.index.contains(&m.key))
            .map(GateIssue::from),
    );

    issues.extend(input.missing.iter().map(|artifact| GateIssue::MissingArtifact {
        artifact: artifact.clone(),
    }));

    let result = if issues.is_empty() {
        GateResult::Pass
    } else {
        GateResult::Fail
    };
    GateVerdict { result, issues }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
