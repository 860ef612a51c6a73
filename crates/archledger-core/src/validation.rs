//! Document discovery and the end-to-end validation of one system.

use crate::baseline::{self, BaselineArtifact, MissingArtifact};
use crate::decision::DecisionIndex;
use crate::error::Result;
use crate::gate::{self, GateInput, GateThresholds, GateVerdict};
use crate::marker::{parse_markers_in, MarkerScan};
use crate::paths;
use crate::pillar::{score_review, PillarReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// SystemDocuments
// ---------------------------------------------------------------------------

/// The two documents markers are read from, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemDocuments {
    pub overview: Option<PathBuf>,
    pub review: Option<PathBuf>,
}

impl SystemDocuments {
    /// The solution overview is the baseline file when present, otherwise the
    /// newest overview whose name contains the system. The review is the
    /// newest `WA-REVIEW-*` for the system.
    pub fn discover(root: &Path, system: &str) -> Result<Self> {
        let baseline = BaselineArtifact::SolutionOverview.path(root, system);
        let overview = if baseline.is_file() {
            Some(baseline)
        } else {
            paths::latest_for_system(&paths::solution_overviews_dir(root), "", system)?
        };
        let review =
            paths::latest_for_system(&paths::reviews_dir(root), paths::REVIEW_PREFIX, system)?;
        tracing::debug!(?overview, ?review, system, "discovered system documents");
        Ok(Self { overview, review })
    }

    /// The documents `validate` reads: the baseline overview only, so a
    /// missing baseline is never papered over by an unrelated overview.
    pub fn for_gate(root: &Path, system: &str) -> Result<Self> {
        let baseline = BaselineArtifact::SolutionOverview.path(root, system);
        let overview = baseline.is_file().then_some(baseline);
        let review =
            paths::latest_for_system(&paths::reviews_dir(root), paths::REVIEW_PREFIX, system)?;
        Ok(Self { overview, review })
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        self.overview.iter().chain(self.review.iter()).cloned().collect()
    }

    fn read(path: Option<&PathBuf>) -> Result<String> {
        match path {
            Some(p) => Ok(std::fs::read_to_string(p)?),
            None => Ok(String::new()),
        }
    }

    pub fn overview_text(&self) -> Result<String> {
        Self::read(self.overview.as_ref())
    }

    pub fn review_text(&self) -> Result<String> {
        Self::read(self.review.as_ref())
    }

    /// Markers from the overview, then from the review.
    pub fn scan_markers(&self) -> Result<MarkerScan> {
        let overview = self.overview_text()?;
        let review = self.review_text()?;
        Ok(parse_markers_in(&[&overview, &review]))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub system: String,
    pub documents: SystemDocuments,
    pub pillars: PillarReport,
    pub markers: MarkerScan,
    pub thresholds: GateThresholds,
    pub verdict: GateVerdict,
}

/// Check baseline artifacts, score the newest review, trace markers against
/// the decision records, and evaluate the gate. Reads only; the caller owns
/// recording the result.
pub fn validate(root: &Path, system: &str, thresholds: GateThresholds) -> Result<Validation> {
    let mut missing = baseline::missing_baseline(root, system);
    let documents = SystemDocuments::for_gate(root, system)?;

    let pillars = match &documents.review {
        Some(path) => score_review(&std::fs::read_to_string(path)?),
        None => {
            missing.push(MissingArtifact::Review {
                system: system.to_string(),
                dir: paths::reviews_dir(root),
            });
            PillarReport::default()
        }
    };

    let markers = documents.scan_markers()?;
    let index = DecisionIndex::build(&paths::decisions_dir(root))?;

    let verdict = gate::evaluate(&GateInput {
        pillars: &pillars,
        markers: &markers,
        index: &index,
        thresholds,
        missing: &missing,
    });
    tracing::info!(system, result = %verdict.result, issues = verdict.issues.len(), "validated system");

    Ok(Validation {
        system: system.to_string(),
        documents,
        pillars,
        markers,
        thresholds,
        verdict,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
