use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// BaselineArtifact
// ---------------------------------------------------------------------------

/// Supporting documents every tracked system must carry before its review
/// can pass. Declaration order is the order issues are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineArtifact {
    SolutionOverview,
    ThreatModelLite,
    RunbookBaseline,
    DiagramContext,
    DiagramContainers,
    DiagramDataflow,
    DiagramNetwork,
}

impl BaselineArtifact {
    pub fn all() -> &'static [BaselineArtifact] {
        &[
            BaselineArtifact::SolutionOverview,
            BaselineArtifact::ThreatModelLite,
            BaselineArtifact::RunbookBaseline,
            BaselineArtifact::DiagramContext,
            BaselineArtifact::DiagramContainers,
            BaselineArtifact::DiagramDataflow,
            BaselineArtifact::DiagramNetwork,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BaselineArtifact::SolutionOverview => "solution_overview",
            BaselineArtifact::ThreatModelLite => "threat_model_lite",
            BaselineArtifact::RunbookBaseline => "runbook_baseline",
            BaselineArtifact::DiagramContext => "diagram_context",
            BaselineArtifact::DiagramContainers => "diagram_containers",
            BaselineArtifact::DiagramDataflow => "diagram_dataflow",
            BaselineArtifact::DiagramNetwork => "diagram_network",
        }
    }

    pub fn path(self, root: &Path, system: &str) -> PathBuf {
        let (dir, file) = match self {
            BaselineArtifact::SolutionOverview => {
                (paths::SOLUTION_OVERVIEWS_DIR, format!("{system}.md"))
            }
            BaselineArtifact::ThreatModelLite => {
                (paths::THREAT_MODELS_DIR, format!("{system}-threat-model-lite.md"))
            }
            BaselineArtifact::RunbookBaseline => {
                (paths::RUNBOOKS_DIR, format!("{system}-runbook-baseline.md"))
            }
            BaselineArtifact::DiagramContext => (paths::DIAGRAMS_DIR, format!("{system}-context.md")),
            BaselineArtifact::DiagramContainers => {
                (paths::DIAGRAMS_DIR, format!("{system}-containers.md"))
            }
            BaselineArtifact::DiagramDataflow => {
                (paths::DIAGRAMS_DIR, format!("{system}-dataflow.md"))
            }
            BaselineArtifact::DiagramNetwork => (paths::DIAGRAMS_DIR, format!("{system}-network.md")),
        };
        root.join(dir).join(file)
    }

    /// Key under `artifacts.baseline_doc_pack.diagrams`, for diagram artifacts.
    pub fn diagram_key(self) -> Option<&'static str> {
        match self {
            BaselineArtifact::DiagramContext => Some("context"),
            BaselineArtifact::DiagramContainers => Some("containers"),
            BaselineArtifact::DiagramDataflow => Some("dataflow"),
            BaselineArtifact::DiagramNetwork => Some("network"),
            _ => None,
        }
    }
}

impl fmt::Display for BaselineArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MissingArtifact
// ---------------------------------------------------------------------------

/// A required document that was not found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingArtifact {
    Baseline {
        artifact: BaselineArtifact,
        path: PathBuf,
    },
    Review {
        system: String,
        dir: PathBuf,
    },
}

impl fmt::Display for MissingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingArtifact::Baseline { artifact, path } => write!(
                f,
                "Missing required baseline artifact ({artifact}): {}. \
                 Run `archledger init --system <system>` to create it.",
                path.display()
            ),
            MissingArtifact::Review { system, dir } => write!(
                f,
                "Missing WA review for system '{system}' in {}",
                dir.display()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// BaselinePack
// ---------------------------------------------------------------------------

/// Paths of the baseline documents as recorded under
/// `artifacts.baseline_doc_pack` in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselinePack {
    pub solution_overview: String,
    pub threat_model_lite: String,
    pub runbook_baseline: String,
    pub diagrams: BTreeMap<String, String>,
}

impl BaselinePack {
    pub fn for_system(root: &Path, system: &str) -> Self {
        let path = |a: BaselineArtifact| a.path(root, system).display().to_string();
        let diagrams = BaselineArtifact::all()
            .iter()
            .filter_map(|&a| a.diagram_key().map(|key| (key.to_string(), path(a))))
            .collect();
        Self {
            solution_overview: path(BaselineArtifact::SolutionOverview),
            threat_model_lite: path(BaselineArtifact::ThreatModelLite),
            runbook_baseline: path(BaselineArtifact::RunbookBaseline),
            diagrams,
        }
    }
}

/// Baseline artifacts of `system` absent from disk, in declared order.
pub fn missing_baseline(root: &Path, system: &str) -> Vec<MissingArtifact> {
    BaselineArtifact::all()
        .iter()
        .map(|&artifact| (artifact, artifact.path(root, system)))
        .filter(|(_, path)| !path.exists())
        .map(|(artifact, path)| MissingArtifact::Baseline { artifact, path })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
