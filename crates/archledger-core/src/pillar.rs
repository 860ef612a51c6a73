use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Pillar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pillar {
    #[serde(rename = "Operational Excellence")]
    OperationalExcellence,
    Security,
    Reliability,
    #[serde(rename = "Performance Efficiency")]
    PerformanceEfficiency,
    #[serde(rename = "Cost Optimization")]
    CostOptimization,
    Sustainability,
}

impl Pillar {
    pub fn all() -> &'static [Pillar] {
        &[
            Pillar::OperationalExcellence,
            Pillar::Security,
            Pillar::Reliability,
            Pillar::PerformanceEfficiency,
            Pillar::CostOptimization,
            Pillar::Sustainability,
        ]
    }

    /// Heading text used in review documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Pillar::OperationalExcellence => "Operational Excellence",
            Pillar::Security => "Security",
            Pillar::Reliability => "Reliability",
            Pillar::PerformanceEfficiency => "Performance Efficiency",
            Pillar::CostOptimization => "Cost Optimization",
            Pillar::Sustainability => "Sustainability",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PillarScore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PillarScore {
    Pass,
    #[serde(rename = "Needs Work")]
    NeedsWork,
    Fail,
}

impl PillarScore {
    pub fn as_str(self) -> &'static str {
        match self {
            PillarScore::Pass => "Pass",
            PillarScore::NeedsWork => "Needs Work",
            PillarScore::Fail => "Fail",
        }
    }
}

impl fmt::Display for PillarScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PillarScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pass" => Ok(PillarScore::Pass),
            "Needs Work" => Ok(PillarScore::NeedsWork),
            "Fail" => Ok(PillarScore::Fail),
            other => Err(format!("unknown pillar score: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// PillarIssue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pillar", rename_all = "snake_case")]
pub enum PillarIssue {
    MissingSection(Pillar),
    MissingScore(Pillar),
}

impl fmt::Display for PillarIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PillarIssue::MissingSection(p) => write!(f, "Missing WA pillar section: {p}"),
            PillarIssue::MissingScore(p) => write!(f, "Missing score for pillar: {p}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PillarReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarReport {
    pub scores: BTreeMap<Pillar, PillarScore>,
    pub issues: Vec<PillarIssue>,
}

impl PillarReport {
    pub fn score(&self, pillar: Pillar) -> Option<PillarScore> {
        self.scores.get(&pillar).copied()
    }

    pub fn count(&self, score: PillarScore) -> usize {
        self.scores.values().filter(|s| **s == score).count()
    }
}

// ---------------------------------------------------------------------------
// Line grammars
// ---------------------------------------------------------------------------

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static SCORE_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^(?P<hashes>#{1,6})\s+(?P<title>.*?)\s*$").unwrap())
}

fn score_re() -> &'static Regex {
    SCORE_RE.get_or_init(|| Regex::new(r"^Score:\s*(?P<value>Pass|Needs Work|Fail)\s*$").unwrap())
}

/// Level and title of a markdown ATX heading line.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let caps = heading_re().captures(line)?;
    let level = caps.name("hashes")?.as_str().len();
    let title = caps.name("title")?.as_str();
    Some((level, title))
}

/// Value of a `Score: <Pass|Needs Work|Fail>` line.
pub fn parse_score_line(line: &str) -> Option<PillarScore> {
    let caps = score_re().captures(line)?;
    caps["value"].parse().ok()
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

const SECTION_LEVEL: usize = 2;

/// Score every pillar of a review document.
///
/// Each pillar owns the lines between its `## <Pillar>` heading and the next
/// heading of level 1 or 2, so a score line never leaks into a neighbouring
/// section. Missing sections and missing scores are collected, never fatal.
pub fn score_review(text: &str) -> PillarReport {
    let lines: Vec<&str> = text.lines().collect();
    let mut report = PillarReport::default();

    for &pillar in Pillar::all() {
        let Some(start) = lines.iter().position(|l| {
            parse_heading(l) == Some((SECTION_LEVEL, pillar.as_str()))
        }) else {
            report.issues.push(PillarIssue::MissingSection(pillar));
            continue;
        };

        let window = lines[start + 1..]
            .iter()
            .take_while(|l| !matches!(parse_heading(l), Some((level, _)) if level <= SECTION_LEVEL));

        let mut found = None;
        for line in window {
            if let Some(score) = parse_score_line(line) {
                found = Some(score);
                break;
            }
        }
        match found {
            Some(score) => {
                report.scores.insert(pillar, score);
            }
            None => report.issues.push(PillarIssue::MissingScore(pillar)),
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
