//! Decision trace report: every marker found in a system's documents paired
//! with the decision record it resolves to.

use crate::decision::DecisionIndex;
use crate::marker::{DecisionMarker, MarkerIssue, MarkerScan};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

pub const MISSING: &str = "MISSING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLink {
    pub marker: DecisionMarker,
    pub adr: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub system: String,
    pub date: String,
    pub sources: Vec<PathBuf>,
    pub links: Vec<TraceLink>,
    pub malformed: Vec<MarkerIssue>,
}

impl DecisionTrace {
    /// Resolve each marker of `scan` against `index`, keeping document order.
    /// Duplicate markers each get their own link.
    pub fn build(
        system: &str,
        date: &str,
        sources: Vec<PathBuf>,
        scan: &MarkerScan,
        index: &DecisionIndex,
    ) -> Self {
        let links = scan
            .markers
            .iter()
            .map(|marker| TraceLink {
                marker: marker.clone(),
                adr: index.get(&marker.key).map(PathBuf::from),
            })
            .collect();
        Self {
            system: system.to_string(),
            date: date.to_string(),
            sources,
            links,
            malformed: scan.issues.clone(),
        }
    }

    pub fn marker_count(&self) -> usize {
        self.links.len()
    }

    pub fn unmapped_count(&self) -> usize {
        self.links.iter().filter(|l| l.adr.is_none()).count()
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Decision Trace");
        let _ = writeln!(out, "System: {}", self.system);
        let _ = writeln!(out, "Date: {}", self.date);
        let _ = writeln!(out);
        if !self.sources.is_empty() {
            let _ = writeln!(out, "## Sources");
            for source in &self.sources {
                let _ = writeln!(out, "- `{}`", source.display());
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "## Decision to ADR Mapping");
        if self.links.is_empty() {
            let _ = writeln!(out, "No MAJOR_DECISION markers found.");
        }
        for link in &self.links {
            let adr = link
                .adr
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| MISSING.to_string());
            let _ = writeln!(out, "- Category: {}", link.marker.category);
            let _ = writeln!(out, "  Key: {}", link.marker.key);
            let _ = writeln!(out, "  Summary: {}", link.marker.summary);
            let _ = writeln!(out, "  ADR: {adr}");
        }
        if !self.malformed.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Malformed Markers");
            for issue in &self.malformed {
                let _ = writeln!(out, "- `{}`", issue.line);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::parse_markers_in;
    use std::path::Path;

    fn index() -> DecisionIndex {
        let mut index = DecisionIndex::new();
        index.register(
            "use-postgres",
            None,
            Path::new("docs/architecture/decisions/ADR-20260101-use-postgres.md"),
        );
        index
    }

    #[test]
    fn links_mapped_and_missing_markers() {
        let scan = parse_markers_in(&[
            "MAJOR_DECISION: data | use-postgres | Orders live in Postgres\n",
            "MAJOR_DECISION: data | adopt-dynamo | Sessions in DynamoDB\n",
        ]);
        let trace = DecisionTrace::build("payments", "2026-01-01", Vec::new(), &scan, &index());
        assert_eq!(trace.marker_count(), 2);
        assert_eq!(trace.unmapped_count(), 1);

        let md = trace.render_markdown();
        assert!(md.contains("  Key: use-postgres\n  Summary: Orders live in Postgres\n  ADR: docs/architecture/decisions/ADR-20260101-use-postgres.md\n"));
        assert!(md.contains("  Key: adopt-dynamo\n  Summary: Sessions in DynamoDB\n  ADR: MISSING\n"));
    }

    #[test]
    fn duplicates_are_listed_twice() {
        let scan = parse_markers_in(&[
            "MAJOR_DECISION: data | use-postgres | first\n",
            "MAJOR_DECISION: data | use-postgres | again\n",
        ]);
        let trace = DecisionTrace::build("payments", "2026-01-01", Vec::new(), &scan, &index());
        assert_eq!(trace.marker_count(), 2);
        assert_eq!(trace.render_markdown().matches("Key: use-postgres").count(), 2);
    }

    #[test]
    fn empty_trace_says_so() {
        let trace = DecisionTrace::build(
            "payments",
            "2026-01-01",
            Vec::new(),
            &MarkerScan::default(),
            &DecisionIndex::new(),
        );
        let md = trace.render_markdown();
        assert!(md.starts_with("# Decision Trace\nSystem: payments\nDate: 2026-01-01\n"));
        assert!(md.contains("No MAJOR_DECISION markers found."));
        assert!(!md.contains("## Sources"));
    }

    #[test]
    fn malformed_markers_get_their_own_section() {
        let scan = parse_markers_in(&["MAJOR_DECISION: only-one-field\n"]);
        let trace = DecisionTrace::build("payments", "2026-01-01", Vec::new(), &scan, &index());
        let md = trace.render_markdown();
        assert!(md.contains("## Malformed Markers\n- `MAJOR_DECISION: only-one-field`"));
    }
}
