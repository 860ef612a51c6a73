use crate::baseline::BaselineArtifact;
use crate::config::Config;
use crate::error::{LedgerError, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    SolutionOverview,
    ThreatModelLite,
    RunbookBaseline,
    WaReview,
    AdrShort,
    AdrFull,
}

impl Template {
    /// File name looked up in an override directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Template::SolutionOverview => "solution-overview.md",
            Template::ThreatModelLite => "threat-model-lite.md",
            Template::RunbookBaseline => "runbook-baseline.md",
            Template::WaReview => "well-architected-review.md",
            Template::AdrShort => "adr-short.md",
            Template::AdrFull => "adr-full.md",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            Template::SolutionOverview => SOLUTION_OVERVIEW,
            Template::ThreatModelLite => THREAT_MODEL_LITE,
            Template::RunbookBaseline => RUNBOOK_BASELINE,
            Template::WaReview => WA_REVIEW,
            Template::AdrShort => ADR_SHORT,
            Template::AdrFull => ADR_FULL,
        }
    }

    /// Template backing a baseline artifact. Diagrams have none.
    pub fn for_baseline(artifact: BaselineArtifact) -> Option<Template> {
        match artifact {
            BaselineArtifact::SolutionOverview => Some(Template::SolutionOverview),
            BaselineArtifact::ThreatModelLite => Some(Template::ThreatModelLite),
            BaselineArtifact::RunbookBaseline => Some(Template::RunbookBaseline),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateSet
// ---------------------------------------------------------------------------

/// Resolves templates from an optional override directory, falling back to
/// the built-in text when no directory is configured.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    override_dir: Option<PathBuf>,
}

impl TemplateSet {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn from_config(root: &Path, config: &Config) -> Self {
        Self::new(config.templates_dir(root))
    }

    /// Template text. With an override directory configured, every template
    /// must exist there; a missing file is an error, not a silent fallback.
    pub fn load(&self, template: Template) -> Result<Cow<'static, str>> {
        let Some(dir) = &self.override_dir else {
            return Ok(Cow::Borrowed(template.builtin()));
        };
        let path = dir.join(template.file_name());
        if !path.is_file() {
            return Err(LedgerError::TemplateNotFound(path));
        }
        tracing::debug!(path = %path.display(), "using template override");
        Ok(Cow::Owned(std::fs::read_to_string(&path)?))
    }

    pub fn render(&self, template: Template, vars: &[(&str, &str)]) -> Result<String> {
        Ok(render(&self.load(template)?, vars))
    }
}

/// Replace every `{{key}}` with its value. Unknown placeholders are left as is.
pub fn render(text: &str, vars: &[(&str, &str)]) -> String {
    let mut out = text.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Quoted YAML block-list items, one per line, indented for front matter.
pub fn yaml_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - \"{}\"", item.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn diagram_placeholder(artifact: BaselineArtifact) -> Option<&'static str> {
    match artifact {
        BaselineArtifact::DiagramContext => Some(
            "# Diagram Placeholder: Context\n\nDefine system context, external actors, and trust boundaries.\n",
        ),
        BaselineArtifact::DiagramContainers => Some(
            "# Diagram Placeholder: Containers\n\nDefine runtime containers/services and key interactions.\n",
        ),
        BaselineArtifact::DiagramDataflow => Some(
            "# Diagram Placeholder: Data Flow\n\nDefine primary data paths, stores, and transformation boundaries.\n",
        ),
        BaselineArtifact::DiagramNetwork => Some(
            "# Diagram Placeholder: Network\n\nDefine VPC/VNet topology, subnets, routing, and ingress/egress controls.\n",
        ),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Built-in templates
// ---------------------------------------------------------------------------

const SOLUTION_OVERVIEW: &str = r#"# Solution Overview: {{system}}

- Date: {{date}}
- Owners: {{owners}}

## Context

Business goals, users, and the problem this system solves.

## Scope

In scope and explicitly out of scope.

## Architecture Summary

Main components, runtime platform, and integration points.
See the diagrams under `docs/architecture/diagrams/`.

## Major Decisions

List each significant decision on its own line using the form
`MAJOR_DECISION: <category> | <decision-key> | <one-line summary>`.
Every decision key must match the slug or `decision_id` of an ADR in
`docs/architecture/decisions/`.

## Risks and Open Items

Known risks, assumptions, and follow-ups.
"#;

const THREAT_MODEL_LITE: &str = r#"# Threat Model (Lite): {{system}}

- Date: {{date}}
- Owners: {{owners}}

## Assets

Data and capabilities worth protecting.

## Trust Boundaries

Where data or control crosses between trust zones.

## Threats

| Threat | Component | Likelihood | Impact | Mitigation |
| --- | --- | --- | --- | --- |
| TBD | TBD | TBD | TBD | TBD |

## Residual Risk

Accepted risks and their owners.
"#;

const RUNBOOK_BASELINE: &str = r#"# Runbook Baseline: {{system}}

- Date: {{date}}
- Owners: {{owners}}

## Service Overview

What runs where, and who is on call.

## Health Checks

Dashboards, alarms, and the signals that indicate healthy operation.

## Common Procedures

Deploy, roll back, scale, and rotate credentials.

## Incident Response

Escalation path and first-response steps.
"#;

const WA_REVIEW: &str = r#"# Well-Architected Review: {{system}}

- Date: {{date}}
- Reviewers: {{reviewers}}

Replace each score placeholder with exactly one of `Pass`, `Needs Work` or `Fail`.

## Operational Excellence

Findings:

Score: <Pass | Needs Work | Fail>

## Security

Findings:

Score: <Pass | Needs Work | Fail>

## Reliability

Findings:

Score: <Pass | Needs Work | Fail>

## Performance Efficiency

Findings:

Score: <Pass | Needs Work | Fail>

## Cost Optimization

Findings:

Score: <Pass | Needs Work | Fail>

## Sustainability

Findings:

Score: <Pass | Needs Work | Fail>

## Decisions Referenced

List `MAJOR_DECISION:` lines here for decisions raised during the review.
"#;

const ADR_SHORT: &str = r#"---
decision_id: "{{decision_id}}"
system: "{{system}}"
category: "{{category}}"
status: "{{status}}"
date: "{{date}}"
owners:
{{owners}}
tags:
{{tags}}
supersedes: "{{supersedes}}"
superseded_by: "{{superseded_by}}"
---

# {{title}}

## Context

Describe business and technical context.

## Decision

Describe the selected decision clearly.

## Consequences

- Consequence 1
- Consequence 2
"#;

const ADR_FULL: &str = r#"---
decision_id: "{{decision_id}}"
system: "{{system}}"
category: "{{category}}"
status: "{{status}}"
date: "{{date}}"
owners:
{{owners}}
tags:
{{tags}}
supersedes: "{{supersedes}}"
superseded_by: "{{superseded_by}}"
---

# {{title}}

## Problem Statement

Problem statement.

## Background

Background.

## Constraints

- Constraint 1
- Constraint 2

## Options Considered

- Option A
- Option B

## Decision

Selected option.

### Rationale

- Rationale 1
- Rationale 2

## Consequences

### Positive

- Positive impact 1
- Positive impact 2

### Negative

- Negative impact 1
- Negative impact 2

## Security and Compliance

Security/compliance implications.

## Cost

Cost implications.

## Operations

Operational implications.

## References

- Reference 1
- Reference 2
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::parse_markers;
    use crate::pillar::{score_review, PillarIssue};
    use tempfile::TempDir;

    #[test]
    fn render_replaces_known_placeholders() {
        let out = render("{{system}} on {{date}} by {{who}}", &[("system", "payments"), ("date", "2026-01-01")]);
        assert_eq!(out, "payments on 2026-01-01 by {{who}}");
    }

    #[test]
    fn builtin_templates_carry_no_live_markers() {
        for template in [
            Template::SolutionOverview,
            Template::ThreatModelLite,
            Template::RunbookBaseline,
            Template::WaReview,
            Template::AdrShort,
            Template::AdrFull,
        ] {
            let scan = parse_markers(template.builtin());
            assert!(scan.markers.is_empty(), "{template:?}");
            assert!(scan.issues.is_empty(), "{template:?}");
        }
    }

    #[test]
    fn fresh_review_has_every_section_but_no_scores() {
        let report = score_review(WA_REVIEW);
        assert_eq!(report.issues.len(), 6);
        assert!(report.issues.iter().all(|i| matches!(i, PillarIssue::MissingScore(_))));
    }

    #[test]
    fn adr_front_matter_lists() {
        let owners = yaml_list(&["alice".to_string(), "bob".to_string()]);
        let out = render(ADR_SHORT, &[("decision_id", "use-postgres"), ("owners", owners.as_str())]);
        assert!(out.contains("decision_id: \"use-postgres\""));
        assert!(out.contains("owners:\n  - \"alice\"\n  - \"bob\"\n"));
    }

    #[test]
    fn override_dir_replaces_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("runbook-baseline.md"), "# Ops {{system}}\n").unwrap();
        let set = TemplateSet::new(Some(dir.path().to_path_buf()));
        let out = set.render(Template::RunbookBaseline, &[("system", "payments")]).unwrap();
        assert_eq!(out, "# Ops payments\n");
    }

    #[test]
    fn override_dir_missing_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        let set = TemplateSet::new(Some(dir.path().to_path_buf()));
        assert!(matches!(
            set.load(Template::WaReview),
            Err(LedgerError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn diagrams_have_placeholders_not_templates() {
        for artifact in BaselineArtifact::all() {
            assert_eq!(
                Template::for_baseline(*artifact).is_some(),
                diagram_placeholder(*artifact).is_none()
            );
        }
    }
}
