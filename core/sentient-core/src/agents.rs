//! Sub-agent registry and result synthesizer.
//!
//! `agent-start` registers a live agent in `agent_history.json`; `agent-stop`
//! moves it to the capped history with findings parsed from its report. When
//! the last live agent stops, the retained history is rolled up into a
//! [`Synthesis`].

use std::collections::BTreeMap;

use chrono::Utc;
use sentient_hook_protocol::HookInput;
use serde::Serialize;

use crate::patterns::{
    RE_BULLET, RE_SECTION_CHANGES, RE_SECTION_ISSUES, RE_SECTION_RECOMMENDATIONS, RE_SEVERITY,
};
use crate::redact::{redact_secrets, truncate_chars};
use crate::store::StateStore;
use crate::types::{AgentHistory, AgentRecord, AgentStatus, Findings, SeverityCounts};

pub const DEFAULT_AGENT_TYPE: &str = "general-purpose";
pub const DEFAULT_MODEL: &str = "inherit";
const UNKNOWN_AGENT: &str = "unknown";

const MAX_FINDING_CHARS: usize = 200;
const MAX_SUMMARY_CHARS: usize = 500;
const MAX_SYNTHESIS_ISSUES: usize = 20;
const MAX_SYNTHESIS_RECOMMENDATIONS: usize = 10;

// MARK: - Register

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutput {
    pub tracked: bool,
    pub agent_id: String,
    pub agent_type: String,
    pub model: String,
    pub active_count: usize,
    pub parallel_hint: String,
}

/// Coordination hint from the live agent counts.
pub fn parallel_hint(active: &BTreeMap<String, AgentRecord>, current_type: &str) -> String {
    let total = active.len();
    let same_type = active
        .values()
        .filter(|record| record.agent_type == current_type)
        .count();

    if total > 5 {
        "High parallelism - consider batching results".to_string()
    } else if same_type > 1 {
        format!(
            "Multiple {} agents active - ensure non-overlapping scope",
            current_type
        )
    } else if total > 2 {
        "Moderate parallelism - synthesizer will merge results".to_string()
    } else {
        "Single agent tracking - proceed normally".to_string()
    }
}

pub fn register_agent(store: &StateStore, input: &HookInput) -> RegisterOutput {
    let agent_id = input
        .agent_id()
        .map(str::to_string)
        .unwrap_or_else(|| format!("agent_{}", ulid::Ulid::new()));

    let mut doc = store.get::<AgentHistory>();
    let mut tracked = true;
    let record = match doc.active.get(&agent_id).cloned() {
        Some(existing) => {
            tracing::debug!(agent = %agent_id, "Agent already registered");
            existing
        }
        None => {
            let record = AgentRecord {
                agent_id: agent_id.clone(),
                agent_type: non_empty(&input.subagent_type)
                    .unwrap_or(DEFAULT_AGENT_TYPE)
                    .to_string(),
                description: input.description.clone().unwrap_or_default(),
                model: non_empty(&input.model).unwrap_or(DEFAULT_MODEL).to_string(),
                status: AgentStatus::Active,
                started_at: Utc::now(),
                completed_at: None,
                summary: None,
                findings: None,
            };
            doc.active.insert(agent_id.clone(), record.clone());
            tracked = store.put(&mut doc);
            tracing::debug!(agent = %agent_id, kind = %record.agent_type, "Agent registered");
            record
        }
    };

    RegisterOutput {
        tracked,
        agent_id,
        parallel_hint: parallel_hint(&doc.active, &record.agent_type),
        agent_type: record.agent_type,
        model: record.model,
        active_count: doc.active.len(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// MARK: - Findings

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Issues,
    Recommendations,
    Changes,
}

/// Pulls severity markers and bulleted items out of a free-text agent report.
///
/// Non-bullet lines act as headers that switch the current section. A bullet
/// outside any section still counts as an issue when it carries a severity.
pub fn extract_findings(report: &str) -> Findings {
    let mut findings = Findings::default();
    let mut section = None;

    for line in report.lines() {
        let mut severities = SeverityCounts::default();
        for caps in RE_SEVERITY.captures_iter(line) {
            match &caps[1] {
                "0" => severities.s0 += 1,
                "1" => severities.s1 += 1,
                "2" => severities.s2 += 1,
                _ => severities.s3 += 1,
            }
        }
        findings.severity_counts.add(&severities);

        let Some(bullet) = RE_BULLET.captures(line) else {
            if RE_SECTION_ISSUES.is_match(line) {
                section = Some(Section::Issues);
            } else if RE_SECTION_RECOMMENDATIONS.is_match(line) {
                section = Some(Section::Recommendations);
            } else if RE_SECTION_CHANGES.is_match(line) {
                section = Some(Section::Changes);
            }
            continue;
        };

        let item = truncate_chars(&bullet[1], MAX_FINDING_CHARS).to_string();
        let target = match section {
            Some(Section::Issues) => &mut findings.issues,
            Some(Section::Recommendations) => &mut findings.recommendations,
            Some(Section::Changes) => &mut findings.changes,
            None if severities.total() > 0 => &mut findings.issues,
            None => continue,
        };
        target.push(item);
    }

    findings
}

// MARK: - Synthesize

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeTally {
    pub count: usize,
    pub findings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub total_agents: usize,
    pub severity_totals: SeverityCounts,
    pub all_issues: Vec<String>,
    pub all_recommendations: Vec<String>,
    pub by_agent_type: BTreeMap<String, TypeTally>,
}

fn push_unique(items: &mut Vec<String>, item: &str, max: usize) {
    if items.len() < max && !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

/// Rolls up every retained terminal record.
pub fn synthesize(history: &[AgentRecord]) -> Synthesis {
    let mut synthesis = Synthesis {
        total_agents: history.len(),
        ..Synthesis::default()
    };

    for record in history {
        let tally = synthesis
            .by_agent_type
            .entry(record.agent_type.clone())
            .or_default();
        tally.count += 1;

        let Some(findings) = &record.findings else {
            continue;
        };
        tally.findings += findings.issues.len();
        synthesis.severity_totals.add(&findings.severity_counts);
        for issue in &findings.issues {
            push_unique(&mut synthesis.all_issues, issue, MAX_SYNTHESIS_ISSUES);
        }
        for rec in &findings.recommendations {
            push_unique(
                &mut synthesis.all_recommendations,
                rec,
                MAX_SYNTHESIS_RECOMMENDATIONS,
            );
        }
    }

    synthesis
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutput {
    pub tracked: bool,
    pub agent_id: String,
    pub success: bool,
    pub active_remaining: usize,
    pub findings: Findings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Synthesis>,
}

/// Moves an agent from the live set into history. Unknown ids still get a record.
pub fn complete_agent(store: &StateStore, input: &HookInput) -> CompletionOutput {
    let agent_id = input.agent_id().unwrap_or(UNKNOWN_AGENT).to_string();
    let success = input.success.unwrap_or(true);
    let report = redact_secrets(input.result.as_deref().unwrap_or(""));
    let findings = extract_findings(&report);
    let now = Utc::now();

    let mut doc = store.get::<AgentHistory>();
    let mut record = doc.active.remove(&agent_id).unwrap_or_else(|| AgentRecord {
        agent_id: agent_id.clone(),
        agent_type: non_empty(&input.subagent_type)
            .unwrap_or(DEFAULT_AGENT_TYPE)
            .to_string(),
        description: input.description.clone().unwrap_or_default(),
        model: non_empty(&input.model).unwrap_or(DEFAULT_MODEL).to_string(),
        status: AgentStatus::Active,
        started_at: now,
        completed_at: None,
        summary: None,
        findings: None,
    });

    record.status = if success {
        AgentStatus::Completed
    } else {
        AgentStatus::Failed
    };
    record.completed_at = Some(now);
    record.summary = Some(report.trim())
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(s, MAX_SUMMARY_CHARS).to_string());
    record.findings = (!findings.is_empty()).then(|| findings.clone());

    doc.history.push(record);
    let tracked = store.put(&mut doc);
    if tracked {
        tracing::debug!(agent = %agent_id, success, remaining = doc.active.len(), "Agent completed");
    } else {
        tracing::warn!(agent = %agent_id, "Agent completion not persisted");
    }

    // Nothing to roll up if the history on disk was not updated.
    let synthesis = (tracked && doc.active.is_empty()).then(|| synthesize(&doc.history));

    CompletionOutput {
        tracked,
        agent_id,
        success,
        active_remaining: doc.active.len(),
        findings,
        synthesis,
    }
}
