//! Deterministic analytics: recompute every score from raw entry content
//! and hold the stored analytics block to it.

use crate::config::{AnalyticsMode, GateConfig};
use crate::tokens::{contains_run, tokenize};
use drillgate_graph::{ContentGraph, EntryView, Node, PromptView};
use drillgate_kernel::{FindingCode, FindingSink, Severity};
use serde::Serialize;
use std::collections::BTreeSet;

pub const SCORE_TOLERANCE: f64 = 1e-9;
pub const CLUSTER_SIZE: usize = 3;
pub const PLACEHOLDER_MARKERS: [&str; 3] = ["TODO", "FIXME", "TBD"];

pub const SLOT_TAGS: [&str; 10] = [
    "subject", "verb", "object", "tense", "time", "place", "quantity", "modifier", "register",
    "polarity",
];

pub fn is_slot_tag(tag: &str) -> bool {
    SLOT_TAGS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveLoad {
    Low,
    Medium,
    High,
}

impl CognitiveLoad {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Share of prompts that change two or more slots at once.
///
/// `None` when any prompt lacks a recorded changed-slot set.
pub fn slot_switch_density(prompts: &[PromptView]) -> Option<f64> {
    if prompts.is_empty() {
        return Some(0.0);
    }
    let mut switching = 0usize;
    for prompt in prompts {
        let changed: BTreeSet<&str> = prompt
            .slots_changed
            .as_ref()?
            .iter()
            .map(String::as_str)
            .collect();
        if changed.len() >= 2 {
            switching += 1;
        }
    }
    Some(switching as f64 / prompts.len() as f64)
}

/// `0.7 * type/token ratio + 0.3 * coefficient of variation of prompt
/// lengths`, capped at 1.
pub fn prompt_diversity_score(prompts: &[Vec<String>]) -> f64 {
    let total: usize = prompts.iter().map(Vec::len).sum();
    if prompts.is_empty() || total == 0 {
        return 0.0;
    }
    let distinct: BTreeSet<&String> = prompts.iter().flatten().collect();
    let ratio = distinct.len() as f64 / total as f64;

    let n = prompts.len() as f64;
    let mean = total as f64 / n;
    let variance = prompts
        .iter()
        .map(|p| {
            let d = p.len() as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let variation = variance.sqrt() / mean;

    (0.7 * ratio + 0.3 * variation).min(1.0)
}

/// Fraction of three-token dictionary clusters with at least one token used
/// by some prompt.
pub fn scenario_coverage_score(dictionary: &[String], prompts: &[Vec<String>]) -> f64 {
    if dictionary.is_empty() {
        return 0.0;
    }
    let entries: Vec<Vec<String>> = dictionary.iter().map(|t| tokenize(t)).collect();
    let clusters = entries.chunks(CLUSTER_SIZE);
    let total = clusters.len();
    let represented = clusters
        .filter(|cluster| {
            cluster
                .iter()
                .any(|entry| prompts.iter().any(|p| contains_run(p, entry)))
        })
        .count();
    represented as f64 / total as f64
}

pub fn average_prompt_tokens(prompts: &[Vec<String>]) -> f64 {
    if prompts.is_empty() {
        return 0.0;
    }
    prompts.iter().map(Vec::len).sum::<usize>() as f64 / prompts.len() as f64
}

/// Additive load score; see [`cognitive_load`] for the class cut-offs.
pub fn cognitive_load_score(slot_count: usize, density: f64, avg_prompt_tokens: f64) -> u32 {
    let slots = match slot_count {
        0..=2 => 1,
        3 => 2,
        _ => 3,
    };
    let switching = if density >= 0.5 {
        2
    } else if density >= 0.3 {
        1
    } else {
        0
    };
    let length = if avg_prompt_tokens >= 10.0 {
        2
    } else if avg_prompt_tokens >= 6.0 {
        1
    } else {
        0
    };
    slots + switching + length
}

pub fn cognitive_load(slot_count: usize, density: f64, avg_prompt_tokens: f64) -> CognitiveLoad {
    match cognitive_load_score(slot_count, density, avg_prompt_tokens) {
        0..=2 => CognitiveLoad::Low,
        3..=4 => CognitiveLoad::Medium,
        _ => CognitiveLoad::High,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDefect {
    Empty,
    Placeholder(&'static str),
}

pub fn outcome_defect(text: &str) -> Option<OutcomeDefect> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(OutcomeDefect::Empty);
    }
    let upper = trimmed.to_uppercase();
    PLACEHOLDER_MARKERS
        .iter()
        .copied()
        .find(|marker| upper.contains(*marker))
        .map(OutcomeDefect::Placeholder)
}

/// Everything recomputable from one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetrics {
    pub prompt_count: usize,
    pub slot_count: usize,
    pub average_prompt_tokens: f64,
    /// `None` when some prompt has no `slotsChanged`.
    pub slot_switch_density: Option<f64>,
    pub prompt_diversity_score: f64,
    /// `None` when the entry has no scenario.
    pub scenario_coverage_score: Option<f64>,
    pub estimated_cognitive_load: Option<CognitiveLoad>,
}

impl EntryMetrics {
    pub fn compute(entry: &EntryView) -> Self {
        let tokens: Vec<Vec<String>> = entry.prompts.iter().map(|p| tokenize(&p.text)).collect();
        let slot_count = entry
            .variation_slots
            .as_ref()
            .map_or(0, |slots| slots.iter().collect::<BTreeSet<_>>().len());
        let average = average_prompt_tokens(&tokens);
        let density = slot_switch_density(&entry.prompts);
        Self {
            prompt_count: entry.prompts.len(),
            slot_count,
            average_prompt_tokens: average,
            slot_switch_density: density,
            prompt_diversity_score: prompt_diversity_score(&tokens),
            scenario_coverage_score: entry
                .scenario
                .as_ref()
                .map(|s| scenario_coverage_score(&s.tokens, &tokens)),
            estimated_cognitive_load: density.map(|d| cognitive_load(slot_count, d, average)),
        }
    }
}

fn mismatch_severity(mode: AnalyticsMode) -> Severity {
    match mode {
        AnalyticsMode::Authoritative => Severity::Hard,
        AnalyticsMode::Legacy => Severity::Warning,
    }
}

fn slot_set(slots: &[String]) -> BTreeSet<&str> {
    slots.iter().map(String::as_str).collect()
}

fn check_slot_tags(node: &Node, entry: &EntryView, sink: &mut FindingSink) {
    for tag in entry.variation_slots.iter().flatten() {
        if !is_slot_tag(tag) {
            sink.report(
                FindingCode::InvalidSlotTag,
                &node.path,
                format!("variationSlots contains unknown slot tag {tag:?}"),
            );
        }
    }
    for (i, prompt) in entry.prompts.iter().enumerate() {
        for tag in prompt.slots_changed.iter().flatten() {
            if !is_slot_tag(tag) {
                sink.report(
                    FindingCode::InvalidSlotTag,
                    &node.path,
                    format!("prompts[{i}].slotsChanged contains unknown slot tag {tag:?}"),
                );
            }
        }
    }
}

/// Stored score, or `None` when absent or out of range (reported).
fn stored_score(
    node: &Node,
    name: &str,
    value: Option<f64>,
    sink: &mut FindingSink,
) -> Option<f64> {
    let score = value?;
    if !(score.is_finite() && (0.0..=1.0).contains(&score)) {
        sink.report(
            FindingCode::AnalyticsScoreOutOfRange,
            &node.path,
            format!("analytics.{name} is {score}, outside [0, 1]"),
        );
        return None;
    }
    Some(score)
}

fn compare_score(
    node: &Node,
    name: &str,
    stored: f64,
    recomputed: f64,
    severity: Severity,
    sink: &mut FindingSink,
) {
    if (stored - recomputed).abs() > SCORE_TOLERANCE {
        sink.report_with(
            FindingCode::AnalyticsScoreMismatch,
            severity,
            &node.path,
            format!("analytics.{name} is {stored}, recomputed {recomputed}"),
        );
    }
}

pub fn check_entry(node: &Node, config: &GateConfig, sink: &mut FindingSink) {
    let entry = EntryView::from_value(&node.doc);
    check_slot_tags(node, &entry, sink);

    let Some(stored) = entry.analytics.as_ref() else {
        return;
    };

    if let (Some(top), Some(block)) = (&entry.primary_structure, &stored.primary_structure)
        && top != block
    {
        sink.report(
            FindingCode::AnalyticsFieldMismatch,
            &node.path,
            format!("analytics.primaryStructure {block:?} differs from primaryStructure {top:?}"),
        );
    }
    if let (Some(top), Some(block)) = (&entry.variation_slots, &stored.variation_slots)
        && slot_set(top) != slot_set(block)
    {
        sink.report(
            FindingCode::AnalyticsFieldMismatch,
            &node.path,
            format!("analytics.variationSlots {block:?} differs from variationSlots {top:?}"),
        );
    }

    if let Some(raw) = &stored.estimated_cognitive_load
        && CognitiveLoad::parse(raw).is_none()
    {
        sink.report(
            FindingCode::InvalidCognitiveLoad,
            &node.path,
            format!("analytics.estimatedCognitiveLoad {raw:?} is not low, medium or high"),
        );
    }

    if let Some(outcome) = &stored.intended_outcome {
        match outcome_defect(outcome) {
            Some(OutcomeDefect::Empty) => sink.report(
                FindingCode::EmptyOutcome,
                &node.path,
                "analytics.intendedOutcome is empty",
            ),
            Some(OutcomeDefect::Placeholder(marker)) => sink.report(
                FindingCode::PlaceholderMarker,
                &node.path,
                format!(
                    "analytics.intendedOutcome contains placeholder marker {marker}: \
                     {outcome:?}"
                ),
            ),
            None => {}
        }
    }

    let metrics = EntryMetrics::compute(&entry);
    let severity = mismatch_severity(config.analytics_mode);

    let density = stored_score(node, "slotSwitchDensity", stored.slot_switch_density, sink);
    let diversity = stored_score(node, "promptDiversityScore", stored.prompt_diversity_score, sink);
    let coverage = stored_score(
        node,
        "scenarioCoverageScore",
        stored.scenario_coverage_score,
        sink,
    );

    match (density, metrics.slot_switch_density) {
        (Some(s), Some(r)) => compare_score(node, "slotSwitchDensity", s, r, severity, sink),
        (Some(_), None) => sink.report(
            FindingCode::AnalyticsUnverifiable,
            &node.path,
            "analytics.slotSwitchDensity cannot be recomputed: some prompts have no slotsChanged",
        ),
        _ => {}
    }
    if let Some(s) = diversity {
        compare_score(
            node,
            "promptDiversityScore",
            s,
            metrics.prompt_diversity_score,
            severity,
            sink,
        );
    }
    match (coverage, metrics.scenario_coverage_score) {
        (Some(s), Some(r)) => compare_score(node, "scenarioCoverageScore", s, r, severity, sink),
        (Some(s), None) if s != 0.0 => sink.report(
            FindingCode::AnalyticsUnverifiable,
            &node.path,
            format!("analytics.scenarioCoverageScore is {s} but the entry has no scenario"),
        ),
        _ => {}
    }

    if let Some(stored_load) = stored
        .estimated_cognitive_load
        .as_deref()
        .and_then(CognitiveLoad::parse)
    {
        match metrics.estimated_cognitive_load {
            Some(load) if load != stored_load => sink.report_with(
                FindingCode::CognitiveLoadMismatch,
                severity,
                &node.path,
                format!(
                    "analytics.estimatedCognitiveLoad is {}, recomputed {}",
                    stored_load.as_str(),
                    load.as_str()
                ),
            ),
            Some(_) => {}
            None => sink.report(
                FindingCode::AnalyticsUnverifiable,
                &node.path,
                "analytics.estimatedCognitiveLoad cannot be recomputed without slot-switch density",
            ),
        }
    }

    if metrics.prompt_count > 0 && metrics.prompt_diversity_score < config.min_prompt_diversity {
        sink.report(
            FindingCode::LowPromptDiversity,
            &node.path,
            format!(
                "prompt diversity {} is below the recommended {}",
                metrics.prompt_diversity_score, config.min_prompt_diversity
            ),
        );
    }
    if let Some(score) = metrics.scenario_coverage_score
        && entry.scenario.as_ref().is_some_and(|s| !s.tokens.is_empty())
        && score < config.min_scenario_coverage
    {
        sink.report(
            FindingCode::LowScenarioCoverage,
            &node.path,
            format!(
                "scenario coverage {score} is below the recommended {}",
                config.min_scenario_coverage
            ),
        );
    }
}

pub fn check_graph(graph: &ContentGraph, config: &GateConfig, sink: &mut FindingSink) {
    for node in graph.entries() {
        check_entry(node, config, sink);
    }
}
