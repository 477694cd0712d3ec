//! Required-field contracts per `(schemaVersion, kind)`.
//!
//! Each known version owns a fixed rule table. Version 1 is frozen: later
//! versions may add rules and tighten optional ones, never drop or retype
//! an existing rule. [`builtin_compatibility_violations`] checks that over
//! the shipped tables.
//!
//! Rule paths are dotted; a `[]` suffix applies the rest of the path to
//! every element of an array (`prompts[].text`). Only the leaf of a path is
//! reported missing; absent parents are either optional or reported by
//! their own rule.

use drillgate_graph::{ContentGraph, DocKind, Node, SchemaVersion};
use drillgate_kernel::{FindingCode, FindingSink};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Bool,
    Array,
    Object,
    StringOrNull,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::StringOrNull => "string or null",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::StringOrNull => value.is_string() || value.is_null(),
        }
    }
}

/// JSON type name of a value, numbers collapsed.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub path: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

const fn req(path: &'static str, ty: FieldType) -> Rule {
    Rule {
        path,
        ty,
        required: true,
    }
}

const fn opt(path: &'static str, ty: FieldType) -> Rule {
    Rule {
        path,
        ty,
        required: false,
    }
}

use FieldType as T;

const V1_CATALOG: &[Rule] = &[
    req("schemaVersion", T::Integer),
    req("kind", T::String),
    req("workspace", T::String),
    req("language", T::String),
    req("sections", T::Array),
    req("sections[].id", T::String),
    req("sections[].kind", T::String),
    req("sections[].title", T::String),
    opt("sections[].itemsUrl", T::String),
];

const V1_INDEX: &[Rule] = &[
    req("schemaVersion", T::Integer),
    req("kind", T::String),
    req("pageSize", T::Integer),
    req("page", T::Integer),
    req("items", T::Array),
    req("items[].id", T::String),
    req("items[].kind", T::String),
    req("items[].title", T::String),
    req("items[].entryUrl", T::String),
    opt("total", T::Integer),
    req("nextPage", T::StringOrNull),
];

const V1_ENTRY: &[Rule] = &[
    req("schemaVersion", T::Integer),
    req("id", T::String),
    req("kind", T::String),
    req("title", T::String),
    req("level", T::String),
    req("estimatedMinutes", T::Integer),
    req("primaryStructure", T::String),
    req("variationSlots", T::Array),
    req("variationSlots[]", T::String),
    req("analytics", T::Object),
    req("analytics.primaryStructure", T::String),
    req("analytics.variationSlots", T::Array),
    req("analytics.slotSwitchDensity", T::Number),
    req("analytics.promptDiversityScore", T::Number),
    opt("analytics.scenarioCoverageScore", T::Number),
    req("analytics.estimatedCognitiveLoad", T::String),
    req("analytics.intendedOutcome", T::String),
];

const V1_PROMPTS: &[Rule] = &[
    req("prompts", T::Array),
    req("prompts[].id", T::String),
    req("prompts[].text", T::String),
    opt("prompts[].slotsChanged", T::Array),
    opt("prompts[].slotsChanged[]", T::String),
];

const V1_SCENARIO: &[Rule] = &[
    opt("scenario", T::Object),
    req("scenario.id", T::String),
    req("scenario.tokens", T::Array),
    req("scenario.tokens[]", T::String),
];

const V1_PACK: &[Rule] = &[req("outline", T::Array), req("outline[]", T::String)];

const V1_EXAM: &[Rule] = &[req("passingScore", T::Number)];

const V1_TRACK: &[Rule] = &[
    req("sessionPlan", T::Array),
    req("sessionPlan[].kind", T::String),
    req("sessionPlan[].itemIds", T::Array),
    req("sessionPlan[].itemIds[]", T::String),
];

const V2_CATALOG: &[Rule] = &[req("locale", T::String)];

const V2_ENTRY: &[Rule] = &[
    req("revision", T::Integer),
    req("analytics.scenarioCoverageScore", T::Number),
];

/// One version's contract for one document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub version: u64,
    pub kind: DocKind,
    pub rules: Vec<Rule>,
}

impl Policy {
    pub fn rule(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.path == path)
    }

    /// Later rules with the same path replace earlier ones.
    fn layer(&mut self, rules: &[Rule]) {
        for rule in rules {
            match self.rules.iter_mut().find(|r| r.path == rule.path) {
                Some(existing) => *existing = *rule,
                None => self.rules.push(*rule),
            }
        }
    }
}

fn v1_layers(kind: DocKind) -> Vec<&'static [Rule]> {
    match kind {
        DocKind::Catalog => vec![V1_CATALOG],
        DocKind::Index => vec![V1_INDEX],
        DocKind::Pack => vec![V1_ENTRY, V1_PACK, V1_PROMPTS, V1_SCENARIO],
        DocKind::Drill => vec![V1_ENTRY, V1_PROMPTS, V1_SCENARIO],
        DocKind::Exam => vec![V1_ENTRY, V1_PROMPTS, V1_EXAM],
        DocKind::Track => vec![V1_ENTRY, V1_TRACK],
    }
}

fn v2_layers(kind: DocKind) -> Vec<&'static [Rule]> {
    match kind {
        DocKind::Catalog => vec![V2_CATALOG],
        DocKind::Index => vec![],
        DocKind::Pack | DocKind::Drill | DocKind::Exam | DocKind::Track => vec![V2_ENTRY],
    }
}

pub fn policy_for(version: &SchemaVersion, kind: DocKind) -> Option<Policy> {
    let mut layers = match version {
        SchemaVersion::V1 => v1_layers(kind),
        SchemaVersion::V2 => {
            let mut layers = v1_layers(kind);
            layers.extend(v2_layers(kind));
            layers
        }
        SchemaVersion::Unknown(_) | SchemaVersion::Missing => return None,
    };
    let mut policy = Policy {
        version: version.number()?,
        kind,
        rules: Vec::new(),
    };
    for layer in layers.drain(..) {
        policy.layer(layer);
    }
    Some(policy)
}

/// Every way `newer` breaks a rule `older` guarantees.
pub fn check_policy_compatibility(older: &Policy, newer: &Policy) -> Vec<String> {
    let mut out = Vec::new();
    for rule in &older.rules {
        match newer.rule(rule.path) {
            None => out.push(format!(
                "v{} {} drops `{}` present in v{}",
                newer.version, newer.kind, rule.path, older.version
            )),
            Some(next) if next.ty != rule.ty => out.push(format!(
                "v{} {} retypes `{}` from {} to {}",
                newer.version,
                newer.kind,
                rule.path,
                rule.ty.as_str(),
                next.ty.as_str()
            )),
            Some(next) if rule.required && !next.required => out.push(format!(
                "v{} {} makes required `{}` optional",
                newer.version, newer.kind, rule.path
            )),
            Some(_) => {}
        }
    }
    out
}

/// Compatibility problems between consecutive built-in versions.
pub fn builtin_compatibility_violations() -> Vec<(DocKind, String)> {
    let kinds = [
        DocKind::Catalog,
        DocKind::Index,
        DocKind::Pack,
        DocKind::Drill,
        DocKind::Exam,
        DocKind::Track,
    ];
    let mut out = Vec::new();
    for kind in kinds {
        if let (Some(v1), Some(v2)) = (
            policy_for(&SchemaVersion::V1, kind),
            policy_for(&SchemaVersion::V2, kind),
        ) {
            out.extend(
                check_policy_compatibility(&v1, &v2)
                    .into_iter()
                    .map(|msg| (kind, msg)),
            );
        }
    }
    out
}

enum Segment<'a> {
    Field(&'a str),
    Each,
}

fn segments(path: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    for part in path.split('.') {
        let (name, each) = match part.strip_suffix("[]") {
            Some(name) => (name, true),
            None => (part, false),
        };
        out.push(Segment::Field(name));
        if each {
            out.push(Segment::Each);
        }
    }
    out
}

fn check_rule(
    value: &Value,
    rule: &Rule,
    segs: &[Segment<'_>],
    location: String,
    node: &Node,
    sink: &mut FindingSink,
) {
    let Some((head, rest)) = segs.split_first() else {
        if !rule.ty.matches(value) {
            sink.report(
                FindingCode::FieldTypeMismatch,
                &node.path,
                format!(
                    "`{location}` must be {}, found {}",
                    rule.ty.as_str(),
                    json_type_name(value)
                ),
            );
        }
        return;
    };
    match head {
        Segment::Field(name) => {
            let Some(obj) = value.as_object() else { return };
            let child_location = if location.is_empty() {
                (*name).to_string()
            } else {
                format!("{location}.{name}")
            };
            match obj.get(*name) {
                Some(child) => check_rule(child, rule, rest, child_location, node, sink),
                None if rest.is_empty() && rule.required => sink.report(
                    FindingCode::MissingRequiredField,
                    &node.path,
                    format!(
                        "v{} {} requires `{child_location}`",
                        node.version, node.kind
                    ),
                ),
                None => {}
            }
        }
        Segment::Each => {
            let Some(items) = value.as_array() else { return };
            for (i, item) in items.iter().enumerate() {
                check_rule(item, rule, rest, format!("{location}[{i}]"), node, sink);
            }
        }
    }
}

fn check_ranges(node: &Node, sink: &mut FindingSink) {
    let doc = &node.doc;
    match node.kind {
        DocKind::Index => {
            for name in ["page", "pageSize"] {
                if let Some(n) = doc.get(name).and_then(Value::as_i64)
                    && n < 1
                {
                    sink.report(
                        FindingCode::ValueOutOfRange,
                        &node.path,
                        format!("`{name}` must be at least 1, found {n}"),
                    );
                }
            }
        }
        DocKind::Exam => {
            if let Some(score) = doc.get("passingScore").and_then(Value::as_f64)
                && !(0.0..=1.0).contains(&score)
            {
                sink.report(
                    FindingCode::ValueOutOfRange,
                    &node.path,
                    format!("`passingScore` must be in [0, 1], found {score}"),
                );
            }
        }
        _ => {}
    }
    if node.kind.is_entry()
        && let Some(minutes) = doc.get("estimatedMinutes").and_then(Value::as_i64)
        && minutes < 0
    {
        sink.report(
            FindingCode::ValueOutOfRange,
            &node.path,
            format!("`estimatedMinutes` must not be negative, found {minutes}"),
        );
    }
}

/// Validate one node against its declared version's contract.
pub fn check_node(node: &Node, sink: &mut FindingSink) {
    let policy = match &node.version {
        SchemaVersion::Missing => {
            sink.report(
                FindingCode::MissingRequiredField,
                &node.path,
                "document declares no `schemaVersion`",
            );
            return;
        }
        SchemaVersion::Unknown(raw) => {
            sink.report(
                FindingCode::UnknownSchemaVersion,
                &node.path,
                format!("unsupported schemaVersion {raw}"),
            );
            return;
        }
        known => match policy_for(known, node.kind) {
            Some(policy) => policy,
            None => return,
        },
    };

    for rule in &policy.rules {
        check_rule(
            &node.doc,
            rule,
            &segments(rule.path),
            String::new(),
            node,
            sink,
        );
    }
    check_ranges(node, sink);

    if node.version == SchemaVersion::V1
        && node.kind.is_entry()
        && let Some(analytics) = node.doc.get("analytics").and_then(Value::as_object)
        && !analytics.contains_key("scenarioCoverageScore")
    {
        sink.report(
            FindingCode::LegacyAnalyticsFieldMissing,
            &node.path,
            "v1 analytics block has no `scenarioCoverageScore`",
        );
    }
}

pub fn check_graph(graph: &ContentGraph, sink: &mut FindingSink) {
    for node in graph.nodes() {
        check_node(node, sink);
    }
}
