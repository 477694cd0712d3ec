//! Lenient typed views over raw documents.
//!
//! Views never fail: a field with the wrong JSON type reads as absent. The
//! schema validator owns type errors; downstream stages only need to know
//! whether usable input exists.

use serde_json::Value;

fn opt_str(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

fn opt_str_list(value: &Value, name: &str) -> Option<Vec<String>> {
    let items = value.get(name)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptView {
    pub id: Option<String>,
    pub text: String,
    /// Recorded changed-slot set; `None` when the prompt predates recording.
    pub slots_changed: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioView {
    pub id: Option<String>,
    pub tokens: Vec<String>,
}

/// Stored analytics block. Scores keep the raw JSON number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyticsView {
    pub primary_structure: Option<String>,
    pub variation_slots: Option<Vec<String>>,
    pub slot_switch_density: Option<f64>,
    pub prompt_diversity_score: Option<f64>,
    pub scenario_coverage_score: Option<f64>,
    pub estimated_cognitive_load: Option<String>,
    pub intended_outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub id: Option<String>,
    pub title: Option<String>,
    pub primary_structure: Option<String>,
    pub variation_slots: Option<Vec<String>>,
    pub prompts: Vec<PromptView>,
    pub scenario: Option<ScenarioView>,
    pub analytics: Option<AnalyticsView>,
}

impl EntryView {
    pub fn from_value(doc: &Value) -> Self {
        let prompts = doc
            .get("prompts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|p| p.is_object())
                    .map(|p| PromptView {
                        id: opt_str(p, "id"),
                        text: opt_str(p, "text").unwrap_or_default(),
                        slots_changed: opt_str_list(p, "slotsChanged"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let scenario = doc
            .get("scenario")
            .filter(|s| s.is_object())
            .map(|s| ScenarioView {
                id: opt_str(s, "id"),
                tokens: opt_str_list(s, "tokens").unwrap_or_default(),
            });

        let analytics = doc
            .get("analytics")
            .filter(|a| a.is_object())
            .map(|a| AnalyticsView {
                primary_structure: opt_str(a, "primaryStructure"),
                variation_slots: opt_str_list(a, "variationSlots"),
                slot_switch_density: a.get("slotSwitchDensity").and_then(Value::as_f64),
                prompt_diversity_score: a.get("promptDiversityScore").and_then(Value::as_f64),
                scenario_coverage_score: a.get("scenarioCoverageScore").and_then(Value::as_f64),
                estimated_cognitive_load: opt_str(a, "estimatedCognitiveLoad"),
                intended_outcome: opt_str(a, "intendedOutcome"),
            });

        Self {
            id: opt_str(doc, "id"),
            title: opt_str(doc, "title"),
            primary_structure: opt_str(doc, "primaryStructure"),
            variation_slots: opt_str_list(doc, "variationSlots"),
            prompts,
            scenario,
            analytics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Explicit `null`: terminal page.
    Null,
    Url(String),
    /// Field absent.
    Missing,
    /// Present with a non-string, non-null value.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexView {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub item_count: usize,
    pub total: Option<u64>,
    pub next_page: NextPage,
}

impl IndexView {
    pub fn from_value(doc: &Value) -> Self {
        let next_page = match doc.get("nextPage") {
            None => NextPage::Missing,
            Some(Value::Null) => NextPage::Null,
            Some(Value::String(url)) => NextPage::Url(url.clone()),
            Some(_) => NextPage::Invalid,
        };
        Self {
            page: doc.get("page").and_then(Value::as_u64),
            page_size: doc.get("pageSize").and_then(Value::as_u64),
            item_count: doc
                .get("items")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
            total: doc.get("total").and_then(Value::as_u64),
            next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_view_tolerates_wrong_types() {
        let doc = json!({
            "id": "greetings",
            "title": 42,
            "variationSlots": ["subject", 3, "verb"],
            "prompts": [
                {"id": "p1", "text": "hola amigo", "slotsChanged": ["subject"]},
                "not an object",
                {"id": "p2", "text": "buenos dias"}
            ],
            "analytics": {"slotSwitchDensity": "high"}
        });
        let view = EntryView::from_value(&doc);
        assert_eq!(view.id.as_deref(), Some("greetings"));
        assert_eq!(view.title, None);
        assert_eq!(
            view.variation_slots,
            Some(vec!["subject".to_string(), "verb".to_string()])
        );
        assert_eq!(view.prompts.len(), 2);
        assert_eq!(view.prompts[1].slots_changed, None);
        assert_eq!(
            view.analytics.as_ref().and_then(|a| a.slot_switch_density),
            None
        );
    }

    #[test]
    fn index_view_distinguishes_null_and_missing_next_page() {
        let terminal = IndexView::from_value(&json!({"nextPage": null, "items": [1, 2]}));
        assert_eq!(terminal.next_page, NextPage::Null);
        assert_eq!(terminal.item_count, 2);

        let missing = IndexView::from_value(&json!({"items": []}));
        assert_eq!(missing.next_page, NextPage::Missing);

        let invalid = IndexView::from_value(&json!({"nextPage": 2}));
        assert_eq!(invalid.next_page, NextPage::Invalid);
    }
}
