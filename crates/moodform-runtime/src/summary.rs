#![forbid(unsafe_code)]

//! Grouped pre-submission summary.
//!
//! The taxonomy is fixed configuration: an ordered list of topics, each with
//! an ordered list of field names. The rendered summary keeps that order,
//! includes only non-empty currently-visible fields, and drops topics that
//! end up with no entries.

use moodform_core::condition::{ConditionSet, VisibilitySet};
use moodform_core::field::FieldStore;
use moodform_core::registry::FieldRegistry;

/// One topic in the fixed summary taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTopic {
    /// Topic label shown as the group heading.
    pub label: String,
    /// Field names in presentation order.
    pub fields: Vec<String>,
}

impl SummaryTopic {
    /// Convenience constructor.
    #[must_use]
    pub fn new<I, S>(label: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// The ordered topic list consumed at summary time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryTaxonomy {
    /// Topics in declared order.
    pub topics: Vec<SummaryTopic>,
}

impl SummaryTaxonomy {
    /// Build a taxonomy from topics.
    #[must_use]
    pub fn new(topics: Vec<SummaryTopic>) -> Self {
        Self { topics }
    }
}

/// One rendered field entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Field name.
    pub field: String,
    /// Rendered value (selections joined with `", "`).
    pub value: String,
}

/// One rendered topic group; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryGroup {
    /// Topic label.
    pub label: String,
    /// Entries in taxonomy order.
    pub entries: Vec<SummaryEntry>,
}

/// Render the grouped summary of non-empty, visible field values.
#[must_use]
pub fn build(
    taxonomy: &SummaryTaxonomy,
    registry: &FieldRegistry,
    store: &dyn FieldStore,
    conditions: &ConditionSet,
    vis: &VisibilitySet,
) -> Vec<SummaryGroup> {
    let mut groups = Vec::new();
    for topic in &taxonomy.topics {
        let mut entries = Vec::new();
        for field in &topic.fields {
            if !conditions.field_visible(vis, field) {
                continue;
            }
            let value = match registry.resolve(store, field) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(field = %field, error = %e, "summary skipped field outside schema");
                    continue;
                }
            };
            if value.is_empty() {
                continue;
            }
            entries.push(SummaryEntry {
                field: field.clone(),
                value: value.render(),
            });
        }
        if !entries.is_empty() {
            groups.push(SummaryGroup {
                label: topic.label.clone(),
                entries,
            });
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodform_core::condition::{ConditionRule, ConditionalBlock};
    use moodform_core::field::{FieldValue, InputElement, InputModality, MemoryFieldStore};

    fn setup() -> (FieldRegistry, ConditionSet, MemoryFieldStore, SummaryTaxonomy) {
        let elements = vec![
            InputElement::new("mood", InputModality::Radio),
            InputElement::new("reason", InputModality::Text),
            InputElement::new("triggers", InputModality::Checkbox),
            InputElement::new("notes", InputModality::Text),
        ];
        let registry = FieldRegistry::classify(&elements, "_mf_").unwrap();
        let conditions = ConditionSet::new(
            vec![ConditionalBlock::new("bad-mood", ["reason"])],
            vec![ConditionRule::new("bad-mood", "mood", "bad")],
        );
        let taxonomy = SummaryTaxonomy::new(vec![
            SummaryTopic::new("Mood", ["mood", "reason"]),
            SummaryTopic::new("Context", ["triggers"]),
            SummaryTopic::new("Anything else", ["notes"]),
        ]);
        (registry, conditions, MemoryFieldStore::new(), taxonomy)
    }

    #[test]
    fn topics_without_entries_are_omitted() {
        let (registry, conditions, mut store, taxonomy) = setup();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("good".into())))
            .unwrap();
        let vis = conditions.recompute_all(&registry, &store);
        let groups = build(&taxonomy, &registry, &store, &conditions, &vis);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Mood");
        assert_eq!(groups[0].entries.len(), 1);
    }

    #[test]
    fn declared_order_is_preserved() {
        let (registry, conditions, mut store, taxonomy) = setup();
        registry
            .apply(&mut store, "notes", FieldValue::Text("ok".into()))
            .unwrap();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        registry
            .apply(&mut store, "reason", FieldValue::Text("tired".into()))
            .unwrap();
        registry
            .apply(&mut store, "triggers", FieldValue::selections(["work"]))
            .unwrap();
        let vis = conditions.recompute_all(&registry, &store);
        let groups = build(&taxonomy, &registry, &store, &conditions, &vis);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["Mood", "Context", "Anything else"]);
        let mood_fields: Vec<&str> =
            groups[0].entries.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(mood_fields, ["mood", "reason"]);
    }

    #[test]
    fn hidden_fields_never_appear() {
        let (registry, conditions, mut store, taxonomy) = setup();
        // Stale value in a hidden block (clear-on-hide has not run).
        registry
            .apply(&mut store, "reason", FieldValue::Text("stale".into()))
            .unwrap();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("good".into())))
            .unwrap();
        let vis = conditions.recompute_all(&registry, &store);
        let groups = build(&taxonomy, &registry, &store, &conditions, &vis);
        assert!(groups[0].entries.iter().all(|e| e.field != "reason"));
    }
}
