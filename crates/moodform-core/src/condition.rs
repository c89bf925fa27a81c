#![forbid(unsafe_code)]

//! Conditional visibility: rules, full recomputation, and clear-on-hide.
//!
//! Visibility is always recomputed from scratch over the full rule set,
//! never patched incrementally. A full recompute is cheap at form scale and
//! removes the entire class of stale-flag bugs that incremental updates
//! invite.
//!
//! # Invariants
//!
//! 1. `recompute_all` is a pure function of current field values: two calls
//!    without an intervening mutation yield identical sets.
//! 2. After `clear_hidden_transitions`, every field of a block that just
//!    became hidden resolves to its empty value.
//! 3. A hidden→visible transition never populates values.
//! 4. A trigger field inside a hidden block still drives rules that depend
//!    on it: rules read raw resolved values, not visibility.

use std::collections::HashMap;

use crate::field::{FieldStore, FieldValue};
use crate::registry::FieldRegistry;

/// Visibility of one conditional block depends on one trigger field.
///
/// The block is visible iff the trigger's resolved selection equals
/// `required_value` exactly. Only a single-choice selection participates;
/// other field kinds never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRule {
    /// Block whose visibility this rule decides.
    pub block_id: String,
    /// Field whose value is inspected.
    pub trigger_field: String,
    /// Exact value required for the block to be visible.
    pub required_value: String,
}

impl ConditionRule {
    /// Convenience constructor.
    #[must_use]
    pub fn new(
        block_id: impl Into<String>,
        trigger_field: impl Into<String>,
        required_value: impl Into<String>,
    ) -> Self {
        Self {
            block_id: block_id.into(),
            trigger_field: trigger_field.into(),
            required_value: required_value.into(),
        }
    }
}

/// A group of fields whose visibility is decided together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalBlock {
    /// Block identifier referenced by rules.
    pub id: String,
    /// Member field names.
    pub fields: Vec<String>,
}

impl ConditionalBlock {
    /// Convenience constructor.
    #[must_use]
    pub fn new<I, S>(id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Computed visibility of all blocks at one point in time.
///
/// Unknown block ids default to visible: a block with no rule and no entry
/// is always shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilitySet {
    map: HashMap<String, bool>,
}

impl VisibilitySet {
    /// Visibility of a block; unknown ids are visible.
    #[must_use]
    pub fn is_visible(&self, block_id: &str) -> bool {
        self.map.get(block_id).copied().unwrap_or(true)
    }

    /// Number of blocks with a recorded entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no block has a recorded entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn set(&mut self, block_id: String, visible: bool) {
        self.map.insert(block_id, visible);
    }
}

/// The form's conditional structure: block membership plus rules.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    blocks: Vec<ConditionalBlock>,
    rules: Vec<ConditionRule>,
    containing: HashMap<String, Vec<usize>>,
}

impl ConditionSet {
    /// Build the condition set and the field→block containment index.
    #[must_use]
    pub fn new(blocks: Vec<ConditionalBlock>, rules: Vec<ConditionRule>) -> Self {
        let mut containing: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, block) in blocks.iter().enumerate() {
            for field in &block.fields {
                containing.entry(field.clone()).or_default().push(i);
            }
        }
        Self {
            blocks,
            rules,
            containing,
        }
    }

    /// Declared blocks.
    #[must_use]
    pub fn blocks(&self) -> &[ConditionalBlock] {
        &self.blocks
    }

    /// Whether the named field triggers at least one rule.
    #[must_use]
    pub fn is_trigger(&self, field: &str) -> bool {
        self.rules.iter().any(|r| r.trigger_field == field)
    }

    /// Recompute visibility of every block from current field values.
    ///
    /// Blocks with no rule are visible. Rules read the trigger's raw resolved
    /// value regardless of where the trigger itself lives.
    #[must_use]
    pub fn recompute_all(&self, registry: &FieldRegistry, store: &dyn FieldStore) -> VisibilitySet {
        let mut vis = VisibilitySet::default();
        for block in &self.blocks {
            vis.set(block.id.clone(), true);
        }
        for rule in &self.rules {
            let selected = match registry.resolve(store, &rule.trigger_field) {
                Ok(FieldValue::Choice(Some(v))) => Some(v),
                // Unselected radios and non-choice kinds never match.
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(
                        block = %rule.block_id,
                        trigger = %rule.trigger_field,
                        error = %e,
                        "condition trigger unresolved, hiding block"
                    );
                    None
                }
            };
            let visible = selected.as_deref() == Some(rule.required_value.as_str());
            vis.set(rule.block_id.clone(), visible);
        }
        vis
    }

    /// Reset every field of each block that just transitioned visible→hidden.
    ///
    /// Must run before the next persistence or progress pass so stale hidden
    /// answers are never persisted, counted, or summarized. Returns the names
    /// that were cleared.
    pub fn clear_hidden_transitions(
        &self,
        prev: &VisibilitySet,
        next: &VisibilitySet,
        registry: &FieldRegistry,
        store: &mut dyn FieldStore,
    ) -> Vec<String> {
        let mut cleared = Vec::new();
        for block in &self.blocks {
            if prev.is_visible(&block.id) && !next.is_visible(&block.id) {
                for field in &block.fields {
                    match registry.clear(store, field) {
                        Ok(()) => cleared.push(field.clone()),
                        Err(e) => {
                            tracing::warn!(block = %block.id, field = %field, error = %e,
                                "clear-on-hide skipped field outside schema");
                        }
                    }
                }
                tracing::debug!(block = %block.id, fields = block.fields.len(), "block hidden, members cleared");
            }
        }
        cleared
    }

    /// Whether a field is currently visible.
    ///
    /// A field is visible iff every block containing it is visible; fields in
    /// no block are always visible.
    #[must_use]
    pub fn field_visible(&self, vis: &VisibilitySet, field: &str) -> bool {
        match self.containing.get(field) {
            None => true,
            Some(blocks) => blocks.iter().all(|&i| vis.is_visible(&self.blocks[i].id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{InputElement, InputModality, MemoryFieldStore};

    fn setup() -> (FieldRegistry, ConditionSet, MemoryFieldStore) {
        let elements = vec![
            InputElement::new("mood", InputModality::Radio),
            InputElement::new("reason", InputModality::Text),
            InputElement::new("coping", InputModality::Checkbox),
        ];
        let registry = FieldRegistry::classify(&elements, "_mf_").unwrap();
        let conditions = ConditionSet::new(
            vec![ConditionalBlock::new("bad-mood", ["reason", "coping"])],
            vec![ConditionRule::new("bad-mood", "mood", "bad")],
        );
        (registry, conditions, MemoryFieldStore::new())
    }

    #[test]
    fn block_hidden_until_trigger_matches() {
        let (registry, conditions, mut store) = setup();
        let vis = conditions.recompute_all(&registry, &store);
        assert!(!vis.is_visible("bad-mood"));

        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        let vis = conditions.recompute_all(&registry, &store);
        assert!(vis.is_visible("bad-mood"));
    }

    #[test]
    fn comparison_is_exact() {
        let (registry, conditions, mut store) = setup();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("Bad".into())))
            .unwrap();
        let vis = conditions.recompute_all(&registry, &store);
        assert!(!vis.is_visible("bad-mood"));
    }

    #[test]
    fn recompute_is_deterministic() {
        let (registry, conditions, mut store) = setup();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        let a = conditions.recompute_all(&registry, &store);
        let b = conditions.recompute_all(&registry, &store);
        assert_eq!(a, b);
    }

    #[test]
    fn hide_transition_clears_members() {
        let (registry, conditions, mut store) = setup();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        registry
            .apply(&mut store, "reason", FieldValue::Text("tired".into()))
            .unwrap();
        registry
            .apply(&mut store, "coping", FieldValue::selections(["walks"]))
            .unwrap();
        let prev = conditions.recompute_all(&registry, &store);

        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("good".into())))
            .unwrap();
        let next = conditions.recompute_all(&registry, &store);
        let cleared =
            conditions.clear_hidden_transitions(&prev, &next, &registry, &mut store);

        assert_eq!(cleared, vec!["reason".to_string(), "coping".to_string()]);
        assert!(registry.resolve(&store, "reason").unwrap().is_empty());
        assert!(registry.resolve(&store, "coping").unwrap().is_empty());
    }

    #[test]
    fn becoming_visible_populates_nothing() {
        let (registry, conditions, mut store) = setup();
        let prev = conditions.recompute_all(&registry, &store);
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();
        let next = conditions.recompute_all(&registry, &store);
        let cleared =
            conditions.clear_hidden_transitions(&prev, &next, &registry, &mut store);
        assert!(cleared.is_empty());
        assert!(registry.resolve(&store, "reason").unwrap().is_empty());
    }

    #[test]
    fn unruled_block_is_always_visible() {
        let registry = FieldRegistry::classify(
            &[InputElement::new("notes", InputModality::Text)],
            "_mf_",
        )
        .unwrap();
        let conditions = ConditionSet::new(
            vec![ConditionalBlock::new("always", ["notes"])],
            vec![],
        );
        let store = MemoryFieldStore::new();
        let vis = conditions.recompute_all(&registry, &store);
        assert!(vis.is_visible("always"));
        assert!(conditions.field_visible(&vis, "notes"));
    }

    #[test]
    fn field_outside_any_block_is_visible() {
        let (_, conditions, _) = setup();
        let vis = VisibilitySet::default();
        assert!(conditions.field_visible(&vis, "mood"));
    }

    #[test]
    fn hidden_trigger_still_drives_dependents() {
        // "mood" sits inside a block hidden by "participate"; its value must
        // still decide the "bad-mood" block.
        let elements = vec![
            InputElement::new("participate", InputModality::Radio),
            InputElement::new("mood", InputModality::Radio),
            InputElement::new("reason", InputModality::Text),
        ];
        let registry = FieldRegistry::classify(&elements, "_mf_").unwrap();
        let conditions = ConditionSet::new(
            vec![
                ConditionalBlock::new("mood-section", ["mood"]),
                ConditionalBlock::new("bad-mood", ["reason"]),
            ],
            vec![
                ConditionRule::new("mood-section", "participate", "yes"),
                ConditionRule::new("bad-mood", "mood", "bad"),
            ],
        );
        let mut store = MemoryFieldStore::new();
        registry
            .apply(&mut store, "mood", FieldValue::Choice(Some("bad".into())))
            .unwrap();

        let vis = conditions.recompute_all(&registry, &store);
        assert!(!vis.is_visible("mood-section"));
        assert!(vis.is_visible("bad-mood"));
    }
}
