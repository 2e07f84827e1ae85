//! Structured rolling summary of a conversation
//!
//! Every category is always present after deserialization: input goes through
//! [`SummaryStore::from_value`], which repairs wrong container types to empty
//! containers instead of failing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const EMPTY_TEXT: &str = "No summary content available";

/// The seven summary categories, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryCategory {
    CoreFacts,
    UserPreferences,
    DecisionsMade,
    Constraints,
    OpenQuestions,
    Entities,
    Unlabeled,
}

impl SummaryCategory {
    pub const ALL: [SummaryCategory; 7] = [
        SummaryCategory::CoreFacts,
        SummaryCategory::UserPreferences,
        SummaryCategory::DecisionsMade,
        SummaryCategory::Constraints,
        SummaryCategory::OpenQuestions,
        SummaryCategory::Entities,
        SummaryCategory::Unlabeled,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SummaryCategory::CoreFacts => "core_facts",
            SummaryCategory::UserPreferences => "user_preferences",
            SummaryCategory::DecisionsMade => "decisions_made",
            SummaryCategory::Constraints => "constraints",
            SummaryCategory::OpenQuestions => "open_questions",
            SummaryCategory::Entities => "entities",
            SummaryCategory::Unlabeled => "unlabeled",
        }
    }

    /// Section heading used when rendering for context injection
    pub fn title(&self) -> &'static str {
        match self {
            SummaryCategory::CoreFacts => "Core Facts",
            SummaryCategory::UserPreferences => "User Preferences",
            SummaryCategory::DecisionsMade => "Decisions Made",
            SummaryCategory::Constraints => "Constraints",
            SummaryCategory::OpenQuestions => "Open Questions",
            SummaryCategory::Entities => "Key Entities",
            SummaryCategory::Unlabeled => "Other Notes",
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, SummaryCategory::Entities)
    }
}

impl fmt::Display for SummaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Category-partitioned summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct SummaryStore {
    pub core_facts: Vec<String>,
    pub user_preferences: Vec<String>,
    pub decisions_made: Vec<String>,
    pub constraints: Vec<String>,
    pub open_questions: Vec<String>,
    /// Entity name to free-form description
    pub entities: IndexMap<String, String>,
    pub unlabeled: Vec<String>,
}

impl SummaryStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a store from arbitrary JSON, repairing it.
    ///
    /// Missing or wrongly-typed categories become empty containers; non-string
    /// list items and entity descriptions are rendered as JSON text; nulls are
    /// dropped. A non-object value yields an empty store.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::empty();
        };

        let mut list = |category: SummaryCategory| -> Vec<String> {
            match map.remove(category.key()) {
                Some(Value::Array(items)) => items.into_iter().filter_map(value_to_text).collect(),
                _ => Vec::new(),
            }
        };

        let core_facts = list(SummaryCategory::CoreFacts);
        let user_preferences = list(SummaryCategory::UserPreferences);
        let decisions_made = list(SummaryCategory::DecisionsMade);
        let constraints = list(SummaryCategory::Constraints);
        let open_questions = list(SummaryCategory::OpenQuestions);
        let unlabeled = list(SummaryCategory::Unlabeled);

        let entities = match map.remove(SummaryCategory::Entities.key()) {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(name, info)| value_to_text(info).map(|info| (name, info)))
                .collect(),
            _ => IndexMap::new(),
        };

        Self {
            core_facts,
            user_preferences,
            decisions_made,
            constraints,
            open_questions,
            entities,
            unlabeled,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Items of a list category; `None` for entities
    pub fn list(&self, category: SummaryCategory) -> Option<&Vec<String>> {
        match category {
            SummaryCategory::CoreFacts => Some(&self.core_facts),
            SummaryCategory::UserPreferences => Some(&self.user_preferences),
            SummaryCategory::DecisionsMade => Some(&self.decisions_made),
            SummaryCategory::Constraints => Some(&self.constraints),
            SummaryCategory::OpenQuestions => Some(&self.open_questions),
            SummaryCategory::Unlabeled => Some(&self.unlabeled),
            SummaryCategory::Entities => None,
        }
    }

    pub fn list_mut(&mut self, category: SummaryCategory) -> Option<&mut Vec<String>> {
        match category {
            SummaryCategory::CoreFacts => Some(&mut self.core_facts),
            SummaryCategory::UserPreferences => Some(&mut self.user_preferences),
            SummaryCategory::DecisionsMade => Some(&mut self.decisions_made),
            SummaryCategory::Constraints => Some(&mut self.constraints),
            SummaryCategory::OpenQuestions => Some(&mut self.open_questions),
            SummaryCategory::Unlabeled => Some(&mut self.unlabeled),
            SummaryCategory::Entities => None,
        }
    }

    pub fn category_len(&self, category: SummaryCategory) -> usize {
        match self.list(category) {
            Some(items) => items.len(),
            None => self.entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        SummaryCategory::ALL
            .iter()
            .all(|category| self.category_len(*category) == 0)
    }

    pub fn stats(&self) -> SummaryStats {
        SummaryStats {
            core_facts: self.core_facts.len(),
            user_preferences: self.user_preferences.len(),
            decisions_made: self.decisions_made.len(),
            constraints: self.constraints.len(),
            open_questions: self.open_questions.len(),
            entities: self.entities.len(),
            unlabeled: self.unlabeled.len(),
            total_items: SummaryCategory::ALL
                .iter()
                .map(|category| self.category_len(*category))
                .sum(),
        }
    }

    /// Render every category as titled bullet sections
    pub fn to_text(&self) -> String {
        render(self, &SummaryCategory::ALL)
    }
}

impl From<Value> for SummaryStore {
    fn from(value: Value) -> Self {
        SummaryStore::from_value(value)
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Render the given categories of `store`; empty sections are skipped
pub(crate) fn render(store: &SummaryStore, categories: &[SummaryCategory]) -> String {
    let mut sections = Vec::new();

    for category in categories {
        let bullets: Vec<String> = match store.list(*category) {
            Some(items) => items.iter().map(|item| format!("  • {}", item)).collect(),
            None => store
                .entities
                .iter()
                .map(|(name, info)| format!("  • {}: {}", name, info))
                .collect(),
        };
        if bullets.is_empty() {
            continue;
        }
        sections.push(format!("{}:\n{}", category.title(), bullets.join("\n")));
    }

    if sections.is_empty() {
        EMPTY_TEXT.to_string()
    } else {
        sections.join("\n\n")
    }
}

/// Per-category item counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub core_facts: usize,
    pub user_preferences: usize,
    pub decisions_made: usize,
    pub constraints: usize,
    pub open_questions: usize,
    pub entities: usize,
    pub unlabeled: usize,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_store_has_every_key() {
        let value = SummaryStore::empty().to_value();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 7);
        for category in SummaryCategory::ALL {
            assert!(object.contains_key(category.key()), "missing {}", category);
        }
    }

    #[test]
    fn test_repair_wrong_types() {
        let store = SummaryStore::from_value(json!({
            "core_facts": "not a list",
            "user_preferences": ["likes tea", 3, null],
            "entities": ["not", "a", "map"],
            "decisions_made": {"nope": 1},
            "extra": [1, 2]
        }));
        assert!(store.core_facts.is_empty());
        assert_eq!(store.user_preferences, vec!["likes tea", "3"]);
        assert!(store.entities.is_empty());
        assert!(store.decisions_made.is_empty());
        assert!(store.unlabeled.is_empty());
    }

    #[test]
    fn test_deserialize_repairs() {
        let store: SummaryStore =
            serde_json::from_str(r#"{"core_facts": ["a"], "entities": {"Bob": "engineer"}}"#)
                .unwrap();
        assert_eq!(store.core_facts, vec!["a"]);
        assert_eq!(store.entities.get("Bob").map(String::as_str), Some("engineer"));

        let store: SummaryStore = serde_json::from_str("[1, 2, 3]").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_entity_order() {
        let store = SummaryStore::from_value(json!({
            "entities": {"Zed": "z", "Alice": "a", "Mia": "m"}
        }));
        let back: SummaryStore = serde_json::from_value(store.to_value()).unwrap();
        assert_eq!(back, store);
        let names: Vec<&str> = back.entities.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zed", "Alice", "Mia"]);
    }

    #[test]
    fn test_render_text() {
        assert_eq!(SummaryStore::empty().to_text(), EMPTY_TEXT);

        let store = SummaryStore::from_value(json!({
            "core_facts": ["Budget is 10k"],
            "entities": {"Acme": "client"}
        }));
        assert_eq!(
            store.to_text(),
            "Core Facts:\n  • Budget is 10k\n\nKey Entities:\n  • Acme: client"
        );
    }

    #[test]
    fn test_stats() {
        let store = SummaryStore::from_value(json!({
            "core_facts": ["a", "b"],
            "open_questions": ["q"],
            "entities": {"x": "y"},
            "unlabeled": ["n"]
        }));
        let stats = store.stats();
        assert_eq!(stats.core_facts, 2);
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.total_items, 5);
        assert!(!store.is_empty());
    }
}
