//! Summary slicing and merging
//!
//! Category membership per size class:
//! - small: core facts, user preferences
//! - medium: small plus decisions, constraints, open questions
//! - large: all seven categories
//!
//! Each class is a superset of the one below it.

use crate::context::summary::{render, SummaryCategory, SummaryStore};
use crate::error::Result;
use crate::registry::{ModelProfile, ModelRegistry, SummarySize};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;

const SMALL: &[SummaryCategory] = &[SummaryCategory::CoreFacts, SummaryCategory::UserPreferences];

const MEDIUM: &[SummaryCategory] = &[
    SummaryCategory::CoreFacts,
    SummaryCategory::UserPreferences,
    SummaryCategory::DecisionsMade,
    SummaryCategory::Constraints,
    SummaryCategory::OpenQuestions,
];

/// Categories a size class receives
pub fn categories_for(size: SummarySize) -> &'static [SummaryCategory] {
    match size {
        SummarySize::Small => SMALL,
        SummarySize::Medium => MEDIUM,
        SummarySize::Large => &SummaryCategory::ALL,
    }
}

/// A summary projected onto a subset of its categories.
///
/// Serializes to an object holding only the selected keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySlice {
    size: SummarySize,
    store: SummaryStore,
}

impl SummarySlice {
    pub fn size(&self) -> SummarySize {
        self.size
    }

    pub fn categories(&self) -> &'static [SummaryCategory] {
        categories_for(self.size)
    }

    pub fn contains(&self, category: SummaryCategory) -> bool {
        self.categories().contains(&category)
    }

    /// The store with every category outside the slice emptied
    pub fn store(&self) -> &SummaryStore {
        &self.store
    }

    pub fn into_store(self) -> SummaryStore {
        self.store
    }

    pub fn to_text(&self) -> String {
        render(&self.store, self.categories())
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for SummarySlice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let categories = self.categories();
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for category in categories {
            match self.store.list(*category) {
                Some(items) => map.serialize_entry(category.key(), items)?,
                None => map.serialize_entry(category.key(), &self.store.entities)?,
            }
        }
        map.end()
    }
}

/// Projects summaries for target models
#[derive(Debug, Clone)]
pub struct SummarySlicer {
    registry: Arc<ModelRegistry>,
}

impl SummarySlicer {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Keep only the categories of `size`
    pub fn slice(summary: &SummaryStore, size: SummarySize) -> SummarySlice {
        let categories = categories_for(size);
        let mut store = SummaryStore::empty();

        for category in categories {
            if let (Some(items), Some(target)) =
                (summary.list(*category), store.list_mut(*category))
            {
                target.clone_from(items);
            } else if !category.is_list() {
                store.entities.clone_from(&summary.entities);
            }
        }

        SummarySlice { size, store }
    }

    pub fn for_profile(summary: &SummaryStore, profile: &ModelProfile) -> SummarySlice {
        Self::slice(summary, profile.preferred_summary_size)
    }

    /// Slice for the preferred size of a registered model
    pub fn for_model(&self, summary: &SummaryStore, model: &str) -> Result<SummarySlice> {
        let profile = self.registry.get(model)?;
        Ok(Self::for_profile(summary, profile))
    }

    /// Union every list category as a sorted, de-duplicated set; entities
    /// from `new` overwrite those in `previous` key by key
    pub fn merge(previous: &SummaryStore, new: &SummaryStore) -> SummaryStore {
        let mut merged = SummaryStore::empty();

        for category in SummaryCategory::ALL.iter().filter(|c| c.is_list()) {
            let union: BTreeSet<String> = previous
                .list(*category)
                .into_iter()
                .chain(new.list(*category))
                .flatten()
                .cloned()
                .collect();
            if let Some(target) = merged.list_mut(*category) {
                *target = union.into_iter().collect();
            }
        }

        merged.entities = previous.entities.clone();
        for (name, info) in &new.entities {
            merged.entities.insert(name.clone(), info.clone());
        }

        merged
    }
}
