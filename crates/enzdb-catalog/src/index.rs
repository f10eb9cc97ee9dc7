//! Insertion-ordered metadata registry.

use std::collections::HashMap;

use crate::metadata::ExperimentMetadata;

/// Metadata records keyed by experiment ID.
///
/// Registration order is preserved because listings and duplicate checks
/// are defined over it. Re-inserting an existing ID replaces the record in
/// place.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    order: Vec<String>,
    entries: HashMap<String, ExperimentMetadata>,
}

impl MetadataIndex {
    pub fn insert(&mut self, id: String, metadata: ExperimentMetadata) {
        if !self.entries.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.entries.insert(id, metadata);
    }

    pub fn remove(&mut self, id: &str) -> Option<ExperimentMetadata> {
        self.order.retain(|known| known != id);
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ExperimentMetadata> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExperimentMetadata> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}
