//! Facet selection store.
//!
//! The single source of truth for which filters are active. Views are derived
//! from this store, never the other way around. All operations are idempotent
//! and return whether they changed anything, so callers know when the
//! compiled query went stale.

use std::collections::HashMap;

/// Currently selected facet values per field plus the free-text filter.
///
/// Invariant: a field key exists only while its value list is non-empty.
/// Value lists have set semantics but preserve insertion order, which fixes
/// the clause order of compiled queries.
#[derive(Debug, Clone, Default)]
pub struct FacetSelection {
    selected: HashMap<String, Vec<String>>,
    text_filter: Option<String>,
}

impl FacetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to `field`. Returns false if it was already selected.
    pub fn select(&mut self, field: &str, value: &str) -> bool {
        let values = self.selected.entry(field.to_string()).or_default();
        if values.iter().any(|v| v == value) {
            return false;
        }
        values.push(value.to_string());
        true
    }

    /// Removes `value` from `field`, dropping the field entry when its last
    /// value goes. Returns false if the value was not selected.
    pub fn deselect(&mut self, field: &str, value: &str) -> bool {
        let Some(values) = self.selected.get_mut(field) else {
            return false;
        };
        let Some(position) = values.iter().position(|v| v == value) else {
            return false;
        };
        values.remove(position);
        if values.is_empty() {
            self.selected.remove(field);
        }
        true
    }

    /// Sets or clears the text filter. Input is trimmed; whitespace-only
    /// input clears. Returns false when the effective value is unchanged.
    pub fn set_text_filter(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        let next = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        if next == self.text_filter {
            return false;
        }
        self.text_filter = next;
        true
    }

    pub fn is_selected(&self, field: &str, value: &str) -> bool {
        self.selected
            .get(field)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    pub fn text_filter(&self) -> Option<&str> {
        self.text_filter.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.text_filter.is_none()
    }

    /// Immutable view of the current selection for query compilation.
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            fields: self.selected.clone(),
            text_filter: self.text_filter.clone(),
        }
    }
}

/// A point-in-time copy of the selection, decoupled from later mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    fields: HashMap<String, Vec<String>>,
    text_filter: Option<String>,
}

impl SelectionSnapshot {
    /// Selected values for one field, in insertion order.
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All fields with at least one selected value, sorted by name.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn text_filter(&self) -> Option<&str> {
        self.text_filter.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.text_filter.is_none()
    }
}
