use std::collections::HashMap;

use crate::SubjectId;

/// A per-subject formatted value owned by one feature.
///
/// The raw template comes from configuration and may be shadowed by a
/// temporary value set through the API. `get` returns the last expanded
/// value; `format_for` adds a per-viewer (relational) expansion on top of
/// it, cached until the expanded value changes.
#[derive(Debug, Clone)]
pub struct Property {
    original_raw: String,
    temporary: Option<String>,
    current: String,
    formats: HashMap<SubjectId, String>,
}

impl Property {
    /// Creates a property and expands its template once
    pub fn new(raw: impl Into<String>, expand: impl FnOnce(&str) -> String) -> Self {
        let original_raw = raw.into();
        let current = expand(&original_raw);
        Self {
            original_raw,
            temporary: None,
            current,
            formats: HashMap::new(),
        }
    }

    /// The template currently in effect
    pub fn raw(&self) -> &str {
        self.temporary.as_deref().unwrap_or(&self.original_raw)
    }

    pub fn original_raw(&self) -> &str {
        &self.original_raw
    }

    /// The last expanded value
    pub fn get(&self) -> &str {
        &self.current
    }

    /// Re-expands the template. Returns true if the value changed.
    pub fn update(&mut self, expand: impl FnOnce(&str) -> String) -> bool {
        let next = expand(self.raw());
        if next == self.current {
            return false;
        }
        self.current = next;
        self.formats.clear();
        true
    }

    /// Replaces the configured template. Returns true if it differed.
    pub fn change_raw(&mut self, raw: &str, expand: impl FnOnce(&str) -> String) -> bool {
        if self.original_raw == raw {
            return false;
        }
        self.original_raw = raw.to_string();
        if self.temporary.is_none() {
            self.current = expand(raw);
        }
        self.formats.clear();
        true
    }

    /// Sets or clears the API override. Returns true if the effective
    /// template changed.
    pub fn set_temporary(
        &mut self,
        temporary: Option<String>,
        expand: impl FnOnce(&str) -> String,
    ) -> bool {
        if self.temporary == temporary {
            return false;
        }
        self.temporary = temporary;
        self.current = expand(self.raw());
        self.formats.clear();
        true
    }

    /// Value as seen by one viewer, expanded on first request
    pub fn format_for(
        &mut self,
        viewer: SubjectId,
        relational: impl FnOnce(&str) -> String,
    ) -> &str {
        let current = &self.current;
        self.formats
            .entry(viewer)
            .or_insert_with(|| relational(current))
    }

    /// Drops the cached format of a viewer that went away
    pub fn forget_viewer(&mut self, viewer: &SubjectId) {
        self.formats.remove(viewer);
    }
}
