use std::collections::HashSet;

/// Lifecycle of a [`crate::DocumentGraphLoader`]; a loader runs at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    NotStarted,
    Started,
    Successful,
    Failed,
}

/// Normalized locations already fetched, whether or not the fetch
/// succeeded. Keys compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the location was already present.
    pub fn insert(&mut self, location: &str) -> bool {
        self.keys.insert(location.to_lowercase())
    }

    #[must_use]
    pub fn contains(&self, location: &str) -> bool {
        self.keys.contains(&location.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
