use super::data::ResourceTypeName;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// Normalized key for a selection: sorted, de-duplicated type names joined by `,`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SelectionSignature(String);

impl SelectionSignature {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Immutable, insertion-ordered set of toggled-on resource types.
///
/// Cloning is cheap; toggling produces a new value and never changes a snapshot
/// somebody else is holding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSelection {
    types: Arc<[ResourceTypeName]>,
}

impl ResourceSelection {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, resource_type: &ResourceTypeName) -> bool {
        self.types.contains(resource_type)
    }

    /// New selection with `resource_type`'s membership flipped
    #[must_use]
    pub fn toggled(&self, resource_type: &ResourceTypeName) -> Self {
        let types: Vec<ResourceTypeName> = if self.contains(resource_type) {
            self.types
                .iter()
                .filter(|t| *t != resource_type)
                .cloned()
                .collect()
        } else {
            self.types
                .iter()
                .cloned()
                .chain(std::iter::once(resource_type.clone()))
                .collect()
        };
        Self {
            types: types.into(),
        }
    }

    #[must_use]
    pub fn signature(&self) -> SelectionSignature {
        SelectionSignature(
            self.types
                .iter()
                .map(ResourceTypeName::as_str)
                .sorted_unstable()
                .dedup()
                .join(","),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceTypeName> {
        self.types.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<ResourceTypeName> for ResourceSelection {
    fn from_iter<I: IntoIterator<Item = ResourceTypeName>>(iter: I) -> Self {
        let types: Vec<ResourceTypeName> = iter.into_iter().unique().collect();
        Self {
            types: types.into(),
        }
    }
}

impl<'a> IntoIterator for &'a ResourceSelection {
    type Item = &'a ResourceTypeName;
    type IntoIter = std::slice::Iter<'a, ResourceTypeName>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

/// Holds the current selection; every mutation swaps in a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    current: ResourceSelection,
}

impl SelectionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> ResourceSelection {
        self.current.clone()
    }

    #[must_use]
    pub fn is_selected(&self, resource_type: &ResourceTypeName) -> bool {
        self.current.contains(resource_type)
    }

    /// Flips membership of `resource_type`; unknown types are accepted as-is.
    pub fn toggle(&mut self, resource_type: &ResourceTypeName) -> ResourceSelection {
        self.current = self.current.toggled(resource_type);
        self.current.clone()
    }

    /// Explicit user action; nothing else empties the selection
    pub fn clear(&mut self) -> ResourceSelection {
        self.current = ResourceSelection::empty();
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> ResourceTypeName {
        ResourceTypeName::new(raw)
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut store = SelectionStore::new();
        let on = store.toggle(&name("pods"));
        assert!(on.contains(&name("pods")));
        let off = store.toggle(&name("Pods"));
        assert!(off.is_empty());
    }

    #[test]
    fn test_old_snapshot_unchanged_after_toggle() {
        let mut store = SelectionStore::new();
        store.toggle(&name("pods"));
        let before = store.snapshot();
        store.toggle(&name("services"));
        store.toggle(&name("pods"));

        assert_eq!(before.len(), 1);
        assert!(before.contains(&name("pods")));
        assert!(!before.contains(&name("services")));
        assert!(store.is_selected(&name("services")));
        assert!(!store.is_selected(&name("pods")));
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut store = SelectionStore::new();
        store.toggle(&name("services"));
        store.toggle(&name("pods"));
        let snapshot = store.snapshot();
        let order: Vec<&str> = snapshot.iter().map(ResourceTypeName::as_str).collect();
        assert_eq!(order, vec!["services", "pods"]);
    }

    #[test]
    fn test_signature_ignores_order() {
        let a: ResourceSelection = [name("services"), name("pods")].into_iter().collect();
        let b: ResourceSelection = [name("pods"), name("services"), name("pods")].into_iter().collect();
        assert_ne!(a, b);
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().as_str(), "pods,services");
        assert_eq!(ResourceSelection::empty().signature().to_string(), "<empty>");
    }

    #[test]
    fn test_unknown_type_is_legal() {
        let mut store = SelectionStore::new();
        let selection = store.toggle(&name("widgets"));
        assert!(selection.contains(&name("widgets")));
    }

    #[test]
    fn test_clear() {
        let mut store = SelectionStore::new();
        store.toggle(&name("pods"));
        assert!(store.clear().is_empty());
        assert!(store.snapshot().is_empty());
    }
}
