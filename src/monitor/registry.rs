//! Set of observers attached to a monitor.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::Observer;

/// Identity of a registered observer.
///
/// Observers are told apart by registration, not by content: adding the
/// same observer twice yields two ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered collection of observers, in registration order.
#[derive(Default, Clone)]
pub struct ObserverRegistry {
    entries: Vec<(ObserverId, Arc<dyn Observer>)>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer under a fresh id.
    pub fn add(&mut self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        self.insert(id, observer);
        id
    }

    /// Add an observer under an id chosen by the caller.
    pub(crate) fn insert(&mut self, id: ObserverId, observer: Arc<dyn Observer>) {
        self.entries.push((id, observer));
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, id: ObserverId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current members for a fan-out.
    ///
    /// Changes made to the registry afterwards don't affect the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ObserverId, Arc<dyn Observer>)> {
        self.entries.clone()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, observer)| (id, observer.name())))
            .finish()
    }
}
