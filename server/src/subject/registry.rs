use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use tabsync_shared::SubjectId;

use crate::Subject;

/// Authoritative map of the subjects connected to this node.
///
/// Lookups go through the map; iteration goes through an immutable
/// snapshot republished on every add and remove, so iterating never blocks
/// writers. A snapshot may still hold a subject that was just removed.
pub struct SubjectRegistry {
    by_id: Mutex<HashMap<SubjectId, Arc<Subject>>>,
    snapshot: ArcSwap<Vec<Arc<Subject>>>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self {
            by_id: Mutex::new(HashMap::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Adds a subject, returning the one it replaced
    pub fn add(&self, subject: Arc<Subject>) -> Option<Arc<Subject>> {
        let mut by_id = self.by_id.lock();
        let replaced = by_id.insert(subject.id(), subject);
        self.publish(&by_id);
        replaced
    }

    pub fn remove(&self, id: &SubjectId) -> Option<Arc<Subject>> {
        let mut by_id = self.by_id.lock();
        let removed = by_id.remove(id)?;
        self.publish(&by_id);
        Some(removed)
    }

    pub fn get(&self, id: &SubjectId) -> Option<Arc<Subject>> {
        self.by_id.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.by_id.lock().contains_key(id)
    }

    /// Every subject online when the snapshot was taken
    pub fn snapshot(&self) -> Arc<Vec<Arc<Subject>>> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, by_id: &HashMap<SubjectId, Arc<Subject>>) {
        let subjects: Vec<_> = by_id.values().cloned().collect();
        self.snapshot.store(Arc::new(subjects));
    }
}

impl Default for SubjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
