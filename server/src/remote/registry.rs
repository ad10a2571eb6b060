use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use tabsync_shared::{JoinMessage, NodeId, SubjectId};

use crate::RemoteSubject;

/// Subjects of other nodes, queried the same way as the local registry
pub struct RemoteRegistry {
    by_id: Mutex<HashMap<SubjectId, Arc<RemoteSubject>>>,
    snapshot: ArcSwap<Vec<Arc<RemoteSubject>>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self {
            by_id: Mutex::new(HashMap::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Applies a join snapshot. An already known subject keeps its feature
    /// values and has its membership fields replaced. Returns the subject
    /// and whether it was unknown before.
    pub fn apply_join(&self, node: NodeId, join: &JoinMessage) -> (Arc<RemoteSubject>, bool) {
        let mut by_id = self.by_id.lock();
        if let Some(known) = by_id.get(&join.id) {
            if known.node() == node {
                known.update(|state| {
                    state.nickname = join.nickname.clone();
                    state.server = join.server.clone();
                    state.vanished = join.vanished;
                });
                return (known.clone(), false);
            }
        }
        let subject = Arc::new(RemoteSubject::new(node, join));
        by_id.insert(join.id, subject.clone());
        self.publish(&by_id);
        (subject, true)
    }

    /// Removes the subject only while it is still connected to `node`. A
    /// subject that moved on keeps the record its new node created.
    pub fn remove_from(&self, id: &SubjectId, node: NodeId) -> Option<Arc<RemoteSubject>> {
        let mut by_id = self.by_id.lock();
        if by_id.get(id)?.node() != node {
            return None;
        }
        let removed = by_id.remove(id)?;
        self.publish(&by_id);
        Some(removed)
    }

    pub fn get(&self, id: &SubjectId) -> Option<Arc<RemoteSubject>> {
        self.by_id.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.by_id.lock().contains_key(id)
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<RemoteSubject>>> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, by_id: &HashMap<SubjectId, Arc<RemoteSubject>>) {
        self.snapshot
            .store(Arc::new(by_id.values().cloned().collect()));
    }
}

impl Default for RemoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
