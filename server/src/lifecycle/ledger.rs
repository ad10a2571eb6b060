use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    hash::Hash,
};

use log::error;

use tabsync_shared::SubjectId;

use super::LifecycleError;

/// Which objects each viewer currently has registered on the platform.
///
/// Every platform call that creates, changes or destroys per-viewer state
/// goes through here: `register` runs its call only for an absent entry,
/// `unregister` and `update` only for a present one. Entries can also be
/// dropped without a call when the platform discarded them on its own.
pub struct RegistrationLedger<K: Eq + Hash + Clone + Display> {
    kind: &'static str,
    registered: HashMap<SubjectId, HashSet<K>>,
}

impl<K: Eq + Hash + Clone + Display> RegistrationLedger<K> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            registered: HashMap::new(),
        }
    }

    pub fn contains(&self, viewer: &SubjectId, key: &K) -> bool {
        self.registered
            .get(viewer)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Records `key` for `viewer` and runs `call`, unless already recorded
    pub fn register(
        &mut self,
        viewer: SubjectId,
        key: K,
        call: impl FnOnce(),
    ) -> Result<(), LifecycleError> {
        if self.contains(&viewer, &key) {
            return Err(LifecycleError::AlreadyRegistered {
                kind: self.kind,
                key: key.to_string(),
                viewer: viewer.to_string(),
            });
        }
        call();
        self.registered.entry(viewer).or_default().insert(key);
        Ok(())
    }

    /// Removes `key` for `viewer` and runs `call`, if it was recorded
    pub fn unregister(
        &mut self,
        viewer: &SubjectId,
        key: &K,
        call: impl FnOnce(),
    ) -> Result<(), LifecycleError> {
        if !self.forget(viewer, key) {
            return Err(self.not_registered(viewer, key));
        }
        call();
        Ok(())
    }

    /// Runs `call` if `key` is recorded for `viewer`
    pub fn update(
        &self,
        viewer: &SubjectId,
        key: &K,
        call: impl FnOnce(),
    ) -> Result<(), LifecycleError> {
        if !self.contains(viewer, key) {
            return Err(self.not_registered(viewer, key));
        }
        call();
        Ok(())
    }

    /// Viewers holding `key`
    pub fn viewers_of(&self, key: &K) -> Vec<SubjectId> {
        self.registered
            .iter()
            .filter(|(_, keys)| keys.contains(key))
            .map(|(viewer, _)| *viewer)
            .collect()
    }

    /// Keys held by `viewer`
    pub fn keys_of(&self, viewer: &SubjectId) -> Vec<K> {
        self.registered
            .get(viewer)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops an entry without a platform call. Returns true if it existed.
    pub fn forget(&mut self, viewer: &SubjectId, key: &K) -> bool {
        let Some(keys) = self.registered.get_mut(viewer) else {
            return false;
        };
        let removed = keys.remove(key);
        if keys.is_empty() {
            self.registered.remove(viewer);
        }
        removed
    }

    /// Drops every entry of a viewer, returning the keys it held
    pub fn forget_viewer(&mut self, viewer: &SubjectId) -> Vec<K> {
        self.registered
            .remove(viewer)
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default()
    }

    /// Every (viewer, key) pair
    pub fn entries(&self) -> Vec<(SubjectId, K)> {
        self.registered
            .iter()
            .flat_map(|(viewer, keys)| keys.iter().map(move |key| (*viewer, key.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registered.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    fn not_registered(&self, viewer: &SubjectId, key: &K) -> LifecycleError {
        LifecycleError::NotRegistered {
            kind: self.kind,
            key: key.to_string(),
            viewer: viewer.to_string(),
        }
    }
}

/// Logs a refused platform call
pub fn report(result: Result<(), LifecycleError>) {
    if let Err(err) = result {
        error!("{err}");
    }
}
