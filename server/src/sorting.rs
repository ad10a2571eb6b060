use std::collections::HashMap;

use parking_lot::Mutex;

use tabsync_shared::SubjectId;

use crate::Subject;

const MAX_TEAM_NAME: usize = 16;
const NAME_CHARS: usize = 12;

/// Group order deciding where subjects appear in the player list
#[derive(Debug, Clone, Default)]
pub struct SortingConfig {
    /// Permission groups, first sorted first. Unlisted groups go last.
    pub group_order: Vec<String>,
}

/// Hands out unique team names whose alphabetical order is the sort order.
///
/// Names are assigned synchronously before name tags are told about a
/// subject, so the name tag executor never waits for sorting.
pub struct Sorting {
    config: SortingConfig,
    assigned: Mutex<HashMap<SubjectId, String>>,
}

impl Sorting {
    pub fn new(config: SortingConfig) -> Self {
        Self {
            config,
            assigned: Mutex::new(HashMap::new()),
        }
    }

    /// Team name of a subject, assigning one if it has none yet
    pub fn assign(&self, subject: &Subject) -> String {
        let mut assigned = self.assigned.lock();
        if let Some(name) = assigned.get(&subject.id()) {
            return name.clone();
        }
        let name = self.unique_name(&assigned, subject);
        assigned.insert(subject.id(), name.clone());
        name
    }

    /// Recomputes the team name after the subject's group changed. Returns
    /// the new name if it differs.
    pub fn reassign(&self, subject: &Subject) -> Option<String> {
        let mut assigned = self.assigned.lock();
        let previous = assigned.remove(&subject.id());
        let name = self.unique_name(&assigned, subject);
        assigned.insert(subject.id(), name.clone());
        match previous {
            Some(previous) if previous[..1] == name[..1] => {
                assigned.insert(subject.id(), previous);
                None
            }
            _ => Some(name),
        }
    }

    pub fn team_name(&self, id: &SubjectId) -> Option<String> {
        self.assigned.lock().get(id).cloned()
    }

    pub fn release(&self, id: &SubjectId) -> Option<String> {
        self.assigned.lock().remove(id)
    }

    fn unique_name(&self, assigned: &HashMap<SubjectId, String>, subject: &Subject) -> String {
        let group = subject.group();
        let position = self
            .config
            .group_order
            .iter()
            .position(|ordered| ordered.eq_ignore_ascii_case(&group))
            .unwrap_or(self.config.group_order.len())
            .min(25);
        let mut base = String::with_capacity(MAX_TEAM_NAME);
        base.push(char::from(b'A' + position as u8));
        base.extend(subject.name().chars().take(NAME_CHARS));

        let mut name = base.clone();
        let mut counter = 1u32;
        while assigned.values().any(|taken| *taken == name) {
            name = format!("{base}{counter}");
            counter += 1;
        }
        name
    }
}
