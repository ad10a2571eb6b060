use std::sync::Arc;

use log::debug;

use crate::Subject;

/// Predicate turning a feature off for the subjects it holds for
pub type Condition = Arc<dyn Fn(&Subject) -> bool + Send + Sync>;

/// Re-evaluates a feature's disable condition and reports flips
#[derive(Clone)]
pub struct DisableChecker {
    feature: &'static str,
    condition: Option<Condition>,
}

impl DisableChecker {
    pub fn new(feature: &'static str, condition: Option<Condition>) -> Self {
        Self { feature, condition }
    }

    pub fn is_disabled(&self, subject: &Subject) -> bool {
        self.condition
            .as_ref()
            .is_some_and(|condition| condition(subject))
    }

    /// Stores the current value in `disabled`. Returns the new value if it
    /// flipped.
    pub fn check(&self, subject: &Subject, disabled: &mut bool) -> Option<bool> {
        let now = self.is_disabled(subject);
        if now == *disabled {
            return None;
        }
        *disabled = now;
        debug!(
            "{}: disable condition for {} is now {}",
            self.feature,
            subject.name(),
            now
        );
        Some(now)
    }
}

/// Condition met while the subject is in one of `worlds`
pub fn in_worlds(worlds: &[&str]) -> Condition {
    let worlds: Vec<String> = worlds.iter().map(|world| world.to_string()).collect();
    Arc::new(move |subject: &Subject| {
        let world = subject.world();
        worlds.iter().any(|disabled| *disabled == world)
    })
}
