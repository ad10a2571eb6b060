use thiserror::Error;

/// A platform call that would break the one-registration-per-viewer rule.
///
/// The ledger refuses such calls instead of forwarding them; callers log
/// the error and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{kind} {key} is already registered for viewer {viewer}")]
    AlreadyRegistered {
        kind: &'static str,
        key: String,
        viewer: String,
    },

    #[error("{kind} {key} is not registered for viewer {viewer}")]
    NotRegistered {
        kind: &'static str,
        key: String,
        viewer: String,
    },
}
