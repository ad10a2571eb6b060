//! Registration bookkeeping shared by the features.
//!
//! An object of subject S is registered for viewer V exactly when S is
//! neither disabled nor paused and V should see S. Features recompute that
//! on every event and let the [`RegistrationLedger`] turn differences into
//! single register or unregister calls.

mod error;
mod ledger;

pub use error::LifecycleError;
pub use ledger::{report, RegistrationLedger};

/// Where a subject's objects stand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    Registered,
    Disabled,
    Paused,
}

/// Why a subject's objects may be withheld from everyone
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleFlags {
    /// Set while the feature's disable condition holds
    pub disabled: bool,
    /// Set through the API
    pub paused: bool,
}

impl LifecycleFlags {
    pub fn is_active(&self) -> bool {
        !self.disabled && !self.paused
    }

    /// State given whether any viewer currently holds a registration
    pub fn state(&self, registered: bool) -> LifecycleState {
        if self.disabled {
            LifecycleState::Disabled
        } else if self.paused {
            LifecycleState::Paused
        } else if registered {
            LifecycleState::Registered
        } else {
            LifecycleState::Unregistered
        }
    }
}
