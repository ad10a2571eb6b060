use tabsync_shared::{GameMode, Objective, SubjectId, TablistEntry, Team};

use crate::Subject;

/// Permission letting a viewer see vanished subjects on other nodes
pub const SEE_VANISHED_PERMISSION: &str = "tab.seevanished";

/// The host platform: visibility answers plus the packets a viewer receives.
///
/// Calls for one feature always come from that feature's executor thread,
/// and are made only for transitions recorded in its registration ledger.
pub trait Platform: Send + Sync {
    /// Whether the platform lets `viewer` see `target` at all
    fn can_see(&self, viewer: &Subject, target: &Subject) -> bool;

    fn has_permission(&self, subject: &Subject, permission: &str) -> bool;

    // Name tags

    fn register_team(&self, viewer: &Subject, team: &Team);

    fn unregister_team(&self, viewer: &Subject, team_name: &str);

    fn update_team(&self, viewer: &Subject, team: &Team);

    // Player list

    fn add_tablist_entry(&self, viewer: &Subject, entry: &TablistEntry);

    fn remove_tablist_entry(&self, viewer: &Subject, entry: SubjectId);

    fn update_latency(&self, viewer: &Subject, entry: SubjectId, latency: u32);

    fn update_game_mode(&self, viewer: &Subject, entry: SubjectId, game_mode: GameMode);

    /// Sets the formatted name of an entry, `None` restores the plain name
    fn update_display_name(&self, viewer: &Subject, entry: SubjectId, display_name: Option<&str>);

    // Scoreboard

    fn register_objective(&self, viewer: &Subject, objective: &Objective);

    fn set_score(
        &self,
        viewer: &Subject,
        objective: &str,
        holder: &str,
        value: i32,
        fancy_value: &str,
    );

    /// Drops the score of a holder that no longer goes by that name
    fn remove_score(&self, viewer: &Subject, objective: &str, holder: &str);

    fn unregister_objective(&self, viewer: &Subject, objective: &str);

    fn set_header_footer(&self, viewer: &Subject, header: &str, footer: &str);
}
