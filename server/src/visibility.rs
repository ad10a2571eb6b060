//! Show/hide decisions between two subjects.
//!
//! Everything here is a pure function of its inputs: the platform is only
//! asked through the `can_see` closures, and group membership comes
//! precomputed from [`ServerGroups`](tabsync_shared::ServerGroups).

use tabsync_shared::{GroupMembership, SubjectId};

/// Where a subject stands when deciding visibility
#[derive(Debug, Clone, Copy)]
pub struct Standing<'a> {
    pub id: SubjectId,
    pub server: &'a str,
    pub membership: &'a GroupMembership,
}

/// Whether `viewer` should see the local subject `target`.
///
/// Rules, first match wins: a subject always sees itself; the platform's
/// `can_see` veto hides; a viewer on a spy server sees everyone; a viewer on
/// the main server of the target's cluster sees the target; otherwise the
/// two must share a server group.
pub fn should_see(viewer: &Standing<'_>, target: &Standing<'_>, can_see: impl FnOnce() -> bool) -> bool {
    if viewer.id == target.id {
        return true;
    }
    if !can_see() {
        return false;
    }
    groups_allow(viewer, target)
}

/// Whether `viewer` should see the remote subject `target`.
///
/// A vanished remote is hidden from viewers without the see-vanished
/// permission; the group rules are the same as for local subjects.
pub fn should_see_remote(
    viewer: &Standing<'_>,
    target: &Standing<'_>,
    target_vanished: bool,
    sees_vanished: impl FnOnce() -> bool,
) -> bool {
    if target_vanished && !sees_vanished() {
        return false;
    }
    groups_allow(viewer, target)
}

/// The spy, cluster and group rules. The cluster rule only looks from the
/// main server outwards, so it is not symmetric.
pub fn groups_allow(viewer: &Standing<'_>, target: &Standing<'_>) -> bool {
    if viewer.membership.on_spy_server {
        return true;
    }
    if let (Some(_), Some(target_main)) = (
        &viewer.membership.cluster_main,
        &target.membership.cluster_main,
    ) {
        if viewer.server == &**target_main {
            return true;
        }
    }
    viewer.membership.group == target.membership.group
}
