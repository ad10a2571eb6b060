use std::collections::HashSet;

use parking_lot::Mutex;

use tabsync_server::{
    shared::{GameMode, Objective, SubjectId, TablistEntry, Team},
    Platform, Subject, SEE_VANISHED_PERMISSION,
};

/// One call made on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    RegisterTeam {
        viewer: SubjectId,
        team: Team,
    },
    UnregisterTeam {
        viewer: SubjectId,
        team_name: String,
    },
    UpdateTeam {
        viewer: SubjectId,
        team: Team,
    },
    AddEntry {
        viewer: SubjectId,
        entry: TablistEntry,
    },
    RemoveEntry {
        viewer: SubjectId,
        entry: SubjectId,
    },
    UpdateLatency {
        viewer: SubjectId,
        entry: SubjectId,
        latency: u32,
    },
    UpdateGameMode {
        viewer: SubjectId,
        entry: SubjectId,
        game_mode: GameMode,
    },
    UpdateDisplayName {
        viewer: SubjectId,
        entry: SubjectId,
        display_name: Option<String>,
    },
    RegisterObjective {
        viewer: SubjectId,
        objective: Objective,
    },
    SetScore {
        viewer: SubjectId,
        objective: String,
        holder: String,
        value: i32,
        fancy_value: String,
    },
    RemoveScore {
        viewer: SubjectId,
        objective: String,
        holder: String,
    },
    UnregisterObjective {
        viewer: SubjectId,
        objective: String,
    },
    SetHeaderFooter {
        viewer: SubjectId,
        header: String,
        footer: String,
    },
}

impl PlatformCall {
    pub fn viewer(&self) -> SubjectId {
        match self {
            PlatformCall::RegisterTeam { viewer, .. }
            | PlatformCall::UnregisterTeam { viewer, .. }
            | PlatformCall::UpdateTeam { viewer, .. }
            | PlatformCall::AddEntry { viewer, .. }
            | PlatformCall::RemoveEntry { viewer, .. }
            | PlatformCall::UpdateLatency { viewer, .. }
            | PlatformCall::UpdateGameMode { viewer, .. }
            | PlatformCall::UpdateDisplayName { viewer, .. }
            | PlatformCall::RegisterObjective { viewer, .. }
            | PlatformCall::SetScore { viewer, .. }
            | PlatformCall::RemoveScore { viewer, .. }
            | PlatformCall::UnregisterObjective { viewer, .. }
            | PlatformCall::SetHeaderFooter { viewer, .. } => *viewer,
        }
    }
}

/// Platform recording every call, with visibility and permissions set up
/// by the test.
///
/// Vanished subjects are invisible to viewers without the see-vanished
/// permission, like on a real server with a vanish plugin.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    hidden: Mutex<HashSet<(SubjectId, SubjectId)>>,
    permissions: Mutex<HashSet<(SubjectId, String)>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    /// Calls recorded since the last `take`
    pub fn take(&self) -> Vec<PlatformCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, filter: impl Fn(&PlatformCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| filter(call)).count()
    }

    /// Makes `can_see(viewer, target)` fail
    pub fn hide(&self, viewer: SubjectId, target: SubjectId) {
        self.hidden.lock().insert((viewer, target));
    }

    pub fn grant(&self, subject: SubjectId, permission: &str) {
        self.permissions
            .lock()
            .insert((subject, permission.to_string()));
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }

    fn permitted(&self, subject: SubjectId, permission: &str) -> bool {
        self.permissions
            .lock()
            .contains(&(subject, permission.to_string()))
    }
}

impl Platform for RecordingPlatform {
    fn can_see(&self, viewer: &Subject, target: &Subject) -> bool {
        if target.is_vanished() && !self.permitted(viewer.id(), SEE_VANISHED_PERMISSION) {
            return false;
        }
        !self.hidden.lock().contains(&(viewer.id(), target.id()))
    }

    fn has_permission(&self, subject: &Subject, permission: &str) -> bool {
        self.permitted(subject.id(), permission)
    }

    fn register_team(&self, viewer: &Subject, team: &Team) {
        self.record(PlatformCall::RegisterTeam {
            viewer: viewer.id(),
            team: team.clone(),
        });
    }

    fn unregister_team(&self, viewer: &Subject, team_name: &str) {
        self.record(PlatformCall::UnregisterTeam {
            viewer: viewer.id(),
            team_name: team_name.to_string(),
        });
    }

    fn update_team(&self, viewer: &Subject, team: &Team) {
        self.record(PlatformCall::UpdateTeam {
            viewer: viewer.id(),
            team: team.clone(),
        });
    }

    fn add_tablist_entry(&self, viewer: &Subject, entry: &TablistEntry) {
        self.record(PlatformCall::AddEntry {
            viewer: viewer.id(),
            entry: entry.clone(),
        });
    }

    fn remove_tablist_entry(&self, viewer: &Subject, entry: SubjectId) {
        self.record(PlatformCall::RemoveEntry {
            viewer: viewer.id(),
            entry,
        });
    }

    fn update_latency(&self, viewer: &Subject, entry: SubjectId, latency: u32) {
        self.record(PlatformCall::UpdateLatency {
            viewer: viewer.id(),
            entry,
            latency,
        });
    }

    fn update_game_mode(&self, viewer: &Subject, entry: SubjectId, game_mode: GameMode) {
        self.record(PlatformCall::UpdateGameMode {
            viewer: viewer.id(),
            entry,
            game_mode,
        });
    }

    fn update_display_name(&self, viewer: &Subject, entry: SubjectId, display_name: Option<&str>) {
        self.record(PlatformCall::UpdateDisplayName {
            viewer: viewer.id(),
            entry,
            display_name: display_name.map(str::to_string),
        });
    }

    fn register_objective(&self, viewer: &Subject, objective: &Objective) {
        self.record(PlatformCall::RegisterObjective {
            viewer: viewer.id(),
            objective: objective.clone(),
        });
    }

    fn set_score(&self, viewer: &Subject, objective: &str, holder: &str, value: i32, fancy_value: &str) {
        self.record(PlatformCall::SetScore {
            viewer: viewer.id(),
            objective: objective.to_string(),
            holder: holder.to_string(),
            value,
            fancy_value: fancy_value.to_string(),
        });
    }

    fn remove_score(&self, viewer: &Subject, objective: &str, holder: &str) {
        self.record(PlatformCall::RemoveScore {
            viewer: viewer.id(),
            objective: objective.to_string(),
            holder: holder.to_string(),
        });
    }

    fn unregister_objective(&self, viewer: &Subject, objective: &str) {
        self.record(PlatformCall::UnregisterObjective {
            viewer: viewer.id(),
            objective: objective.to_string(),
        });
    }

    fn set_header_footer(&self, viewer: &Subject, header: &str, footer: &str) {
        self.record(PlatformCall::SetHeaderFooter {
            viewer: viewer.id(),
            header: header.to_string(),
            footer: footer.to_string(),
        });
    }
}
