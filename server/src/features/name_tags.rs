use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::Arc,
};

use log::{debug, info};

use tabsync_shared::{
    CollisionRule, Message, NameVisibility, Property, ProtocolError, SubjectId, Team,
    TeamUpdateMessage,
};

use crate::{
    condition::{Condition, DisableChecker},
    executor::{CategoryUsage, FeatureExecutor},
    features::{Feature, FeatureContext},
    lifecycle::{report, LifecycleFlags, LifecycleState, RegistrationLedger},
    platform::SEE_VANISHED_PERMISSION,
    remote::RemoteTeam,
    replication::{MessageKinds, RemoteListener},
    sorting::Sorting,
    ExecutorError, RemoteSubject, Subject,
};

const PREFIX: &str = "tagprefix";
const SUFFIX: &str = "tagsuffix";

/// Contains Config properties which will be used by [`NameTags`]
#[derive(Clone)]
pub struct NameTagConfig {
    /// Hides every name tag from every viewer
    pub invisible_name_tags: bool,
    /// Lets team members see each other while invisible
    pub can_see_friendly_invisibles: bool,
    /// Collision rule of every team unless forced through the API
    pub collision_rule: bool,
    pub disable_condition: Option<Condition>,
}

impl Default for NameTagConfig {
    fn default() -> Self {
        Self {
            invisible_name_tags: false,
            can_see_friendly_invisibles: false,
            collision_rule: true,
            disable_condition: None,
        }
    }
}

/// Scoreboard teams carrying every subject's name tag prefix and suffix
pub struct NameTags {
    sorting: Arc<Sorting>,
    executor: FeatureExecutor<NameTagState>,
}

impl NameTags {
    pub fn new(
        context: FeatureContext,
        config: NameTagConfig,
        sorting: Arc<Sorting>,
    ) -> Result<Self, ExecutorError> {
        let state = NameTagState {
            disable: DisableChecker::new("NameTags", config.disable_condition.clone()),
            context,
            config,
            players: HashMap::new(),
            teams: RegistrationLedger::new("team"),
        };
        Ok(Self {
            sorting,
            executor: FeatureExecutor::new("nametags", state)?,
        })
    }

    pub(crate) fn register_messages(
        feature: &Arc<Self>,
        kinds: &mut MessageKinds,
    ) -> Result<(), ProtocolError> {
        let feature = feature.clone();
        kinds.add::<TeamUpdateMessage>(move |inbound, _, message| {
            let Some(remote) = inbound.known(&message.id, TeamUpdateMessage::NAME) else {
                return;
            };
            feature.executor.submit("remote-team-update", move |state| {
                state.remote_team_update(&remote, message)
            });
        })
    }

    /// Hides the subject's name tag from everyone
    pub fn hide_name_tag(&self, subject: SubjectId) {
        self.executor.submit("visibility", move |state| state.set_hidden(subject, true));
    }

    pub fn show_name_tag(&self, subject: SubjectId) {
        self.executor.submit("visibility", move |state| state.set_hidden(subject, false));
    }

    /// Hides the subject's name tag from one viewer
    pub fn hide_name_tag_for(&self, subject: SubjectId, viewer: SubjectId) {
        self.executor.submit("visibility", move |state| {
            state.set_hidden_for(subject, viewer, true)
        });
    }

    pub fn show_name_tag_for(&self, subject: SubjectId, viewer: SubjectId) {
        self.executor.submit("visibility", move |state| {
            state.set_hidden_for(subject, viewer, false)
        });
    }

    /// Makes the viewer see no name tags at all, or all of them again
    pub fn toggle_name_tag_view(&self, viewer: SubjectId) {
        self.executor.submit("visibility", move |state| state.toggle_view(viewer));
    }

    /// Withdraws the subject's team until resumed
    pub fn pause_team_handling(&self, subject: SubjectId) {
        self.executor.submit("pause", move |state| state.pause(subject));
    }

    pub fn resume_team_handling(&self, subject: SubjectId) {
        self.executor.submit("resume", move |state| state.resume(subject));
    }

    /// Overrides the configured prefix; `None` restores it
    pub fn set_prefix(&self, subject: SubjectId, prefix: Option<String>) {
        self.executor.submit("prefix", move |state| {
            state.set_temporary(subject, Some(prefix), None)
        });
    }

    /// Overrides the configured suffix; `None` restores it
    pub fn set_suffix(&self, subject: SubjectId, suffix: Option<String>) {
        self.executor.submit("suffix", move |state| {
            state.set_temporary(subject, None, Some(suffix))
        });
    }

    /// Forces a collision rule; `None` returns to the configured one
    pub fn set_collision_rule(&self, subject: SubjectId, collision: Option<bool>) {
        self.executor
            .submit("collision", move |state| state.set_collision(subject, collision));
    }

    /// Moves the subject to a new team name, e.g. after a group change
    pub fn update_team_name(&self, subject: SubjectId, team_name: String) {
        self.executor.submit("team-name", move |state| {
            state.update_team_name(subject, team_name)
        });
    }

    /// Lifecycle state of a subject's team, `None` for unknown subjects.
    /// Blocks until the queue is drained up to this call, so it must not be
    /// called from a feature task.
    pub fn lifecycle_state(&self, subject: SubjectId) -> Result<Option<LifecycleState>, ExecutorError> {
        self.executor.query("query", move |state| {
            state.players.get(&subject).map(|data| {
                let registered = !state.teams.viewers_of(&data.team_name).is_empty();
                data.flags.state(registered)
            })
        })
    }
}

impl Feature for NameTags {
    fn name(&self) -> &'static str {
        "NameTags"
    }

    fn on_join(&self, subject: &Arc<Subject>) {
        let team_name = self.sorting.assign(subject);
        let subject = subject.clone();
        self.executor
            .submit("join", move |state| state.join(subject, team_name));
    }

    fn on_quit(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("quit", move |state| state.quit(id));
    }

    fn on_server_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("server-switch", move |state| state.reload(id));
    }

    fn on_world_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("world-switch", move |state| state.reload(id));
    }

    fn on_vanish_change(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("vanish", move |state| state.vanish_change(id));
    }

    fn refresh(&self, subject: &Arc<Subject>, force: bool) {
        let id = subject.id();
        self.executor
            .submit("refresh", move |state| state.refresh(id, force));
    }

    fn unload(&self) {
        self.executor.submit("unload", |state| state.unload());
    }

    fn flush(&self) -> Result<(), ExecutorError> {
        self.executor.flush()
    }

    fn shutdown(&self) {
        self.executor.shutdown();
    }

    fn usage(&self) -> Vec<(&'static str, CategoryUsage)> {
        self.executor.usage()
    }
}

impl RemoteListener for NameTags {
    fn on_remote_join(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-join", move |state| state.sync_remote(&remote, false));
    }

    fn on_remote_vanish_change(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-vanish", move |state| state.sync_remote(&remote, false));
    }

    fn on_remote_nickname_change(&self, remote: &Arc<RemoteSubject>, _previous: &str) {
        let remote = remote.clone();
        self.executor
            .submit("remote-nickname", move |state| state.remote_rename(&remote));
    }

    fn on_remote_quit(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-quit", move |state| state.remote_quit(&remote));
    }

    fn on_load_request(&self) {
        self.executor.submit("load-request", |state| {
            let ids: Vec<_> = state.players.keys().copied().collect();
            for id in ids {
                state.replicate(id);
            }
        });
    }
}

struct TeamData {
    subject: Arc<Subject>,
    team_name: String,
    prefix: Property,
    suffix: Property,
    flags: LifecycleFlags,
    /// Hidden from everyone through the API
    hidden: bool,
    hidden_for: HashSet<SubjectId>,
    /// Viewers the platform stopped from seeing this subject while vanished
    vanished_for: HashSet<SubjectId>,
    /// This subject sees no name tags
    invisible_view: bool,
    forced_collision: Option<bool>,
}

struct NameTagState {
    context: FeatureContext,
    config: NameTagConfig,
    disable: DisableChecker,
    players: HashMap<SubjectId, TeamData>,
    teams: RegistrationLedger<String>,
}

impl NameTagState {
    fn join(&mut self, subject: Arc<Subject>, team_name: String) {
        let id = subject.id();
        if self.players.contains_key(&id) {
            debug!("{} already has a team, ignoring repeated join", subject.name());
            return;
        }

        let expand = self.context.expander(&subject);
        let prefix = Property::new(
            self.context.template(&subject, PREFIX).unwrap_or_default(),
            &expand,
        );
        let suffix = Property::new(
            self.context.template(&subject, SUFFIX).unwrap_or_default(),
            &expand,
        );
        self.players.insert(
            id,
            TeamData {
                subject: subject.clone(),
                team_name,
                prefix,
                suffix,
                flags: LifecycleFlags::default(),
                hidden: false,
                hidden_for: HashSet::new(),
                vanished_for: HashSet::new(),
                invisible_view: false,
                forced_collision: None,
            },
        );

        for other in self.others(&id) {
            if subject.is_vanished() && !self.context.platform.can_see(&other, &subject) {
                if let Some(data) = self.players.get_mut(&id) {
                    data.vanished_for.insert(other.id());
                }
            }
            if other.is_vanished() && !self.context.platform.can_see(&subject, &other) {
                if let Some(data) = self.players.get_mut(&other.id()) {
                    data.vanished_for.insert(id);
                }
            }
            self.register_team(other.id(), &subject);
        }
        for remote in self.context.remotes.snapshot().iter() {
            self.sync_remote_for(remote, &subject, false);
        }

        if self.disable.is_disabled(&subject) {
            if let Some(data) = self.players.get_mut(&id) {
                data.flags.disabled = true;
            }
            return;
        }
        self.register_everywhere(id);
        self.replicate(id);
    }

    fn quit(&mut self, id: SubjectId) {
        if !self.players.contains_key(&id) {
            return;
        }
        self.teams.forget_viewer(&id);
        self.unregister_everywhere(id);
        self.players.remove(&id);
        for data in self.players.values_mut() {
            data.hidden_for.remove(&id);
            data.vanished_for.remove(&id);
            data.prefix.forget_viewer(&id);
            data.suffix.forget_viewer(&id);
        }
    }

    fn refresh(&mut self, id: SubjectId, force: bool) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(disabled) = self.disable.check(&data.subject, &mut data.flags.disabled) {
            if disabled {
                self.unregister_everywhere(id);
            } else {
                self.register_everywhere(id);
                self.replicate(id);
            }
            return;
        }
        if data.flags.disabled {
            return;
        }
        let changed = if force {
            self.reload_properties(id);
            true
        } else {
            let expand = self.context.expander(&data.subject);
            let prefix = data.prefix.update(&expand);
            let suffix = data.suffix.update(&expand);
            prefix || suffix
        };
        if changed {
            self.update_everywhere(id);
        }
    }

    /// Server or world switch: templates may resolve differently now
    fn reload(&mut self, id: SubjectId) {
        if self.reload_properties(id) && self.players.get(&id).is_some_and(|data| !data.flags.disabled) {
            self.update_everywhere(id);
        }
    }

    fn reload_properties(&mut self, id: SubjectId) -> bool {
        let Some(data) = self.players.get_mut(&id) else {
            return false;
        };
        let prefix_raw = self.context.template(&data.subject, PREFIX).unwrap_or_default();
        let suffix_raw = self.context.template(&data.subject, SUFFIX).unwrap_or_default();
        let expand = self.context.expander(&data.subject);
        let mut changed = data.prefix.change_raw(&prefix_raw, &expand);
        changed |= data.suffix.change_raw(&suffix_raw, &expand);
        changed |= data.prefix.update(&expand);
        changed |= data.suffix.update(&expand);
        changed
    }

    fn vanish_change(&mut self, id: SubjectId) {
        let others = self.others(&id);
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        let subject = data.subject.clone();
        if subject.is_vanished() {
            for viewer in others {
                if self.context.platform.can_see(&viewer, &subject) {
                    continue;
                }
                data.vanished_for.insert(viewer.id());
                if self.teams.contains(&viewer.id(), &data.team_name) {
                    let platform = &self.context.platform;
                    let team_name = &data.team_name;
                    report(self.teams.unregister(&viewer.id(), team_name, || {
                        platform.unregister_team(&viewer, team_name)
                    }));
                }
            }
        } else {
            let vanished_for = mem::take(&mut data.vanished_for);
            for viewer_id in vanished_for {
                if let Some(viewer) = self.players.get(&viewer_id).map(|data| data.subject.clone()) {
                    self.register_team(id, &viewer);
                }
            }
        }
    }

    fn pause(&mut self, id: SubjectId) {
        if self.players.get(&id).map_or(true, |data| data.flags.paused) {
            return;
        }
        self.unregister_everywhere(id);
        if let Some(data) = self.players.get_mut(&id) {
            data.flags.paused = true;
        }
    }

    fn resume(&mut self, id: SubjectId) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if !data.flags.paused {
            return;
        }
        data.flags.paused = false;
        if !data.flags.disabled {
            self.register_everywhere(id);
        }
    }

    fn set_hidden(&mut self, id: SubjectId, hidden: bool) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if data.hidden == hidden {
            return;
        }
        data.hidden = hidden;
        self.update_everywhere(id);
    }

    fn set_hidden_for(&mut self, id: SubjectId, viewer: SubjectId, hidden: bool) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        let changed = if hidden {
            data.hidden_for.insert(viewer)
        } else {
            data.hidden_for.remove(&viewer)
        };
        if changed {
            self.update_for(id, viewer);
        }
    }

    fn toggle_view(&mut self, viewer: SubjectId) {
        let Some(data) = self.players.get_mut(&viewer) else {
            return;
        };
        data.invisible_view = !data.invisible_view;
        info!(
            "{} now sees {} name tags",
            data.subject.name(),
            if data.invisible_view { "no" } else { "all" }
        );
        let targets: Vec<_> = self.players.keys().copied().collect();
        for target in targets {
            self.update_for(target, viewer);
        }
        if let Some(viewer) = self.players.get(&viewer).map(|data| data.subject.clone()) {
            for remote in self.context.remotes.snapshot().iter() {
                self.sync_remote_for(remote, &viewer, true);
            }
        }
    }

    fn set_temporary(
        &mut self,
        id: SubjectId,
        prefix: Option<Option<String>>,
        suffix: Option<Option<String>>,
    ) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        let expand = self.context.expander(&data.subject);
        let mut changed = false;
        if let Some(prefix) = prefix {
            changed |= data.prefix.set_temporary(prefix, &expand);
        }
        if let Some(suffix) = suffix {
            changed |= data.suffix.set_temporary(suffix, &expand);
        }
        if changed && !data.flags.disabled {
            self.update_everywhere(id);
        }
    }

    fn set_collision(&mut self, id: SubjectId, collision: Option<bool>) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if data.forced_collision == collision {
            return;
        }
        data.forced_collision = collision;
        self.update_everywhere(id);
    }

    fn update_team_name(&mut self, id: SubjectId, team_name: String) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if data.team_name == team_name {
            return;
        }
        if !data.flags.is_active() {
            data.team_name = team_name;
            return;
        }
        self.unregister_everywhere(id);
        if let Some(data) = self.players.get_mut(&id) {
            data.team_name = team_name;
        }
        self.register_everywhere(id);
        self.replicate(id);
    }

    fn unload(&mut self) {
        for (viewer_id, team_name) in self.teams.entries() {
            if let Some(viewer) = self.players.get(&viewer_id) {
                self.context
                    .platform
                    .unregister_team(&viewer.subject, &team_name);
            }
        }
        self.teams = RegistrationLedger::new("team");
        self.players.clear();
    }

    // Local teams

    fn register_everywhere(&mut self, id: SubjectId) {
        for viewer in self.all() {
            self.register_team(id, &viewer);
        }
    }

    fn register_team(&mut self, id: SubjectId, viewer: &Arc<Subject>) {
        let viewer_hides_tags = self
            .players
            .get(&viewer.id())
            .is_some_and(|data| data.invisible_view);
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if !data.flags.is_active() || self.teams.contains(&viewer.id(), &data.team_name) {
            return;
        }
        if data.subject.id() != viewer.id() && !self.context.platform.can_see(viewer, &data.subject) {
            return;
        }
        let team = team_for(&self.context, &self.config, data, viewer, viewer_hides_tags);
        let platform = &self.context.platform;
        report(self.teams.register(viewer.id(), team.name.clone(), || {
            platform.register_team(viewer, &team)
        }));
    }

    fn unregister_everywhere(&mut self, id: SubjectId) {
        let Some(team_name) = self.players.get(&id).map(|data| data.team_name.clone()) else {
            return;
        };
        for viewer_id in self.teams.viewers_of(&team_name) {
            let Some(viewer) = self.players.get(&viewer_id).map(|data| data.subject.clone()) else {
                self.teams.forget(&viewer_id, &team_name);
                continue;
            };
            let platform = &self.context.platform;
            report(self.teams.unregister(&viewer_id, &team_name, || {
                platform.unregister_team(&viewer, &team_name)
            }));
        }
    }

    fn update_everywhere(&mut self, id: SubjectId) {
        let Some(team_name) = self.players.get(&id).map(|data| data.team_name.clone()) else {
            return;
        };
        for viewer_id in self.teams.viewers_of(&team_name) {
            self.update_for(id, viewer_id);
        }
        self.replicate(id);
    }

    fn update_for(&mut self, id: SubjectId, viewer_id: SubjectId) {
        let Some((viewer, viewer_hides_tags)) = self
            .players
            .get(&viewer_id)
            .map(|data| (data.subject.clone(), data.invisible_view))
        else {
            return;
        };
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if !self.teams.contains(&viewer_id, &data.team_name) {
            return;
        }
        let team = team_for(&self.context, &self.config, data, &viewer, viewer_hides_tags);
        let platform = &self.context.platform;
        report(self.teams.update(&viewer_id, &team.name, || {
            platform.update_team(&viewer, &team)
        }));
    }

    fn replicate(&self, id: SubjectId) {
        let Some(data) = self.players.get(&id) else {
            return;
        };
        if !data.flags.is_active() {
            return;
        }
        self.context.send(&TeamUpdateMessage {
            id,
            team_name: data.team_name.clone(),
            prefix: data.prefix.get().to_string(),
            suffix: data.suffix.get().to_string(),
            visibility: NameVisibility::from_visible(!data.hidden && !self.config.invisible_name_tags),
            collision: CollisionRule::from_enabled(collision_of(&self.config, data)),
        });
    }

    // Remote teams

    fn remote_team_update(&mut self, remote: &Arc<RemoteSubject>, message: TeamUpdateMessage) {
        let team = RemoteTeam::from(&message);
        let previous = remote.update(|state| state.team.replace(team.clone()));
        if let Some(previous) = previous.filter(|previous| previous.team_name != team.team_name) {
            self.unregister_remote(&previous.team_name);
        }
        self.sync_remote(remote, true);
    }

    /// Brings every viewer's registration of a remote team in line with
    /// the remote's current state
    fn sync_remote(&mut self, remote: &Arc<RemoteSubject>, send_updates: bool) {
        for viewer in self.all() {
            self.sync_remote_for(remote, &viewer, send_updates);
        }
    }

    fn sync_remote_for(&mut self, remote: &RemoteSubject, viewer: &Arc<Subject>, send_updates: bool) {
        let Some(remote_team) = remote.team() else {
            return;
        };
        let viewer_hides_tags = self
            .players
            .get(&viewer.id())
            .is_some_and(|data| data.invisible_view);
        let visible = !remote.is_vanished()
            || self
                .context
                .platform
                .has_permission(viewer, SEE_VANISHED_PERMISSION);
        let registered = self.teams.contains(&viewer.id(), &remote_team.team_name);
        let platform = &self.context.platform;
        let team = Team {
            name: remote_team.team_name.clone(),
            prefix: remote_team.prefix.clone(),
            suffix: remote_team.suffix.clone(),
            visibility: if viewer_hides_tags {
                NameVisibility::Never
            } else {
                remote_team.visibility
            },
            collision: remote_team.collision,
            members: vec![remote.nickname()],
            options: team_options(&self.config),
        };
        match (registered, visible) {
            (false, true) => report(self.teams.register(viewer.id(), team.name.clone(), || {
                platform.register_team(viewer, &team)
            })),
            (true, false) => report(self.teams.unregister(&viewer.id(), &team.name, || {
                platform.unregister_team(viewer, &team.name)
            })),
            (true, true) if send_updates => report(self.teams.update(&viewer.id(), &team.name, || {
                platform.update_team(viewer, &team)
            })),
            _ => {}
        }
    }

    /// Team members are added by nickname, so the team is registered again
    /// with the new one
    fn remote_rename(&mut self, remote: &Arc<RemoteSubject>) {
        if let Some(team) = remote.team() {
            self.unregister_remote(&team.team_name);
        }
        self.sync_remote(remote, false);
    }

    fn remote_quit(&mut self, remote: &RemoteSubject) {
        if let Some(team) = remote.team() {
            self.unregister_remote(&team.team_name);
        }
    }

    fn unregister_remote(&mut self, team_name: &String) {
        for viewer_id in self.teams.viewers_of(team_name) {
            let Some(viewer) = self.players.get(&viewer_id).map(|data| data.subject.clone()) else {
                self.teams.forget(&viewer_id, team_name);
                continue;
            };
            let platform = &self.context.platform;
            report(self.teams.unregister(&viewer_id, team_name, || {
                platform.unregister_team(&viewer, team_name)
            }));
        }
    }

    // Helpers

    fn all(&self) -> Vec<Arc<Subject>> {
        self.players.values().map(|data| data.subject.clone()).collect()
    }

    fn others(&self, id: &SubjectId) -> Vec<Arc<Subject>> {
        self.players
            .values()
            .filter(|data| data.subject.id() != *id)
            .map(|data| data.subject.clone())
            .collect()
    }
}

fn collision_of(config: &NameTagConfig, data: &TeamData) -> bool {
    data.forced_collision.unwrap_or(config.collision_rule)
}

fn team_options(config: &NameTagConfig) -> u8 {
    if config.can_see_friendly_invisibles {
        2
    } else {
        0
    }
}

fn team_for(
    context: &FeatureContext,
    config: &NameTagConfig,
    data: &mut TeamData,
    viewer: &Subject,
    viewer_hides_tags: bool,
) -> Team {
    let subject = data.subject.clone();
    let relational = |text: &str| context.text.expand_relational(text, &subject, viewer);
    let prefix = data.prefix.format_for(viewer.id(), relational).to_string();
    let suffix = data.suffix.format_for(viewer.id(), relational).to_string();
    let visible = !data.hidden
        && !data.hidden_for.contains(&viewer.id())
        && !config.invisible_name_tags
        && !viewer_hides_tags;
    Team {
        name: data.team_name.clone(),
        prefix,
        suffix,
        visibility: NameVisibility::from_visible(visible),
        collision: CollisionRule::from_enabled(collision_of(config, data)),
        members: vec![subject.nickname()],
        options: team_options(config),
    }
}
