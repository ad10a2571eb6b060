use std::{collections::HashMap, sync::Arc, time::Duration};

use log::{debug, trace};

use tabsync_shared::{
    server_matches, GameMode, GroupDefinitions, GroupMembership, Message, ProtocolError,
    ServerGroups, SubjectId, TablistEntry, TablistFormatMessage,
};

use crate::{
    executor::{CategoryUsage, FeatureExecutor},
    features::{Feature, FeatureContext, PublishedFormats},
    lifecycle::{report, RegistrationLedger},
    platform::SEE_VANISHED_PERMISSION,
    replication::{MessageKinds, RemoteListener},
    visibility::{should_see, should_see_remote, Standing},
    ExecutorError, RemoteSubject, Subject,
};

/// Contains Config properties which will be used by [`GlobalPlayerList`]
#[derive(Debug, Clone)]
pub struct GlobalPlayerListConfig {
    /// Server groups, clusters and spy servers
    pub groups: GroupDefinitions,
    /// Shows subjects of other servers in spectator mode
    pub others_as_spectators: bool,
    /// Shows vanished subjects in spectator mode
    pub vanished_as_spectators: bool,
    /// Forwards latency changes to viewers on other servers
    pub update_latency: bool,
    /// How long after a server switch entries are re-sent. The platform
    /// removes the subject from other tablists on its own shortly after the
    /// switch.
    pub server_switch_delay: Duration,
}

impl Default for GlobalPlayerListConfig {
    fn default() -> Self {
        Self {
            groups: GroupDefinitions {
                spy_servers: vec!["spyserver1".to_string()],
                ..Default::default()
            },
            others_as_spectators: false,
            vanished_as_spectators: true,
            update_latency: false,
            server_switch_delay: Duration::from_millis(200),
        }
    }
}

/// Shows subjects of other servers in the same group in every viewer's
/// player list
pub struct GlobalPlayerList {
    groups: Arc<ServerGroups>,
    server_switch_delay: Duration,
    executor: FeatureExecutor<GlobalListState>,
}

impl GlobalPlayerList {
    /// `formats` supplies display names of listed subjects when tablist
    /// formatting is enabled
    pub fn new(
        context: FeatureContext,
        config: GlobalPlayerListConfig,
        formats: Option<Arc<PublishedFormats>>,
    ) -> Result<Self, ExecutorError> {
        let groups = Arc::new(ServerGroups::new(config.groups.clone()));
        let state = GlobalListState {
            context,
            groups: groups.clone(),
            others_as_spectators: config.others_as_spectators,
            vanished_as_spectators: config.vanished_as_spectators,
            update_latency: config.update_latency,
            formats,
            players: HashMap::new(),
            remotes: HashMap::new(),
            entries: RegistrationLedger::new("tablist entry"),
        };
        Ok(Self {
            groups,
            server_switch_delay: config.server_switch_delay,
            executor: FeatureExecutor::new("global-playerlist", state)?,
        })
    }

    pub(crate) fn register_messages(
        feature: &Arc<Self>,
        kinds: &mut MessageKinds,
    ) -> Result<(), ProtocolError> {
        let feature = feature.clone();
        kinds.add::<TablistFormatMessage>(move |inbound, _, message| {
            let Some(remote) = inbound.known(&message.id, TablistFormatMessage::NAME) else {
                return;
            };
            feature.executor.submit("remote-format", move |state| {
                state.remote_format(&remote, message.format)
            });
        })
    }

    pub fn groups(&self) -> &ServerGroups {
        &self.groups
    }

    /// Subjects in `group` who are not vanished, local and remote. `None`
    /// if no such group is configured. Blocks until the queue is drained up
    /// to this call, so it must not be called from a feature task.
    pub fn online_count(&self, group: &str) -> Result<Option<usize>, ExecutorError> {
        let Some(patterns) = self.groups.group_patterns(group).map(<[String]>::to_vec) else {
            return Ok(None);
        };
        self.executor.query("online-count", move |state| {
            let local = state
                .players
                .values()
                .filter(|listed| !listed.subject.is_vanished() && server_matches(&listed.server, &patterns))
                .count();
            let remote = state
                .remotes
                .values()
                .filter(|listed| !listed.remote.is_vanished() && server_matches(&listed.server, &patterns))
                .count();
            Some(local + remote)
        })
    }
}

impl Feature for GlobalPlayerList {
    fn name(&self) -> &'static str {
        "Global PlayerList"
    }

    fn on_join(&self, subject: &Arc<Subject>) {
        let subject = subject.clone();
        self.executor.submit("join", move |state| state.join(subject));
    }

    fn on_quit(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("quit", move |state| state.quit(id));
    }

    fn on_server_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        let server = subject.server();
        self.executor
            .submit("server-switch", move |state| state.move_to(id, server));
        self.executor
            .submit_delayed("server-switch", self.server_switch_delay, move |state| {
                state.resend(id)
            });
    }

    fn on_vanish_change(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("vanish", move |state| state.vanish_change(id));
    }

    fn on_game_mode_change(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("game-mode", move |state| state.game_mode_change(id));
    }

    fn on_tablist_clear(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("tablist-clear", move |state| state.tablist_clear(id));
    }

    fn refresh(&self, subject: &Arc<Subject>, _force: bool) {
        let id = subject.id();
        self.executor
            .submit("latency", move |state| state.latency_change(id));
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

impl RemoteListener for GlobalPlayerList {
    fn on_remote_join(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-join", move |state| state.remote_join(remote));
    }

    fn on_remote_server_switch(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-server-switch", move |state| state.remote_switch(remote));
    }

    fn on_remote_vanish_change(&self, remote: &Arc<RemoteSubject>) {
        let remote = remote.clone();
        self.executor
            .submit("remote-vanish", move |state| state.remote_vanish(remote));
    }

    fn on_remote_nickname_change(&self, remote: &Arc<RemoteSubject>, _previous: &str) {
        let remote = remote.clone();
        self.executor
            .submit("remote-nickname", move |state| state.remote_rename(remote));
    }

    fn on_remote_quit(&self, remote: &Arc<RemoteSubject>) {
        let id = remote.id();
        self.executor
            .submit("remote-quit", move |state| state.remote_quit(id));
    }
}

/// A local subject as the player list last saw it
struct Listed {
    subject: Arc<Subject>,
    server: String,
    membership: GroupMembership,
}

impl Listed {
    fn standing(&self) -> Standing<'_> {
        Standing {
            id: self.subject.id(),
            server: &self.server,
            membership: &self.membership,
        }
    }
}

struct RemoteListed {
    remote: Arc<RemoteSubject>,
    server: String,
    membership: GroupMembership,
}

impl RemoteListed {
    fn standing(&self) -> Standing<'_> {
        Standing {
            id: self.remote.id(),
            server: &self.server,
            membership: &self.membership,
        }
    }
}

struct GlobalListState {
    context: FeatureContext,
    groups: Arc<ServerGroups>,
    others_as_spectators: bool,
    vanished_as_spectators: bool,
    update_latency: bool,
    formats: Option<Arc<PublishedFormats>>,
    players: HashMap<SubjectId, Listed>,
    remotes: HashMap<SubjectId, RemoteListed>,
    /// Keyed by the tablist id of the listed subject
    entries: RegistrationLedger<SubjectId>,
}

impl GlobalListState {
    fn join(&mut self, subject: Arc<Subject>) {
        let id = subject.id();
        if self.players.contains_key(&id) {
            debug!("{} is already listed, ignoring repeated join", subject.name());
            return;
        }
        let server = subject.server();
        let membership = self.groups.membership(&server);
        self.players.insert(
            id,
            Listed {
                subject,
                server,
                membership,
            },
        );

        for other in self.other_ids(&id) {
            if self.same_server(&id, &other) {
                continue;
            }
            self.show_if_visible(&other, &id);
            self.show_if_visible(&id, &other);
        }
        let remotes: Vec<_> = self.remotes.keys().copied().collect();
        for remote in remotes {
            self.show_remote_if_visible(&id, &remote);
        }
    }

    fn quit(&mut self, id: SubjectId) {
        let Some(listed) = self.players.remove(&id) else {
            return;
        };
        let tablist_id = listed.subject.tablist_id();
        for viewer in self.entries.viewers_of(&tablist_id) {
            self.hide(&viewer, &tablist_id);
        }
        self.entries.forget_viewer(&id);
    }

    /// Recomputes the membership right away; entries follow after the
    /// server switch delay
    fn move_to(&mut self, id: SubjectId, server: String) {
        let membership = self.groups.membership(&server);
        if let Some(listed) = self.players.get_mut(&id) {
            listed.server = server;
            listed.membership = membership;
        }
    }

    fn resend(&mut self, id: SubjectId) {
        let Some(tablist_id) = self.players.get(&id).map(|listed| listed.subject.tablist_id()) else {
            return;
        };
        for viewer in self.other_ids(&id) {
            if self.same_server(&viewer, &id) {
                // the backend lists subjects of its own server
                self.entries.forget(&viewer, &tablist_id);
                continue;
            }
            self.hide(&viewer, &tablist_id);
            self.show_if_visible(&viewer, &id);
        }
    }

    /// The platform dropped every entry of the viewer's player list
    fn tablist_clear(&mut self, viewer: SubjectId) {
        if !self.players.contains_key(&viewer) {
            return;
        }
        self.entries.forget_viewer(&viewer);
        for other in self.other_ids(&viewer) {
            if !self.same_server(&viewer, &other) {
                self.show_if_visible(&viewer, &other);
            }
        }
        let remotes: Vec<_> = self.remotes.keys().copied().collect();
        for remote in remotes {
            self.show_remote_if_visible(&viewer, &remote);
        }
    }

    fn vanish_change(&mut self, id: SubjectId) {
        let Some(listed) = self.players.get(&id) else {
            return;
        };
        let vanished = listed.subject.is_vanished();
        let tablist_id = listed.subject.tablist_id();
        for viewer in self.other_ids(&id) {
            if self.same_server(&viewer, &id) {
                continue;
            }
            if vanished {
                if !self.sees(&viewer, &id) {
                    self.hide(&viewer, &tablist_id);
                }
            } else {
                self.show_if_visible(&viewer, &id);
            }
        }
    }

    fn game_mode_change(&mut self, id: SubjectId) {
        let Some(target) = self.players.get(&id) else {
            return;
        };
        let tablist_id = target.subject.tablist_id();
        for viewer in self.entries.viewers_of(&tablist_id) {
            let (Some(viewer), Some(target)) = (self.players.get(&viewer), self.players.get(&id)) else {
                continue;
            };
            let game_mode = self.game_mode_of(target, viewer);
            self.context
                .platform
                .update_game_mode(&viewer.subject, tablist_id, game_mode);
        }
    }

    fn latency_change(&mut self, id: SubjectId) {
        if !self.update_latency {
            return;
        }
        let Some(target) = self.players.get(&id) else {
            return;
        };
        let tablist_id = target.subject.tablist_id();
        let latency = target.subject.latency();
        for viewer in self.entries.viewers_of(&tablist_id) {
            let Some(viewer) = self.players.get(&viewer) else {
                continue;
            };
            if viewer.membership.group == target.membership.group {
                self.context
                    .platform
                    .update_latency(&viewer.subject, tablist_id, latency);
            }
        }
    }

    fn unload(&mut self) {
        for (viewer, key) in self.entries.entries() {
            if let Some(viewer) = self.players.get(&viewer) {
                self.context
                    .platform
                    .remove_tablist_entry(&viewer.subject, key);
            }
        }
        self.entries = RegistrationLedger::new("tablist entry");
        self.players.clear();
        self.remotes.clear();
    }

    // Remote subjects

    fn remote_join(&mut self, remote: Arc<RemoteSubject>) {
        let id = remote.id();
        let server = remote.server();
        trace!("Listing remote subject {} on {server}", remote.name());
        let membership = self.groups.membership(&server);
        self.remotes.insert(
            id,
            RemoteListed {
                remote,
                server,
                membership,
            },
        );
        let viewers: Vec<_> = self.players.keys().copied().collect();
        for viewer in viewers {
            self.show_remote_if_visible(&viewer, &id);
        }
    }

    fn remote_switch(&mut self, remote: Arc<RemoteSubject>) {
        let id = remote.id();
        let server = remote.server();
        let membership = self.groups.membership(&server);
        match self.remotes.get_mut(&id) {
            Some(listed) => {
                listed.server = server;
                listed.membership = membership;
            }
            None => return self.remote_join(remote),
        }
        let viewers: Vec<_> = self.players.keys().copied().collect();
        for viewer in viewers {
            if self.same_server_as_remote(&viewer, &id) {
                self.entries.forget(&viewer, &id);
            } else if self.sees_remote(&viewer, &id) {
                self.show_remote(&viewer, &id);
            } else {
                self.hide(&viewer, &id);
            }
        }
    }

    fn remote_vanish(&mut self, remote: Arc<RemoteSubject>) {
        let id = remote.id();
        if !self.remotes.contains_key(&id) {
            return self.remote_join(remote);
        }
        let viewers: Vec<_> = self.players.keys().copied().collect();
        for viewer in viewers {
            if remote.is_vanished() {
                if !self.sees_remote(&viewer, &id) {
                    self.hide(&viewer, &id);
                }
            } else {
                self.show_remote_if_visible(&viewer, &id);
            }
        }
    }

    /// Entry names cannot be changed in place, so every listed entry is
    /// sent again
    fn remote_rename(&mut self, remote: Arc<RemoteSubject>) {
        let id = remote.id();
        if !self.remotes.contains_key(&id) {
            return self.remote_join(remote);
        }
        for viewer in self.entries.viewers_of(&id) {
            self.hide(&viewer, &id);
            self.show_remote(&viewer, &id);
        }
    }

    fn remote_quit(&mut self, id: SubjectId) {
        if self.remotes.remove(&id).is_none() {
            return;
        }
        for viewer in self.entries.viewers_of(&id) {
            self.hide(&viewer, &id);
        }
    }

    fn remote_format(&mut self, remote: &RemoteSubject, format: String) {
        remote.update(|state| state.tablist_format = Some(format.clone()));
        let id = remote.id();
        for viewer in self.entries.viewers_of(&id) {
            let Some(viewer) = self.players.get(&viewer) else {
                continue;
            };
            let platform = &self.context.platform;
            report(self.entries.update(&viewer.subject.id(), &id, || {
                platform.update_display_name(&viewer.subject, id, Some(&format))
            }));
        }
    }

    // Entries

    fn sees(&self, viewer: &SubjectId, target: &SubjectId) -> bool {
        let (Some(viewer), Some(target)) = (self.players.get(viewer), self.players.get(target)) else {
            return false;
        };
        should_see(&viewer.standing(), &target.standing(), || {
            self.context.platform.can_see(&viewer.subject, &target.subject)
        })
    }

    fn sees_remote(&self, viewer: &SubjectId, target: &SubjectId) -> bool {
        let (Some(viewer), Some(target)) = (self.players.get(viewer), self.remotes.get(target)) else {
            return false;
        };
        should_see_remote(
            &viewer.standing(),
            &target.standing(),
            target.remote.is_vanished(),
            || {
                self.context
                    .platform
                    .has_permission(&viewer.subject, SEE_VANISHED_PERMISSION)
            },
        )
    }

    fn show_if_visible(&mut self, viewer: &SubjectId, target: &SubjectId) {
        if self.sees(viewer, target) {
            self.show(viewer, target);
        }
    }

    fn show_remote_if_visible(&mut self, viewer: &SubjectId, target: &SubjectId) {
        if !self.same_server_as_remote(viewer, target) && self.sees_remote(viewer, target) {
            self.show_remote(viewer, target);
        }
    }

    fn show(&mut self, viewer: &SubjectId, target: &SubjectId) {
        let (Some(viewer), Some(target)) = (self.players.get(viewer), self.players.get(target)) else {
            return;
        };
        let key = target.subject.tablist_id();
        if self.entries.contains(&viewer.subject.id(), &key) {
            return;
        }
        let entry = TablistEntry {
            id: key,
            name: target.subject.nickname(),
            listed: true,
            latency: if self.update_latency {
                target.subject.latency()
            } else {
                0
            },
            game_mode: self.game_mode_of(target, viewer),
            display_name: self
                .formats
                .as_ref()
                .and_then(|formats| formats.get(&target.subject.id())),
        };
        let platform = &self.context.platform;
        report(self.entries.register(viewer.subject.id(), key, || {
            platform.add_tablist_entry(&viewer.subject, &entry)
        }));
    }

    fn show_remote(&mut self, viewer: &SubjectId, target: &SubjectId) {
        let (Some(viewer), Some(target)) = (self.players.get(viewer), self.remotes.get(target)) else {
            return;
        };
        let key = target.remote.id();
        if self.entries.contains(&viewer.subject.id(), &key) {
            return;
        }
        let spectator = self.others_as_spectators
            || (self.vanished_as_spectators && target.remote.is_vanished());
        let entry = TablistEntry {
            id: key,
            name: target.remote.nickname(),
            listed: true,
            latency: 0,
            game_mode: if spectator {
                GameMode::SPECTATOR
            } else {
                GameMode::SURVIVAL
            },
            display_name: target.remote.tablist_format(),
        };
        let platform = &self.context.platform;
        report(self.entries.register(viewer.subject.id(), key, || {
            platform.add_tablist_entry(&viewer.subject, &entry)
        }));
    }

    /// Removes an entry if the viewer holds it
    fn hide(&mut self, viewer: &SubjectId, key: &SubjectId) {
        if !self.entries.contains(viewer, key) {
            return;
        }
        let Some(viewer) = self.players.get(viewer) else {
            self.entries.forget(viewer, key);
            return;
        };
        let platform = &self.context.platform;
        report(self.entries.unregister(&viewer.subject.id(), key, || {
            platform.remove_tablist_entry(&viewer.subject, *key)
        }));
    }

    fn game_mode_of(&self, target: &Listed, viewer: &Listed) -> GameMode {
        if (self.others_as_spectators && target.server != viewer.server)
            || (self.vanished_as_spectators && target.subject.is_vanished())
        {
            GameMode::SPECTATOR
        } else {
            target.subject.game_mode()
        }
    }

    // Helpers

    fn other_ids(&self, id: &SubjectId) -> Vec<SubjectId> {
        self.players.keys().filter(|other| *other != id).copied().collect()
    }

    fn same_server(&self, a: &SubjectId, b: &SubjectId) -> bool {
        match (self.players.get(a), self.players.get(b)) {
            (Some(a), Some(b)) => a.server == b.server,
            _ => false,
        }
    }

    fn same_server_as_remote(&self, viewer: &SubjectId, remote: &SubjectId) -> bool {
        match (self.players.get(viewer), self.remotes.get(remote)) {
            (Some(viewer), Some(remote)) => viewer.server == remote.server,
            _ => false,
        }
    }
}
