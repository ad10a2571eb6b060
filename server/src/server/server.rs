use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};

use tabsync_shared::{
    GameMode, Message, NodeId, PropertyStore, QuitMessage, ScoreUpdateMessage,
    ServerSwitchMessage, SubjectId, TablistFormatMessage, TeamUpdateMessage, VanishMessage,
    DEFAULT_GROUP,
};

use crate::{
    executor::CategoryUsage,
    features::{
        Feature, FeatureContext, GlobalPlayerList, HeaderFooter, NameTags, PlayerListObjective,
        TablistFormat,
    },
    remote::{RemoteScore, RemoteTeam},
    replication::{
        join_message, MessageKinds, Outbound, RemoteListener, Replication, ReplicationChannel,
    },
    sorting::Sorting,
    Platform, RemoteRegistry, Subject, SubjectInfo, SubjectRegistry, SyncConfig, SyncServerError,
    TextEngine,
};

/// What a [`SyncServer`] needs from its host
#[derive(Clone)]
pub struct Collaborators {
    pub platform: Arc<dyn Platform>,
    pub text: Arc<dyn TextEngine>,
    pub properties: Arc<PropertyStore>,
    /// Pub/sub channel shared with the other nodes. Without one the node
    /// runs on its own.
    pub channel: Option<Arc<dyn ReplicationChannel>>,
}

/// Keeps name tags, player list entries, scores and header/footer of every
/// connected subject in sync for every viewer, and replicates local state
/// to the other nodes.
///
/// Platform events are reported through the event methods, which update
/// the [`SubjectRegistry`] right away and hand the rest of the work to the
/// features' executors. Bytes from the replication channel go to
/// [`receive`](Self::receive).
pub struct SyncServer {
    node: NodeId,
    enabled: bool,
    subjects: Arc<SubjectRegistry>,
    remotes: Arc<RemoteRegistry>,
    properties: Arc<PropertyStore>,
    sorting: Arc<Sorting>,
    outbound: Option<Outbound>,
    replication: Option<Replication>,
    /// In load order
    features: Vec<Arc<dyn Feature>>,
    name_tags: Option<Arc<NameTags>>,
    global_player_list: Option<Arc<GlobalPlayerList>>,
    player_list_objective: Option<Arc<PlayerListObjective>>,
    tablist_format: Option<Arc<TablistFormat>>,
    header_footer: Option<Arc<HeaderFooter>>,
    shut_down: AtomicBool,
}

impl SyncServer {
    /// Starts every configured feature and, with a channel, replication.
    /// Peers are asked for their state right away.
    pub fn new(config: SyncConfig, collaborators: Collaborators) -> Result<Self, SyncServerError> {
        let Collaborators {
            platform,
            text,
            properties,
            channel,
        } = collaborators;

        let subjects = Arc::new(SubjectRegistry::new());
        let remotes = Arc::new(RemoteRegistry::new());
        let sorting = Arc::new(Sorting::new(config.sorting.clone()));
        let outbound = channel.map(|channel| Outbound::new(config.node_id, channel));
        let context = FeatureContext {
            platform,
            text,
            properties: properties.clone(),
            remotes: remotes.clone(),
            outbound: outbound.clone(),
        };

        // the global player list reads the formats published by tablist formatting
        let tablist_format = config
            .tablist_format
            .map(|config| TablistFormat::new(context.clone(), config).map(Arc::new))
            .transpose()?;
        let global_player_list = config
            .global_player_list
            .map(|config| {
                let formats = tablist_format.as_ref().map(|feature| feature.formats());
                GlobalPlayerList::new(context.clone(), config, formats).map(Arc::new)
            })
            .transpose()?;
        let name_tags = config
            .name_tags
            .map(|config| NameTags::new(context.clone(), config, sorting.clone()).map(Arc::new))
            .transpose()?;
        let player_list_objective = config
            .player_list_objective
            .map(|config| PlayerListObjective::new(context.clone(), config).map(Arc::new))
            .transpose()?;
        let header_footer = config
            .header_footer
            .map(|config| HeaderFooter::new(context.clone(), config).map(Arc::new))
            .transpose()?;

        let mut features: Vec<Arc<dyn Feature>> = Vec::new();
        let mut listeners: Vec<Arc<dyn RemoteListener>> = Vec::new();
        let mut kinds = MessageKinds::new();
        if let Some(feature) = &tablist_format {
            features.push(feature.clone());
            listeners.push(feature.clone());
        }
        match &global_player_list {
            Some(feature) => {
                features.push(feature.clone());
                listeners.push(feature.clone());
                GlobalPlayerList::register_messages(feature, &mut kinds)?;
            }
            None => kinds.add::<TablistFormatMessage>(|inbound, _, message| {
                if let Some(remote) = inbound.known(&message.id, TablistFormatMessage::NAME) {
                    remote.update(|state| state.tablist_format = Some(message.format));
                }
            })?,
        }
        match &name_tags {
            Some(feature) => {
                features.push(feature.clone());
                listeners.push(feature.clone());
                NameTags::register_messages(feature, &mut kinds)?;
            }
            None => kinds.add::<TeamUpdateMessage>(|inbound, _, message| {
                if let Some(remote) = inbound.known(&message.id, TeamUpdateMessage::NAME) {
                    remote.update(|state| state.team = Some(RemoteTeam::from(&message)));
                }
            })?,
        }
        match &player_list_objective {
            Some(feature) => {
                features.push(feature.clone());
                listeners.push(feature.clone());
                PlayerListObjective::register_messages(feature, &mut kinds)?;
            }
            None => kinds.add::<ScoreUpdateMessage>(|inbound, _, message| {
                if let Some(remote) = inbound.known(&message.id, ScoreUpdateMessage::NAME) {
                    remote.update(|state| {
                        state.score = Some(RemoteScore {
                            value: message.value,
                            fancy_value: message.fancy_value,
                        })
                    });
                }
            })?,
        }
        if let Some(feature) = &header_footer {
            features.push(feature.clone());
        }

        let replication = outbound
            .clone()
            .map(|outbound| {
                Replication::new(outbound, subjects.clone(), remotes.clone(), listeners, kinds)
            })
            .transpose()?;
        if let Some(replication) = &replication {
            replication.request_load();
        }

        info!(
            "Node {} started with {} features{}",
            config.node_id,
            features.len(),
            if replication.is_some() {
                ", replication enabled"
            } else {
                ""
            }
        );

        Ok(Self {
            node: config.node_id,
            enabled: true,
            subjects,
            remotes,
            properties,
            sorting,
            outbound,
            replication,
            features,
            name_tags,
            global_player_list,
            player_list_objective,
            tablist_format,
            header_footer,
            shut_down: AtomicBool::new(false),
        })
    }

    /// A server that only keeps the subject registry. No feature runs, no
    /// task is scheduled and nothing is registered on the platform.
    pub fn disabled(node: NodeId) -> Self {
        info!("Node {node} started disabled");
        Self {
            node,
            enabled: false,
            subjects: Arc::new(SubjectRegistry::new()),
            remotes: Arc::new(RemoteRegistry::new()),
            properties: Arc::new(PropertyStore::new()),
            sorting: Arc::new(Sorting::new(Default::default())),
            outbound: None,
            replication: None,
            features: Vec::new(),
            name_tags: None,
            global_player_list: None,
            player_list_objective: None,
            tablist_format: None,
            header_footer: None,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn subjects(&self) -> &SubjectRegistry {
        &self.subjects
    }

    pub fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn name_tags(&self) -> Option<&NameTags> {
        self.name_tags.as_deref()
    }

    pub fn global_player_list(&self) -> Option<&GlobalPlayerList> {
        self.global_player_list.as_deref()
    }

    pub fn player_list_objective(&self) -> Option<&PlayerListObjective> {
        self.player_list_objective.as_deref()
    }

    pub fn tablist_format(&self) -> Option<&TablistFormat> {
        self.tablist_format.as_deref()
    }

    pub fn header_footer(&self) -> Option<&HeaderFooter> {
        self.header_footer.as_deref()
    }

    // Platform events

    /// A subject connected. Joining twice returns the subject already
    /// registered and changes nothing.
    pub fn join(&self, info: SubjectInfo) -> Arc<Subject> {
        if let Some(subject) = self.subjects.get(&info.id) {
            debug!("{} is already connected, ignoring repeated join", subject.name());
            return subject;
        }
        let subject = Arc::new(info.into_subject());
        self.subjects.add(subject.clone());
        if !self.enabled {
            return subject;
        }
        self.send(&join_message(&subject));
        for feature in &self.features {
            feature.on_join(&subject);
        }
        subject
    }

    pub fn quit(&self, id: &SubjectId) {
        let Some(subject) = self.subjects.remove(id) else {
            debug!("Quit of unknown subject {id}");
            return;
        };
        if !self.enabled {
            return;
        }
        for feature in &self.features {
            feature.on_quit(&subject);
        }
        self.sorting.release(id);
        self.send(&QuitMessage { id: *id });
    }

    pub fn switch_server(&self, id: &SubjectId, server: impl Into<String>) {
        let server = server.into();
        let Some(subject) = self.changed(id, |state| replace(&mut state.server, server.clone())) else {
            return;
        };
        self.send(&ServerSwitchMessage {
            id: *id,
            server,
        });
        for feature in &self.features {
            feature.on_server_switch(&subject);
        }
    }

    pub fn switch_world(&self, id: &SubjectId, world: impl Into<String>) {
        let world = world.into();
        let Some(subject) = self.changed(id, |state| replace(&mut state.world, world)) else {
            return;
        };
        for feature in &self.features {
            feature.on_world_switch(&subject);
        }
    }

    pub fn set_vanished(&self, id: &SubjectId, vanished: bool) {
        let Some(subject) = self.changed(id, |state| replace(&mut state.vanished, vanished)) else {
            return;
        };
        self.send(&VanishMessage { id: *id, vanished });
        for feature in &self.features {
            feature.on_vanish_change(&subject);
        }
    }

    pub fn set_game_mode(&self, id: &SubjectId, game_mode: GameMode) {
        let Some(subject) = self.changed(id, |state| replace(&mut state.game_mode, game_mode)) else {
            return;
        };
        for feature in &self.features {
            feature.on_game_mode_change(&subject);
        }
    }

    /// New latency; every feature re-evaluates its values
    pub fn set_latency(&self, id: &SubjectId, latency: u32) {
        let Some(subject) = self.changed(id, |state| replace(&mut state.latency, latency)) else {
            return;
        };
        for feature in &self.features {
            feature.refresh(&subject, false);
        }
    }

    pub fn set_nickname(&self, id: &SubjectId, nickname: impl Into<String>) {
        let nickname = nickname.into();
        let Some(subject) = self.changed(id, |state| replace(&mut state.nickname, nickname)) else {
            return;
        };
        // peers take the new nickname from a repeated join
        self.send(&join_message(&subject));
        for feature in &self.features {
            feature.on_nickname_change(&subject);
        }
    }

    /// New permission group: the subject may sort differently, and its
    /// templates are reloaded
    pub fn set_group(&self, id: &SubjectId, group: impl Into<String>) {
        let group = group.into();
        let Some(subject) = self.changed(id, |state| replace(&mut state.group, group)) else {
            return;
        };
        if let (Some(name_tags), Some(team_name)) = (&self.name_tags, self.sorting.reassign(&subject)) {
            name_tags.update_team_name(*id, team_name);
        }
        for feature in &self.features {
            feature.refresh(&subject, true);
        }
    }

    /// The platform dropped every entry of the subject's player list, as it
    /// does when the subject switches servers
    pub fn tablist_cleared(&self, id: &SubjectId) {
        let Some(subject) = self.enabled_subject(id) else {
            return;
        };
        for feature in &self.features {
            feature.on_tablist_clear(&subject);
        }
    }

    /// Re-evaluates the subject's values and disable conditions
    pub fn refresh(&self, id: &SubjectId) {
        let Some(subject) = self.enabled_subject(id) else {
            return;
        };
        for feature in &self.features {
            feature.refresh(&subject, false);
        }
    }

    /// Refreshes every connected subject
    pub fn refresh_all(&self) {
        if !self.enabled {
            return;
        }
        for subject in self.subjects.snapshot().iter() {
            for feature in &self.features {
                feature.refresh(subject, false);
            }
        }
    }

    // Commands

    /// Reloads every template of the subject and re-sends what changed
    pub fn force_refresh(&self, id: &SubjectId) {
        let Some(subject) = self.enabled_subject(id) else {
            return;
        };
        for feature in &self.features {
            feature.refresh(&subject, true);
        }
    }

    /// Sets or, with `None`, removes a property of one subject. Returns
    /// false for unknown subjects.
    pub fn set_property(&self, id: &SubjectId, key: &str, value: Option<&str>) -> bool {
        let Some(subject) = self.subjects.get(id) else {
            debug!("Cannot set property {key} of unknown subject {id}");
            return false;
        };
        self.properties
            .set_user_property(subject.name(), key, value, None, None);
        self.force_refresh(id);
        true
    }

    /// Sets or, with `None`, removes a group property, optionally scoped
    /// to a server or world, and refreshes the group's subjects
    pub fn set_group_property(
        &self,
        group: &str,
        key: &str,
        value: Option<&str>,
        server: Option<&str>,
        world: Option<&str>,
    ) {
        if self
            .properties
            .set_group_property(group, key, value, server, world)
        {
            self.refresh_group(group);
        }
    }

    /// Drops every property of a group and refreshes its subjects
    pub fn remove_group(&self, group: &str) {
        if self.properties.remove_group(group) {
            self.refresh_group(group);
        }
    }

    fn refresh_group(&self, group: &str) {
        for subject in self.subjects.snapshot().iter() {
            if group == DEFAULT_GROUP || subject.group() == group {
                self.force_refresh(&subject.id());
            }
        }
    }

    // Replication

    /// Bytes received from the replication channel
    pub fn receive(&self, bytes: &[u8]) {
        if let Some(replication) = &self.replication {
            replication.receive(bytes);
        }
    }

    /// Blocks until every task submitted so far ran, replication first so
    /// that the work it forwards to features is included. Delayed tasks
    /// still waiting for their delay are not waited for.
    pub fn flush(&self) -> Result<(), SyncServerError> {
        if let Some(replication) = &self.replication {
            replication.flush()?;
        }
        for feature in &self.features {
            feature.flush()?;
        }
        Ok(())
    }

    /// Accumulated task time per executor and category
    pub fn usage(&self) -> Vec<(&'static str, Vec<(&'static str, CategoryUsage)>)> {
        let mut usage: Vec<_> = self
            .features
            .iter()
            .map(|feature| (feature.name(), feature.usage()))
            .collect();
        if let Some(replication) = &self.replication {
            usage.push(("Replication", replication.usage()));
        }
        usage
    }

    /// Removes everything registered on the platform, tells peers every
    /// local subject left and stops all executors. Later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) || !self.enabled {
            return;
        }
        for feature in &self.features {
            feature.unload();
        }
        for feature in &self.features {
            if let Err(err) = feature.flush() {
                warn!("{} did not unload cleanly: {err}", feature.name());
            }
            feature.shutdown();
        }
        for subject in self.subjects.snapshot().iter() {
            self.send(&QuitMessage { id: subject.id() });
        }
        if let Some(replication) = &self.replication {
            replication.shutdown();
        }
        info!("Node {} shut down", self.node);
    }

    // Helpers

    fn send<M: Message>(&self, message: &M) {
        if let Some(outbound) = &self.outbound {
            outbound.send(message);
        }
    }

    fn enabled_subject(&self, id: &SubjectId) -> Option<Arc<Subject>> {
        if !self.enabled {
            return None;
        }
        let subject = self.subjects.get(id);
        if subject.is_none() {
            debug!("Event for unknown subject {id}");
        }
        subject
    }

    /// Applies a change to the subject's state. Returns the subject if the
    /// previous value differed and features should hear about it.
    fn changed<T: PartialEq + Clone>(
        &self,
        id: &SubjectId,
        change: impl FnOnce(&mut crate::SubjectState) -> (T, T),
    ) -> Option<Arc<Subject>> {
        let subject = self.subjects.get(id);
        let Some(subject) = subject else {
            debug!("Event for unknown subject {id}");
            return None;
        };
        let (previous, current) = subject.update(change);
        if previous == current || !self.enabled {
            return None;
        }
        Some(subject)
    }
}

/// Stores `value`, returning the previous and the new value
fn replace<T: Clone>(slot: &mut T, value: T) -> (T, T) {
    let previous = std::mem::replace(slot, value.clone());
    (previous, value)
}

impl Drop for SyncServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
