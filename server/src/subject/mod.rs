mod registry;

pub use registry::SubjectRegistry;

use parking_lot::RwLock;

use tabsync_shared::{GameMode, PropertyLookup, SubjectId};

/// Mutable part of a subject, written by the event thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectState {
    pub nickname: String,
    pub server: String,
    pub world: String,
    pub group: String,
    pub vanished: bool,
    pub latency: u32,
    pub game_mode: GameMode,
}

/// A connected participant on this node
#[derive(Debug)]
pub struct Subject {
    id: SubjectId,
    tablist_id: SubjectId,
    name: String,
    state: RwLock<SubjectState>,
}

impl Subject {
    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// Identity of the subject's player list entry
    pub fn tablist_id(&self) -> SubjectId {
        self.tablist_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the current mutable state
    pub fn state(&self) -> SubjectState {
        self.state.read().clone()
    }

    pub fn nickname(&self) -> String {
        self.state.read().nickname.clone()
    }

    pub fn server(&self) -> String {
        self.state.read().server.clone()
    }

    pub fn world(&self) -> String {
        self.state.read().world.clone()
    }

    pub fn group(&self) -> String {
        self.state.read().group.clone()
    }

    pub fn is_vanished(&self) -> bool {
        self.state.read().vanished
    }

    pub fn latency(&self) -> u32 {
        self.state.read().latency
    }

    pub fn game_mode(&self) -> GameMode {
        self.state.read().game_mode
    }

    pub(crate) fn update<R>(&self, update: impl FnOnce(&mut SubjectState) -> R) -> R {
        update(&mut self.state.write())
    }

    /// Looks up a property for this subject in `lookup`
    pub(crate) fn with_lookup<R>(&self, lookup: impl FnOnce(&PropertyLookup<'_>) -> R) -> R {
        let state = self.state.read();
        let id = self.id.to_string();
        lookup(&PropertyLookup {
            name: &self.name,
            id: &id,
            group: &state.group,
            server: &state.server,
            world: &state.world,
        })
    }
}

/// Everything the platform reports about a joining subject
#[derive(Debug, Clone)]
pub struct SubjectInfo {
    pub id: SubjectId,
    pub tablist_id: SubjectId,
    pub name: String,
    pub nickname: String,
    pub server: String,
    pub world: String,
    pub group: String,
    pub vanished: bool,
    pub latency: u32,
    pub game_mode: GameMode,
}

impl SubjectInfo {
    pub fn new(id: SubjectId, name: impl Into<String>, server: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            tablist_id: id,
            nickname: name.clone(),
            name,
            server: server.into(),
            world: "world".to_string(),
            group: "default".to_string(),
            vanished: false,
            latency: 0,
            game_mode: GameMode::SURVIVAL,
        }
    }

    pub fn into_subject(self) -> Subject {
        Subject {
            id: self.id,
            tablist_id: self.tablist_id,
            name: self.name,
            state: RwLock::new(SubjectState {
                nickname: self.nickname,
                server: self.server,
                world: self.world,
                group: self.group,
                vanished: self.vanished,
                latency: self.latency,
                game_mode: self.game_mode,
            }),
        }
    }
}
