mod registry;

pub use registry::RemoteRegistry;

use parking_lot::RwLock;

use tabsync_shared::{CollisionRule, JoinMessage, NameVisibility, NodeId, SubjectId, TeamUpdateMessage};

/// Last name tag replicated for a remote subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTeam {
    pub team_name: String,
    pub prefix: String,
    pub suffix: String,
    pub visibility: NameVisibility,
    pub collision: CollisionRule,
}

impl From<&TeamUpdateMessage> for RemoteTeam {
    fn from(message: &TeamUpdateMessage) -> Self {
        Self {
            team_name: message.team_name.clone(),
            prefix: message.prefix.clone(),
            suffix: message.suffix.clone(),
            visibility: message.visibility,
            collision: message.collision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteScore {
    pub value: i32,
    pub fancy_value: String,
}

/// Last known state of a remote subject. Each field group is written by a
/// single executor: membership fields by replication, the rest by the
/// feature owning them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    pub nickname: String,
    pub server: String,
    pub vanished: bool,
    pub team: Option<RemoteTeam>,
    pub score: Option<RemoteScore>,
    pub tablist_format: Option<String>,
}

/// A subject connected to another node, as last replicated
#[derive(Debug)]
pub struct RemoteSubject {
    id: SubjectId,
    node: NodeId,
    name: String,
    state: RwLock<RemoteState>,
}

impl RemoteSubject {
    pub fn new(node: NodeId, join: &JoinMessage) -> Self {
        Self {
            id: join.id,
            node,
            name: join.name.clone(),
            state: RwLock::new(RemoteState {
                nickname: join.nickname.clone(),
                server: join.server.clone(),
                vanished: join.vanished,
                team: None,
                score: None,
                tablist_format: None,
            }),
        }
    }

    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// Node the subject is connected to
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RemoteState {
        self.state.read().clone()
    }

    pub fn nickname(&self) -> String {
        self.state.read().nickname.clone()
    }

    pub fn server(&self) -> String {
        self.state.read().server.clone()
    }

    pub fn is_vanished(&self) -> bool {
        self.state.read().vanished
    }

    pub fn team(&self) -> Option<RemoteTeam> {
        self.state.read().team.clone()
    }

    pub fn score(&self) -> Option<RemoteScore> {
        self.state.read().score.clone()
    }

    pub fn tablist_format(&self) -> Option<String> {
        self.state.read().tablist_format.clone()
    }

    pub(crate) fn update<R>(&self, update: impl FnOnce(&mut RemoteState) -> R) -> R {
        update(&mut self.state.write())
    }
}
