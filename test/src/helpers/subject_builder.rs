use tabsync_server::{
    shared::{GameMode, SubjectId},
    SubjectInfo,
};

/// Subject identity from a small number
pub fn id(value: u128) -> SubjectId {
    SubjectId::from_u128(value)
}

/// Builds the [`SubjectInfo`] of a joining subject
pub struct SubjectBuilder {
    info: SubjectInfo,
}

impl SubjectBuilder {
    pub fn new(value: u128, name: &str, server: &str) -> Self {
        Self {
            info: SubjectInfo::new(id(value), name, server),
        }
    }

    pub fn tablist_id(mut self, value: u128) -> Self {
        self.info.tablist_id = id(value);
        self
    }

    pub fn nickname(mut self, nickname: &str) -> Self {
        self.info.nickname = nickname.to_string();
        self
    }

    pub fn world(mut self, world: &str) -> Self {
        self.info.world = world.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.info.group = group.to_string();
        self
    }

    pub fn vanished(mut self) -> Self {
        self.info.vanished = true;
        self
    }

    pub fn latency(mut self, latency: u32) -> Self {
        self.info.latency = latency;
        self
    }

    pub fn game_mode(mut self, game_mode: GameMode) -> Self {
        self.info.game_mode = game_mode;
        self
    }

    pub fn build(self) -> SubjectInfo {
        self.info
    }
}
