use std::default::Default;

use tabsync_shared::NodeId;

use crate::{
    features::{
        GlobalPlayerListConfig, HeaderFooterConfig, NameTagConfig, PlayerListObjectiveConfig,
        TablistFormatConfig,
    },
    sorting::SortingConfig,
};

/// Contains Config properties which will be used by the [`SyncServer`](crate::SyncServer).
/// A feature runs when its config is `Some`.
#[derive(Clone)]
pub struct SyncConfig {
    /// Identity of this node on the replication channel
    pub node_id: NodeId,
    /// Used to order subjects in the player list through their team names
    pub sorting: SortingConfig,
    pub name_tags: Option<NameTagConfig>,
    pub global_player_list: Option<GlobalPlayerListConfig>,
    pub player_list_objective: Option<PlayerListObjectiveConfig>,
    pub tablist_format: Option<TablistFormatConfig>,
    pub header_footer: Option<HeaderFooterConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::random(),
            sorting: SortingConfig::default(),
            name_tags: Some(NameTagConfig::default()),
            global_player_list: None,
            player_list_objective: None,
            tablist_format: Some(TablistFormatConfig::default()),
            header_footer: Some(HeaderFooterConfig::default()),
        }
    }
}
