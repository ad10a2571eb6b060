use std::{sync::Arc, time::Duration};

use tabsync_server::{
    shared::{GroupDefinitions, NodeId, PropertyStore},
    Collaborators, GlobalPlayerListConfig, HeaderFooterConfig, NameTagConfig, PlainText,
    PlayerListObjectiveConfig, ReplicationChannel, Subject, SubjectInfo, SyncConfig, SyncServer,
    TablistFormatConfig,
};

use crate::{LoopbackBus, RecordingPlatform};

/// Every feature enabled, lobbies grouped by `lobby*`, no disable
/// conditions and no server switch delay
pub fn test_config(node: u128) -> SyncConfig {
    SyncConfig {
        node_id: NodeId::from_u128(node),
        sorting: Default::default(),
        name_tags: Some(NameTagConfig::default()),
        global_player_list: Some(GlobalPlayerListConfig {
            groups: GroupDefinitions {
                server_groups: vec![("lobbies".to_string(), vec!["lobby*".to_string()])],
                spy_servers: vec!["spy".to_string()],
                ..Default::default()
            },
            server_switch_delay: Duration::ZERO,
            ..Default::default()
        }),
        player_list_objective: Some(PlayerListObjectiveConfig::default()),
        tablist_format: Some(TablistFormatConfig {
            disable_condition: None,
        }),
        header_footer: Some(HeaderFooterConfig::default()),
    }
}

/// A [`SyncServer`] wired to a [`RecordingPlatform`]
pub struct TestNode {
    pub platform: Arc<RecordingPlatform>,
    pub properties: Arc<PropertyStore>,
    pub server: SyncServer,
}

impl TestNode {
    /// A node running on its own
    pub fn new(config: SyncConfig) -> Self {
        Self::build(config, None)
    }

    /// A node replicating through `bus`
    pub fn with_bus(config: SyncConfig, bus: &Arc<LoopbackBus>) -> Self {
        Self::build(config, Some(bus.clone()))
    }

    fn build(config: SyncConfig, bus: Option<Arc<LoopbackBus>>) -> Self {
        let platform = Arc::new(RecordingPlatform::new());
        let properties = Arc::new(PropertyStore::new());
        let server = SyncServer::new(
            config,
            Collaborators {
                platform: platform.clone(),
                text: Arc::new(PlainText),
                properties: properties.clone(),
                channel: bus.map(|bus| bus as Arc<dyn ReplicationChannel>),
            },
        )
        .expect("server should start");
        Self {
            platform,
            properties,
            server,
        }
    }

    pub fn join(&self, info: SubjectInfo) -> Arc<Subject> {
        self.server.join(info)
    }

    /// Waits for every executor of the node
    pub fn flush(&self) {
        self.server.flush().expect("flush should succeed");
    }
}
