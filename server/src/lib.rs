//! # Tabsync Server
//! Keeps name tags, player list entries, scoreboard values and the
//! header/footer of every connected subject consistent for every viewer,
//! and replicates local state to the other nodes of a proxied network
//! through a pub/sub channel.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use tabsync_shared::{
        encode_message, parse_score, CollisionRule, Envelope, GameMode, GroupDefinitions,
        GroupMembership, GroupToken, HealthDisplay, JoinMessage, LoadRequestMessage, Message,
        NameVisibility, NodeId, Objective, Property, PropertyStore, ProtocolError, QuitMessage,
        ScoreUpdateMessage, ScoreValue, ServerGroups, ServerSwitchMessage, SubjectId,
        TablistEntry, TablistFormatMessage, Team, TeamUpdateMessage, VanishMessage, DEFAULT_GROUP,
    };
}

mod condition;
mod error;
mod executor;
mod features;
mod lifecycle;
mod platform;
mod remote;
mod replication;
mod server;
mod sorting;
mod subject;
mod text;
mod visibility;

pub use condition::{in_worlds, Condition, DisableChecker};
pub use error::{ExecutorError, SyncServerError};
pub use executor::{CategoryUsage, FeatureExecutor};
pub use features::{
    Feature, FeatureContext, GlobalPlayerList, GlobalPlayerListConfig, HeaderFooter,
    HeaderFooterConfig, HeaderFooterLines, NameTagConfig, NameTags, PlayerListObjective,
    PlayerListObjectiveConfig, PublishedFormats, TablistFormat, TablistFormatConfig,
    OBJECTIVE_NAME,
};
pub use lifecycle::{LifecycleError, LifecycleFlags, LifecycleState, RegistrationLedger};
pub use platform::{Platform, SEE_VANISHED_PERMISSION};
pub use remote::{RemoteRegistry, RemoteScore, RemoteState, RemoteSubject, RemoteTeam};
pub use replication::{
    join_message, Inbound, MessageKinds, Outbound, RemoteListener, Replication,
    ReplicationChannel,
};
pub use server::{Collaborators, SyncConfig, SyncServer};
pub use sorting::{Sorting, SortingConfig};
pub use subject::{Subject, SubjectInfo, SubjectRegistry, SubjectState};
pub use text::{PlainText, TextEngine};
pub use visibility::{groups_allow, should_see, should_see_remote, Standing};
