//! # Tabsync Shared
//! Common functionality shared between tabsync nodes: subject identities,
//! cached properties, server group membership and the replication protocol.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use tabsync_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr};

mod groups;
mod messages;
mod presentation;
mod property;
mod property_store;
mod score;
mod types;

pub use groups::{
    server_matches, GroupDefinitions, GroupMembership, GroupToken, ServerGroups,
    DEFAULT_SERVER_GROUP,
};
pub use messages::{
    error::ProtocolError,
    format::TablistFormatMessage,
    message::{encode_message, Envelope, Message},
    player::{JoinMessage, LoadRequestMessage, QuitMessage, ServerSwitchMessage, VanishMessage},
    score::ScoreUpdateMessage,
    team::TeamUpdateMessage,
};
pub use presentation::{
    CollisionRule, GameMode, HealthDisplay, NameVisibility, Objective, TablistEntry, Team,
};
pub use property::Property;
pub use property_store::{PropertyLookup, PropertyStore, DEFAULT_GROUP};
pub use score::{parse_score, ScoreValue};
pub use types::{NodeId, SubjectId};
