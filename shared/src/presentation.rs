//! Values handed to the platform when registering or updating the
//! per-viewer presentation of a subject.

use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::SubjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameVisibility {
    Always,
    Never,
}

impl NameVisibility {
    pub fn from_visible(visible: bool) -> Self {
        if visible {
            Self::Always
        } else {
            Self::Never
        }
    }
}

impl Serde for NameVisibility {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self == Self::Always);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_visible(reader.read_bit()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionRule {
    Always,
    Never,
}

impl CollisionRule {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Always
        } else {
            Self::Never
        }
    }
}

impl Serde for CollisionRule {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self == Self::Always);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_enabled(reader.read_bit()?))
    }
}

/// A scoreboard team carrying one subject's name tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub prefix: String,
    pub suffix: String,
    pub visibility: NameVisibility,
    pub collision: CollisionRule,
    pub members: Vec<String>,
    /// Bit flags, `2` lets members see friendly invisibles
    pub options: u8,
}

/// Numeric game mode as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameMode(pub u8);

impl GameMode {
    pub const SURVIVAL: GameMode = GameMode(0);
    pub const SPECTATOR: GameMode = GameMode(3);
}

/// One row of a viewer's player list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablistEntry {
    pub id: SubjectId,
    pub name: String,
    pub listed: bool,
    pub latency: u32,
    pub game_mode: GameMode,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthDisplay {
    Integer,
    Hearts,
}

/// A scoreboard objective shown in the player list slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub name: String,
    pub title: String,
    pub display: HealthDisplay,
}
