use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{CollisionRule, Message, NameVisibility, SubjectId};

/// Current name tag of a subject; replaces whatever was known before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUpdateMessage {
    pub id: SubjectId,
    pub team_name: String,
    pub prefix: String,
    pub suffix: String,
    pub visibility: NameVisibility,
    pub collision: CollisionRule,
}

impl Message for TeamUpdateMessage {
    const NAME: &'static str = "team-update";
}

impl Serde for TeamUpdateMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.team_name.ser(writer);
        self.prefix.ser(writer);
        self.suffix.ser(writer);
        self.visibility.ser(writer);
        self.collision.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            team_name: String::de(reader)?,
            prefix: String::de(reader)?,
            suffix: String::de(reader)?,
            visibility: NameVisibility::de(reader)?,
            collision: CollisionRule::de(reader)?,
        })
    }
}
