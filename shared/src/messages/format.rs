use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{Message, SubjectId};

/// Player list display name of a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablistFormatMessage {
    pub id: SubjectId,
    pub format: String,
}

impl Message for TablistFormatMessage {
    const NAME: &'static str = "tablist-format";
}

impl Serde for TablistFormatMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.format.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            format: String::de(reader)?,
        })
    }
}
