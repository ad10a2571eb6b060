use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{Message, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUpdateMessage {
    pub id: SubjectId,
    pub value: i32,
    pub fancy_value: String,
}

impl Message for ScoreUpdateMessage {
    const NAME: &'static str = "score-update";
}

impl Serde for ScoreUpdateMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.value.ser(writer);
        self.fancy_value.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            value: i32::de(reader)?,
            fancy_value: String::de(reader)?,
        })
    }
}
