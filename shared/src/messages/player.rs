//! Membership messages: who is online on which node, and where.

use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{Message, SubjectId};

/// Full snapshot of a subject, sent on join and in answer to a load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMessage {
    pub id: SubjectId,
    pub name: String,
    pub nickname: String,
    pub server: String,
    pub vanished: bool,
}

impl Message for JoinMessage {
    const NAME: &'static str = "join";
}

impl Serde for JoinMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.name.ser(writer);
        self.nickname.ser(writer);
        self.server.ser(writer);
        self.vanished.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            name: String::de(reader)?,
            nickname: String::de(reader)?,
            server: String::de(reader)?,
            vanished: bool::de(reader)?,
        })
    }
}

/// Asks every other node to resend the full state of its subjects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequestMessage;

impl Message for LoadRequestMessage {
    const NAME: &'static str = "load-request";
}

impl Serde for LoadRequestMessage {
    fn ser(&self, _writer: &mut dyn BitWrite) {}

    fn de(_reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSwitchMessage {
    pub id: SubjectId,
    pub server: String,
}

impl Message for ServerSwitchMessage {
    const NAME: &'static str = "server-switch";
}

impl Serde for ServerSwitchMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.server.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            server: String::de(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanishMessage {
    pub id: SubjectId,
    pub vanished: bool,
}

impl Message for VanishMessage {
    const NAME: &'static str = "vanish";
}

impl Serde for VanishMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.vanished.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
            vanished: bool::de(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuitMessage {
    pub id: SubjectId,
}

impl Message for QuitMessage {
    const NAME: &'static str = "quit";
}

impl Serde for QuitMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: SubjectId::de(reader)?,
        })
    }
}
