use tabsync_serde::{BitReader, BitWriter, Serde};

use crate::{NodeId, ProtocolError};

/// A replication message, registered with the channel under its name
pub trait Message: Serde + Send + 'static {
    const NAME: &'static str;
}

/// Encodes a message behind an envelope naming its origin and kind
pub fn encode_message<M: Message>(origin: NodeId, message: &M) -> Vec<u8> {
    let mut writer = BitWriter::new();
    origin.ser(&mut writer);
    M::NAME.to_string().ser(&mut writer);
    message.ser(&mut writer);
    writer.to_bytes()
}

/// An opened envelope whose payload has not been read yet
pub struct Envelope<'b> {
    origin: NodeId,
    kind: String,
    reader: BitReader<'b>,
}

impl<'b> Envelope<'b> {
    pub fn open(bytes: &'b [u8]) -> Result<Self, ProtocolError> {
        let mut reader = BitReader::new(bytes);
        let origin = NodeId::de(&mut reader)
            .map_err(|source| ProtocolError::MalformedEnvelope { source })?;
        let kind = String::de(&mut reader)
            .map_err(|source| ProtocolError::MalformedEnvelope { source })?;
        Ok(Self {
            origin,
            kind,
            reader,
        })
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Reads the payload as `M`, which must be the kind on the envelope
    pub fn read<M: Message>(mut self) -> Result<M, ProtocolError> {
        if self.kind != M::NAME {
            return Err(ProtocolError::KindMismatch {
                expected: M::NAME,
                actual: self.kind,
            });
        }
        M::de(&mut self.reader).map_err(|source| ProtocolError::Decode {
            kind: self.kind,
            source,
        })
    }
}
