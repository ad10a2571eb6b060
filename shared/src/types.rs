use std::fmt;

use tabsync_serde::{BitReader, BitWrite, Serde, SerdeErr};
use uuid::Uuid;

/// Stable identity of a subject, either its account id or its tablist id
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct SubjectId(Uuid);

impl SubjectId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serde for SubjectId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let (high, low) = self.0.as_u64_pair();
        high.ser(writer);
        low.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let high = u64::de(reader)?;
        let low = u64::de(reader)?;
        Ok(Self(Uuid::from_u64_pair(high, low)))
    }
}

/// Identity of one node (proxy instance) attached to the replication channel
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serde for NodeId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let (high, low) = self.0.as_u64_pair();
        high.ser(writer);
        low.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let high = u64::de(reader)?;
        let low = u64::de(reader)?;
        Ok(Self(Uuid::from_u64_pair(high, low)))
    }
}
