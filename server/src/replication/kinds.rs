use std::{collections::HashMap, sync::Arc};

use tabsync_shared::{Envelope, Message, NodeId, ProtocolError};

use super::Inbound;

pub(crate) type InboundTask = Box<dyn FnOnce(&mut Inbound) + Send>;

type Decoder = Box<dyn Fn(Envelope<'_>) -> Result<InboundTask, ProtocolError> + Send + Sync>;

/// Handlers for every message kind this node understands, by name.
///
/// Decoding happens on the receiving thread; the decoded message is handed
/// to its handler as a task on the replication executor.
#[derive(Default)]
pub struct MessageKinds {
    decoders: HashMap<&'static str, Decoder>,
}

impl MessageKinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler of message `M`
    pub fn add<M: Message>(
        &mut self,
        handler: impl Fn(&mut Inbound, NodeId, M) + Send + Sync + 'static,
    ) -> Result<(), ProtocolError> {
        if self.decoders.contains_key(M::NAME) {
            return Err(ProtocolError::AlreadyRegistered { kind: M::NAME });
        }
        let handler = Arc::new(handler);
        self.decoders.insert(
            M::NAME,
            Box::new(move |envelope: Envelope<'_>| {
                let origin = envelope.origin();
                let message = envelope.read::<M>()?;
                let handler = handler.clone();
                let task: InboundTask =
                    Box::new(move |inbound: &mut Inbound| handler(inbound, origin, message));
                Ok(task)
            }),
        );
        Ok(())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    pub(crate) fn decode(&self, envelope: Envelope<'_>) -> Result<InboundTask, ProtocolError> {
        let Some(decoder) = self.decoders.get(envelope.kind()) else {
            return Err(ProtocolError::UnknownKind {
                kind: envelope.kind().to_string(),
            });
        };
        decoder(envelope)
    }
}
