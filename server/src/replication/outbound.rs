use std::sync::Arc;

use log::trace;

use tabsync_shared::{encode_message, Message, NodeId};

/// The pub/sub channel shared by every node of the cluster
pub trait ReplicationChannel: Send + Sync {
    /// Publishes an encoded message to every other node
    fn publish(&self, bytes: Vec<u8>);
}

/// Sending half of replication, held by every feature that publishes state
#[derive(Clone)]
pub struct Outbound {
    node: NodeId,
    channel: Arc<dyn ReplicationChannel>,
}

impl Outbound {
    pub fn new(node: NodeId, channel: Arc<dyn ReplicationChannel>) -> Self {
        Self { node, channel }
    }

    /// Identity of this node, stamped on every outgoing message
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn send<M: Message>(&self, message: &M) {
        let bytes = encode_message(self.node, message);
        trace!("Publishing {} ({} bytes)", M::NAME, bytes.len());
        self.channel.publish(bytes);
    }
}
