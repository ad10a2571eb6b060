use parking_lot::Mutex;

use tabsync_server::ReplicationChannel;

use crate::TestNode;

/// In-memory pub/sub channel shared by every [`TestNode`] of a test
#[derive(Default)]
pub struct LoopbackBus {
    published: Mutex<Vec<Vec<u8>>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published since the last drain
    pub fn drain(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.published.lock())
    }

    /// Hands every published message to every node until no node publishes
    /// anything new. Returns how many messages were delivered.
    pub fn deliver(&self, nodes: &[&TestNode]) -> usize {
        let mut delivered = 0;
        for _ in 0..32 {
            for node in nodes {
                node.flush();
            }
            let batch = self.drain();
            if batch.is_empty() {
                break;
            }
            for bytes in &batch {
                for node in nodes {
                    node.server.receive(bytes);
                }
            }
            delivered += batch.len();
        }
        for node in nodes {
            node.flush();
        }
        delivered
    }
}

impl ReplicationChannel for LoopbackBus {
    fn publish(&self, bytes: Vec<u8>) {
        self.published.lock().push(bytes);
    }
}
