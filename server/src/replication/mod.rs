//! Cross-node replication of subject state.
//!
//! Membership messages (join, server switch, vanish, quit, load request)
//! are applied to the [`RemoteRegistry`] on the replication executor, which
//! then notifies every [`RemoteListener`]. Feature messages are checked
//! against the registry on the same executor and forwarded to the owning
//! feature, so a feature always sees a remote's join before its updates.

mod kinds;
mod outbound;

pub use kinds::MessageKinds;
pub use outbound::{Outbound, ReplicationChannel};

use std::sync::Arc;

use log::{debug, trace, warn};

use tabsync_shared::{
    Envelope, JoinMessage, LoadRequestMessage, Message, NodeId, ProtocolError, QuitMessage,
    ServerSwitchMessage, SubjectId, VanishMessage,
};

use crate::{
    executor::FeatureExecutor, ExecutorError, RemoteRegistry, RemoteSubject, Subject,
    SubjectRegistry,
};

/// Receives remote membership changes. Implementations move the work onto
/// their own executor.
pub trait RemoteListener: Send + Sync {
    fn on_remote_join(&self, _remote: &Arc<RemoteSubject>) {}

    fn on_remote_server_switch(&self, _remote: &Arc<RemoteSubject>) {}

    fn on_remote_vanish_change(&self, _remote: &Arc<RemoteSubject>) {}

    /// The remote now goes by another nickname; `previous` is the old one
    fn on_remote_nickname_change(&self, _remote: &Arc<RemoteSubject>, _previous: &str) {}

    fn on_remote_quit(&self, _remote: &Arc<RemoteSubject>) {}

    /// Another node asked for the full state of this node
    fn on_load_request(&self) {}
}

/// Join snapshot of a local subject
pub fn join_message(subject: &Subject) -> JoinMessage {
    let state = subject.state();
    JoinMessage {
        id: subject.id(),
        name: subject.name().to_string(),
        nickname: state.nickname,
        server: state.server,
        vanished: state.vanished,
    }
}

/// State of the replication executor
pub struct Inbound {
    remotes: Arc<RemoteRegistry>,
    subjects: Arc<SubjectRegistry>,
    outbound: Outbound,
    listeners: Vec<Arc<dyn RemoteListener>>,
}

impl Inbound {
    /// The remote subject an update is about, if it is known
    pub fn known(&self, id: &SubjectId, kind: &'static str) -> Option<Arc<RemoteSubject>> {
        let remote = self.remotes.get(id);
        if remote.is_none() {
            debug!("Dropping {kind} for unknown remote subject {id}");
        }
        remote
    }

    fn on_join(&mut self, origin: NodeId, message: JoinMessage) {
        let previous = self.remotes.get(&message.id).map(|remote| remote.state());
        let (remote, created) = self.remotes.apply_join(origin, &message);
        let previous = match previous {
            Some(previous) if !created => previous,
            _ => {
                trace!("Remote subject {} joined on {origin}", remote.name());
                self.notify(|listener| listener.on_remote_join(&remote));
                return;
            }
        };
        if previous.nickname != message.nickname {
            self.notify(|listener| listener.on_remote_nickname_change(&remote, &previous.nickname));
        }
        if previous.server != message.server {
            self.notify(|listener| listener.on_remote_server_switch(&remote));
        }
        if previous.vanished != message.vanished {
            self.notify(|listener| listener.on_remote_vanish_change(&remote));
        }
    }

    fn on_server_switch(&mut self, message: ServerSwitchMessage) {
        let Some(remote) = self.known(&message.id, ServerSwitchMessage::NAME) else {
            return;
        };
        let changed = remote.update(|state| {
            let changed = state.server != message.server;
            state.server = message.server;
            changed
        });
        if changed {
            self.notify(|listener| listener.on_remote_server_switch(&remote));
        }
    }

    fn on_vanish(&mut self, message: VanishMessage) {
        let Some(remote) = self.known(&message.id, VanishMessage::NAME) else {
            return;
        };
        let changed = remote.update(|state| {
            let changed = state.vanished != message.vanished;
            state.vanished = message.vanished;
            changed
        });
        if changed {
            self.notify(|listener| listener.on_remote_vanish_change(&remote));
        }
    }

    fn on_quit(&mut self, origin: NodeId, message: QuitMessage) {
        let Some(remote) = self.remotes.remove_from(&message.id, origin) else {
            debug!(
                "Dropping {} from {origin} for remote subject {} not connected there",
                QuitMessage::NAME,
                message.id
            );
            return;
        };
        trace!("Remote subject {} quit", remote.name());
        self.notify(|listener| listener.on_remote_quit(&remote));
    }

    fn on_load_request(&mut self, origin: NodeId) {
        debug!("Node {origin} requested a full state load");
        for subject in self.subjects.snapshot().iter() {
            self.outbound.send(&join_message(subject));
        }
        self.notify(|listener| listener.on_load_request());
    }

    fn notify(&self, event: impl Fn(&dyn RemoteListener)) {
        for listener in &self.listeners {
            event(listener.as_ref());
        }
    }
}

/// Receiving half of replication
pub struct Replication {
    node: NodeId,
    kinds: MessageKinds,
    outbound: Outbound,
    executor: FeatureExecutor<Inbound>,
}

impl Replication {
    /// Starts the replication executor. `kinds` holds the feature message
    /// handlers; the membership handlers are added here.
    pub fn new(
        outbound: Outbound,
        subjects: Arc<SubjectRegistry>,
        remotes: Arc<RemoteRegistry>,
        listeners: Vec<Arc<dyn RemoteListener>>,
        mut kinds: MessageKinds,
    ) -> Result<Self, crate::SyncServerError> {
        kinds.add::<JoinMessage>(|inbound, origin, message| inbound.on_join(origin, message))?;
        kinds.add::<ServerSwitchMessage>(|inbound, _, message| inbound.on_server_switch(message))?;
        kinds.add::<VanishMessage>(|inbound, _, message| inbound.on_vanish(message))?;
        kinds.add::<QuitMessage>(|inbound, origin, message| inbound.on_quit(origin, message))?;
        kinds.add::<LoadRequestMessage>(|inbound, origin, _| inbound.on_load_request(origin))?;

        let executor = FeatureExecutor::new(
            "replication",
            Inbound {
                remotes,
                subjects,
                outbound: outbound.clone(),
                listeners,
            },
        )?;

        Ok(Self {
            node: outbound.node(),
            kinds,
            outbound,
            executor,
        })
    }

    /// Asks every other node to resend its full state
    pub fn request_load(&self) {
        self.outbound.send(&LoadRequestMessage);
    }

    /// Hands bytes received from the channel over to the replication
    /// executor. Messages published by this node are ignored; messages that
    /// cannot be decoded are logged and skipped.
    pub fn receive(&self, bytes: &[u8]) {
        if let Err(err) = self.try_receive(bytes) {
            warn!("Skipping replication message: {err}");
        }
    }

    fn try_receive(&self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let envelope = Envelope::open(bytes)?;
        if envelope.origin() == self.node {
            return Ok(());
        }
        let task = self.kinds.decode(envelope)?;
        self.executor.submit("inbound", task);
        Ok(())
    }

    pub fn flush(&self) -> Result<(), ExecutorError> {
        self.executor.flush()
    }

    pub fn shutdown(&self) {
        self.executor.shutdown();
    }

    pub fn usage(&self) -> Vec<(&'static str, crate::CategoryUsage)> {
        self.executor.usage()
    }
}
