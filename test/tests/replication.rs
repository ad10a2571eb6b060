use std::sync::Arc;

use tabsync_server::{
    shared::{
        encode_message, CollisionRule, Envelope, JoinMessage, LoadRequestMessage, Message,
        NameVisibility, NodeId, QuitMessage, ScoreUpdateMessage, ServerSwitchMessage,
        TablistFormatMessage, TeamUpdateMessage, VanishMessage,
    },
    OBJECTIVE_NAME,
};
use tabsync_test::{assert_calls, id, test_config, LoopbackBus, PlatformCall, SubjectBuilder, TestNode};

fn assert_survives<M: Message + PartialEq + std::fmt::Debug>(message: M) {
    let origin = NodeId::from_u128(7);
    let bytes = encode_message(origin, &message);
    let envelope = Envelope::open(&bytes).expect("envelope opens");
    assert_eq!(envelope.origin(), origin);
    assert_eq!(envelope.kind(), M::NAME);
    assert_eq!(envelope.read::<M>().expect("payload decodes"), message);
}

#[test]
fn every_message_kind_crosses_the_wire() {
    assert_survives(JoinMessage {
        id: id(1),
        name: "alice".to_string(),
        nickname: "Ally".to_string(),
        server: "lobby-1".to_string(),
        vanished: true,
    });
    assert_survives(LoadRequestMessage);
    assert_survives(ServerSwitchMessage {
        id: id(1),
        server: "survival".to_string(),
    });
    assert_survives(VanishMessage {
        id: id(1),
        vanished: false,
    });
    assert_survives(QuitMessage { id: id(1) });
    assert_survives(TeamUpdateMessage {
        id: id(1),
        team_name: "Aalice".to_string(),
        prefix: "&c[Admin] ".to_string(),
        suffix: " ✦".to_string(),
        visibility: NameVisibility::Never,
        collision: CollisionRule::Always,
    });
    assert_survives(ScoreUpdateMessage {
        id: id(1),
        value: -42,
        fancy_value: "&7Ping: -42".to_string(),
    });
    assert_survives(TablistFormatMessage {
        id: id(1),
        format: "[A] Ally".to_string(),
    });
}

struct Network {
    bus: Arc<LoopbackBus>,
    first: TestNode,
    second: TestNode,
}

impl Network {
    fn new() -> Self {
        let bus = Arc::new(LoopbackBus::new());
        let first = TestNode::with_bus(test_config(1), &bus);
        let second = TestNode::with_bus(test_config(2), &bus);
        Self { bus, first, second }
    }

    fn deliver(&self) -> usize {
        self.bus.deliver(&[&self.first, &self.second])
    }
}

fn network_with_alice_and_bob() -> Network {
    let network = Network::new();
    network
        .second
        .join(SubjectBuilder::new(2, "bob", "lobby-2").build());
    network.deliver();
    network
        .first
        .join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    network.deliver();
    network
}

#[test]
fn remote_join_shows_up_in_other_nodes_lists() {
    let _ = env_logger::builder().is_test(true).try_init();
    let network = network_with_alice_and_bob();
    let platform = &network.second.platform;

    let remote = network
        .second
        .server
        .remotes()
        .get(&id(1))
        .expect("alice is known on the second node");
    assert_eq!(remote.node(), NodeId::from_u128(1));
    assert_eq!(remote.server(), "lobby-1");

    assert_calls!(
        platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(2) && entry.id == id(1)
    );
    assert_calls!(
        platform,
        1,
        PlatformCall::RegisterTeam { viewer, team } if *viewer == id(2) && team.name == "Aalice"
    );
    assert_calls!(
        network.first.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.id == id(2)
    );
}

#[test]
fn remote_scores_reach_every_viewer_holding_the_objective() {
    let network = network_with_alice_and_bob();

    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::SetScore { viewer, objective, holder, .. }
            if *viewer == id(2) && objective == OBJECTIVE_NAME && holder == "alice"
    );
    let score = network
        .second
        .server
        .remotes()
        .get(&id(1))
        .and_then(|remote| remote.score())
        .expect("score replicated");
    assert_eq!(score.value, 0);
}

#[test]
fn remote_quit_removes_everything() {
    let network = network_with_alice_and_bob();
    network.second.platform.clear();

    network.first.server.quit(&id(1));
    network.deliver();

    assert!(network.second.server.remotes().get(&id(1)).is_none());
    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::RemoveEntry { viewer, entry } if *viewer == id(2) && *entry == id(1)
    );
    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::UnregisterTeam { viewer, team_name } if *viewer == id(2) && team_name == "Aalice"
    );
}

#[test]
fn remote_server_switch_out_of_the_group_removes_the_entry() {
    let network = network_with_alice_and_bob();
    network.second.platform.clear();

    network.first.server.switch_server(&id(1), "survival");
    network.deliver();

    assert_eq!(
        network
            .second
            .server
            .remotes()
            .get(&id(1))
            .map(|remote| remote.server()),
        Some("survival".to_string())
    );
    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::RemoveEntry { viewer, entry } if *viewer == id(2) && *entry == id(1)
    );
}

#[test]
fn own_messages_are_ignored() {
    let network = network_with_alice_and_bob();

    assert!(network.first.server.remotes().get(&id(1)).is_none());
    assert!(network.second.server.remotes().get(&id(2)).is_none());
    assert_eq!(network.first.server.remotes().len(), 1);
    assert_eq!(network.second.server.remotes().len(), 1);
}

#[test]
fn late_node_loads_the_network_state() {
    let network = network_with_alice_and_bob();

    let late = TestNode::with_bus(test_config(3), &network.bus);
    network.bus.deliver(&[&network.first, &network.second, &late]);

    assert_eq!(late.server.remotes().len(), 2);
    let alice = late.server.remotes().get(&id(1)).expect("alice loaded");
    assert_eq!(alice.team().map(|team| team.team_name), Some("Aalice".to_string()));
    assert!(alice.score().is_some());
    assert_eq!(alice.tablist_format(), Some("alice".to_string()));
}

#[test]
fn garbage_and_unknown_subjects_are_skipped() {
    let bus = Arc::new(LoopbackBus::new());
    let node = TestNode::with_bus(test_config(1), &bus);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();
    node.platform.clear();

    let peer = NodeId::from_u128(9);
    node.server.receive(&[1, 2, 3]);
    node.server.receive(&[]);
    node.server.receive(&encode_message(
        peer,
        &TeamUpdateMessage {
            id: id(77),
            team_name: "Aghost".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            visibility: NameVisibility::Always,
            collision: CollisionRule::Always,
        },
    ));
    node.server.receive(&encode_message(peer, &VanishMessage { id: id(77), vanished: true }));
    node.server.receive(&encode_message(peer, &QuitMessage { id: id(77) }));
    node.flush();

    assert!(node.server.remotes().is_empty());
    assert!(node.platform.calls().is_empty());

    // the node still works afterwards
    node.server.receive(&encode_message(
        peer,
        &JoinMessage {
            id: id(78),
            name: "late".to_string(),
            nickname: "late".to_string(),
            server: "lobby-4".to_string(),
            vanished: false,
        },
    ));
    node.flush();
    assert!(node.server.remotes().contains(&id(78)));
}

#[test]
fn remote_vanish_hides_from_viewers_without_permission() {
    let network = network_with_alice_and_bob();
    network.second.platform.clear();

    network.first.server.set_vanished(&id(1), true);
    network.deliver();

    assert!(network
        .second
        .server
        .remotes()
        .get(&id(1))
        .is_some_and(|remote| remote.is_vanished()));
    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::RemoveEntry { viewer, entry } if *viewer == id(2) && *entry == id(1)
    );
    assert_calls!(
        network.second.platform,
        1,
        PlatformCall::UnregisterTeam { viewer, team_name } if *viewer == id(2) && team_name == "Aalice"
    );
}
