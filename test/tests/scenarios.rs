use std::sync::Arc;

use tabsync_server::{
    shared::{
        encode_message, CollisionRule, JoinMessage, NameVisibility, NodeId, QuitMessage,
        ScoreUpdateMessage, TeamUpdateMessage,
    },
    SEE_VANISHED_PERMISSION,
};
use tabsync_test::{
    assert_calls, id, test_config, LoopbackBus, PlatformCall, SubjectBuilder, TestNode,
};

#[test]
fn lobbies_share_a_player_list_and_survival_stays_apart() {
    let _ = env_logger::builder().is_test(true).try_init();
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").build());
    node.join(SubjectBuilder::new(3, "carol", "survival").build());
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.id == id(2)
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(2) && entry.id == id(1)
    );
    assert_calls!(node.platform, 0, PlatformCall::AddEntry { viewer, .. } if *viewer == id(3));
    assert_calls!(node.platform, 0, PlatformCall::AddEntry { entry, .. } if entry.id == id(3));
}

#[test]
fn same_server_entries_are_left_to_the_backend() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();

    assert_calls!(node.platform, 0, PlatformCall::AddEntry { .. });
}

fn vanish_scene() -> TestNode {
    let node = TestNode::new(test_config(1));
    node.platform.grant(id(3), SEE_VANISHED_PERMISSION);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").build());
    node.join(SubjectBuilder::new(3, "admin", "lobby-2").build());
    node.join(SubjectBuilder::new(4, "ghost", "lobby-3").build());
    node.flush();
    node.platform.clear();
    node
}

#[test]
fn vanishing_hides_from_viewers_without_permission() {
    let node = vanish_scene();

    node.server.set_vanished(&id(4), true);
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Aghost"
    );
    assert_calls!(
        node.platform,
        0,
        PlatformCall::UnregisterTeam { viewer, .. } if *viewer == id(3)
    );
    assert_calls!(
        node.platform,
        2,
        PlatformCall::RemoveEntry { entry, .. } if *entry == id(4)
    );
    assert_calls!(
        node.platform,
        0,
        PlatformCall::RemoveEntry { viewer, .. } if *viewer == id(3)
    );
}

#[test]
fn reappearing_restores_exactly_what_was_removed() {
    let node = vanish_scene();
    node.server.set_vanished(&id(4), true);
    node.flush();
    node.platform.clear();

    node.server.set_vanished(&id(4), false);
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Aghost"
    );
    assert_calls!(
        node.platform,
        2,
        PlatformCall::AddEntry { entry, .. } if entry.id == id(4)
    );
    assert_calls!(node.platform, 0, PlatformCall::RegisterTeam { viewer, .. } if *viewer == id(3));
    assert_calls!(node.platform, 0, PlatformCall::AddEntry { viewer, .. } if *viewer == id(3));
}

#[test]
fn unchanged_vanish_status_is_no_event() {
    let node = vanish_scene();

    node.server.set_vanished(&id(4), false);
    node.flush();

    assert!(node.platform.calls().is_empty());
}

#[test]
fn server_switch_moves_subject_between_groups() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "survival").build());
    node.flush();
    node.platform.clear();

    node.server.switch_server(&id(2), "lobby-2");
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.id == id(2)
    );

    node.platform.clear();
    node.server.switch_server(&id(2), "survival");
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::RemoveEntry { viewer, entry } if *viewer == id(1) && *entry == id(2)
    );
    assert_calls!(node.platform, 0, PlatformCall::AddEntry { .. });
}

fn team_update(prefix: &str) -> TeamUpdateMessage {
    TeamUpdateMessage {
        id: id(50),
        team_name: "Bremote".to_string(),
        prefix: prefix.to_string(),
        suffix: String::new(),
        visibility: NameVisibility::Always,
        collision: CollisionRule::Always,
    }
}

#[test]
fn team_updates_apply_in_arrival_order() {
    let bus = Arc::new(LoopbackBus::new());
    let node = TestNode::with_bus(test_config(1), &bus);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();

    let peer = NodeId::from_u128(99);
    node.server.receive(&encode_message(
        peer,
        &JoinMessage {
            id: id(50),
            name: "remote".to_string(),
            nickname: "remote".to_string(),
            server: "lobby-9".to_string(),
            vanished: false,
        },
    ));
    node.server.receive(&encode_message(peer, &team_update("[new]")));
    node.server.receive(&encode_message(peer, &team_update("[old]")));
    node.flush();

    let remote = node.server.remotes().get(&id(50)).expect("remote joined");
    assert_eq!(remote.team().expect("team received").prefix, "[old]");

    assert_calls!(
        node.platform,
        1,
        PlatformCall::RegisterTeam { viewer, team } if *viewer == id(1) && team.prefix == "[new]"
    );
    let last_update = node
        .platform
        .calls()
        .into_iter()
        .rev()
        .find_map(|call| match call {
            PlatformCall::UpdateTeam { viewer, team } if viewer == id(1) => Some(team),
            _ => None,
        })
        .expect("team was updated");
    assert_eq!(last_update.prefix, "[old]");
}

fn remote_join(nickname: &str) -> JoinMessage {
    JoinMessage {
        id: id(50),
        name: "remote".to_string(),
        nickname: nickname.to_string(),
        server: "lobby-9".to_string(),
        vanished: false,
    }
}

fn node_with_alice() -> TestNode {
    let bus = Arc::new(LoopbackBus::new());
    let node = TestNode::with_bus(test_config(1), &bus);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();
    node
}

#[test]
fn late_quit_from_the_previous_node_keeps_the_subject() {
    let node = node_with_alice();
    let (old_node, new_node) = (NodeId::from_u128(98), NodeId::from_u128(99));

    node.server.receive(&encode_message(old_node, &remote_join("remote")));
    node.server.receive(&encode_message(new_node, &remote_join("remote")));
    node.server.receive(&encode_message(old_node, &QuitMessage { id: id(50) }));
    node.flush();

    let remote = node.server.remotes().get(&id(50)).expect("subject still connected");
    assert_eq!(remote.node(), new_node);
    assert_calls!(node.platform, 0, PlatformCall::RemoveEntry { entry, .. } if *entry == id(50));

    node.server.receive(&encode_message(new_node, &QuitMessage { id: id(50) }));
    node.flush();
    assert!(node.server.remotes().get(&id(50)).is_none());
    assert_calls!(node.platform, 1, PlatformCall::RemoveEntry { entry, .. } if *entry == id(50));
}

#[test]
fn remote_nickname_change_is_sent_again() {
    let node = node_with_alice();
    let peer = NodeId::from_u128(99);
    node.server.receive(&encode_message(peer, &remote_join("remote")));
    node.server.receive(&encode_message(peer, &team_update("[R] ")));
    node.server.receive(&encode_message(
        peer,
        &ScoreUpdateMessage {
            id: id(50),
            value: 30,
            fancy_value: "30ms".to_string(),
        },
    ));
    node.flush();
    node.platform.clear();

    node.server.receive(&encode_message(peer, &remote_join("renamed")));
    node.flush();

    assert_eq!(
        node.server.remotes().get(&id(50)).map(|remote| remote.nickname()),
        Some("renamed".to_string())
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::RemoveEntry { viewer, entry } if *viewer == id(1) && *entry == id(50)
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.name == "renamed"
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Bremote"
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::RegisterTeam { team, .. } if team.members.len() == 1 && team.members[0] == "renamed"
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::RemoveScore { holder, .. } if holder == "remote"
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::SetScore { holder, value: 30, .. } if holder == "renamed"
    );
}
