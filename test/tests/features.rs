use std::{sync::Arc, time::Duration};

use tabsync_server::{
    in_worlds,
    shared::{encode_message, GameMode, GroupDefinitions, JoinMessage, NodeId, DEFAULT_GROUP},
    GlobalPlayerListConfig, HeaderFooterConfig, HeaderFooterLines, SortingConfig, SyncConfig,
};
use tabsync_test::{
    assert_calls, id, test_config, LoopbackBus, PlatformCall, SubjectBuilder, TestNode,
};

fn lines(header: &str, footer: &str) -> HeaderFooterLines {
    HeaderFooterLines {
        header: vec![header.to_string()],
        footer: vec![footer.to_string()],
    }
}

fn last_header(node: &TestNode, viewer: u128) -> Option<(String, String)> {
    node.platform
        .calls()
        .into_iter()
        .rev()
        .find_map(|call| match call {
            PlatformCall::SetHeaderFooter {
                viewer: v,
                header,
                footer,
            } if v == id(viewer) => Some((header, footer)),
            _ => None,
        })
}

#[test]
fn header_comes_from_group_properties() {
    let _ = env_logger::builder().is_test(true).try_init();
    let node = TestNode::new(test_config(1));
    node.properties
        .set_group_property(DEFAULT_GROUP, "header", Some("Welcome %player%"), None, None);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();

    assert_eq!(
        last_header(&node, 1),
        Some(("Welcome alice".to_string(), String::new()))
    );

    let header_footer = node.server.header_footer().expect("header/footer enabled");
    header_footer.set_header(id(1), Some("custom".to_string()));
    node.flush();
    assert_eq!(last_header(&node, 1).map(|(header, _)| header), Some("custom".to_string()));

    header_footer.set_header(id(1), None);
    node.flush();
    assert_eq!(
        last_header(&node, 1).map(|(header, _)| header),
        Some("Welcome alice".to_string())
    );
}

#[test]
fn header_follows_the_server_scope() {
    let node = TestNode::new(SyncConfig {
        header_footer: Some(HeaderFooterConfig {
            lines: lines("Lobby", "play.example.net"),
            per_server: vec![(vec!["survival*".to_string()], lines("Survival", "Good luck"))],
            ..Default::default()
        }),
        ..test_config(1)
    });
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();
    assert_eq!(
        last_header(&node, 1),
        Some(("Lobby".to_string(), "play.example.net".to_string()))
    );

    node.server.switch_server(&id(1), "survival-2");
    node.flush();
    assert_eq!(
        last_header(&node, 1),
        Some(("Survival".to_string(), "Good luck".to_string()))
    );
}

#[test]
fn disabled_header_is_cleared_and_restored() {
    let node = TestNode::new(SyncConfig {
        header_footer: Some(HeaderFooterConfig {
            lines: lines("Hello", "Bye"),
            disable_condition: Some(in_worlds(&["minigame"])),
            ..Default::default()
        }),
        ..test_config(1)
    });
    node.join(
        SubjectBuilder::new(1, "alice", "lobby-1")
            .world("minigame")
            .build(),
    );
    node.flush();
    assert_calls!(node.platform, 0, PlatformCall::SetHeaderFooter { .. });

    node.server.switch_world(&id(1), "world");
    node.server.refresh(&id(1));
    node.flush();
    assert_eq!(last_header(&node, 1), Some(("Hello".to_string(), "Bye".to_string())));

    node.server.switch_world(&id(1), "minigame");
    node.server.refresh(&id(1));
    node.flush();
    assert_eq!(last_header(&node, 1), Some((String::new(), String::new())));
}

#[test]
fn tablist_names_follow_the_prefix_property() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::UpdateDisplayName { entry, display_name, .. }
            if *entry == id(1) && display_name.as_deref() == Some("alice")
    );

    assert!(node.server.set_property(&id(1), "tabprefix", Some("[A] ")));
    node.flush();
    assert_calls!(
        node.platform,
        2,
        PlatformCall::UpdateDisplayName { entry, display_name, .. }
            if *entry == id(1) && display_name.as_deref() == Some("[A] alice")
    );
    assert_eq!(
        node.server
            .tablist_format()
            .expect("formatting enabled")
            .formats()
            .get(&id(1)),
        Some("[A] alice".to_string())
    );

    assert!(!node.server.set_property(&id(9), "tabprefix", Some("[X] ")));
}

#[test]
fn temporary_tablist_name_overrides_and_restores() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();
    let format = node.server.tablist_format().expect("formatting enabled");

    format.set_name(id(1), Some("Queen".to_string()));
    node.flush();
    assert_eq!(format.formats().get(&id(1)), Some("Queen".to_string()));

    format.set_name(id(1), None);
    node.flush();
    assert_eq!(format.formats().get(&id(1)), Some("alice".to_string()));
}

#[test]
fn online_count_skips_vanished_and_other_groups() {
    let bus = Arc::new(LoopbackBus::new());
    let node = TestNode::with_bus(test_config(1), &bus);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").vanished().build());
    node.join(SubjectBuilder::new(3, "carol", "survival").build());
    node.server.receive(&encode_message(
        NodeId::from_u128(9),
        &JoinMessage {
            id: id(4),
            name: "dave".to_string(),
            nickname: "dave".to_string(),
            server: "lobby-7".to_string(),
            vanished: false,
        },
    ));
    node.flush();

    let list = node.server.global_player_list().expect("global list enabled");
    assert_eq!(list.online_count("lobbies").unwrap(), Some(2));
    assert_eq!(list.online_count("nowhere").unwrap(), None);
}

#[test]
fn tablist_clear_lists_everyone_again() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").build());
    node.flush();
    node.platform.clear();

    node.server.tablist_cleared(&id(1));
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.id == id(2)
    );
    assert_calls!(node.platform, 0, PlatformCall::AddEntry { viewer, .. } if *viewer == id(2));
}

fn spectator_node(others_as_spectators: bool, update_latency: bool) -> TestNode {
    TestNode::new(SyncConfig {
        global_player_list: Some(GlobalPlayerListConfig {
            groups: GroupDefinitions {
                server_groups: vec![("lobbies".to_string(), vec!["lobby*".to_string()])],
                ..Default::default()
            },
            others_as_spectators,
            update_latency,
            server_switch_delay: Duration::ZERO,
            ..Default::default()
        }),
        ..test_config(1)
    })
}

#[test]
fn others_can_be_shown_as_spectators() {
    let node = spectator_node(true, false);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").build());
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::AddEntry { entry, .. } if entry.game_mode == GameMode::SPECTATOR
    );
}

#[test]
fn game_mode_and_latency_reach_other_servers() {
    let node = spectator_node(false, true);
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-2").latency(20).build());
    node.flush();
    assert_calls!(
        node.platform,
        1,
        PlatformCall::AddEntry { viewer, entry } if *viewer == id(1) && entry.latency == 20
    );
    node.platform.clear();

    node.server.set_game_mode(&id(2), GameMode(1));
    node.server.set_latency(&id(2), 50);
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::UpdateGameMode { viewer, entry, game_mode }
            if *viewer == id(1) && *entry == id(2) && *game_mode == GameMode(1)
    );
    assert_calls!(
        node.platform,
        1,
        PlatformCall::UpdateLatency { viewer, entry, latency: 50 } if *viewer == id(1) && *entry == id(2)
    );
}

#[test]
fn group_change_moves_the_subject_to_another_team() {
    let node = TestNode::new(SyncConfig {
        sorting: SortingConfig {
            group_order: vec!["admin".to_string(), "default".to_string()],
        },
        ..test_config(1)
    });
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();
    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Balice"
    );
    node.platform.clear();

    node.server.set_group(&id(1), "admin");
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Balice"
    );
    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Aalice"
    );
}

#[test]
fn usage_is_reported_per_feature_and_category() {
    let node = TestNode::new(test_config(1));
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.flush();

    let usage = node.server.usage();
    let name_tags = usage
        .iter()
        .find(|(feature, _)| *feature == "NameTags")
        .map(|(_, categories)| categories)
        .expect("name tags report usage");
    let join = name_tags
        .iter()
        .find(|(category, _)| *category == "join")
        .map(|(_, usage)| usage)
        .expect("join was measured");
    assert_eq!(join.tasks, 1);
    assert_eq!(usage.len(), 5);
}
