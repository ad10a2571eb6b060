use tabsync_server::{
    in_worlds, shared::NodeId, LifecycleState, NameTagConfig, SyncConfig, SyncServer,
};
use tabsync_test::{assert_calls, id, test_config, PlatformCall, SubjectBuilder, TestNode};

fn name_tag_node() -> TestNode {
    let node = TestNode::new(SyncConfig {
        name_tags: Some(NameTagConfig {
            disable_condition: Some(in_worlds(&["minigame"])),
            ..Default::default()
        }),
        global_player_list: None,
        player_list_objective: None,
        tablist_format: None,
        header_footer: None,
        ..test_config(1)
    });
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();
    node.platform.clear();
    node
}

fn state_of(node: &TestNode, subject: u128) -> Option<LifecycleState> {
    node.server
        .name_tags()
        .expect("name tags are enabled")
        .lifecycle_state(id(subject))
        .expect("name tags are running")
}

fn enter_world(node: &TestNode, subject: u128, world: &str) {
    node.server.switch_world(&id(subject), world);
    node.server.refresh(&id(subject));
    node.flush();
}

#[test]
fn pause_and_resume_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let node = name_tag_node();
    let name_tags = node.server.name_tags().expect("name tags are enabled");
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Registered));

    name_tags.pause_team_handling(id(1));
    name_tags.pause_team_handling(id(1));
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Aalice"
    );
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Paused));

    node.platform.clear();
    name_tags.resume_team_handling(id(1));
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Aalice"
    );
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Registered));
}

#[test]
fn disable_condition_flips_once_per_change() {
    let node = name_tag_node();

    enter_world(&node, 1, "minigame");
    node.server.refresh(&id(1));
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Aalice"
    );
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Disabled));
    // alice still sees bob's name tag
    assert_calls!(node.platform, 0, PlatformCall::UnregisterTeam { team_name, .. } if team_name == "Abob");

    node.platform.clear();
    enter_world(&node, 1, "world");

    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Aalice"
    );
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Registered));
}

#[test]
fn disabled_wins_over_paused() {
    let node = name_tag_node();
    let name_tags = node.server.name_tags().expect("name tags are enabled");

    name_tags.pause_team_handling(id(1));
    enter_world(&node, 1, "minigame");
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Disabled));

    node.platform.clear();
    name_tags.resume_team_handling(id(1));
    node.flush();
    assert!(node.platform.calls().is_empty());
    assert_eq!(state_of(&node, 1), Some(LifecycleState::Disabled));

    enter_world(&node, 1, "world");
    assert_calls!(
        node.platform,
        2,
        PlatformCall::RegisterTeam { team, .. } if team.name == "Aalice"
    );
}

#[test]
fn unknown_subjects_have_no_lifecycle() {
    let node = name_tag_node();
    assert_eq!(state_of(&node, 99), None);
}

#[test]
fn shutdown_unregisters_everything_and_is_idempotent() {
    let node = name_tag_node();

    node.server.shutdown();
    assert_calls!(node.platform, 4, PlatformCall::UnregisterTeam { .. });

    node.server.shutdown();
    assert_calls!(node.platform, 4, PlatformCall::UnregisterTeam { .. });
}

#[test]
fn disabled_server_only_tracks_subjects() {
    let server = SyncServer::disabled(NodeId::from_u128(5));
    assert!(!server.is_enabled());

    let subject = server.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    server.set_vanished(&id(1), true);
    server.switch_server(&id(1), "survival");
    server.refresh_all();

    assert_eq!(server.subjects().len(), 1);
    assert!(subject.is_vanished());
    assert_eq!(subject.server(), "survival");
    assert!(server.name_tags().is_none());
    assert!(server.usage().is_empty());
    assert!(server.flush().is_ok());

    server.quit(&id(1));
    assert!(server.subjects().is_empty());
}
