use tabsync_server::{
    shared::HealthDisplay,
    PlayerListObjectiveConfig, SyncConfig, OBJECTIVE_NAME,
};
use tabsync_test::{assert_calls, id, test_config, PlatformCall, SubjectBuilder, TestNode};

fn objective_node(value: &str) -> TestNode {
    TestNode::new(SyncConfig {
        player_list_objective: Some(PlayerListObjectiveConfig {
            value: value.to_string(),
            fancy_value: "%ping%ms".to_string(),
            disable_condition: None,
        }),
        ..test_config(1)
    })
}

fn score_of_alice(value: &str) -> i32 {
    let node = objective_node(value);
    node.join(
        SubjectBuilder::new(1, "alice", "lobby-1")
            .latency(12)
            .build(),
    );
    node.flush();
    node.platform
        .calls()
        .into_iter()
        .find_map(|call| match call {
            PlatformCall::SetScore { holder, value, .. } if holder == "alice" => Some(value),
            _ => None,
        })
        .expect("score was sent")
}

#[test]
fn integer_values_are_used_as_is() {
    assert_eq!(score_of_alice("%ping%"), 12);
    assert_eq!(score_of_alice("-3"), -3);
}

#[test]
fn decimal_values_are_rounded() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert_eq!(score_of_alice("12.7"), 13);
    assert_eq!(score_of_alice("12.2"), 12);
}

#[test]
fn values_that_are_not_numbers_become_zero() {
    assert_eq!(score_of_alice("abc"), 0);
    assert_eq!(score_of_alice(""), 0);
}

#[test]
fn health_placeholders_draw_hearts() {
    let hearts = PlayerListObjectiveConfig {
        value: "%health%".to_string(),
        ..Default::default()
    };
    assert_eq!(hearts.display(), HealthDisplay::Hearts);
    assert_eq!(PlayerListObjectiveConfig::default().display(), HealthDisplay::Integer);
}

#[test]
fn latency_change_updates_the_score_for_every_viewer() {
    let node = objective_node("%ping%");
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();
    node.platform.clear();

    node.server.set_latency(&id(1), 80);
    node.flush();

    assert_calls!(
        node.platform,
        2,
        PlatformCall::SetScore { objective, holder, value: 80, fancy_value, .. }
            if objective == OBJECTIVE_NAME && holder == "alice" && fancy_value == "80ms"
    );
}

#[test]
fn every_viewer_gets_the_objective_once() {
    let node = objective_node("%ping%");
    node.join(SubjectBuilder::new(1, "alice", "lobby-1").build());
    node.join(SubjectBuilder::new(2, "bob", "lobby-1").build());
    node.flush();

    assert_calls!(
        node.platform,
        1,
        PlatformCall::RegisterObjective { viewer, objective } if *viewer == id(1) && objective.name == OBJECTIVE_NAME
    );
    assert_calls!(node.platform, 2, PlatformCall::RegisterObjective { .. });
    // bob sees his own score and alice's, alice hers and then bob's
    assert_calls!(node.platform, 4, PlatformCall::SetScore { .. });
}
