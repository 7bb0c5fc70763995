use vpfs_dashboard::classify::{POSITION_SENTINEL, Tone};
use vpfs_dashboard::model::{Millis, Point, Team};
use vpfs_dashboard::reconcile::TeamReconciler;
use vpfs_dashboard::render::{Container, NodeContent, NodeTree};

const NOW: Millis = 1_700_000_000_000;

fn team(number: u32, money: f64) -> Team {
    Team {
        number,
        money,
        karma: 100.0,
        current_fare: None,
        position: Point::new(1.0, 2.0),
        last_pos_update: NOW - 250,
        last_status: NOW - 250,
    }
}

fn row(tree: &NodeTree, teams: &TeamReconciler, number: u32) -> vpfs_dashboard::classify::TeamRow {
    let node = teams.node_for(number).expect("team should be tracked");
    match &tree.node(node).expect("node should exist").content {
        NodeContent::Team(row) => row.clone(),
        NodeContent::Fare(_) => panic!("team node holds a fare card"),
    }
}

#[test]
fn teams_sort_ascending_behind_header() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(12, 0.0), team(3, 0.0), team(5, 0.0)], NOW);

    assert_eq!(
        tree.keys(Container::Teams),
        vec!["|header|", "team-3", "team-5", "team-12"]
    );
}

#[test]
fn removal_prunes_only_the_missing_team() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(3, 0.0), team(5, 0.0), team(12, 0.0)], NOW);
    let kept = teams.node_for(3).expect("tracked");
    let gone = teams.node_for(5).expect("tracked");

    let stats = teams.apply(&mut tree, &[team(12, 0.0), team(3, 0.0)], NOW);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.created, 0);
    assert!(!tree.contains(gone));
    assert_eq!(teams.node_for(3), Some(kept));
    assert!(teams.node_for(5).is_none());
    assert_eq!(tree.keys(Container::Teams), vec!["|header|", "team-3", "team-12"]);
}

#[test]
fn new_team_slots_into_numeric_order() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(3, 0.0), team(12, 0.0)], NOW);
    teams.apply(&mut tree, &[team(3, 0.0), team(12, 0.0), team(7, 0.0)], NOW);

    assert_eq!(
        tree.keys(Container::Teams),
        vec!["|header|", "team-3", "team-7", "team-12"]
    );
}

#[test]
fn reapplying_teams_is_idempotent() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    let snapshot = vec![team(3, 10.0), team(5, 20.0)];

    teams.apply(&mut tree, &snapshot, NOW);
    let before = tree.stats();
    let stats = teams.apply(&mut tree, &snapshot, NOW);

    assert!(!stats.is_structural());
    assert_eq!(stats.updated, 0);
    assert_eq!(tree.stats().created, before.created);
    assert_eq!(tree.stats().removed, before.removed);
    assert_eq!(teams.len(), 2);
}

#[test]
fn row_content_updates_in_place() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(3, 10.0)], NOW);
    let node = teams.node_for(3).expect("tracked");

    let mut richer = team(3, 42.5);
    richer.current_fare = Some("8".to_string());
    let stats = teams.apply(&mut tree, &[richer], NOW);

    assert_eq!(stats.updated, 1);
    assert_eq!(teams.node_for(3), Some(node));
    let shown = row(&tree, &teams, 3);
    assert_eq!(shown.money, "$42.50");
    assert_eq!(shown.current_fare, "8");
}

#[test]
fn duplicate_numbers_keep_the_last_record() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(4, 1.0), team(4, 2.0)], NOW);

    assert_eq!(teams.len(), 1);
    assert_eq!(row(&tree, &teams, 4).money, "$2.00");
}

#[test]
fn never_reported_position_shows_sentinel() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    let mut silent = team(8, 0.0);
    silent.last_pos_update = 0;
    silent.last_status = NOW - 7_000;
    teams.apply(&mut tree, &[silent], NOW);

    let shown = row(&tree, &teams, 8);
    assert_eq!(shown.position_age.label, POSITION_SENTINEL);
    assert_eq!(shown.position_age.tone, Tone::Normal);
    assert_eq!(shown.status_age.label, "7000ms");
    assert_eq!(shown.status_age.tone, Tone::Warning);
}

#[test]
fn empty_snapshot_clears_all_teams() {
    let mut tree = NodeTree::new();
    let mut teams = TeamReconciler::new();
    teams.apply(&mut tree, &[team(1, 0.0), team(2, 0.0)], NOW);

    let stats = teams.apply(&mut tree, &[], NOW);
    assert_eq!(stats.removed, 2);
    assert!(teams.is_empty());
    assert_eq!(tree.keys(Container::Teams), vec!["|header|"]);
}
