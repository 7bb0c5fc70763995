use std::fs;
use std::path::PathBuf;

use vpfs_dashboard::model::FareModifier;
use vpfs_dashboard::vpfs_api::{
    parse_fare_snapshot_json, parse_match_status_json, parse_team_snapshot_json,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_flat_fare_snapshot() {
    let raw = read_fixture("dashboard_fares.json");
    let fares = parse_fare_snapshot_json(&raw).expect("fixture should parse");
    // The record without an id is dropped.
    assert_eq!(fares.len(), 2);

    assert_eq!(fares[0].id, 0);
    assert!(fares[0].claimed);
    assert_eq!(fares[0].team, Some(7));
    assert_eq!(fares[0].expiry, 1_700_000_030_000);
    assert!(fares[0].in_position);
    assert_eq!(fares[0].active, None);

    assert_eq!(fares[1].pay, 34.5);
    assert_eq!(fares[1].modifiers, FareModifier::Senior);
    assert_eq!(fares[1].expiry, 1_699_999_990_500);
    assert_eq!(fares[1].active, Some(false));
    // Team only travels with a claim.
    assert_eq!(fares[1].team, None);
}

#[test]
fn parses_partitioned_fare_snapshot_with_aliases() {
    let raw = read_fixture("partitioned_fares.json");
    let fares = parse_fare_snapshot_json(&raw).expect("fixture should parse");
    let ids: Vec<u64> = fares.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![4, 2, 3]);

    assert_eq!(fares[0].active, Some(true));
    assert_eq!(fares[0].modifiers, FareModifier::Subsidized);
    assert_eq!(fares[0].src.x, 1.0);
    assert_eq!(fares[0].dest.y, 4.0);

    assert_eq!(fares[1].active, Some(false));
    assert!(fares[1].picked_up && fares[1].paid);

    // An explicit flag beats list membership.
    assert_eq!(fares[2].active, Some(true));
}

#[test]
fn partitioned_snapshot_without_lists_is_empty() {
    let fares = parse_fare_snapshot_json(r#"{"active": null, "unrelated": []}"#)
        .expect("missing lists should not fail");
    assert!(fares.is_empty());

    let fares = parse_fare_snapshot_json(r#"{"past": [{"id": 9}]}"#).expect("should parse");
    assert_eq!(fares.len(), 1);
    assert_eq!(fares[0].active, Some(false));
}

#[test]
fn null_and_empty_fare_snapshots_are_empty() {
    assert!(parse_fare_snapshot_json("null").expect("null").is_empty());
    assert!(parse_fare_snapshot_json("  ").expect("blank").is_empty());
}

#[test]
fn scalar_fare_snapshot_is_rejected() {
    assert!(parse_fare_snapshot_json("42").is_err());
    assert!(parse_fare_snapshot_json("{not json").is_err());
}

#[test]
fn parses_team_snapshot() {
    let raw = read_fixture("dashboard_teams.json");
    let teams = parse_team_snapshot_json(&raw).expect("fixture should parse");
    // Team 0 is not a valid number.
    assert_eq!(teams.len(), 2);

    assert_eq!(teams[0].number, 12);
    assert_eq!(teams[0].karma, 95.0);
    assert_eq!(teams[0].current_fare.as_deref(), Some("4"));
    assert_eq!(teams[0].last_pos_update, 1_699_999_995_000);
    assert_eq!(teams[0].last_status, 1_699_999_999_500);

    assert_eq!(teams[1].number, 3);
    assert_eq!(teams[1].karma, 100.0);
    assert!(teams[1].current_fare.is_none());
}

#[test]
fn team_snapshot_must_be_an_array() {
    assert!(parse_team_snapshot_json(r#"{"teams": []}"#).is_err());
    assert!(parse_team_snapshot_json("null").expect("null").is_empty());
}

#[test]
fn parses_match_status() {
    let raw = read_fixture("match_status.json");
    let status = parse_match_status_json(&raw).expect("fixture should parse");
    assert_eq!(status.mode, "lab");
    assert_eq!(status.match_index, 3);
    assert!(status.match_start);
    assert_eq!(status.time_remaining, 42_750);
    assert_eq!(status.in_match, Some(false));
    assert_eq!(status.team, Some(-1));
}

#[test]
fn match_status_accepts_alias_fields() {
    let status = parse_match_status_json(
        r#"{"mode": "match", "matchIndex": 2, "matchStart": false, "timeRemaining": -3}"#,
    )
    .expect("should parse");
    assert_eq!(status.match_index, 2);
    assert_eq!(status.time_remaining, -3_000);
    assert!(parse_match_status_json("[]").is_err());
}

#[test]
fn out_of_range_team_numbers_are_not_narrowed() {
    let teams = parse_team_snapshot_json(
        r#"[{"number": 4294967296}, {"number": 4294967297}, {"number": 1, "money": 5}]"#,
    )
    .expect("should parse");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].number, 1);
    assert_eq!(teams[0].money, 5.0);

    let fares = parse_fare_snapshot_json(
        r#"[{"id": 1, "claimed": true, "team": 4294967303}, {"id": 2, "claimed": true, "team": 7}]"#,
    )
    .expect("should parse");
    assert_eq!(fares[0].team, None);
    assert_eq!(fares[1].team, Some(7));
}
