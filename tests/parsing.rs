use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use fpl_similarity::aggregate::{extract_managers, extract_pick_summary};
use fpl_similarity::fpl_api::{parse_bootstrap_json, parse_standings_json};
use fpl_similarity::model::ActiveChip;
use fpl_similarity::vector::{Lineup, PlayerUniverse, WeightScheme, build_vector};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_bootstrap_fixture() {
    let raw = read_fixture("bootstrap.json");
    let boot = parse_bootstrap_json(&raw).expect("fixture should parse");
    assert_eq!(boot.current_gameweek, 3);
    assert!(!boot.current_finished);
    assert_eq!(boot.players.len(), 4);
    assert_eq!(boot.players[&328].name, "M.Salah");
    assert!((boot.players[&328].price - 14.5).abs() < 1e-9);
    assert!((boot.prices()[&1] - 5.5).abs() < 1e-9);
}

#[test]
fn parses_standings_fixture() {
    let raw = read_fixture("standings_page.json");
    let page = parse_standings_json(&raw).expect("fixture should parse");
    assert_eq!(page.league.as_ref().map(|l| l.name.as_str()), Some("Office Classic"));
    assert!(page.standings.as_ref().is_some_and(|s| s.has_next));

    let managers = extract_managers(&page);
    assert_eq!(managers.len(), 2);
    assert_eq!(managers[0].team_id, 1234567);
    assert_eq!(managers[0].name, "Alex Morgan");
    assert_eq!(managers[1].team_name, "Klopp Fiction");
}

#[test]
fn new_entries_fill_in_before_first_deadline() {
    let raw = read_fixture("new_entries_page.json");
    let page = parse_standings_json(&raw).expect("fixture should parse");
    let managers = extract_managers(&page);
    assert_eq!(managers.len(), 2);
    assert_eq!(managers[0].name, "Jo Rivers");
    assert_eq!(managers[1].team_id, 4455662);
    assert_eq!(managers[1].team_name, "Haaland Ghosts");
}

#[test]
fn parses_picks_fixture() {
    let payload: Value = serde_json::from_str(&read_fixture("picks.json")).unwrap();
    let summary = extract_pick_summary(&payload).expect("fixture should summarise");
    assert_eq!(summary.captain, 328);
    assert_eq!(summary.vice_captain, 17);
    assert_eq!(summary.gw_points_raw, 78);
    assert_eq!(summary.transfer_cost, 4);
    assert_eq!(summary.gw_points, 74);
    assert_eq!(summary.total_points, 201);
    assert_eq!(summary.overall_rank, Some(1502001));
    assert_eq!(summary.gw_rank, Some(88123));
    assert_eq!(summary.active_chip, Some(ActiveChip::TripleCaptain));
    assert_eq!(summary.player_ids(), vec![1, 328, 17, 5]);
}

#[test]
fn fixtures_combine_into_a_weighted_vector() {
    let boot = parse_bootstrap_json(&read_fixture("bootstrap.json")).unwrap();
    let payload: Value = serde_json::from_str(&read_fixture("picks.json")).unwrap();
    let summary = extract_pick_summary(&payload).unwrap();

    let universe = PlayerUniverse::from_rosters([summary.roster.as_slice()]);
    let vector = build_vector(
        Lineup {
            roster: &summary.roster,
            captain: summary.captain,
            vice_captain: summary.vice_captain,
            active_chip: summary.active_chip.as_ref(),
        },
        &universe,
        &boot.prices(),
        &WeightScheme::default(),
    );

    let expected = [5.5 / 15.0, 14.5 / 15.0 * 3.0, 10.1 / 15.0, 6.1 / 15.0 * 0.1];
    assert_eq!(vector.len(), expected.len());
    for (got, want) in vector.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
    }
}
