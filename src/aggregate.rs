use std::collections::HashMap;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::PickError;
use crate::fpl_api::StandingsPage;
use crate::model::{ActiveChip, ManagerPicks, ManagerRecord, PickSummary, RosterSlot, TeamPicks};

/// Managers on one standings page. Confirmed standings win outright; the
/// provisional new-entrant list is only read when there are none.
pub fn extract_managers(page: &StandingsPage) -> Vec<ManagerRecord> {
    if let Some(block) = page.standings.as_ref().filter(|b| !b.results.is_empty()) {
        return block
            .results
            .iter()
            .map(|row| ManagerRecord {
                name: row.player_name.clone(),
                team_name: row.entry_name.clone(),
                team_id: row.entry,
            })
            .collect();
    }

    if let Some(block) = page.new_entries.as_ref().filter(|b| !b.results.is_empty()) {
        info!("no standings yet, using new entries to populate managers");
        return block
            .results
            .iter()
            .map(|row| ManagerRecord {
                name: format!("{} {}", row.player_first_name, row.player_last_name),
                team_name: row.entry_name.clone(),
                team_id: row.entry,
            })
            .collect();
    }

    Vec::new()
}

#[derive(Debug, Deserialize)]
struct PicksPayload {
    #[serde(default)]
    picks: Option<Vec<PickEntry>>,
    #[serde(default)]
    entry_history: Option<EntryHistory>,
    #[serde(default)]
    active_chip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PickEntry {
    element: u32,
    position: u8,
    #[serde(default)]
    is_captain: bool,
    #[serde(default)]
    is_vice_captain: bool,
}

#[derive(Debug, Deserialize)]
struct EntryHistory {
    #[serde(default)]
    total_points: i64,
    #[serde(default)]
    overall_rank: Option<u64>,
    #[serde(default)]
    points: i64,
    #[serde(default)]
    event_transfers_cost: i64,
    #[serde(default)]
    rank: Option<u64>,
}

/// Summarise one raw picks payload.
pub fn extract_pick_summary(payload: &Value) -> Result<PickSummary, PickError> {
    if payload.get("picks").is_none() {
        return Err(PickError::MissingPicks);
    }
    let parsed = PicksPayload::deserialize(payload).map_err(PickError::Malformed)?;
    let picks = parsed.picks.ok_or(PickError::MissingPicks)?;
    let history = parsed.entry_history.ok_or(PickError::MissingEntryHistory)?;

    let captain = picks
        .iter()
        .find(|p| p.is_captain)
        .map(|p| p.element)
        .ok_or(PickError::MissingCaptain)?;
    let vice_captain = picks
        .iter()
        .find(|p| p.is_vice_captain)
        .map(|p| p.element)
        .ok_or(PickError::MissingViceCaptain)?;

    let roster = picks
        .iter()
        .map(|p| RosterSlot {
            player_id: p.element,
            position: p.position,
        })
        .collect();

    Ok(PickSummary {
        roster,
        captain,
        vice_captain,
        total_points: history.total_points,
        overall_rank: history.overall_rank,
        gw_points_raw: history.points,
        transfer_cost: history.event_transfers_cost,
        gw_points: history.points - history.event_transfers_cost,
        gw_rank: history.rank,
        active_chip: parsed.active_chip.map(ActiveChip::from),
    })
}

/// Join fetched picks back onto their managers by team id. Managers with no
/// picks, or whose payload cannot be summarised, are logged and left out.
pub fn pair_with_managers(managers: &[ManagerRecord], picks: &[TeamPicks]) -> Vec<ManagerPicks> {
    let by_team: HashMap<u32, &Value> = picks
        .iter()
        .map(|team| (team.team_id, &team.payload))
        .collect();

    let mut out = Vec::with_capacity(managers.len());
    for manager in managers {
        let Some(payload) = by_team.get(&manager.team_id) else {
            continue;
        };
        match extract_pick_summary(payload) {
            Ok(summary) => out.push(ManagerPicks {
                manager: manager.clone(),
                summary,
            }),
            Err(err) => warn!(
                "dropping manager {} ({}): {err}",
                manager.name, manager.team_id
            ),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_managers, extract_pick_summary, pair_with_managers};
    use crate::error::PickError;
    use crate::fpl_api::parse_standings_json;
    use crate::model::{ActiveChip, ManagerRecord, TeamPicks};

    fn picks_payload(captain: u32, vice: u32) -> serde_json::Value {
        json!({
            "active_chip": "3xc",
            "entry_history": {
                "total_points": 512,
                "overall_rank": 120034,
                "points": 71,
                "event_transfers_cost": 8,
                "rank": 40211
            },
            "picks": [
                {"element": 1, "position": 1,
                 "is_captain": captain == 1, "is_vice_captain": vice == 1},
                {"element": 2, "position": 2,
                 "is_captain": captain == 2, "is_vice_captain": vice == 2},
                {"element": 3, "position": 12, "is_captain": false, "is_vice_captain": false}
            ]
        })
    }

    #[test]
    fn confirmed_standings_ignore_new_entries() {
        let page = parse_standings_json(
            r#"{
                "standings": {"results": [
                    {"entry": 11, "entry_name": "Eleven", "player_name": "Ann Lee"}
                ]},
                "new_entries": {"results": [{"entry": 12, "entry_name": "Twelve",
                    "player_first_name": "Bo", "player_last_name": "Kim"}]}
            }"#,
        )
        .unwrap();
        let managers = extract_managers(&page);
        assert_eq!(managers.len(), 1);
        assert_eq!(managers[0].team_id, 11);
        assert_eq!(managers[0].name, "Ann Lee");
    }

    #[test]
    fn new_entries_used_when_standings_empty() {
        let page = parse_standings_json(
            r#"{
                "standings": {"results": []},
                "new_entries": {"results": [{"entry": 12, "entry_name": "Twelve",
                    "player_first_name": "Bo", "player_last_name": "Kim"}]}
            }"#,
        )
        .unwrap();
        let managers = extract_managers(&page);
        assert_eq!(
            managers,
            vec![ManagerRecord {
                name: "Bo Kim".to_string(),
                team_name: "Twelve".to_string(),
                team_id: 12,
            }]
        );
    }

    #[test]
    fn gameweek_points_subtract_transfer_cost() {
        let summary = extract_pick_summary(&picks_payload(2, 1)).unwrap();
        assert_eq!(summary.gw_points_raw, 71);
        assert_eq!(summary.gw_points, 63);
        assert_eq!(summary.total_points, 512);
        assert_eq!(summary.captain, 2);
        assert_eq!(summary.vice_captain, 1);
        assert_eq!(summary.active_chip, Some(ActiveChip::TripleCaptain));
        assert_eq!(summary.player_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_picks_fails_soft() {
        let err = extract_pick_summary(&json!({"detail": "Not found."})).unwrap_err();
        assert!(matches!(err, PickError::MissingPicks));
    }

    #[test]
    fn missing_captain_is_explicit() {
        let err = extract_pick_summary(&picks_payload(99, 1)).unwrap_err();
        assert!(matches!(err, PickError::MissingCaptain));
    }

    #[test]
    fn pairing_follows_team_id_not_position() {
        let managers = vec![
            ManagerRecord {
                name: "A".to_string(),
                team_name: "Team A".to_string(),
                team_id: 1,
            },
            ManagerRecord {
                name: "B".to_string(),
                team_name: "Team B".to_string(),
                team_id: 2,
            },
            ManagerRecord {
                name: "C".to_string(),
                team_name: "Team C".to_string(),
                team_id: 3,
            },
        ];
        // A was dropped at fetch time, C has no captain.
        let picks = vec![
            TeamPicks {
                team_id: 3,
                payload: picks_payload(42, 1),
            },
            TeamPicks {
                team_id: 2,
                payload: picks_payload(1, 2),
            },
        ];
        let paired = pair_with_managers(&managers, &picks);
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].manager.name, "B");
        assert_eq!(paired[0].summary.captain, 1);
    }
}
