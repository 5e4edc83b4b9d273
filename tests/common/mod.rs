#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use serde_json::{Value, json};

use fpl_similarity::error::FetchError;
use fpl_similarity::fpl_api::{Bootstrap, FplApi, StandingsPage, parse_standings_json};
use fpl_similarity::model::{ManagerRecord, PlayerRecord};

/// In-memory upstream that records every call.
#[derive(Default)]
pub struct FakeApi {
    pub bootstrap: RefCell<Option<Bootstrap>>,
    pub standings: RefCell<HashMap<(u32, u32), StandingsPage>>,
    pub picks: RefCell<HashMap<(u32, u32), Value>>,
    pub failing_team: Cell<Option<u32>>,
    pub bootstrap_calls: Cell<usize>,
    pub standings_calls: RefCell<Vec<(u32, u32)>>,
    pub picks_calls: RefCell<Vec<(u32, u32)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bootstrap(&self, current: u32, finished: bool, prices: &[(u32, f64)]) {
        let players: BTreeMap<u32, PlayerRecord> = prices
            .iter()
            .map(|(id, price)| {
                (
                    *id,
                    PlayerRecord {
                        name: format!("Player {id}"),
                        price: *price,
                    },
                )
            })
            .collect();
        *self.bootstrap.borrow_mut() = Some(Bootstrap {
            players,
            current_gameweek: current,
            current_finished: finished,
        });
    }

    pub fn set_standings(&self, league_id: u32, page: u32, managers: &[ManagerRecord]) {
        let results: Vec<Value> = managers
            .iter()
            .map(|m| {
                json!({
                    "entry": m.team_id,
                    "entry_name": m.team_name,
                    "player_name": m.name,
                })
            })
            .collect();
        let raw = json!({
            "league": {"id": league_id, "name": format!("League {league_id}")},
            "standings": {"has_next": false, "results": results},
            "new_entries": {"has_next": false, "results": []},
        });
        let parsed = parse_standings_json(&raw.to_string()).expect("fake standings should parse");
        self.standings.borrow_mut().insert((league_id, page), parsed);
    }

    pub fn set_picks(&self, team_id: u32, gameweek: u32, payload: Value) {
        self.picks.borrow_mut().insert((team_id, gameweek), payload);
    }

    pub fn picks_call_count(&self) -> usize {
        self.picks_calls.borrow().len()
    }

    pub fn standings_call_count(&self) -> usize {
        self.standings_calls.borrow().len()
    }
}

impl FplApi for FakeApi {
    fn fetch_bootstrap(&self) -> Result<Bootstrap, FetchError> {
        self.bootstrap_calls.set(self.bootstrap_calls.get() + 1);
        self.bootstrap
            .borrow()
            .clone()
            .ok_or(FetchError::NoCurrentGameweek)
    }

    fn fetch_standings(&self, league_id: u32, page: u32) -> Result<StandingsPage, FetchError> {
        self.standings_calls.borrow_mut().push((league_id, page));
        Ok(self
            .standings
            .borrow()
            .get(&(league_id, page))
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_picks(&self, team_id: u32, gameweek: u32) -> Result<Value, FetchError> {
        self.picks_calls.borrow_mut().push((team_id, gameweek));
        if self.failing_team.get() == Some(team_id) {
            return Err(FetchError::Status {
                url: format!("entry/{team_id}/event/{gameweek}/picks/"),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        // The live client hands back the 404 body for a team with no entry.
        Ok(self
            .picks
            .borrow()
            .get(&(team_id, gameweek))
            .cloned()
            .unwrap_or_else(|| json!({"detail": "Not found."})))
    }
}

pub fn manager(team_id: u32) -> ManagerRecord {
    ManagerRecord {
        name: format!("Manager {team_id}"),
        team_name: format!("Team {team_id}"),
        team_id,
    }
}

/// Picks payload with players in slot order 1..=n.
pub fn picks_payload(players: &[u32], captain: u32, vice: u32, chip: Option<&str>) -> Value {
    let picks: Vec<Value> = players
        .iter()
        .enumerate()
        .map(|(idx, id)| {
            json!({
                "element": id,
                "position": idx + 1,
                "multiplier": if *id == captain { 2 } else { 1 },
                "is_captain": *id == captain,
                "is_vice_captain": *id == vice,
            })
        })
        .collect();
    json!({
        "active_chip": chip,
        "automatic_subs": [],
        "entry_history": {
            "event": 1,
            "points": 60,
            "total_points": 300,
            "rank": 12000,
            "overall_rank": 450000,
            "event_transfers": 1,
            "event_transfers_cost": 4,
        },
        "picks": picks,
    })
}
