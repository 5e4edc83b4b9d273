use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slots 1..=11 are the starting eleven, 12..=15 the ordered bench.
pub const STARTING_SLOTS: u8 = 11;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(rename = "web_name")]
    pub name: String,
    /// Current price in whole units (the API reports tenths).
    #[serde(rename = "now_cost")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerRecord {
    pub name: String,
    pub team_name: String,
    pub team_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RosterSlot {
    pub player_id: u32,
    pub position: u8,
}

impl RosterSlot {
    pub fn is_starter(&self) -> bool {
        self.position <= STARTING_SLOTS
    }
}

/// Chip played by a manager for a gameweek.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActiveChip {
    BenchBoost,
    TripleCaptain,
    FreeHit,
    Wildcard,
    AssistantManager,
    Other(String),
}

impl ActiveChip {
    pub fn as_str(&self) -> &str {
        match self {
            ActiveChip::BenchBoost => "bboost",
            ActiveChip::TripleCaptain => "3xc",
            ActiveChip::FreeHit => "freehit",
            ActiveChip::Wildcard => "wildcard",
            ActiveChip::AssistantManager => "manager",
            ActiveChip::Other(tag) => tag,
        }
    }
}

impl From<String> for ActiveChip {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "bboost" => ActiveChip::BenchBoost,
            "3xc" => ActiveChip::TripleCaptain,
            "freehit" => ActiveChip::FreeHit,
            "wildcard" => ActiveChip::Wildcard,
            "manager" => ActiveChip::AssistantManager,
            _ => ActiveChip::Other(tag),
        }
    }
}

impl From<ActiveChip> for String {
    fn from(chip: ActiveChip) -> Self {
        chip.as_str().to_string()
    }
}

impl fmt::Display for ActiveChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of one manager's gameweek picks that the analysis uses.
#[derive(Debug, Clone, PartialEq)]
pub struct PickSummary {
    pub roster: Vec<RosterSlot>,
    pub captain: u32,
    pub vice_captain: u32,
    pub total_points: i64,
    pub overall_rank: Option<u64>,
    pub gw_points_raw: i64,
    pub transfer_cost: i64,
    /// Gameweek points with the transfer penalty already taken off.
    pub gw_points: i64,
    pub gw_rank: Option<u64>,
    pub active_chip: Option<ActiveChip>,
}

impl PickSummary {
    pub fn player_ids(&self) -> Vec<u32> {
        self.roster.iter().map(|slot| slot.player_id).collect()
    }
}

/// Raw picks payload for one team, keyed by the team it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPicks {
    pub team_id: u32,
    pub payload: Value,
}

/// A manager and their summarised picks, kept together so that dropping a
/// manager can never shift another manager's picks onto the wrong name.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerPicks {
    pub manager: ManagerRecord,
    pub summary: PickSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueName {
    pub id: u32,
    pub name: String,
}

/// One output row: every manager whose feature vector was identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedGroup {
    pub manager_names: Vec<String>,
    pub team_names: Vec<String>,
    pub team_ids: Vec<u32>,
    pub manager_count: usize,
    pub captain: u32,
    pub vice_captain: u32,
    pub total_points: i64,
    pub rank: Option<u64>,
    pub gw_points: i64,
    pub gw_rank: Option<u64>,
    pub active_chip: Option<ActiveChip>,
    pub players_owned: Vec<u32>,
    pub pca_x: f64,
    pub pca_y: f64,
    pub tsne_x: f64,
    pub tsne_y: f64,
}
