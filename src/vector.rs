//! Turns a roster into a fixed-length weight vector over the players seen in
//! one comparison batch.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{ActiveChip, RosterSlot, STARTING_SLOTS};

pub const DEFAULT_PRICE_CEILING: f64 = 15.0;
/// Price assumed for a player missing from the catalogue.
pub const UNKNOWN_PLAYER_PRICE: f64 = 4.0;

const FLAT_BENCH_WEIGHT: f64 = 0.1;
// Goalkeeper, then the three outfield bench slots in order.
const GRADED_BENCH_WEIGHTS: [f64; 4] = [0.05, 0.25, 0.1, 0.05];
const TRIPLE_CAPTAIN_MULTIPLIER: f64 = 3.0;
const VICE_CAPTAIN_MULTIPLIER: f64 = 1.05;

/// How lineup position and captaincy are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingVariant {
    /// Starters 1.0, every bench slot 0.1, captain x2.
    #[default]
    Binary,
    /// Starters 1.0, bench graded per slot, captain x1.5, vice-captain x1.05.
    Graded,
}

impl WeightingVariant {
    fn bench_weight(self, position: u8) -> f64 {
        match self {
            WeightingVariant::Binary => FLAT_BENCH_WEIGHT,
            WeightingVariant::Graded => {
                let idx = usize::from(position.saturating_sub(STARTING_SLOTS + 1))
                    .min(GRADED_BENCH_WEIGHTS.len() - 1);
                GRADED_BENCH_WEIGHTS[idx]
            }
        }
    }

    fn captain_multiplier(self) -> f64 {
        match self {
            WeightingVariant::Binary => 2.0,
            WeightingVariant::Graded => 1.5,
        }
    }

    fn vice_captain_multiplier(self) -> Option<f64> {
        match self {
            WeightingVariant::Binary => None,
            WeightingVariant::Graded => Some(VICE_CAPTAIN_MULTIPLIER),
        }
    }
}

impl FromStr for WeightingVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(WeightingVariant::Binary),
            "graded" => Ok(WeightingVariant::Graded),
            other => Err(format!("unknown weighting variant '{other}'")),
        }
    }
}

impl fmt::Display for WeightingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightingVariant::Binary => f.write_str("binary"),
            WeightingVariant::Graded => f.write_str("graded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightScheme {
    pub variant: WeightingVariant,
    /// Prices are divided by this, not normalised to the batch's range.
    pub price_ceiling: f64,
    pub unknown_price: f64,
}

impl Default for WeightScheme {
    fn default() -> Self {
        Self {
            variant: WeightingVariant::default(),
            price_ceiling: DEFAULT_PRICE_CEILING,
            unknown_price: UNKNOWN_PLAYER_PRICE,
        }
    }
}

/// Index <-> player mapping for one batch. Order is first-seen, so it is only
/// meaningful within the batch it was built from.
#[derive(Debug, Clone, Default)]
pub struct PlayerUniverse {
    ids: Vec<u32>,
    index: HashMap<u32, usize>,
}

impl PlayerUniverse {
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut universe = Self::default();
        for id in ids {
            universe.insert(id);
        }
        universe
    }

    pub fn from_rosters<'a>(rosters: impl IntoIterator<Item = &'a [RosterSlot]>) -> Self {
        Self::from_ids(
            rosters
                .into_iter()
                .flat_map(|roster| roster.iter().map(|slot| slot.player_id)),
        )
    }

    fn insert(&mut self, id: u32) {
        if !self.index.contains_key(&id) {
            self.index.insert(id, self.ids.len());
            self.ids.push(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, player_id: u32) -> Option<usize> {
        self.index.get(&player_id).copied()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }
}

/// Inputs to [`build_vector`] beyond the universe and price table.
#[derive(Debug, Clone, Copy)]
pub struct Lineup<'a> {
    pub roster: &'a [RosterSlot],
    pub captain: u32,
    pub vice_captain: u32,
    pub active_chip: Option<&'a ActiveChip>,
}

pub fn build_vector(
    lineup: Lineup<'_>,
    universe: &PlayerUniverse,
    prices: &HashMap<u32, f64>,
    scheme: &WeightScheme,
) -> Vec<f64> {
    let mut vector = vec![0.0; universe.len()];
    let bench_boost = matches!(lineup.active_chip, Some(ActiveChip::BenchBoost));
    let triple_captain = matches!(lineup.active_chip, Some(ActiveChip::TripleCaptain));

    for slot in lineup.roster {
        let Some(idx) = universe.index_of(slot.player_id) else {
            continue;
        };
        let price = prices
            .get(&slot.player_id)
            .copied()
            .unwrap_or(scheme.unknown_price);
        let scaled_price = price / scheme.price_ceiling;

        let mut position_weight = if bench_boost || slot.is_starter() {
            1.0
        } else {
            scheme.variant.bench_weight(slot.position)
        };

        if slot.player_id == lineup.captain {
            position_weight *= if triple_captain {
                TRIPLE_CAPTAIN_MULTIPLIER
            } else {
                scheme.variant.captain_multiplier()
            };
        } else if slot.player_id == lineup.vice_captain {
            if let Some(bonus) = scheme.variant.vice_captain_multiplier() {
                position_weight *= bonus;
            }
        }

        vector[idx] = scaled_price * position_weight;
    }
    vector
}
