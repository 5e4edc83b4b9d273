use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::cache_store::{CacheDocument, write_json_atomic};
use crate::error::CacheError;
use crate::fpl_api::Bootstrap;
use crate::model::{AggregatedGroup, LeagueName, PlayerRecord};

const LEAGUES_KEY: &str = "leagues";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCatalogueFile {
    pub player_data: BTreeMap<u32, PlayerRecord>,
    pub current_gameweek: u32,
}

/// Overwrite the player catalogue snapshot. Never merged with the old file.
pub fn write_player_catalogue(path: &Path, bootstrap: &Bootstrap) -> Result<(), CacheError> {
    let file = PlayerCatalogueFile {
        player_data: bootstrap.players.clone(),
        current_gameweek: bootstrap.current_gameweek,
    };
    write_json_atomic(path, &file, Some(2))?;
    info!(
        "player data and current gameweek saved to {}",
        path.display()
    );
    Ok(())
}

/// `leagues.json` keeps the list under a `leagues` key alongside whatever else
/// the document holds; `available_leagues.json` is the bare list.
pub fn write_league_names(
    leagues_path: &Path,
    available_path: &Path,
    leagues: &[LeagueName],
) -> Result<(), CacheError> {
    let mut doc = CacheDocument::load(leagues_path);
    doc.insert(LEAGUES_KEY, &leagues)?;
    doc.save()?;

    write_json_atomic(available_path, leagues, Some(2))?;
    info!("league names saved to {}", available_path.display());
    Ok(())
}

pub fn write_results(path: &Path, groups: &[AggregatedGroup]) -> Result<(), CacheError> {
    write_json_atomic(path, groups, Some(4))?;
    info!("data saved to {}", path.display());
    Ok(())
}
