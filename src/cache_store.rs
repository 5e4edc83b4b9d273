use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::extract_managers;
use crate::error::{CacheError, RunError};
use crate::fpl_api::FplApi;
use crate::model::{ManagerRecord, TeamPicks};

/// A whole JSON object on disk. Read at the start of a call, rewritten in one
/// piece at the end. No locking: concurrent writers race.
#[derive(Debug, Clone)]
pub struct CacheDocument {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl CacheDocument {
    /// Missing or unreadable files start an empty document.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("ignoring unreadable cache {}: {err}", path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Typed read. An entry that no longer decodes counts as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("cache entry {key} in {} is stale: {err}", self.path.display());
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), CacheError> {
        let encoded = serde_json::to_value(value).map_err(|source| CacheError::Serialize {
            what: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), encoded);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn save(&self) -> Result<(), CacheError> {
        write_json_atomic(&self.path, &self.entries, None)
    }
}

/// Write `value` to `path` via a temp file and rename. `indent` selects pretty
/// printing with that many spaces.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    indent: Option<usize>,
) -> Result<(), CacheError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let json = match indent {
        Some(width) => {
            let indent = vec![b' '; width];
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value
                .serialize(&mut ser)
                .map_err(|source| CacheError::Serialize {
                    what: path.display().to_string(),
                    source,
                })?;
            buf
        }
        None => serde_json::to_vec(value).map_err(|source| CacheError::Serialize {
            what: path.display().to_string(),
            source,
        })?,
    };

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|source| CacheError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn managers_key(league_id: u32) -> String {
    format!("{league_id}_managers")
}

pub fn picks_key(league_id: u32, gameweek: u32) -> String {
    format!("{league_id}_{gameweek}_picks")
}

pub fn metadata_key(league_id: u32, gameweek: u32) -> String {
    format!("{league_id}_{gameweek}_metadata")
}

/// Stamp written alongside every refresh of the current gameweek.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureStamp {
    pub fetched_after_finished: bool,
    /// Unix seconds.
    pub last_fetch_time: f64,
}

impl CaptureStamp {
    pub fn now(fetched_after_finished: bool) -> Self {
        Self {
            fetched_after_finished,
            last_fetch_time: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameweekStatus {
    pub current: u32,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    UseCached,
    Fetch,
}

/// Whether cached picks for `gameweek` can be served.
///
/// Past gameweeks are final once cached. The current gameweek is served from
/// cache while it is live; once it finishes, one more refresh is needed unless
/// the cached entry was itself captured after the finish.
pub fn picks_decision(
    gameweek: u32,
    status: GameweekStatus,
    has_entry: bool,
    stamp: Option<&CaptureStamp>,
) -> CacheDecision {
    if !has_entry {
        return CacheDecision::Fetch;
    }
    if gameweek < status.current {
        return CacheDecision::UseCached;
    }
    let captured_final = stamp.is_some_and(|s| s.fetched_after_finished);
    if !status.finished || captured_final {
        CacheDecision::UseCached
    } else {
        CacheDecision::Fetch
    }
}

/// Cache-fronted access to league managers and gameweek picks.
#[derive(Debug, Clone)]
pub struct IncrementalCache {
    pub managers_path: PathBuf,
    pub picks_path: PathBuf,
    /// Pause between consecutive upstream requests.
    pub request_delay: Duration,
}

impl IncrementalCache {
    pub fn new(managers_path: PathBuf, picks_path: PathBuf, request_delay: Duration) -> Self {
        Self {
            managers_path,
            picks_path,
            request_delay,
        }
    }

    /// All managers in a league. A populated entry is trusted forever.
    pub fn managers(
        &self,
        api: &dyn FplApi,
        league_id: u32,
    ) -> Result<Vec<ManagerRecord>, RunError> {
        let key = managers_key(league_id);
        let mut doc = CacheDocument::load(&self.managers_path);
        if let Some(cached) = doc.get::<Vec<ManagerRecord>>(&key).filter(|m| !m.is_empty()) {
            info!("using {} cached managers for league {league_id}", cached.len());
            return Ok(cached);
        }

        let managers = fetch_all_managers(api, league_id, self.request_delay)?;
        doc.insert(&key, &managers)?;
        doc.save()?;
        Ok(managers)
    }

    /// Raw picks for every manager in `managers` for `gameweek`, subject to
    /// [`picks_decision`]. Managers whose payload lacks a picks list are
    /// dropped from the returned (and cached) batch.
    pub fn gameweek_picks(
        &self,
        api: &dyn FplApi,
        league_id: u32,
        managers: &[ManagerRecord],
        gameweek: u32,
        status: GameweekStatus,
    ) -> Result<Vec<TeamPicks>, RunError> {
        let key = picks_key(league_id, gameweek);
        let meta_key = metadata_key(league_id, gameweek);
        let mut doc = CacheDocument::load(&self.picks_path);

        let cached = doc.get::<Vec<TeamPicks>>(&key);
        let stamp = doc.get::<CaptureStamp>(&meta_key);
        debug!(
            "gameweek {gameweek}: current={} finished={} cached={} stamp={stamp:?}",
            status.current,
            status.finished,
            cached.is_some()
        );

        match (picks_decision(gameweek, status, cached.is_some(), stamp.as_ref()), cached) {
            (CacheDecision::UseCached, Some(picks)) => {
                info!("using cached picks for league {league_id} gameweek {gameweek}");
                return Ok(picks);
            }
            _ => info!("fetching picks for league {league_id} gameweek {gameweek}"),
        }

        let mut picks = Vec::with_capacity(managers.len());
        for (idx, manager) in managers.iter().enumerate() {
            if idx > 0 {
                thread::sleep(self.request_delay);
            }
            info!("fetching picks for {}", manager.name);
            let payload = api.fetch_picks(manager.team_id, gameweek)?;
            if payload.get("picks").is_some() {
                picks.push(TeamPicks {
                    team_id: manager.team_id,
                    payload,
                });
            } else {
                warn!(
                    "picks missing for manager {} gameweek {gameweek}, skipping",
                    manager.team_id
                );
            }
        }

        doc.insert(&key, &picks)?;
        if gameweek == status.current {
            doc.insert(&meta_key, &CaptureStamp::now(status.finished))?;
        }
        doc.save()?;
        debug!(
            "picks cache keys: {}",
            doc.keys().collect::<Vec<_>>().join(", ")
        );
        Ok(picks)
    }
}

/// Walk standings pages until one yields no managers.
pub fn fetch_all_managers(
    api: &dyn FplApi,
    league_id: u32,
    delay: Duration,
) -> Result<Vec<ManagerRecord>, RunError> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        info!("fetching page {page} of league {league_id} standings");
        let standings = api.fetch_standings(league_id, page)?;
        let managers = extract_managers(&standings);
        if managers.is_empty() {
            break;
        }
        all.extend(managers);
        page += 1;
        thread::sleep(delay);
    }
    Ok(all)
}
