use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::FetchError;
use crate::http_client::http_client;
use crate::model::PlayerRecord;

pub const FPL_API_BASE: &str = "https://fantasy.premierleague.com/api";

/// Read-only access to the three upstream endpoints. Each call is exactly one
/// logical request; errors are not recovered here.
pub trait FplApi {
    fn fetch_bootstrap(&self) -> Result<Bootstrap, FetchError>;

    fn fetch_standings(&self, league_id: u32, page: u32) -> Result<StandingsPage, FetchError>;

    /// Raw picks payload. Left untyped so a payload with missing fields can
    /// still be cached and reported on per manager.
    fn fetch_picks(&self, team_id: u32, gameweek: u32) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    pub players: BTreeMap<u32, PlayerRecord>,
    pub current_gameweek: u32,
    pub current_finished: bool,
}

impl Bootstrap {
    pub fn prices(&self) -> std::collections::HashMap<u32, f64> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.price))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BootstrapResponse {
    events: Vec<BootstrapEvent>,
    elements: Vec<BootstrapElement>,
}

#[derive(Debug, Deserialize)]
struct BootstrapEvent {
    id: u32,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    finished: bool,
}

#[derive(Debug, Deserialize)]
struct BootstrapElement {
    id: u32,
    web_name: String,
    now_cost: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandingsPage {
    #[serde(default)]
    pub league: Option<LeagueInfo>,
    #[serde(default)]
    pub standings: Option<ResultsBlock<StandingEntry>>,
    #[serde(default)]
    pub new_entries: Option<ResultsBlock<NewEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueInfo {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsBlock<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub has_next: bool,
}

impl<T> Default for ResultsBlock<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            has_next: false,
        }
    }
}

/// Confirmed standings row.
#[derive(Debug, Clone, Deserialize)]
pub struct StandingEntry {
    pub entry: u32,
    pub entry_name: String,
    pub player_name: String,
}

/// Provisional entrant, listed before the league's first scored gameweek.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub entry: u32,
    pub entry_name: String,
    pub player_first_name: String,
    pub player_last_name: String,
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap, FetchError> {
    let parsed: BootstrapResponse =
        serde_json::from_str(raw).map_err(|source| FetchError::Decode {
            url: "bootstrap-static".to_string(),
            source,
        })?;
    bootstrap_from_response(parsed)
}

fn bootstrap_from_response(parsed: BootstrapResponse) -> Result<Bootstrap, FetchError> {
    let current = parsed
        .events
        .iter()
        .find(|event| event.is_current)
        .ok_or(FetchError::NoCurrentGameweek)?;

    let players = parsed
        .elements
        .into_iter()
        .map(|element| {
            (
                element.id,
                PlayerRecord {
                    name: element.web_name,
                    price: element.now_cost as f64 / 10.0,
                },
            )
        })
        .collect();

    Ok(Bootstrap {
        players,
        current_gameweek: current.id,
        current_finished: current.finished,
    })
}

pub fn parse_standings_json(raw: &str) -> Result<StandingsPage, FetchError> {
    serde_json::from_str(raw).map_err(|source| FetchError::Decode {
        url: "leagues-classic standings".to_string(),
        source,
    })
}

/// Live client against the public API.
pub struct HttpFplApi {
    client: &'static Client,
    base: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFplApi {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
            base: config.api_base.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.request_delay,
        })
    }

    /// GET with retry on transport failure. Any status is returned to the caller.
    fn get_text(&self, url: &str) -> Result<(StatusCode, String), FetchError> {
        let mut attempt = 1;
        let resp = loop {
            match self.client.get(url).send() {
                Ok(resp) => break resp,
                Err(source) if attempt < self.max_attempts => {
                    warn!("request to {url} failed (attempt {attempt}): {source}");
                    attempt += 1;
                    std::thread::sleep(self.retry_delay);
                }
                Err(source) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        };

        let status = resp.status();
        let body = resp.text().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!("GET {url} -> {status}, {} bytes", body.len());
        Ok((status, body))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let (status, body) = self.get_text(url)?;
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Picks responses are read even on a client error: a team with no entry for
/// the gameweek gets `404 {"detail": ...}`, which the caller drops like any
/// other payload without picks. Server errors and non-JSON bodies stay fatal.
pub fn picks_from_response(
    url: &str,
    status: StatusCode,
    body: &str,
) -> Result<Value, FetchError> {
    let parsed = serde_json::from_str::<Value>(body);
    if status.is_success() {
        return parsed.map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        });
    }
    match parsed {
        Ok(payload) if status.is_client_error() && payload.is_object() => {
            debug!("{url} answered {status}, passing body on");
            Ok(payload)
        }
        _ => Err(FetchError::Status {
            url: url.to_string(),
            status,
        }),
    }
}

impl FplApi for HttpFplApi {
    fn fetch_bootstrap(&self) -> Result<Bootstrap, FetchError> {
        let url = format!("{}/bootstrap-static/", self.base);
        let parsed: BootstrapResponse = self.get_json(&url)?;
        bootstrap_from_response(parsed)
    }

    fn fetch_standings(&self, league_id: u32, page: u32) -> Result<StandingsPage, FetchError> {
        let url = format!(
            "{}/leagues-classic/{league_id}/standings/\
             ?page_standings={page}&page_new_entries={page}",
            self.base
        );
        self.get_json(&url)
    }

    fn fetch_picks(&self, team_id: u32, gameweek: u32) -> Result<Value, FetchError> {
        let url = format!("{}/entry/{team_id}/event/{gameweek}/picks/", self.base);
        let (status, body) = self.get_text(&url)?;
        picks_from_response(&url, status, &body)
    }
}
