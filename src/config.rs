use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::fpl_api::FPL_API_BASE;
use crate::projection::{DEFAULT_PERPLEXITY_CAP, DEFAULT_TSNE_MAX_ITER};
use crate::vector::{DEFAULT_PRICE_CEILING, UNKNOWN_PLAYER_PRICE, WeightScheme, WeightingVariant};

const DEFAULT_LEAGUE_IDS: &[u32] = &[36590];
const DEFAULT_DATA_DIR: &str = "./src/assets";
const DEFAULT_CACHE_DIR: &str = "./cache";
const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;

/// Which gameweeks a run processes for each league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameweekRange {
    /// Only the gameweek the bootstrap flags as current.
    #[default]
    Current,
    /// Every gameweek from 1 through the current one.
    All,
    Span(u32, u32),
}

impl GameweekRange {
    /// Gameweeks to process given the current gameweek. Never goes past it.
    pub fn resolve(self, current: u32) -> RangeInclusive<u32> {
        match self {
            GameweekRange::Current => current..=current,
            GameweekRange::All => 1..=current,
            GameweekRange::Span(from, to) => from.max(1)..=to.min(current),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        match raw.as_str() {
            "" | "current" => return Ok(GameweekRange::Current),
            "all" => return Ok(GameweekRange::All),
            _ => {}
        }
        if let Some((from, to)) = raw.split_once('-') {
            let from = from.trim().parse::<u32>().context("invalid gameweek range start")?;
            let to = to.trim().parse::<u32>().context("invalid gameweek range end")?;
            if from > to {
                return Err(anyhow!("gameweek range {from}-{to} is reversed"));
            }
            return Ok(GameweekRange::Span(from, to));
        }
        let single = raw.parse::<u32>().context("invalid gameweek")?;
        Ok(GameweekRange::Span(single, single))
    }
}

/// Everything a run needs that the source kept as edited constants.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classic leagues to analyse.
    pub league_ids: Vec<u32>,
    /// Where the front end reads its JSON from: player catalogue, league
    /// names and per-gameweek results.
    pub data_dir: PathBuf,
    /// Managers and picks caches.
    pub cache_dir: PathBuf,
    pub api_base: String,
    /// Politeness pause between consecutive upstream requests.
    pub request_delay: Duration,
    /// `None` leaves the HTTP client's default in place.
    pub request_timeout: Option<Duration>,
    /// Attempts per request on transport failure. 1 means no retry.
    pub max_attempts: u32,
    pub weighting: WeightingVariant,
    /// Player prices are divided by this before weighting.
    pub price_ceiling: f64,
    pub gameweeks: GameweekRange,
    pub tsne_max_iter: usize,
    pub perplexity_cap: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            league_ids: DEFAULT_LEAGUE_IDS.to_vec(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            api_base: FPL_API_BASE.to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            request_timeout: None,
            max_attempts: 1,
            weighting: WeightingVariant::default(),
            price_ceiling: DEFAULT_PRICE_CEILING,
            gameweeks: GameweekRange::default(),
            tsne_max_iter: DEFAULT_TSNE_MAX_ITER,
            perplexity_cap: DEFAULT_PERPLEXITY_CAP,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(raw) = get("FPL_LEAGUE_IDS") {
            cfg.league_ids = parse_ids(&raw);
            if cfg.league_ids.is_empty() {
                return Err(anyhow!("FPL_LEAGUE_IDS has no valid league ids: {raw}"));
            }
        }
        if let Some(dir) = get("FPL_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(dir) = get("FPL_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(dir.trim());
        }
        if let Some(base) = get("FPL_API_BASE") {
            cfg.api_base = base.trim().to_string();
        }
        if let Some(raw) = get("FPL_REQUEST_DELAY_MS") {
            let ms = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("FPL_REQUEST_DELAY_MS is not a number: {raw}"))?;
            cfg.request_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = get("FPL_REQUEST_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("FPL_REQUEST_TIMEOUT_SECS is not a number: {raw}"))?;
            cfg.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = get("FPL_MAX_ATTEMPTS") {
            cfg.max_attempts = raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("FPL_MAX_ATTEMPTS is not a number: {raw}"))?;
            if cfg.max_attempts == 0 {
                return Err(anyhow!("FPL_MAX_ATTEMPTS must be >= 1"));
            }
        }
        if let Some(raw) = get("FPL_WEIGHTING") {
            cfg.weighting = raw.parse::<WeightingVariant>().map_err(|e| anyhow!(e))?;
        }
        if let Some(raw) = get("FPL_PRICE_CEILING") {
            cfg.price_ceiling = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("FPL_PRICE_CEILING is not a number: {raw}"))?;
            if !(cfg.price_ceiling.is_finite() && cfg.price_ceiling > 0.0) {
                return Err(anyhow!("FPL_PRICE_CEILING must be > 0"));
            }
        }
        if let Some(raw) = get("FPL_GAMEWEEKS") {
            cfg.gameweeks = GameweekRange::parse(&raw)
                .with_context(|| format!("FPL_GAMEWEEKS is invalid: {raw}"))?;
        }
        if let Some(raw) = get("FPL_TSNE_MAX_ITER") {
            cfg.tsne_max_iter = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("FPL_TSNE_MAX_ITER is not a number: {raw}"))?;
        }

        Ok(cfg)
    }

    pub fn weight_scheme(&self) -> WeightScheme {
        WeightScheme {
            variant: self.weighting,
            price_ceiling: self.price_ceiling,
            unknown_price: UNKNOWN_PLAYER_PRICE,
        }
    }

    pub fn player_data_path(&self) -> PathBuf {
        self.data_dir.join("player_data.json")
    }

    pub fn leagues_path(&self) -> PathBuf {
        self.data_dir.join("leagues.json")
    }

    pub fn available_leagues_path(&self) -> PathBuf {
        self.data_dir.join("available_leagues.json")
    }

    pub fn managers_cache_path(&self) -> PathBuf {
        self.cache_dir.join("managers.json")
    }

    pub fn picks_cache_path(&self) -> PathBuf {
        self.cache_dir.join("gameweek_picks.json")
    }

    pub fn results_path(&self, league_id: u32, gameweek: u32) -> PathBuf {
        self.data_dir
            .join(format!("fpl_team_similarity_{league_id}_gw{gameweek}.json"))
    }
}

fn parse_ids(raw: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for id in raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|id| *id != 0)
    {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{Config, GameweekRange};
    use crate::vector::WeightingVariant;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_single_pass_behaviour() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.league_ids, vec![36590]);
        assert_eq!(cfg.request_delay, Duration::from_secs(1));
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.max_attempts, 1);
        assert_eq!(cfg.weighting, WeightingVariant::Binary);
        assert_eq!(cfg.price_ceiling, 15.0);
        assert_eq!(cfg.gameweeks, GameweekRange::Current);
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = config_from(&[
            ("FPL_LEAGUE_IDS", "7639, 8497;7639"),
            ("FPL_CACHE_DIR", "/tmp/fpl"),
            ("FPL_REQUEST_DELAY_MS", "0"),
            ("FPL_REQUEST_TIMEOUT_SECS", "20"),
            ("FPL_WEIGHTING", "graded"),
            ("FPL_GAMEWEEKS", "3-7"),
        ])
        .unwrap();
        assert_eq!(cfg.league_ids, vec![7639, 8497]);
        assert_eq!(cfg.picks_cache_path(), PathBuf::from("/tmp/fpl/gameweek_picks.json"));
        assert_eq!(cfg.request_delay, Duration::ZERO);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(20)));
        assert_eq!(cfg.weighting, WeightingVariant::Graded);
        assert_eq!(cfg.gameweeks, GameweekRange::Span(3, 7));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("FPL_LEAGUE_IDS", "abc")]).is_err());
        assert!(config_from(&[("FPL_WEIGHTING", "linear")]).is_err());
        assert!(config_from(&[("FPL_PRICE_CEILING", "0")]).is_err());
        assert!(config_from(&[("FPL_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config_from(&[("FPL_GAMEWEEKS", "9-2")]).is_err());
    }

    #[test]
    fn gameweek_range_never_passes_current() {
        assert_eq!(GameweekRange::Current.resolve(8), 8..=8);
        assert_eq!(GameweekRange::All.resolve(3), 1..=3);
        assert_eq!(GameweekRange::Span(5, 40).resolve(10), 5..=10);
        assert!(GameweekRange::Span(12, 12).resolve(10).is_empty());
    }

    #[test]
    fn results_file_is_named_per_league_and_gameweek() {
        let cfg = config_from(&[("FPL_DATA_DIR", "assets")]).unwrap();
        assert_eq!(
            cfg.results_path(36590, 4),
            PathBuf::from("assets/fpl_team_similarity_36590_gw4.json")
        );
    }
}
