use std::collections::HashMap;
use std::thread;

use log::{debug, info, warn};

use crate::aggregate::pair_with_managers;
use crate::cache_store::{GameweekStatus, IncrementalCache};
use crate::config::Config;
use crate::error::{FetchError, ProjectionError, RunError};
use crate::fpl_api::FplApi;
use crate::model::{AggregatedGroup, LeagueName, ManagerPicks};
use crate::persist;
use crate::projection::{Pca, Point2, Projector, Tsne, TsneInit};
use crate::vector::{Lineup, PlayerUniverse, WeightScheme, build_vector};

/// Managers whose vectors are bit-for-bit identical.
#[derive(Debug, Clone)]
pub struct TeamGroup<'a> {
    pub vector: Vec<f64>,
    pub members: Vec<&'a ManagerPicks>,
}

/// One vector per team, all over the same batch universe.
pub fn build_team_vectors(
    teams: &[ManagerPicks],
    prices: &HashMap<u32, f64>,
    scheme: &WeightScheme,
) -> (PlayerUniverse, Vec<Vec<f64>>) {
    let universe = PlayerUniverse::from_rosters(teams.iter().map(|t| t.summary.roster.as_slice()));
    let vectors = teams
        .iter()
        .map(|team| {
            let summary = &team.summary;
            build_vector(
                Lineup {
                    roster: &summary.roster,
                    captain: summary.captain,
                    vice_captain: summary.vice_captain,
                    active_chip: summary.active_chip.as_ref(),
                },
                &universe,
                prices,
                scheme,
            )
        })
        .collect();
    (universe, vectors)
}

/// Group teams by exact vector equality, in first-seen order.
pub fn group_identical<'a>(
    teams: &'a [ManagerPicks],
    vectors: Vec<Vec<f64>>,
) -> Vec<TeamGroup<'a>> {
    let mut slot_by_key: HashMap<Vec<u64>, usize> = HashMap::new();
    let mut groups: Vec<TeamGroup<'a>> = Vec::new();

    for (team, vector) in teams.iter().zip(vectors) {
        let key: Vec<u64> = vector.iter().map(|w| w.to_bits()).collect();
        match slot_by_key.get(&key) {
            Some(&slot) => groups[slot].members.push(team),
            None => {
                slot_by_key.insert(key, groups.len());
                groups.push(TeamGroup {
                    vector,
                    members: vec![team],
                });
            }
        }
    }
    groups
}

/// Collapse each group to one output row. Pick fields come from the first
/// member; coordinates are matched by position.
pub fn aggregate_groups(
    groups: &[TeamGroup<'_>],
    pca: &[Point2],
    tsne: &[Point2],
) -> Vec<AggregatedGroup> {
    groups
        .iter()
        .zip(pca.iter().zip(tsne))
        .map(|(group, (pca, tsne))| {
            let first = &group.members[0].summary;
            AggregatedGroup {
                manager_names: group.members.iter().map(|m| m.manager.name.clone()).collect(),
                team_names: group
                    .members
                    .iter()
                    .map(|m| m.manager.team_name.clone())
                    .collect(),
                team_ids: group.members.iter().map(|m| m.manager.team_id).collect(),
                manager_count: group.members.len(),
                captain: first.captain,
                vice_captain: first.vice_captain,
                total_points: first.total_points,
                rank: first.overall_rank,
                gw_points: first.gw_points,
                gw_rank: first.gw_rank,
                active_chip: first.active_chip.clone(),
                players_owned: first.player_ids(),
                pca_x: pca[0],
                pca_y: pca[1],
                tsne_x: tsne[0],
                tsne_y: tsne[1],
            }
        })
        .collect()
}

/// Vectors, grouping and both projections for one batch of teams.
pub fn analyse_batch(
    teams: &[ManagerPicks],
    prices: &HashMap<u32, f64>,
    scheme: &WeightScheme,
    pca: &dyn Projector,
    tsne: &dyn Projector,
) -> Result<Vec<AggregatedGroup>, ProjectionError> {
    let (universe, vectors) = build_team_vectors(teams, prices, scheme);
    let groups = group_identical(teams, vectors);
    info!(
        "{} teams, {} distinct, {} players in universe",
        teams.len(),
        groups.len(),
        universe.len()
    );

    let distinct: Vec<Vec<f64>> = groups.iter().map(|g| g.vector.clone()).collect();
    debug!("projecting with {} and {}", pca.name(), tsne.name());
    let pca_points = pca.project(&distinct)?;
    let tsne_points = tsne.project(&distinct)?;
    Ok(aggregate_groups(&groups, &pca_points, &tsne_points))
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub current_gameweek: u32,
    pub leagues: Vec<LeagueName>,
    pub results_written: Vec<(u32, u32)>,
    pub gameweeks_skipped: Vec<(u32, u32)>,
}

/// Page 1 of each league's standings, for its display name.
pub fn fetch_league_names(
    api: &dyn FplApi,
    league_ids: &[u32],
    config: &Config,
) -> Result<Vec<LeagueName>, RunError> {
    let mut leagues = Vec::with_capacity(league_ids.len());
    for (idx, &league_id) in league_ids.iter().enumerate() {
        if idx > 0 {
            thread::sleep(config.request_delay);
        }
        info!("fetching league name for league {league_id}");
        let page = api.fetch_standings(league_id, 1)?;
        let league = page.league.ok_or(FetchError::MissingLeague(league_id))?;
        leagues.push(LeagueName {
            id: league_id,
            name: league.name,
        });
    }
    Ok(leagues)
}

pub fn refresh_league_names(
    api: &dyn FplApi,
    config: &Config,
) -> Result<Vec<LeagueName>, RunError> {
    let leagues = fetch_league_names(api, &config.league_ids, config)?;
    persist::write_league_names(
        &config.leagues_path(),
        &config.available_leagues_path(),
        &leagues,
    )?;
    Ok(leagues)
}

/// One full pass: catalogue, league names, then every configured league and
/// gameweek.
pub fn run(config: &Config, api: &dyn FplApi) -> Result<RunSummary, RunError> {
    let bootstrap = api.fetch_bootstrap()?;
    persist::write_player_catalogue(&config.player_data_path(), &bootstrap)?;
    let prices = bootstrap.prices();
    let status = GameweekStatus {
        current: bootstrap.current_gameweek,
        finished: bootstrap.current_finished,
    };
    info!(
        "current gameweek {} (finished: {})",
        status.current, status.finished
    );

    let mut summary = RunSummary {
        current_gameweek: status.current,
        leagues: refresh_league_names(api, config)?,
        ..RunSummary::default()
    };

    let cache = IncrementalCache::new(
        config.managers_cache_path(),
        config.picks_cache_path(),
        config.request_delay,
    );
    let scheme = config.weight_scheme();
    let tsne = Tsne {
        perplexity_cap: config.perplexity_cap,
        max_iter: config.tsne_max_iter,
        init: TsneInit::Pca,
    };

    for &league_id in &config.league_ids {
        info!("processing league {league_id}");
        let managers = cache.managers(api, league_id)?;
        if managers.is_empty() {
            warn!("league {league_id} has no managers, skipping");
            continue;
        }

        for gameweek in config.gameweeks.resolve(status.current) {
            info!("processing gameweek {gameweek}");
            let picks = cache.gameweek_picks(api, league_id, &managers, gameweek, status)?;
            let teams = pair_with_managers(&managers, &picks);
            if teams.is_empty() {
                warn!("no valid team data for league {league_id} gameweek {gameweek}, skipping");
                summary.gameweeks_skipped.push((league_id, gameweek));
                continue;
            }

            let groups = analyse_batch(&teams, &prices, &scheme, &Pca, &tsne)?;
            persist::write_results(&config.results_path(league_id, gameweek), &groups)?;
            summary.results_written.push((league_id, gameweek));
        }
    }

    Ok(summary)
}
