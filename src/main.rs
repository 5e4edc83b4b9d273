use anyhow::{Context, Result};

use fpl_similarity::config::Config;
use fpl_similarity::fpl_api::HttpFplApi;
use fpl_similarity::pipeline;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("invalid configuration")?;
    let api = HttpFplApi::new(&config).context("unable to build api client")?;
    let summary = pipeline::run(&config, &api).context("similarity run failed")?;

    println!("Team similarity run complete");
    println!("Current gameweek: {}", summary.current_gameweek);
    for league in &summary.leagues {
        println!("league {}: {}", league.id, league.name);
    }
    println!("Results written: {}", summary.results_written.len());
    for (league_id, gameweek) in &summary.results_written {
        println!(" - {}", config.results_path(*league_id, *gameweek).display());
    }
    if !summary.gameweeks_skipped.is_empty() {
        println!("Skipped (no valid teams): {}", summary.gameweeks_skipped.len());
        for (league_id, gameweek) in &summary.gameweeks_skipped {
            println!(" - league {league_id} gw{gameweek}");
        }
    }

    Ok(())
}
