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
    let leagues = pipeline::refresh_league_names(&api, &config).context("league refresh failed")?;

    println!("League names refreshed");
    println!("File: {}", config.available_leagues_path().display());
    for league in leagues {
        println!("league {}: {}", league.id, league.name);
    }
    Ok(())
}
