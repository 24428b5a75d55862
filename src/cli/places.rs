//! Define places subcommand
use super::{new_dashboard, run_action};
use crate::config::Config;
use crate::dispatch::Action;
use crate::gps::BoundingBox;
use crate::places::FetchStrategy;
use structopt::StructOpt;

/// Places inside a bounding box with the current weather at each one
#[derive(Debug, StructOpt)]
pub struct PlacesOpts {
    /// bounding box as "south,west,north,east" in degrees
    #[structopt(short, long, allow_hyphen_values = true)]
    bbox: BoundingBox,
    /// number of weather requests in flight at once, overrides the config file
    #[structopt(long)]
    concurrency: Option<usize>,
}

pub fn places_command(config: Config, opts: PlacesOpts) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = match opts.concurrency {
        Some(n) => FetchStrategy::from_concurrency(n),
        None => config.fetch_strategy(),
    };
    let dashboard = new_dashboard(&config, strategy)?;
    run_action(&dashboard, &Action::DrawBox(opts.bbox))?;
    println!();
    run_action(&dashboard, &Action::Places)?;
    Ok(())
}
