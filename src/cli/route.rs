//! Define route subcommand
use super::{new_dashboard, run_action, write_output};
use crate::config::Config;
use crate::dispatch::Action;
use crate::session::lock;
use crate::Error;
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

/// Route between two locations, given as free text or "lat,lng"
#[derive(Debug, StructOpt)]
pub struct RouteOpts {
    #[structopt(name = "START")]
    start: String,
    #[structopt(name = "END")]
    end: String,
    /// render the route, its markers and today's incidents to an image, "-" writes to stdout
    #[structopt(short, long, parse(from_os_str))]
    image: Option<PathBuf>,
}

pub fn route_command(config: Config, opts: RouteOpts) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = new_dashboard(&config, config.fetch_strategy())?;
    run_action(
        &dashboard,
        &Action::Route {
            start: opts.start,
            end: opts.end,
        },
    )?;

    if let Some(path) = opts.image {
        let route_drawer = config.get_route_visualization_handler()?;
        let (line, overlays, markers) = {
            let state = lock(dashboard.view())?;
            (
                state.route_line().cloned().ok_or(Error::RouteNotFound)?,
                state.traffic_lines().to_vec(),
                state.route_markers().to_vec(),
            )
        };
        let image_data = route_drawer.draw_route(&line, &overlays, &markers)?;
        write_output(Some(&path), &image_data)?;
        info!("wrote route image to {:?}", path);
    }

    Ok(())
}
