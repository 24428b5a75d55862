//! Define elevation subcommand
use super::{new_dashboard, run_action};
use crate::config::Config;
use crate::dispatch::Action;
use crate::services::{DataSeries, Plot};
use crate::session::lock;
use crate::Error;
use structopt::StructOpt;

/// Elevation profile along the route between two locations
#[derive(Debug, StructOpt)]
pub struct ElevationOpts {
    #[structopt(name = "START")]
    start: String,
    #[structopt(name = "END")]
    end: String,
    /// only print the sampled elevations, don't draw a chart
    #[structopt(long)]
    no_plot: bool,
}

pub fn elevation_command(
    config: Config,
    opts: ElevationOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = new_dashboard(&config, config.fetch_strategy())?;
    run_action(
        &dashboard,
        &Action::Elevation {
            start: opts.start,
            end: opts.end,
        },
    )?;
    if opts.no_plot {
        return Ok(());
    }

    let chart = lock(dashboard.view())?
        .elevation_chart()
        .cloned()
        .ok_or(Error::ElevationNotFound)?;
    let plotter = config.get_plotting_visualization_handler()?;
    let mut plot = Plot::new(
        format!("Elevation profile ({:.2} km)", chart.total_distance_km()),
        "Distance (km)".to_string(),
        "Elevation (m)".to_string(),
    );
    plot.y_bounds = Some(chart.y_bounds());
    plot.x_labels = chart.x_labels();
    plot.add_series(DataSeries::new("elevation", chart.series()));
    plotter.plot(&[&plot])?;

    Ok(())
}
