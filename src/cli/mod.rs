//! Define the application's command line interface
use crate::config::Config;
use crate::dispatch::{Action, Dashboard, Outcome};
use crate::places::FetchStrategy;
use crate::services::MapApi;
use crate::Error;
use simplelog::LevelFilter;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use structopt::StructOpt;

mod elevation;
use elevation::{elevation_command, ElevationOpts};
mod interactive;
use interactive::{interactive_command, InteractiveOpts};
mod places;
use places::{places_command, PlacesOpts};
mod route;
use route::{route_command, RouteOpts};

/// Plan routes, check traffic, chart elevation profiles and find places with their weather
#[derive(Debug, StructOpt)]
#[structopt(name = "mapdash")]
pub struct Cli {
    /// Set logging level to debug, use a second time (e.g. -vv) to set logging to trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Suppress info logging messages use a second time (e.g. -qq) to hide warnings
    #[structopt(short, long, parse(from_occurrences))]
    quiet: i32,
    /// Config file to use instead of the default one in the user's config directory
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    cmd: Command,
}

impl Cli {
    /// Return the verbose flag counts as a log level filter
    pub fn verbosity(&self, default: LevelFilter) -> LevelFilter {
        if self.quiet == 1 {
            LevelFilter::Warn
        } else if self.quiet > 1 {
            LevelFilter::Error
        } else if self.verbose == 1 {
            LevelFilter::Debug
        } else if self.verbose > 1 {
            LevelFilter::Trace
        } else {
            default
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Consume options struct and return the result of subcommand execution
    pub fn execute_subcommand(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        self.cmd.execute(config)
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Draw a route between two locations and list traffic incidents along it
    #[structopt(name = "route")]
    Route(RouteOpts),
    /// Chart the elevation profile of the route between two locations
    #[structopt(name = "elevation")]
    Elevation(ElevationOpts),
    /// List places and their current weather inside a bounding box
    #[structopt(name = "places")]
    Places(PlacesOpts),
    /// Run commands from stdin against a single shared map view
    #[structopt(name = "interactive")]
    Interactive(InteractiveOpts),
}

impl Command {
    /// Consume enum variant and return the result of the command's execution
    fn execute(self, config: Config) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Command::Route(opts) => route_command(config, opts),
            Command::Elevation(opts) => elevation_command(config, opts),
            Command::Places(opts) => places_command(config, opts),
            Command::Interactive(opts) => interactive_command(config, opts),
        }
    }
}

/// Build the dashboard from the configured map API
fn new_dashboard(config: &Config, strategy: FetchStrategy) -> Result<Dashboard, Error> {
    let api: Arc<dyn MapApi> = Arc::from(config.get_map_api_handler()?);
    Ok(Dashboard::new(api, strategy))
}

/// Dispatch a single action and print its output, an alert becomes the command's error
fn run_action(dashboard: &Dashboard, action: &Action) -> Result<(), Error> {
    match dashboard.dispatch(action) {
        Outcome::Rendered(text) => {
            print!("{}", text);
            Ok(())
        }
        Outcome::Alert(alert) => Err(Error::Other(alert)),
        Outcome::Superseded | Outcome::Quit => Ok(()),
    }
}

/// Write binary output to a file, or stdout if no path or "-" is given
fn write_output(path: Option<&Path>, data: &[u8]) -> io::Result<()> {
    match path {
        Some(path) if path.to_string_lossy() != "-" => std::fs::write(path, data),
        _ => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(data)
        }
    }
}
