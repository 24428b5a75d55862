use mapdash::cli::Cli;
use mapdash::config::Config;
use simplelog::{Config as LogConfig, TermLogger, TerminalMode};
use structopt::StructOpt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Cli::from_args();
    let config = Config::from_path(opt.config_path())?;
    TermLogger::init(
        opt.verbosity(config.log_level()),
        LogConfig::default(),
        TerminalMode::Mixed,
    )?;

    // execute any subcommands
    opt.execute_subcommand(config)
}
