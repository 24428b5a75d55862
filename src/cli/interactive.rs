//! Define interactive subcommand
use super::new_dashboard;
use crate::config::Config;
use crate::dispatch::{Action, Dashboard, Outcome, HELP};
use log::{debug, error};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use structopt::StructOpt;

/// Read dashboard commands line by line, type "help" for the command list
#[derive(Debug, StructOpt)]
pub struct InteractiveOpts {
    /// don't print a prompt before reading each command
    #[structopt(long)]
    no_prompt: bool,
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Rendered(text) => println!("{}", text.trim_end()),
        Outcome::Alert(alert) => eprintln!("ALERT: {}", alert),
        Outcome::Superseded | Outcome::Quit => {}
    }
}

/// Pipeline actions wait on the network, so each gets its own thread
fn is_pipeline(action: &Action) -> bool {
    matches!(
        action,
        Action::Route { .. } | Action::Elevation { .. } | Action::Places
    )
}

pub fn interactive_command(
    config: Config,
    opts: InteractiveOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = Arc::new(new_dashboard(&config, config.fetch_strategy())?);
    let mut running: Vec<JoinHandle<()>> = Vec::new();
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if !opts.no_prompt {
            print!("> ");
            io::stdout().flush()?;
        }
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let action: Action = match line.parse() {
            Ok(action) => action,
            Err(e) => {
                eprintln!("ALERT: {}", e);
                continue;
            }
        };
        if action == Action::Quit {
            break;
        }
        if is_pipeline(&action) {
            let dashboard: Arc<Dashboard> = Arc::clone(&dashboard);
            running.push(thread::spawn(move || print_outcome(dashboard.dispatch(&action))));
        } else {
            print_outcome(dashboard.dispatch(&action));
        }
        running.retain(|h| !h.is_finished());
    }

    debug!("waiting on {} running commands", running.len());
    for handle in running {
        if handle.join().is_err() {
            error!("command thread panicked");
        }
    }
    Ok(())
}
