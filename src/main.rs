//! feescope - checkout page fee analyzer CLI

use clap::Parser;
use tracing_subscriber::EnvFilter;

use feescope::cli::{Cli, Commands, NotifyCommands};
use feescope::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays clean for --json
fn init_logging(verbose: bool) {
    let default_level = if verbose { "feescope=info" } else { "warn" };
    let filter = EnvFilter::try_from_env("FEESCOPE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // Analysis
        Commands::Analyze { source, site, json, save, no_record } => {
            commands::cmd_analyze(&source, site, json, save, !no_record)
        }
        Commands::Monitor { source, site, json, save, linger } => {
            commands::cmd_monitor(&source, site, json, save, linger)
        }

        // History and analytics
        Commands::History { limit, json } => commands::cmd_history(limit, json),
        Commands::Forget { id } => commands::cmd_forget(&id),
        Commands::Clear { yes } => commands::cmd_clear(yes),
        Commands::Stats { json } => commands::cmd_stats(json),

        // Notifications
        Commands::Notify(NotifyCommands::Set { ntfy, slack, discord, command, disable }) => {
            commands::cmd_notify_set(ntfy, slack, discord, command, disable)
        }
        Commands::Notify(NotifyCommands::Show) => commands::cmd_notify_show(),
        Commands::Notify(NotifyCommands::Test) => commands::cmd_notify_test(),

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
