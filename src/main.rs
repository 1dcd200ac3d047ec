mod cli;
mod domains;
mod error;
mod filters;
mod fmt;
mod loader;
mod logging;
mod models;
mod reports;
mod settings;
mod tui;

use std::io::IsTerminal;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, FilterArgs, OutputFormat};

fn main() {
    let cli = Cli::parse();

    let interactive = match cli.command {
        Some(Commands::Dashboard) => true,
        None => std::io::stdout().is_terminal(),
        Some(_) => false,
    };
    if let Err(e) = logging::init(interactive) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = match cli.command {
        None if interactive => cli::dashboard::run(&cli.source),
        None => cli::report::run(&cli.source, &FilterArgs::default(), OutputFormat::Text),
        Some(Commands::Dashboard) => cli::dashboard::run(&cli.source),
        Some(Commands::Report { ref filters, format }) => {
            cli::report::run(&cli.source, filters, format)
        }
        Some(Commands::Domains) => cli::domains::run(&cli.source),
        Some(Commands::Load { ref path }) => cli::load::run(path, cli.source.sheet.as_deref()),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "onboard", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if interactive {
            tracing::error!("{e}");
        }
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
