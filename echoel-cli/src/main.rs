use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod demo;

#[derive(Parser)]
#[command(name = "echoel", about = "Bio-reactive audio/visual plugin host")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// List the built-in plugins
    Plugins(commands::plugins::PluginsArgs),
    /// Run the host with the built-in plugins and simulated inputs
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Plugins(args) => commands::plugins::run(args),
        Commands::Run(args) => commands::run::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_run_duration() {
        let cli = Cli::try_parse_from(["echoel", "run", "--seconds", "0.5", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.seconds, 0.5),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parses_plugin_filter() {
        let cli = Cli::try_parse_from(["echoel", "plugins", "--capability", "audioEffect"]).unwrap();
        match cli.command {
            Commands::Plugins(args) => assert_eq!(args.capability.as_deref(), Some("audioEffect")),
            _ => panic!("expected plugins"),
        }
    }
}
