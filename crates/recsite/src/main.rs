//! Recsite CLI - recorded meetings site publisher.
//!
//! Provides commands for:
//! - `consume`: Regenerate pages from catalog change notifications
//! - `rebuild`: Regenerate every page from a full catalog scan
//! - `path`: Print the site path of an organization, topic, or meeting

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConsumeArgs, PathArgs, RebuildArgs};
use output::Output;

/// Recsite - recorded meetings site publisher.
#[derive(Parser)]
#[command(name = "recsite", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover recsite.toml).
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Enable info-level logging.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// AWS region (overrides config).
    #[arg(long, global = true, env = "AWS_REGION")]
    pub(crate) region: Option<String>,

    /// Custom AWS endpoint URL, e.g. a local emulator (overrides config).
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub(crate) endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drain the notification queue and regenerate affected pages.
    Consume(ConsumeArgs),
    /// Regenerate every page from a full catalog scan.
    Rebuild(RebuildArgs),
    /// Print the site path for an organization, topic, or meeting.
    Path(PathArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Consume(args) => args.execute(&cli.global),
        Commands::Rebuild(args) => args.execute(&cli.global),
        Commands::Path(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "recsite",
            "consume",
            "--once",
            "--config",
            "site.toml",
            "--region",
            "eu-west-1",
        ])
        .unwrap();

        assert_eq!(cli.global.config, Some(PathBuf::from("site.toml")));
        assert_eq!(cli.global.region.as_deref(), Some("eu-west-1"));
        assert!(matches!(cli.command, Commands::Consume(_)));
    }

    #[test]
    fn test_once_conflicts_with_max_cycles() {
        let result = Cli::try_parse_from(["recsite", "consume", "--once", "--max-cycles", "3"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_path_requires_organization() {
        assert!(Cli::try_parse_from(["recsite", "path"]).is_err());
        assert!(
            Cli::try_parse_from(["recsite", "path", "Acme", "--start", "2024-01-01T15:00:00Z"])
                .is_err()
        );
    }
}
