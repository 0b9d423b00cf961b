mod cmd;
mod output;
mod products;
mod repair_console;
mod root;
mod session;
mod signals;
mod vendor;

#[cfg(feature = "cdp")]
mod cdp;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, progress::ProgressSubcommand, selector::SelectorSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "marketlist",
    about = "Resumable multi-account marketplace listing uploader",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from marketlist.yaml)
    #[arg(long, global = true, env = "MARKETLIST_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create marketlist.yaml and scaffold selector files
    Init {
        /// Regions to scaffold selector files for
        #[arg(long, value_delimiter = ',', default_value = "SG,HK,MY")]
        regions: Vec<String>,

        /// Categories to scaffold selector files for
        #[arg(long, value_delimiter = ',', default_value = "sneakers,bags,clothes")]
        categories: Vec<String>,
    },

    /// Upload every pending product in a product file
    Run(cmd::run::RunArgs),

    /// Inspect or clear resumption progress
    Progress {
        #[command(subcommand)]
        subcommand: ProgressSubcommand,
    },

    /// Inspect or patch selector files
    Selector {
        #[command(subcommand)]
        subcommand: SelectorSubcommand,
    },

    /// Show or validate marketlist.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Check that the fingerprint-browser API is reachable
    Health,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) | Commands::Health => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            regions,
            categories,
        } => cmd::init::run(&root, &regions, &categories),
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Progress { subcommand } => cmd::progress::run(&root, subcommand, cli.json),
        Commands::Selector { subcommand } => cmd::selector::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Health => cmd::health::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
