use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use music_tracker::{
    cli_types::{Cli, Commands},
    ui::UIManager,
    CliApp, CliConfig,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so tables on stdout stay clean
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("music_tracker={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = CliConfig::load().context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config = config.with_database_path(db);
    }
    let colors_enabled = !cli.no_color;

    match cli.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config => {
            let ui = UIManager::new(colors_enabled && config.output.colors);
            ui.print_header("Configuration");
            ui.print_info(&config.to_toml().context("Failed to render configuration")?);
            Ok(())
        }
        command => {
            let mut app = CliApp::new(config, colors_enabled)?;
            match command {
                Commands::Add(args) => app.add(args).map(|_| ()),
                Commands::List(args) => app.list(args),
                Commands::Show(args) => app.show(args),
                Commands::Refine(args) => app.refine(args),
                Commands::Reject(args) => app.reject(args),
                Commands::Review(args) => app.review(args),
                Commands::Open(args) => app.open(args),
                Commands::Stats => app.stats(),
                Commands::Analytics => app.analytics(),
                Commands::Version | Commands::Config => Ok(()),
            }
        }
    }
}
