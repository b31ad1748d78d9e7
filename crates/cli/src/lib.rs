pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use specwatch_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "specwatch",
    about = "Specwatch assistant CLI",
    long_about = "Route natural-language requests about RF spectrum automation rules through \
                  the specwatch intent router.",
    after_help = "Examples:\n  specwatch query \"list my rules\"\n  specwatch demo\n  specwatch repl"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the TOML config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Route a single query and print the response")]
    Query {
        #[arg(help = "The natural-language request")]
        text: String,
    },
    #[command(about = "Interactive prompt; type 'quit' to exit")]
    Repl,
    #[command(about = "Run the built-in demo queries against the seeded store")]
    Demo,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        ..LoadOptions::default()
    })?;
    init_logging(&config);

    let router = commands::build_router(&config)?;
    match cli.command {
        Command::Query { text } => commands::query(&router, &text).await,
        Command::Repl => commands::repl(&router).await,
        Command::Demo => commands::demo(&router).await,
    }
}

fn init_logging(config: &AppConfig) {
    use specwatch_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
