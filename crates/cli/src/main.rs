//! tofmt - boss respawn timetable tool
//!
//! Exports a timetable as a shareable text envelope, inspects envelopes
//! received from others, prints the effective configuration, and runs an
//! in-process share/follow demo.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tofmt")]
#[command(about = "Boss respawn timetable sharing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the timetable as a text envelope
    Export {
        /// Catalog file (defaults to the built-in catalog)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// User settings file
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// none, zlib, bzip2 or zstd (overrides the settings file)
        #[arg(long)]
        compression: Option<String>,

        /// Record a kill now, as AREA:LINE:BOSS
        #[arg(short, long = "kill")]
        kills: Vec<String>,
    },
    /// Decode and summarize a text envelope
    Inspect {
        /// The envelope text
        text: String,

        /// Catalog file the envelope is validated against
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective catalog and settings as JSON
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Share a timetable with an in-process follower
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            config,
            settings,
            compression,
            kills,
        } => {
            let text = commands::export(config.as_deref(), settings.as_deref(), compression.as_deref(), &kills)?;
            println!("{text}");
        }
        Commands::Inspect { text, config, json } => {
            let summary = commands::inspect(&text, config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print();
            }
        }
        Commands::Config { config, settings } => {
            let effective = commands::effective_config(config.as_deref(), settings.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        Commands::Demo => commands::demo().await?,
    }

    Ok(())
}
