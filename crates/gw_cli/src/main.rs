//! Griefwatch CLI
//!
//! Batch analysis over decoded timeline documents: timeline JSON in,
//! findings report JSON out, progress on stderr.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gw_core::analysis::{run_analysis, AnalysisOptions, ProgressUpdate};
use gw_core::timeline_from_json;

#[derive(Parser)]
#[command(name = "gw_cli")]
#[command(about = "Detect griefing behavior in decoded demo timelines", long_about = None)]
#[command(version = gw_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one timeline document
    Analyze {
        /// Input timeline JSON file path
        #[arg(long)]
        r#in: PathBuf,

        /// Output report JSON file path
        #[arg(long)]
        out: PathBuf,

        /// Enable the experimental detectors (blocking, inactivity,
        /// objective, economy)
        #[arg(long, default_value = "false")]
        experimental: bool,

        /// Pretty-print the report JSON
        #[arg(long, default_value = "false")]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { r#in, out, experimental, pretty } => {
            let input = fs::read_to_string(&r#in)
                .with_context(|| format!("reading timeline from {}", r#in.display()))?;
            let timeline = timeline_from_json(&input)
                .with_context(|| format!("parsing timeline from {}", r#in.display()))?;
            tracing::info!(
                frames = timeline.frames.len(),
                rounds = timeline.rounds.len(),
                experimental,
                "timeline loaded"
            );

            let opts = if experimental {
                AnalysisOptions::with_experimental()
            } else {
                AnalysisOptions::default()
            };
            let mut progress = |u: ProgressUpdate| {
                eprintln!("[{:>5.1}%] {}", u.percentage, u.current_step);
            };
            let results = run_analysis(&timeline, &opts, &mut progress)
                .context("analysis failed")?;

            let report = if pretty {
                serde_json::to_string_pretty(&results)?
            } else {
                serde_json::to_string(&results)?
            };
            fs::write(&out, report)
                .with_context(|| format!("writing report to {}", out.display()))?;
            tracing::info!(
                afk = results.afk_detections.len(),
                team_kills = results.team_kills.len(),
                team_damage = results.team_damage.len(),
                disconnects = results.disconnects.len(),
                team_flashes = results.team_flashes.len(),
                out = %out.display(),
                "report written"
            );
            Ok(())
        }
    }
}
