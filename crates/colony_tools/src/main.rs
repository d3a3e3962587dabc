//! Colony Decision Core - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "colony-tools")]
#[command(about = "Development tools for the colony decision core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate colony config files
    Validate {
        /// Config file, or directory of .ron configs
        #[arg(default_value = "config/colonies")]
        path: PathBuf,
    },
    /// Render the cost grid for a region description
    Grid {
        /// Region description (RON)
        path: PathBuf,
        /// Also write the grid snapshot here
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating colony configs in: {}", path.display());
            match colony_tools::validate::validate_configs(&path) {
                Ok(reports) => tracing::info!("Validation passed ({} files)", reports.len()),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Grid { path, snapshot } => {
            match colony_tools::grid::render_grid_file(&path, snapshot.as_deref()) {
                Ok(rendered) => print!("{rendered}"),
                Err(e) => {
                    tracing::error!("Grid rendering failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
