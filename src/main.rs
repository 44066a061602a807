//! tileconv - tile pyramid format and datatype conversion.
//!
//! This binary wraps the conversion pipeline for command-line use: validate
//! a configuration and inspect the derived pyramids, or convert a single
//! tile from a directory of source tiles.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tileconv::{Config, FsTileSource, TileConverter, TileOutcome};

#[derive(Parser)]
#[command(name = "tileconv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print the derived pyramids.
    Check {
        #[command(flatten)]
        config: Config,
    },

    /// Convert one tile from the source directory.
    Tile {
        #[command(flatten)]
        config: Config,

        /// Tile address as level/row/col in the output pyramid.
        address: String,

        /// Conditional identity tag, as from a previous run.
        #[arg(long)]
        if_none_match: Option<String>,

        /// Write the produced tile here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Check { config } => run_check(config),
        Command::Tile {
            config,
            address,
            if_none_match,
            output,
        } => run_tile(config, address, if_none_match, output).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tileconv=debug"
    } else {
        "tileconv=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: Config) -> ExitCode {
    let built = match config.build() {
        Ok(built) => built,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("tileconv configuration");
    println!("──────────────────────");
    println!();

    for (label, geometry) in [("Input", &built.input), ("Output", &built.output)] {
        println!(
            "{} pyramid: {}x{} pixels, {} channel(s), {:?}, skip {}",
            label,
            geometry.size.x,
            geometry.size.y,
            geometry.size.c,
            geometry.datatype,
            geometry.skip
        );
        for (i, level) in geometry.levels().iter().enumerate() {
            println!(
                "  level {:2}: {:5} x {:5} tiles, resolution {:.6} x {:.6}",
                i, level.tiles_wide, level.tiles_high, level.rx, level.ry
            );
        }
        println!();
    }

    println!("Output format: {}", built.output_format.name());
    match &built.lut {
        Some(lut) => println!("LUT: {} control points", lut.points().len()),
        None => println!("LUT: none (passthrough datatype)"),
    }
    println!("Empty tile: {} bytes, tag {}", built.empty_tile.len(), built.empty_etag);
    println!();
    println!("Configuration is valid.");

    ExitCode::SUCCESS
}

// =============================================================================
// Tile Command
// =============================================================================

async fn run_tile(
    config: Config,
    address: String,
    if_none_match: Option<String>,
    output: Option<PathBuf>,
) -> ExitCode {
    let source_dir = match &config.source_dir {
        Some(dir) => dir.clone(),
        None => {
            error!("A source directory is required. Set --source-dir or TILECONV_SOURCE_DIR");
            return ExitCode::FAILURE;
        }
    };

    let built = match config.build() {
        Ok(built) => built,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let converter = match TileConverter::new(built, FsTileSource::new(source_dir)) {
        Ok(converter) => converter,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match converter
        .get_tile_path(&address, if_none_match.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Tile {} failed: {}", address, e);
            return ExitCode::FAILURE;
        }
    };

    let response = match outcome {
        TileOutcome::Tile(response) => response,
        TileOutcome::NotModified => {
            eprintln!("Not modified");
            return ExitCode::SUCCESS;
        }
        TileOutcome::Missing => {
            eprintln!("Missing tile, serving the canonical payload");
            converter.missing_response()
        }
        TileOutcome::NotFound => {
            error!("Tile {} exists upstream but could not be decoded", address);
            return ExitCode::FAILURE;
        }
    };

    eprintln!("ETag: {}", response.etag);
    eprintln!("Content-Type: {}", response.mime);

    let result = match output {
        Some(path) => std::fs::write(&path, &response.data)
            .map_err(|e| format!("{}: {}", path.display(), e)),
        None => std::io::stdout()
            .write_all(&response.data)
            .map_err(|e| e.to_string()),
    };
    if let Err(e) = result {
        error!("Failed to write tile: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
