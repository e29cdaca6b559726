//! strip-tiler - slice tall strip images into page-height tiles.
//!
//! This binary parses the command line, sets up logging and runs one of the
//! `split`, `tile` or `download` commands.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strip_tiler::{
    config::{Cli, Command, DownloadConfig, SplitConfig, TileConfig},
    BatchProcessor, DownloadPipeline, HttpImageFetcher, ManifestSource, NamingContext,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Split(config) => run_split(config),
        Command::Tile(config) => run_tile(config),
        Command::Download(config) => run_download(config).await,
    }
}

// =============================================================================
// Split Command
// =============================================================================

fn run_split(config: SplitConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Input: {}", config.input.display());
    info!("Output: {}", config.output.display());
    info!(
        "Piece height: {}px, format: {:?}",
        config.tiling.piece_height, config.tiling.format
    );

    let (tiler, layout) = match config.tiling.build() {
        Ok(built) => built,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let processor = BatchProcessor::new(tiler)
        .with_layout(layout)
        .with_separator(&config.tiling.title_separator);

    match processor.process_tree(&config.input, &config.output) {
        Ok(report) => {
            if !report.chapters_failed.is_empty() {
                warn!("{} chapter(s) failed", report.chapters_failed.len());
            }
            if config.json {
                print_json(&report);
            }
            if report.chapters_failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Tile Command
// =============================================================================

fn run_tile(config: TileConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = config.tiling.build().and_then(|(tiler, layout)| {
        let context = NamingContext::new(&config.title, &config.chapter)
            .with_separator(&config.tiling.title_separator);
        let output_dir = layout.chapter_path(&config.output, &context);
        tiler.tile_file(&config.image, &output_dir, &context, config.start)
    });

    match result {
        Ok(outcome) => {
            for tile in &outcome.tiles {
                info!("Saved: {}", tile.path.display());
            }
            // Next start index, for threading through shell scripts
            println!("{}", outcome.next_index);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to tile {}: {}", config.image.display(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Download Command
// =============================================================================

async fn run_download(config: DownloadConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match ManifestSource::from_path(&config.manifest).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to load manifest: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let series = source.manifest().title.clone();

    let fetcher = match HttpImageFetcher::with_config(config.fetcher_config()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (tiler, layout) = match config.tiling.build() {
        Ok(built) => built,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = DownloadPipeline::new(source, fetcher, tiler)
        .with_layout(layout)
        .with_separator(&config.tiling.title_separator)
        .with_range(config.range());

    match pipeline.run(&series, &config.output).await {
        Ok(report) => {
            if !report.chapters_skipped.is_empty() {
                warn!("{} chapter(s) skipped", report.chapters_skipped.len());
            }
            if config.json {
                print_json(&report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "strip_tiler=debug"
    } else {
        "strip_tiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(report: &T) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize report: {}", e),
    }
}
