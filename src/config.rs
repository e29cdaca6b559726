//! Configuration management for strip-tiler.
//!
//! This module provides the command-line interface:
//! - `split`: re-tile an existing `<series>/<chapter>/` folder tree
//! - `tile`: tile a single image file
//! - `download`: fetch the chapters listed in a manifest and tile them
//!
//! Tiling options are shared by every subcommand and can also be set through
//! environment variables with the `STRIP_` prefix:
//!
//! - `STRIP_PIECE_HEIGHT` - Tile height in pixels (default: 2000)
//! - `STRIP_FORMAT` - Output encoding: preserve, jpeg, png, webp, gif (default: preserve)
//! - `STRIP_JPEG_QUALITY` - JPEG quality 1-100 (default: 95)
//! - `STRIP_FILE_TEMPLATE` - Tile file name template (default: `page_{page}.{ext}`)
//! - `STRIP_CHAPTER_DIR` - Chapter directory template (default: `chapter_{chapter}`)
//! - `STRIP_TITLE_SEPARATOR` - Replacement for spaces in titles (default: `_`)
//! - `STRIP_FETCH_TIMEOUT` - HTTP timeout in seconds for `download` (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::{TemplateError, TileError};
use crate::pipeline::ChapterRange;
use crate::source::{HttpFetcherConfig, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::tile::{
    is_valid_quality, EncodingPolicy, OutputFormat, OutputLayout, Tiler,
    DEFAULT_CHAPTER_DIR_TEMPLATE, DEFAULT_FILE_TEMPLATE, DEFAULT_JPEG_QUALITY,
    DEFAULT_PIECE_HEIGHT, DEFAULT_TITLE_SEPARATOR,
};

// =============================================================================
// CLI Structure
// =============================================================================

/// strip-tiler - slice tall strip images into page-height tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "strip-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Re-tile a folder tree of downloaded chapters (<series>/<chapter>/images)
    Split(SplitConfig),

    /// Tile a single image and print the next page index
    Tile(TileConfig),

    /// Download the chapters listed in a manifest and tile them
    Download(DownloadConfig),
}

// =============================================================================
// Shared Tiling Options
// =============================================================================

/// Output encoding selection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatArg {
    /// Keep the source container (PNG when it cannot be written)
    #[default]
    Preserve,
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl FormatArg {
    pub fn policy(self) -> EncodingPolicy {
        match self {
            FormatArg::Preserve => EncodingPolicy::Preserve,
            FormatArg::Jpeg => EncodingPolicy::Force(OutputFormat::Jpeg),
            FormatArg::Png => EncodingPolicy::Force(OutputFormat::Png),
            FormatArg::Webp => EncodingPolicy::Force(OutputFormat::WebP),
            FormatArg::Gif => EncodingPolicy::Force(OutputFormat::Gif),
        }
    }
}

/// Options controlling how images are tiled and named.
#[derive(Args, Debug, Clone)]
pub struct TilingArgs {
    /// Height of each tile in pixels.
    #[arg(long, default_value_t = DEFAULT_PIECE_HEIGHT, env = "STRIP_PIECE_HEIGHT")]
    pub piece_height: u32,

    /// Output encoding policy.
    #[arg(long, value_enum, default_value_t = FormatArg::Preserve, env = "STRIP_FORMAT")]
    pub format: FormatArg,

    /// JPEG quality for JPEG tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "STRIP_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Tile file name template ({title}, {chapter}, {page}, {page:0N}, {ext}).
    #[arg(long, default_value = DEFAULT_FILE_TEMPLATE, env = "STRIP_FILE_TEMPLATE")]
    pub file_template: String,

    /// Chapter directory template ({title}, {chapter}).
    #[arg(long, default_value = DEFAULT_CHAPTER_DIR_TEMPLATE, env = "STRIP_CHAPTER_DIR")]
    pub chapter_dir: String,

    /// Replacement for whitespace in series titles.
    #[arg(long, default_value = DEFAULT_TITLE_SEPARATOR, env = "STRIP_TITLE_SEPARATOR")]
    pub title_separator: String,
}

impl Default for TilingArgs {
    fn default() -> Self {
        Self {
            piece_height: DEFAULT_PIECE_HEIGHT,
            format: FormatArg::Preserve,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            file_template: DEFAULT_FILE_TEMPLATE.to_string(),
            chapter_dir: DEFAULT_CHAPTER_DIR_TEMPLATE.to_string(),
            title_separator: DEFAULT_TITLE_SEPARATOR.to_string(),
        }
    }
}

impl TilingArgs {
    /// Validate the tiling options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.piece_height == 0 {
            return Err("piece_height must be greater than 0".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.title_separator.contains(['/', '\\']) {
            return Err("title_separator must not contain path separators".to_string());
        }

        self.layout().map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Parse the naming templates.
    pub fn layout(&self) -> Result<OutputLayout, TemplateError> {
        OutputLayout::from_templates(&self.chapter_dir, &self.file_template)
    }

    /// Build a tiler from these options.
    pub fn tiler(&self) -> Result<Tiler, TileError> {
        self.build().map(|(tiler, _)| tiler)
    }

    /// Build the tiler together with the output layout it names files for.
    pub fn build(&self) -> Result<(Tiler, OutputLayout), TileError> {
        let layout = self.layout()?;
        let tiler = Tiler::new(self.piece_height)?
            .with_policy(self.format.policy())
            .with_jpeg_quality(self.jpeg_quality)
            .with_file_name(layout.file_name.clone());
        Ok((tiler, layout))
    }
}

// =============================================================================
// Split Command
// =============================================================================

/// Re-tile a folder tree.
#[derive(Args, Debug, Clone)]
pub struct SplitConfig {
    /// Input root containing <series>/<chapter>/ folders.
    #[arg(env = "STRIP_INPUT")]
    pub input: PathBuf,

    /// Output root.
    #[arg(env = "STRIP_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub tiling: TilingArgs,

    /// Print the run report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.tiling.validate()?;

        if self.input == self.output {
            return Err("input and output must be different directories".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Tile Command
// =============================================================================

/// Tile one image.
#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    /// Image file to tile.
    pub image: PathBuf,

    /// Output root.
    pub output: PathBuf,

    /// Series title.
    #[arg(long)]
    pub title: String,

    /// Chapter identifier.
    #[arg(long)]
    pub chapter: String,

    /// Page index of the first tile.
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    #[command(flatten)]
    pub tiling: TilingArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl TileConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.tiling.validate()?;

        if self.start == 0 {
            return Err("start must be at least 1".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.chapter.is_empty() || self.chapter.contains(['/', '\\']) {
            return Err("chapter must be a non-empty name without path separators".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Download Command
// =============================================================================

/// Download and tile chapters from a manifest.
#[derive(Args, Debug, Clone)]
pub struct DownloadConfig {
    /// JSON manifest listing chapters and image URLs.
    #[arg(env = "STRIP_MANIFEST")]
    pub manifest: PathBuf,

    /// Output root.
    #[arg(env = "STRIP_OUTPUT")]
    pub output: PathBuf,

    /// First chapter number to download.
    #[arg(long)]
    pub from: Option<u32>,

    /// Last chapter number to download.
    #[arg(long)]
    pub to: Option<u32>,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "STRIP_FETCH_TIMEOUT")]
    pub timeout: u64,

    /// User-Agent header for image requests.
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "STRIP_USER_AGENT")]
    pub user_agent: String,

    /// Referer header for image requests.
    #[arg(long, env = "STRIP_REFERER")]
    pub referer: Option<String>,

    #[command(flatten)]
    pub tiling: TilingArgs,

    /// Print the run report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.tiling.validate()?;

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(format!("--from ({}) is after --to ({})", from, to));
            }
        }

        Ok(())
    }

    pub fn range(&self) -> ChapterRange {
        ChapterRange {
            from: self.from,
            to: self.to,
        }
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
