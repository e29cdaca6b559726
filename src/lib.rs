//! # strip-tiler
//!
//! Slices tall webtoon-style strip images into fixed-height page tiles.
//!
//! Long-strip reading sites deliver a chapter as a handful of very tall
//! images. This library cuts each of them into pieces of a fixed height and
//! numbers the pieces contiguously across the whole chapter, so paginated
//! readers show them in order.
//!
//! ## Features
//!
//! - **Deterministic slicing**: all tiles are exactly the piece height except a
//!   final remainder; re-running with the same inputs rewrites identical files
//! - **Animated sources**: GIF, WebP and APNG frames are tiled into per-frame folders
//! - **Encoding policy**: preserve the source container or force JPEG/PNG/WebP/GIF,
//!   with automatic color mode conversion
//! - **Configurable naming**: file and chapter directory templates
//! - **Batch mode**: re-tile an existing `<series>/<chapter>/` tree in natural order
//! - **Download mode**: fetch chapters listed by a [`source::ChapterSource`]
//!
//! ## Architecture
//!
//! - [`tile`] - The tiler: geometry, decoding, encoding, naming
//! - [`batch`] - Folder tree enumeration and batch re-tiling
//! - [`source`] - Chapter listing and image fetching collaborators
//! - [`pipeline`] - Download-and-tile driver
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use strip_tiler::{BatchProcessor, Tiler};
//!
//! let tiler = Tiler::new(2000).unwrap();
//! let report = BatchProcessor::new(tiler)
//!     .process_tree(Path::new("downloads"), Path::new("split"))
//!     .unwrap();
//! println!("{} tiles written", report.tiles_written);
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod tile;

// Re-export commonly used types
pub use batch::{
    discover_chapters, is_image_file, list_images, natural_cmp, BatchProcessor, BatchReport,
    ChapterDir, ChapterFailure, Discovery,
};
pub use config::{Cli, Command, DownloadConfig, FormatArg, SplitConfig, TileConfig, TilingArgs};
pub use error::{ChapterError, FetchError, RunError, SourceError, TemplateError, TileError};
pub use pipeline::{ChapterRange, DownloadPipeline, DownloadReport};
pub use source::{
    ChapterRef, ChapterSource, HttpImageFetcher, ImageFetcher, Manifest, ManifestSource,
};
pub use tile::{
    normalize_color, plan_pieces, EncodingPolicy, NamingContext, NamingTemplate, OutputFormat,
    OutputLayout, PieceRange, SourceImage, Tile, TileOutcome, Tiler,
};
