//! Tiling core.
//!
//! This module turns one decoded strip image into a sequence of page tiles on
//! disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Batch processor / download pipeline   │
//! └────────────────────┬────────────────────┘
//!                      │  (source, context, start page)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                 Tiler                   │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ plan_pieces  │  │  TileEncoder    │  │
//! │  │ (row ranges) │  │ (normalize →    │  │
//! │  │              │  │  encode)        │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │  next page
//!                      ▼
//!                  filesystem
//! ```
//!
//! # Components
//!
//! - [`Tiler`]: slices each frame and writes tiles, returning the next page index
//! - [`SourceImage`]: decoded static or animated source
//! - [`plan_pieces`]: pure row-range partitioning
//! - [`TileEncoder`], [`EncodingPolicy`], [`normalize_color`]: output encoding
//! - [`NamingTemplate`], [`NamingContext`], [`OutputLayout`]: file and directory names

mod encoder;
mod layout;
mod naming;
mod source;
mod tiler;

pub use encoder::{
    clamp_quality, is_valid_quality, normalize_color, EncodingPolicy, OutputFormat,
    ResolvedEncoding, TileEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use layout::{piece_count, plan_pieces, PieceRange};
pub use naming::{
    NamingContext, NamingTemplate, OutputLayout, DEFAULT_CHAPTER_DIR_TEMPLATE,
    DEFAULT_FILE_TEMPLATE, DEFAULT_TITLE_SEPARATOR,
};
pub use source::SourceImage;
pub use tiler::{frame_dir_name, Tile, TileOutcome, Tiler, DEFAULT_PIECE_HEIGHT};
