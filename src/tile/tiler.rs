//! The tiler: slices source frames into page-height tiles on disk.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Tiler::tile()                          │
//! │  for each frame (frame_NN/ subdirectory when animated):       │
//! │    1. plan_pieces(frame height, piece height)                 │
//! │    2. crop [0, W) × [y0, y1)                                  │
//! │    3. normalize color → encode → write <template>.<ext>       │
//! │    4. page += 1                                               │
//! │  return next page                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The page counter is threaded by the caller: pass the returned
//! `next_index` as the `start_index` of the next image in the same chapter.
//! The counter has no locking; one chapter must not be tiled concurrently.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TileError;

use super::encoder::{EncodingPolicy, OutputFormat, TileEncoder, DEFAULT_JPEG_QUALITY};
use super::layout::{plan_pieces, PieceRange};
use super::naming::{NamingContext, NamingTemplate};
use super::source::SourceImage;

/// Default piece height in pixels.
pub const DEFAULT_PIECE_HEIGHT: u32 = 2000;

// =============================================================================
// Tiles
// =============================================================================

/// One output tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Frame the tile was cut from (0 for static sources)
    pub frame: usize,

    /// Source rows covered by this tile
    pub range: PieceRange,

    /// Assigned page index
    pub page: u32,

    /// Destination file
    pub path: PathBuf,

    /// Output encoding
    pub format: OutputFormat,
}

/// Result of tiling one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOutcome {
    /// Tiles in page order
    pub tiles: Vec<Tile>,

    /// Page index to pass as `start_index` for the next image of the chapter
    pub next_index: u32,
}

// =============================================================================
// Tiler
// =============================================================================

/// Slices source images into fixed-height tiles.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use strip_tiler::tile::{NamingContext, SourceImage, Tiler};
///
/// let tiler = Tiler::new(2000).unwrap();
/// let context = NamingContext::new("Muse on Fame", "1");
///
/// let mut page = 1;
/// for file in ["001.jpg", "002.jpg"] {
///     let source = SourceImage::open(Path::new(file)).unwrap();
///     page = tiler.tile(&source, Path::new("out"), &context, page).unwrap().next_index;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Tiler {
    piece_height: NonZeroU32,
    policy: EncodingPolicy,
    encoder: TileEncoder,
    file_name: NamingTemplate,
}

impl Tiler {
    /// Create a tiler with the default policy (preserve source format) and
    /// file name template.
    pub fn new(piece_height: u32) -> Result<Self, TileError> {
        let piece_height =
            NonZeroU32::new(piece_height).ok_or(TileError::InvalidPieceHeight(piece_height))?;
        Ok(Self {
            piece_height,
            policy: EncodingPolicy::default(),
            encoder: TileEncoder::with_quality(DEFAULT_JPEG_QUALITY),
            file_name: NamingTemplate::default(),
        })
    }

    pub fn with_policy(mut self, policy: EncodingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.encoder = TileEncoder::with_quality(quality);
        self
    }

    pub fn with_file_name(mut self, template: NamingTemplate) -> Self {
        self.file_name = template;
        self
    }

    pub fn piece_height(&self) -> u32 {
        self.piece_height.get()
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    /// Compute the tiles for `source` without writing anything.
    pub fn plan(
        &self,
        source: &SourceImage,
        output_dir: &Path,
        context: &NamingContext,
        start_index: u32,
    ) -> Result<Vec<Tile>, TileError> {
        self.plan_pages(source, output_dir, context, start_index)
            .map(|(tiles, _)| tiles)
    }

    /// Plan tiles and the page index following the last one.
    fn plan_pages(
        &self,
        source: &SourceImage,
        output_dir: &Path,
        context: &NamingContext,
        start_index: u32,
    ) -> Result<(Vec<Tile>, u32), TileError> {
        if start_index == 0 {
            return Err(TileError::InvalidStartIndex(start_index));
        }

        let encoding = self.policy.resolve(Some(source.format()), source.extension());
        let animated = source.is_animated();
        let mut page = start_index;
        let mut tiles = Vec::new();

        for (frame_index, frame) in source.frames().iter().enumerate() {
            let dir = if animated {
                output_dir.join(frame_dir_name(frame_index))
            } else {
                output_dir.to_path_buf()
            };

            for range in plan_pieces(frame.height(), self.piece_height) {
                let name = self.file_name.render(context, page, &encoding.extension);
                tiles.push(Tile {
                    frame: frame_index,
                    range,
                    page,
                    path: dir.join(name),
                    format: encoding.format,
                });
                page = page
                    .checked_add(1)
                    .ok_or(TileError::PageOverflow { start: start_index })?;
            }
        }

        Ok((tiles, page))
    }

    /// Slice `source` into tiles under `output_dir`, numbering from `start_index`.
    ///
    /// # Errors
    ///
    /// - [`TileError::InvalidStartIndex`] if `start_index` is 0
    /// - [`TileError::PageOverflow`] if the next page index does not fit in a `u32`
    /// - [`TileError::Io`] if a directory or tile cannot be written; tiles
    ///   written before the failure are left in place
    /// - [`TileError::Encode`] if a piece cannot be encoded
    pub fn tile(
        &self,
        source: &SourceImage,
        output_dir: &Path,
        context: &NamingContext,
        start_index: u32,
    ) -> Result<TileOutcome, TileError> {
        let (tiles, next_index) = self.plan_pages(source, output_dir, context, start_index)?;

        debug!(
            "Tiling {}x{} {:?} source ({} frame(s)) into {} tile(s) from page {}",
            source.width(),
            source.height(),
            source.format(),
            source.frames().len(),
            tiles.len(),
            start_index
        );

        std::fs::create_dir_all(output_dir).map_err(|e| TileError::io(output_dir, e))?;

        let mut current_dir: Option<&Path> = None;
        for tile in &tiles {
            if let Some(parent) = tile.path.parent() {
                if current_dir != Some(parent) {
                    std::fs::create_dir_all(parent).map_err(|e| TileError::io(parent, e))?;
                    current_dir = Some(parent);
                }
            }

            let frame = &source.frames()[tile.frame];
            let piece = frame.crop_imm(0, tile.range.y0, frame.width(), tile.range.height());
            let written = self.encoder.write(piece, tile.format, &tile.path)?;

            debug!(
                "Saved page {} ({} rows, {} bytes): {}",
                tile.page,
                tile.range.height(),
                written,
                tile.path.display()
            );
        }

        Ok(TileOutcome { tiles, next_index })
    }

    /// Open an image file and tile it.
    pub fn tile_file(
        &self,
        path: &Path,
        output_dir: &Path,
        context: &NamingContext,
        start_index: u32,
    ) -> Result<TileOutcome, TileError> {
        let source = SourceImage::open(path)?;
        self.tile(&source, output_dir, context, start_index)
    }
}

/// Subdirectory name for a frame of an animated source.
pub fn frame_dir_name(frame_index: usize) -> String {
    format!("frame_{frame_index:02}")
}
