//! Tile encoder.
//!
//! This module chooses the output encoding for each tile, normalizes the color
//! mode of a piece to what that encoding can store, and encodes it.
//!
//! # Design Decisions
//!
//! - **Policy, not hardcoding**: callers pick between preserving the source
//!   container and forcing one format for every tile.
//!
//! - **Single normalization step**: every piece passes through
//!   [`normalize_color`] before encoding. Modes the target cannot store
//!   (alpha for JPEG, 16-bit for WebP, ...) are converted, never rejected.
//!
//! - **Deterministic output**: the same pixels, format and quality always
//!   produce the same bytes, so re-running a chapter overwrites tiles with
//!   identical files.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};

use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Output Format
// =============================================================================

/// Encodings a tile can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl OutputFormat {
    /// Map an `image` format to an output format, if we can encode it.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    /// The matching `image` format.
    pub const fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Gif => ImageFormat::Gif,
        }
    }

    /// Canonical file extension, without dot.
    pub const fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Gif => "GIF",
        }
    }

    /// Whether the encoding can store an alpha channel.
    pub const fn supports_alpha(&self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Whether the encoding can store 16 bits per channel.
    pub const fn supports_high_depth(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }

    /// Whether the encoding can store single-channel grayscale.
    pub const fn supports_gray(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Encoding Policy
// =============================================================================

/// How the output encoding of a tile is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingPolicy {
    /// Keep the source container; fall back to PNG when it cannot be encoded.
    #[default]
    Preserve,

    /// Always encode tiles in the given format.
    Force(OutputFormat),
}

/// Format and extension resolved for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEncoding {
    pub format: OutputFormat,
    pub extension: String,
}

impl EncodingPolicy {
    /// Resolve the output encoding for a source.
    ///
    /// With [`EncodingPolicy::Preserve`] the source file's own extension is kept
    /// when it names the same container (`.jpeg` stays `.jpeg`).
    pub fn resolve(&self, source: Option<ImageFormat>, source_ext: Option<&str>) -> ResolvedEncoding {
        match self {
            EncodingPolicy::Force(format) => ResolvedEncoding {
                format: *format,
                extension: format.extension().to_string(),
            },
            EncodingPolicy::Preserve => {
                let format = source
                    .and_then(OutputFormat::from_image_format)
                    .unwrap_or(OutputFormat::Png);
                let extension = source_ext
                    .map(str::to_ascii_lowercase)
                    .filter(|ext| {
                        ImageFormat::from_extension(ext) == Some(format.image_format())
                    })
                    .unwrap_or_else(|| format.extension().to_string());
                ResolvedEncoding { format, extension }
            }
        }
    }
}

// =============================================================================
// Color Normalization
// =============================================================================

/// Convert `image` to a color mode `format` can store.
///
/// Images already in a supported mode are returned untouched.
pub fn normalize_color(image: DynamicImage, format: OutputFormat) -> DynamicImage {
    let color = image.color();
    if is_supported(color, format) {
        return image;
    }

    if format.supports_alpha() && color.has_alpha() {
        if format.supports_high_depth() && color.bytes_per_pixel() / color.channel_count() >= 2 {
            DynamicImage::ImageRgba16(image.to_rgba16())
        } else {
            DynamicImage::ImageRgba8(image.to_rgba8())
        }
    } else if format.supports_high_depth() && color.bytes_per_pixel() / color.channel_count() >= 2 {
        DynamicImage::ImageRgb16(image.to_rgb16())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

fn is_supported(color: ColorType, format: OutputFormat) -> bool {
    match color {
        ColorType::Rgb8 => true,
        ColorType::Rgba8 => format.supports_alpha(),
        ColorType::L8 => format.supports_gray(),
        ColorType::La8 => format.supports_gray() && format.supports_alpha(),
        ColorType::L16 | ColorType::Rgb16 => format.supports_high_depth(),
        ColorType::La16 | ColorType::Rgba16 => {
            format.supports_high_depth() && format.supports_alpha()
        }
        _ => false,
    }
}

// =============================================================================
// Tile Encoder
// =============================================================================

/// Encoder for tile pieces.
#[derive(Debug, Clone, Copy)]
pub struct TileEncoder {
    quality: u8,
}

impl Default for TileEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileEncoder {
    /// Create an encoder with the default JPEG quality.
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Create an encoder with the given JPEG quality (clamped to 1-100).
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// JPEG quality in use.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Normalize the color mode of `image` and encode it as `format`.
    pub fn encode(&self, image: DynamicImage, format: OutputFormat) -> Result<Bytes, TileError> {
        let image = normalize_color(image, format);
        let mut output = Vec::new();

        let result = match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
                image.write_with_encoder(encoder)
            }
            other => image.write_to(&mut Cursor::new(&mut output), other.image_format()),
        };

        result.map_err(|e| TileError::Encode {
            format: format.name(),
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }

    /// Encode `image` and write it to `path`.
    pub fn write(
        &self,
        image: DynamicImage,
        format: OutputFormat,
        path: &Path,
    ) -> Result<usize, TileError> {
        let data = self.encode(image, format)?;
        std::fs::write(path, &data).map_err(|e| TileError::io(path, e))?;
        Ok(data.len())
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
