//! Decoded source images.
//!
//! A [`SourceImage`] holds every frame of a decoded strip image. Animated GIF,
//! animated WebP and APNG containers are expanded into their fully composited
//! frames; everything else decodes to a single frame.

use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageResult};

use crate::error::TileError;

/// A decoded image, possibly animated.
#[derive(Debug, Clone)]
pub struct SourceImage {
    frames: Vec<DynamicImage>,
    format: ImageFormat,
    extension: Option<String>,
}

impl SourceImage {
    /// Wrap an already decoded single-frame image.
    pub fn from_image(image: DynamicImage, format: ImageFormat) -> Self {
        Self {
            frames: vec![image],
            format,
            extension: None,
        }
    }

    /// Decode an image from raw bytes.
    ///
    /// The container is sniffed from the content; `hint` is only used when
    /// sniffing fails.
    pub fn from_bytes(data: &[u8], hint: Option<ImageFormat>) -> Result<Self, TileError> {
        let format = image::guess_format(data)
            .ok()
            .or(hint)
            .ok_or_else(|| TileError::Decode {
                message: "unrecognized image format".to_string(),
            })?;

        let frames = decode_frames(data, format).map_err(|e| TileError::Decode {
            message: e.to_string(),
        })?;

        if frames.is_empty() {
            return Err(TileError::Decode {
                message: "image contains no frames".to_string(),
            });
        }

        Ok(Self {
            frames,
            format,
            extension: None,
        })
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, TileError> {
        let data = std::fs::read(path).map_err(|e| TileError::io(path, e))?;
        let hint = ImageFormat::from_path(path).ok();

        let mut source = Self::from_bytes(&data, hint).map_err(|e| match e {
            TileError::Decode { message } => TileError::Decode {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;
        source.extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);

        Ok(source)
    }

    /// Detected container format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Extension of the file this image was read from, if any.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// All frames in display order.
    pub fn frames(&self) -> &[DynamicImage] {
        &self.frames
    }

    /// Whether the source has more than one frame.
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Frame width (constant across frames).
    pub fn width(&self) -> u32 {
        self.frames[0].width()
    }

    /// Height of the first frame.
    pub fn height(&self) -> u32 {
        self.frames[0].height()
    }
}

fn decode_frames(data: &[u8], format: ImageFormat) -> ImageResult<Vec<DynamicImage>> {
    match format {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(data))?;
            collect_frames(decoder)
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(data))?;
            if decoder.has_animation() {
                collect_frames(decoder)
            } else {
                Ok(vec![DynamicImage::from_decoder(decoder)?])
            }
        }
        ImageFormat::Png => {
            let mut decoder = PngDecoder::new(Cursor::new(data))?;
            if decoder.is_apng()? {
                collect_frames(decoder.apng()?)
            } else {
                Ok(vec![DynamicImage::from_decoder(decoder)?])
            }
        }
        other => Ok(vec![image::load_from_memory_with_format(data, other)?]),
    }
}

fn collect_frames<'a>(decoder: impl AnimationDecoder<'a>) -> ImageResult<Vec<DynamicImage>> {
    decoder
        .into_frames()
        .map(|frame| frame.map(|f| DynamicImage::ImageRgba8(f.into_buffer())))
        .collect()
}
