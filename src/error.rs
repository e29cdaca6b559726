use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while tiling a source image.
#[derive(Debug, Error)]
pub enum TileError {
    /// Source bytes or file could not be interpreted as an image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// A piece could not be encoded in the chosen output format
    #[error("Failed to encode {format} tile: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    /// A tile or directory could not be written
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Piece height must be positive
    #[error("Invalid piece height: {0} (must be greater than 0)")]
    InvalidPieceHeight(u32),

    /// Page indices start at 1
    #[error("Invalid start index: {0} (page indices start at 1)")]
    InvalidStartIndex(u32),

    /// Numbering from `start` runs past the largest page index
    #[error("Page index overflow: tiles numbered from {start} exceed {}", u32::MAX)]
    PageOverflow { start: u32 },

    /// Naming template could not be parsed or is unusable
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

impl TileError {
    /// Whether this error only concerns the current source image.
    ///
    /// Decode and encode failures skip the image; everything else stops the chapter.
    pub fn is_per_image(&self) -> bool {
        matches!(self, TileError::Decode { .. } | TileError::Encode { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised when parsing a naming template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Opening brace without matching closing brace
    #[error("Unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    /// Stray closing brace
    #[error("Unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    /// Placeholder name not recognised
    #[error("Unknown placeholder: {{{0}}}")]
    UnknownPlaceholder(String),

    /// File name template without a page placeholder would overwrite itself
    #[error("Template '{0}' has no {{page}} placeholder")]
    MissingPage(String),

    /// Template renders path separators
    #[error("Template '{0}' must not contain path separators")]
    PathSeparator(String),
}

/// Errors from the chapter listing collaborator
#[derive(Debug, Error)]
pub enum SourceError {
    /// Manifest or listing could not be read
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing content could not be parsed
    #[error("Failed to parse listing: {0}")]
    Parse(String),

    /// URL in the listing is malformed
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Series or chapter unknown to this source
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors from the image fetching collaborator
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or connection error
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// URL cannot be requested
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
}

/// Errors that stop one downloaded chapter; the run continues with the next.
#[derive(Debug, Error)]
pub enum ChapterError {
    /// The source could not list the chapter's images
    #[error("Failed to list images: {0}")]
    Listing(#[from] SourceError),

    /// The source listed no images for the chapter
    #[error("No images found")]
    Empty,

    /// Tiling failed in a way that affects the whole chapter
    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Errors that end a batch or download run before any chapter is processed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Input directory does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Failed to list chapters: {0}")]
    Source(#[from] SourceError),
}
