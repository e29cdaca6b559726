//! Chapter sources and image fetchers.
//!
//! These are the collaborators that feed the tiler when chapters come from the
//! network instead of a local folder:
//!
//! ```text
//! ┌─────────────────┐   ChapterRef    ┌─────────────────┐   bytes   ┌───────┐
//! │  ChapterSource  │ ──────────────▶ │  ImageFetcher   │ ────────▶ │ Tiler │
//! │ (one per site)  │   image URLs    │ (HTTP, no retry)│           └───────┘
//! └─────────────────┘                 └─────────────────┘
//! ```
//!
//! Each site gets its own [`ChapterSource`] implementation. Listing returns an
//! explicit, ordered list of [`ChapterRef`]s that the download step consumes;
//! there is no shared chapter state between the two steps.

mod http;
mod manifest;

pub use http::{HttpFetcherConfig, HttpImageFetcher, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use manifest::{ChapterEntry, Manifest, ManifestSource};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, SourceError};

/// A chapter as listed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    /// Chapter number used for ordering and naming
    pub number: u32,

    /// Optional display label (e.g. "Chapter 12.5")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Chapter page URL, if the source has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChapterRef {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            label: None,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Identifier used in output names.
    pub fn identifier(&self) -> String {
        self.number.to_string()
    }
}

/// Sort chapters ascending by number. Duplicates are kept in listing order.
pub fn sort_chapters(chapters: &mut [ChapterRef]) {
    chapters.sort_by_key(|c| c.number);
}

/// Derive a series title from its URL: the last path segment with characters
/// invalid in file names removed and hyphens turned into spaces.
pub fn title_from_url(series_url: &str) -> String {
    let path = series_url
        .split(['?', '#'])
        .next()
        .unwrap_or(series_url);
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path);

    segment
        .chars()
        .filter(|&c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .map(|c| if c == '-' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lists chapters of a series and the image URLs of each chapter.
///
/// One implementation per site; the download pipeline only sees this trait.
#[async_trait]
pub trait ChapterSource: Send + Sync {
    /// Short name of the source, for logs.
    fn name(&self) -> &str;

    /// Series title used for output naming.
    async fn series_title(&self, series: &str) -> Result<String, SourceError> {
        Ok(title_from_url(series))
    }

    /// List chapters of `series`, ascending by number.
    async fn list_chapters(&self, series: &str) -> Result<Vec<ChapterRef>, SourceError>;

    /// Image URLs of one chapter, in reading order.
    async fn chapter_images(&self, chapter: &ChapterRef) -> Result<Vec<String>, SourceError>;
}

/// Fetches raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}
