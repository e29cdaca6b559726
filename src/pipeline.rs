//! Download pipeline: chapter source → image fetcher → tiler → filesystem.
//!
//! Failure isolation is per unit. A chapter whose images cannot be listed is
//! skipped; an image that cannot be fetched or decoded is skipped; a write
//! failure stops the current chapter only. Nothing is retried.
//!
//! A source may list the same chapter number more than once (alternate
//! uploads). Those entries share one output directory, so they also share
//! one page counter and are numbered after each other instead of
//! overwriting each other's pages.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::batch::ChapterFailure;
use crate::error::{ChapterError, RunError};
use crate::source::{ChapterRef, ChapterSource, ImageFetcher};
use crate::tile::{NamingContext, OutputLayout, SourceImage, Tiler, DEFAULT_TITLE_SEPARATOR};

/// Inclusive chapter number range to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChapterRange {
    pub from: Option<u32>,
    pub to: Option<u32>,
}

impl ChapterRange {
    pub fn contains(&self, number: u32) -> bool {
        self.from.map_or(true, |from| number >= from) && self.to.map_or(true, |to| number <= to)
    }
}

/// Summary of a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub title: String,
    pub chapters_listed: usize,
    pub chapters_processed: usize,
    pub chapters_skipped: Vec<ChapterFailure>,
    pub images_tiled: usize,
    pub images_skipped: usize,
    pub tiles_written: usize,
}

/// Downloads a series chapter by chapter and tiles every image.
pub struct DownloadPipeline<S: ChapterSource, F: ImageFetcher> {
    source: S,
    fetcher: F,
    tiler: Tiler,
    layout: OutputLayout,
    separator: String,
    range: ChapterRange,
}

impl<S: ChapterSource, F: ImageFetcher> DownloadPipeline<S, F> {
    pub fn new(source: S, fetcher: F, tiler: Tiler) -> Self {
        Self {
            source,
            fetcher,
            tiler,
            layout: OutputLayout::default(),
            separator: DEFAULT_TITLE_SEPARATOR.to_string(),
            range: ChapterRange::default(),
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.tiler = self.tiler.with_file_name(layout.file_name.clone());
        self.layout = layout;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_range(mut self, range: ChapterRange) -> Self {
        self.range = range;
        self
    }

    /// Download and tile every chapter of `series` under `output_root`.
    ///
    /// # Errors
    ///
    /// Only a failure to list the series' chapters is returned; everything
    /// below that is recorded in the report.
    pub async fn run(&self, series: &str, output_root: &Path) -> Result<DownloadReport, RunError> {
        let title = self.source.series_title(series).await?;
        info!("Scraping chapters from {} ({})", series, self.source.name());

        let chapters = self.source.list_chapters(series).await?;
        info!("Found {} chapters.", chapters.len());

        let mut report = DownloadReport {
            title: title.clone(),
            chapters_listed: chapters.len(),
            ..Default::default()
        };

        let mut counters: HashMap<String, u32> = HashMap::new();

        for chapter in chapters.iter().filter(|c| self.range.contains(c.number)) {
            let identifier = chapter.identifier();
            if let Some(next) = counters.get(&identifier) {
                warn!(
                    "Chapter {} listed more than once ({}); continuing from page {}",
                    identifier,
                    chapter.label.as_deref().unwrap_or("no label"),
                    next
                );
            }
            let page = counters.entry(identifier.clone()).or_insert(1);

            match self
                .run_chapter(&title, chapter, output_root, page, &mut report)
                .await
            {
                Ok(()) => report.chapters_processed += 1,
                Err(e) => {
                    warn!("Chapter {} skipped: {}", chapter.number, e);
                    report.chapters_skipped.push(ChapterFailure {
                        series: title.clone(),
                        chapter: identifier,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Download completed: {} chapter(s), {} image(s), {} tile(s)",
            report.chapters_processed, report.images_tiled, report.tiles_written
        );

        Ok(report)
    }

    async fn run_chapter(
        &self,
        title: &str,
        chapter: &ChapterRef,
        output_root: &Path,
        page: &mut u32,
        report: &mut DownloadReport,
    ) -> Result<(), ChapterError> {
        info!(
            "Processing Chapter {}: {}",
            chapter.number,
            chapter.url.as_deref().unwrap_or("-")
        );

        let images = self.source.chapter_images(chapter).await?;
        if images.is_empty() {
            return Err(ChapterError::Empty);
        }

        let context =
            NamingContext::new(title, chapter.identifier()).with_separator(&self.separator);
        let output_dir = self.layout.chapter_path(output_root, &context);
        let first_page = *page;

        for (idx, url) in images.iter().enumerate() {
            let data = match self.fetcher.fetch(url).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Error downloading page {}: {}", idx + 1, e);
                    report.images_skipped += 1;
                    continue;
                }
            };

            let source = match SourceImage::from_bytes(&data, None) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping page {} ({}): {}", idx + 1, url, e);
                    report.images_skipped += 1;
                    continue;
                }
            };

            match self.tiler.tile(&source, &output_dir, &context, *page) {
                Ok(outcome) => {
                    *page = outcome.next_index;
                    report.images_tiled += 1;
                    report.tiles_written += outcome.tiles.len();
                }
                Err(e) if e.is_per_image() => {
                    warn!("Skipping page {} ({}): {}", idx + 1, url, e);
                    report.images_skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            "Chapter {} done, pages {}..{} written to {}",
            chapter.number,
            first_page,
            *page,
            output_dir.display()
        );
        Ok(())
    }
}
