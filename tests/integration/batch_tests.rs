//! Batch re-tiling integration tests.
//!
//! Tests cover:
//! - Natural ordering of pages within a chapter
//! - Counter threading across every image of a chapter
//! - Per-image failure isolation
//! - Output layout and skipped directories

use tempfile::TempDir;

use strip_tiler::error::RunError;
use strip_tiler::tile::{EncodingPolicy, OutputFormat, OutputLayout, Tiler};
use strip_tiler::BatchProcessor;

use super::test_utils::{dimensions, list_files, write_png};

fn processor() -> BatchProcessor {
    BatchProcessor::new(Tiler::new(2000).unwrap())
}

#[test]
fn test_chapter_pages_tiled_in_natural_order() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let chapter = input.path().join("Muse on Fame").join("1");

    // Heights identify the source: page_10 is the only 300px image
    write_png(&chapter.join("page_1.png"), 40, 5000);
    write_png(&chapter.join("page_2.png"), 40, 1200);
    write_png(&chapter.join("page_10.png"), 40, 300);

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.chapters_processed, 1);
    assert_eq!(report.images_tiled, 3);
    assert_eq!(report.tiles_written, 5);

    let out_dir = output.path().join("muse_on_fame").join("chapter_1");
    let heights: Vec<u32> = (1..=5)
        .map(|i| dimensions(&out_dir.join(format!("page_{i}.png"))).1)
        .collect();
    assert_eq!(heights, vec![2000, 2000, 1000, 1200, 300]);
}

#[test]
fn test_counters_are_per_chapter() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    write_png(&input.path().join("Series A/1/01.png"), 10, 2500);
    write_png(&input.path().join("Series A/2/01.png"), 10, 100);
    write_png(&input.path().join("Series B/1/01.png"), 10, 100);

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert_eq!(report.chapters_processed, 3);
    assert_eq!(
        list_files(output.path()),
        vec![
            "series_a/chapter_1/page_1.png",
            "series_a/chapter_1/page_2.png",
            "series_a/chapter_2/page_1.png",
            "series_b/chapter_1/page_1.png",
        ]
    );
}

#[test]
fn test_nested_folders_continue_chapter_numbering() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    write_png(&input.path().join("Series/1/a.png"), 10, 100);
    write_png(&input.path().join("Series/1/part2/b.png"), 10, 100);

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert_eq!(report.chapters_processed, 1);
    assert_eq!(report.images_tiled, 2);
    assert_eq!(
        list_files(output.path()),
        vec![
            "series/chapter_1/page_1.png",
            "series/chapter_1/page_2.png",
        ]
    );
}

#[test]
fn test_undecodable_image_is_skipped() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let chapter = input.path().join("Series").join("3");

    write_png(&chapter.join("1.png"), 10, 100);
    std::fs::write(chapter.join("2.jpg"), b"definitely not a jpeg").unwrap();
    write_png(&chapter.join("3.png"), 10, 100);

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert_eq!(report.images_tiled, 2);
    assert_eq!(report.images_skipped, 1);
    assert_eq!(report.chapters_processed, 1);
    assert!(report.chapters_failed.is_empty());
    assert_eq!(
        list_files(output.path()),
        vec![
            "series/chapter_3/page_1.png",
            "series/chapter_3/page_2.png",
        ]
    );
}

#[test]
fn test_shallow_image_folders_are_reported() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    write_png(&input.path().join("loose.png"), 10, 10);
    write_png(&input.path().join("Series/stray.png"), 10, 10);
    write_png(&input.path().join("Series/1/01.png"), 10, 10);

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert_eq!(report.chapters_processed, 1);
    assert_eq!(report.skipped_dirs.len(), 2);
    assert!(report.skipped_dirs.contains(&input.path().join("Series")));
    assert_eq!(list_files(output.path()), vec!["series/chapter_1/page_1.png"]);
}

#[test]
fn test_write_failure_fails_only_that_chapter() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    write_png(&input.path().join("Series/1/01.png"), 10, 10);
    write_png(&input.path().join("Series/2/01.png"), 10, 10);

    // Block chapter 1's output directory with a regular file
    std::fs::create_dir_all(output.path().join("series")).unwrap();
    std::fs::write(output.path().join("series/chapter_1"), b"").unwrap();

    let report = processor()
        .process_tree(input.path(), output.path())
        .unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.chapters_failed.len(), 1);
    assert_eq!(report.chapters_failed[0].chapter, "1");
    assert_eq!(report.chapters_processed, 1);
    assert!(output.path().join("series/chapter_2/page_1.png").exists());
}

#[test]
fn test_custom_layout_and_format() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("Muse on Fame/7/01.png"), 10, 1500);

    let tiler = Tiler::new(1000)
        .unwrap()
        .with_policy(EncodingPolicy::Force(OutputFormat::Jpeg));
    let layout =
        OutputLayout::from_templates("chapter{chapter}", "chapter{chapter}_{page:02}.{ext}")
            .unwrap();

    BatchProcessor::new(tiler)
        .with_layout(layout)
        .with_separator("-")
        .process_tree(input.path(), output.path())
        .unwrap();

    assert_eq!(
        list_files(output.path()),
        vec![
            "muse-on-fame/chapter7/chapter7_01.jpg",
            "muse-on-fame/chapter7/chapter7_02.jpg",
        ]
    );
}

#[test]
fn test_missing_input_is_error() {
    let output = TempDir::new().unwrap();
    let missing = output.path().join("nope");

    let result = processor().process_tree(&missing, output.path());
    assert!(matches!(result, Err(RunError::MissingInput(path)) if path == missing));
}
