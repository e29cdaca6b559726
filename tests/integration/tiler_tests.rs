//! Tiler integration tests.
//!
//! Tests cover:
//! - Slicing geometry for tall, short and animated sources
//! - Page numbering threaded across consecutive images
//! - Deterministic output on re-runs
//! - Encoding policy and color conversion of written files

use image::{ColorType, GenericImageView, ImageFormat, Rgb};
use tempfile::TempDir;

use strip_tiler::error::TileError;
use strip_tiler::tile::{
    EncodingPolicy, NamingContext, NamingTemplate, OutputFormat, OutputLayout, SourceImage,
    Tiler,
};

use super::test_utils::{
    animated_gif_bytes, animated_webp_bytes, apng_bytes, dimensions, encode, gradient_image,
    list_files, png_bytes, rgba_image, write_png,
};

fn context() -> NamingContext {
    NamingContext::new("Muse on Fame", "1")
}

// =============================================================================
// Geometry
// =============================================================================

#[test]
fn test_tall_image_splits_into_full_pieces_and_remainder() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(800, 5000), None).unwrap();

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(outcome.next_index, 4);
    assert_eq!(
        list_files(out.path()),
        vec!["page_1.png", "page_2.png", "page_3.png"]
    );

    let heights: Vec<u32> = outcome
        .tiles
        .iter()
        .map(|t| dimensions(&t.path).1)
        .collect();
    assert_eq!(heights, vec![2000, 2000, 1000]);
    assert!(outcome.tiles.iter().all(|t| dimensions(&t.path).0 == 800));
}

#[test]
fn test_tile_pixels_match_source_rows() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(300, 5000), None).unwrap();

    tiler.tile(&source, out.path(), &context(), 1).unwrap();

    // PNG is lossless, so every tile row is the matching source row
    let second = image::open(out.path().join("page_2.png")).unwrap().to_rgb8();
    assert_eq!(*second.get_pixel(5, 0), Rgb([5, (2000 % 256) as u8, (2000 / 256) as u8]));

    let last = image::open(out.path().join("page_3.png")).unwrap().to_rgb8();
    assert_eq!(
        *last.get_pixel(299, 999),
        Rgb([(299 % 256) as u8, (4999 % 256) as u8, (4999 / 256) as u8])
    );
}

#[test]
fn test_short_image_writes_single_tile() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(720, 1200), None).unwrap();

    let outcome = tiler.tile(&source, out.path(), &context(), 7).unwrap();

    assert_eq!(outcome.next_index, 8);
    assert_eq!(outcome.tiles.len(), 1);
    assert_eq!(list_files(out.path()), vec!["page_7.png"]);
    assert_eq!(dimensions(&outcome.tiles[0].path), (720, 1200));
}

#[test]
fn test_exact_multiple_has_no_remainder_tile() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(1000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(50, 3000), None).unwrap();

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(outcome.tiles.len(), 3);
    assert!(outcome.tiles.iter().all(|t| dimensions(&t.path).1 == 1000));
}

#[test]
fn test_animated_source_tiles_each_frame() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&animated_gif_bytes(16, 4000, 3), None).unwrap();
    assert!(source.is_animated());

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(outcome.tiles.len(), 6);
    assert_eq!(outcome.next_index, 7);
    assert_eq!(
        list_files(out.path()),
        vec![
            "frame_00/page_1.gif",
            "frame_00/page_2.gif",
            "frame_01/page_3.gif",
            "frame_01/page_4.gif",
            "frame_02/page_5.gif",
            "frame_02/page_6.gif",
        ]
    );
    for tile in &outcome.tiles {
        assert_eq!(dimensions(&tile.path), (16, 2000));
    }
}

#[test]
fn test_apng_source_tiles_each_frame() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(1000).unwrap();
    let source = SourceImage::from_bytes(&apng_bytes(12, 1500, 3), None).unwrap();
    assert_eq!(source.format(), ImageFormat::Png);
    assert!(source.is_animated());
    assert_eq!(source.frames().len(), 3);

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(outcome.next_index, 7);
    assert_eq!(
        list_files(out.path()),
        vec![
            "frame_00/page_1.png",
            "frame_00/page_2.png",
            "frame_01/page_3.png",
            "frame_01/page_4.png",
            "frame_02/page_5.png",
            "frame_02/page_6.png",
        ]
    );
    assert_eq!(dimensions(&outcome.tiles[5].path), (12, 500));

    // Frames keep their own pixels
    let first = image::open(&outcome.tiles[0].path).unwrap().to_rgba8();
    let last = image::open(&outcome.tiles[4].path).unwrap().to_rgba8();
    assert_eq!(first.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(last.get_pixel(0, 0).0, [0, 120, 135, 255]);
}

#[test]
fn test_animated_webp_source_tiles_each_frame() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(200).unwrap();
    let source = SourceImage::from_bytes(&animated_webp_bytes(8, 300, 3), None).unwrap();
    assert_eq!(source.format(), ImageFormat::WebP);
    assert!(source.is_animated());
    assert_eq!(source.frames().len(), 3);

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(outcome.tiles.len(), 6);
    assert_eq!(
        list_files(out.path()),
        vec![
            "frame_00/page_1.webp",
            "frame_00/page_2.webp",
            "frame_01/page_3.webp",
            "frame_01/page_4.webp",
            "frame_02/page_5.webp",
            "frame_02/page_6.webp",
        ]
    );
    assert_eq!(dimensions(&outcome.tiles[1].path), (8, 100));
}

// =============================================================================
// Numbering
// =============================================================================

#[test]
fn test_page_index_continues_across_images() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let ctx = context();

    let first = SourceImage::from_bytes(&png_bytes(100, 5000), None).unwrap();
    let second = SourceImage::from_bytes(&png_bytes(100, 1200), None).unwrap();
    let third = SourceImage::from_bytes(&png_bytes(100, 4000), None).unwrap();

    let mut page = 1;
    for source in [&first, &second, &third] {
        page = tiler.tile(source, out.path(), &ctx, page).unwrap().next_index;
    }

    assert_eq!(page, 7);
    let mut files = list_files(out.path());
    files.sort_by(|a, b| strip_tiler::natural_cmp(a, b));
    assert_eq!(
        files,
        (1..=6).map(|i| format!("page_{i}.png")).collect::<Vec<_>>()
    );
}

#[test]
fn test_start_index_zero_rejected() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(10, 10), None).unwrap();

    let result = tiler.tile(&source, out.path(), &context(), 0);
    assert!(matches!(result, Err(TileError::InvalidStartIndex(0))));
    assert!(list_files(out.path()).is_empty());
}

#[test]
fn test_numbering_past_u32_max_writes_nothing() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(10).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(10, 30), None).unwrap();

    let result = tiler.tile(&source, out.path(), &context(), u32::MAX);
    assert!(matches!(
        result,
        Err(TileError::PageOverflow { start: u32::MAX })
    ));
    assert!(list_files(out.path()).is_empty());
}

#[test]
fn test_zero_piece_height_rejected() {
    assert!(matches!(
        Tiler::new(0),
        Err(TileError::InvalidPieceHeight(0))
    ));
}

#[test]
fn test_rerun_produces_identical_files() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(200, 4500), None).unwrap();

    let first = tiler.tile(&source, out.path(), &context(), 1).unwrap();
    let before: Vec<Vec<u8>> = first
        .tiles
        .iter()
        .map(|t| std::fs::read(&t.path).unwrap())
        .collect();

    let second = tiler.tile(&source, out.path(), &context(), 1).unwrap();
    let after: Vec<Vec<u8>> = second
        .tiles
        .iter()
        .map(|t| std::fs::read(&t.path).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(before, after);
    assert_eq!(list_files(out.path()).len(), 3);
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_forced_jpeg_drops_alpha() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(500)
        .unwrap()
        .with_policy(EncodingPolicy::Force(OutputFormat::Jpeg));
    let source = SourceImage::from_bytes(&encode(&rgba_image(64, 900), ImageFormat::Png), None)
        .unwrap();

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(list_files(out.path()), vec!["page_1.jpg", "page_2.jpg"]);
    for tile in &outcome.tiles {
        assert_eq!(tile.format, OutputFormat::Jpeg);
        let img = image::open(&tile.path).unwrap();
        assert_eq!(img.color(), ColorType::Rgb8);
    }
}

#[test]
fn test_preserve_keeps_source_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("strip.jpeg");
    std::fs::write(&input, encode(&gradient_image(120, 2500), ImageFormat::Jpeg)).unwrap();

    let out = dir.path().join("out");
    let tiler = Tiler::new(2000).unwrap();
    let outcome = tiler.tile_file(&input, &out, &context(), 1).unwrap();

    assert_eq!(list_files(&out), vec!["page_1.jpeg", "page_2.jpeg"]);
    assert!(outcome.tiles.iter().all(|t| t.format == OutputFormat::Jpeg));
    assert_eq!(
        image::ImageFormat::from_path(&outcome.tiles[1].path).unwrap(),
        ImageFormat::Jpeg
    );
    assert_eq!(dimensions(&outcome.tiles[1].path), (120, 500));
}

#[test]
fn test_preserve_webp_source() {
    let out = TempDir::new().unwrap();
    let tiler = Tiler::new(300).unwrap();
    let webp = encode(&rgba_image(40, 700), ImageFormat::WebP);
    let source = SourceImage::from_bytes(&webp, None).unwrap();

    let outcome = tiler.tile(&source, out.path(), &context(), 1).unwrap();

    assert_eq!(
        list_files(out.path()),
        vec!["page_1.webp", "page_2.webp", "page_3.webp"]
    );
    let last = image::open(&outcome.tiles[2].path).unwrap();
    assert_eq!(last.dimensions(), (40, 100));
}

#[test]
fn test_decode_failure_is_per_image() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

    let tiler = Tiler::new(2000).unwrap();
    let err = tiler
        .tile_file(&input, &dir.path().join("out"), &context(), 1)
        .unwrap_err();
    assert!(matches!(err, TileError::Decode { .. }));
    assert!(err.is_per_image());
}

#[test]
fn test_write_failure_is_io_error() {
    let dir = TempDir::new().unwrap();
    // A regular file where the output directory should be
    let blocker = dir.path().join("out");
    write_png(&blocker, 1, 1);

    let tiler = Tiler::new(2000).unwrap();
    let source = SourceImage::from_bytes(&png_bytes(10, 10), None).unwrap();
    let err = tiler.tile(&source, &blocker, &context(), 1).unwrap_err();
    assert!(matches!(err, TileError::Io { .. }));
    assert!(!err.is_per_image());
}

// =============================================================================
// Naming
// =============================================================================

#[test]
fn test_custom_layout_paths() {
    let out = TempDir::new().unwrap();
    let layout = OutputLayout::from_templates("chapter{chapter}", "{chapter}_{page:02}.{ext}")
        .unwrap();
    let tiler = Tiler::new(1000)
        .unwrap()
        .with_policy(EncodingPolicy::Force(OutputFormat::Jpeg))
        .with_file_name(layout.file_name.clone());

    let ctx = NamingContext::new("Muse on Fame", "12");
    let dir = layout.chapter_path(out.path(), &ctx);
    let source = SourceImage::from_bytes(&png_bytes(30, 2500), None).unwrap();
    tiler.tile(&source, &dir, &ctx, 9).unwrap();

    assert_eq!(
        list_files(out.path()),
        vec![
            "muse_on_fame/chapter12/12_09.jpg",
            "muse_on_fame/chapter12/12_10.jpg",
            "muse_on_fame/chapter12/12_11.jpg",
        ]
    );
}

#[test]
fn test_file_template_requires_page() {
    assert!(NamingTemplate::parse_file_name("{title}.{ext}").is_err());
    assert!(NamingTemplate::parse_file_name("{title}_{page}.{ext}").is_ok());
}
