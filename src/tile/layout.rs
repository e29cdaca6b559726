//! Piece geometry.
//!
//! Splitting is purely vertical: every piece spans the full frame width and
//! all pieces except the last are exactly `piece_height` rows tall. A short
//! trailing remainder is always emitted as its own piece, however small.

use std::num::NonZeroU32;

/// A half-open row range `[y0, y1)` of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRange {
    /// First row (inclusive)
    pub y0: u32,

    /// End row (exclusive)
    pub y1: u32,
}

impl PieceRange {
    /// Number of rows covered by this piece.
    #[inline]
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Partition a frame of `height` rows into pieces of `piece_height`.
///
/// Returns `ceil(height / piece_height)` ranges ordered top to bottom. A frame
/// no taller than `piece_height` yields a single range covering it entirely,
/// including the degenerate zero-height frame.
pub fn plan_pieces(height: u32, piece_height: NonZeroU32) -> Vec<PieceRange> {
    let piece = piece_height.get();

    if height <= piece {
        return vec![PieceRange { y0: 0, y1: height }];
    }

    let full = height / piece;
    let remainder = height % piece;

    let mut ranges: Vec<PieceRange> = (0..full)
        .map(|i| PieceRange {
            y0: i * piece,
            y1: (i + 1) * piece,
        })
        .collect();

    if remainder > 0 {
        ranges.push(PieceRange {
            y0: height - remainder,
            y1: height,
        });
    }

    ranges
}

/// Number of pieces [`plan_pieces`] will produce.
#[inline]
pub fn piece_count(height: u32, piece_height: NonZeroU32) -> u32 {
    if height == 0 {
        1
    } else {
        height.div_ceil(piece_height.get())
    }
}
