//! Motion estimation: block matching against the previous frame
//!
//! For every 8x8 block of the current plane the matcher searches a window of
//! candidate positions in the previous plane. The window has fixed radius
//! [`SEARCH_RADIUS`] and is centered on the predictor taken from the previous
//! frame's match map at the same block position (zero when that entry was
//! intra or no map exists), so sustained motion larger than the radius is
//! recovered over successive frames at fixed per-block cost.
//!
//! The metric is the sum of absolute differences over the 64 samples. If the
//! best candidate's SAD is below [`SAD_THRESHOLD`] the block is inter-coded
//! and the residual is emitted; otherwise the raw block samples are emitted
//! and the block is marked intra. Ties are broken deterministically on
//! `(sad, dy*dy + dx*dx, dy, dx)`: smallest displacement magnitude first,
//! then row-major candidate order, so encodes are reproducible.

use crate::error::{Result, WmcError};
use crate::plane::{Plane, BLOCK_SIZE};
use ndarray::Array2;

/// Search window radius around the predicted position, in samples
pub const SEARCH_RADIUS: isize = 4;

/// SAD acceptance threshold: mean |difference| of 8.0 per sample
pub const SAD_THRESHOLD: f32 = 512.0;

/// Block displacement relative to the co-located position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MotionVector {
    /// Row displacement (positive = downward in the previous plane)
    pub dy: i16,
    /// Column displacement (positive = rightward in the previous plane)
    pub dx: i16,
}

impl MotionVector {
    /// The zero displacement
    pub fn zero() -> Self {
        MotionVector::default()
    }

    /// Squared displacement magnitude, used for tie-breaking
    pub fn magnitude_sq(&self) -> i32 {
        i32::from(self.dy) * i32::from(self.dy) + i32::from(self.dx) * i32::from(self.dx)
    }
}

/// Per-block match decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMatch {
    /// No usable predecessor match; raw samples were emitted
    #[default]
    Intra,
    /// Matched in the previous plane; a residual was emitted
    Inter(MotionVector),
}

impl BlockMatch {
    /// Check if this block was coded without prediction
    pub fn is_intra(&self) -> bool {
        matches!(self, BlockMatch::Intra)
    }

    /// Get the motion vector of an inter-coded block
    pub fn motion(&self) -> Option<MotionVector> {
        match self {
            BlockMatch::Intra => None,
            BlockMatch::Inter(mv) => Some(*mv),
        }
    }
}

/// One match entry per 8x8 block of a plane
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMap {
    entries: Array2<BlockMatch>,
}

impl MatchMap {
    /// Create an all-intra map of the given block-grid dimensions
    pub fn intra(block_rows: usize, block_cols: usize) -> Self {
        MatchMap {
            entries: Array2::default((block_rows, block_cols)),
        }
    }

    /// Create an all-intra map sized for the plane's block grid
    pub fn for_plane(plane: &Plane) -> Self {
        MatchMap::intra(plane.block_rows(), plane.block_cols())
    }

    /// Rebuild a map from row-major entries (container read path)
    pub fn from_entries(
        block_rows: usize,
        block_cols: usize,
        entries: Vec<BlockMatch>,
    ) -> Result<Self> {
        let entries = Array2::from_shape_vec((block_rows, block_cols), entries)
            .map_err(|e| WmcError::corrupt_record(format!("match map shape: {}", e)))?;
        Ok(MatchMap { entries })
    }

    /// Number of block rows
    pub fn block_rows(&self) -> usize {
        self.entries.nrows()
    }

    /// Number of block columns
    pub fn block_cols(&self) -> usize {
        self.entries.ncols()
    }

    /// Entry for the block at `(block_row, block_col)`
    pub fn get(&self, block_row: usize, block_col: usize) -> BlockMatch {
        self.entries[[block_row, block_col]]
    }

    /// Overwrite the entry at `(block_row, block_col)`
    pub fn set(&mut self, block_row: usize, block_col: usize, entry: BlockMatch) {
        self.entries[[block_row, block_col]] = entry;
    }

    /// Iterate entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &BlockMatch> {
        self.entries.iter()
    }

    /// Count of intra-coded blocks
    pub fn intra_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_intra()).count()
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    sad: f32,
    magnitude_sq: i32,
    mv: MotionVector,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.sad != other.sad {
            return self.sad < other.sad;
        }
        if self.magnitude_sq != other.magnitude_sq {
            return self.magnitude_sq < other.magnitude_sq;
        }
        (self.mv.dy, self.mv.dx) < (other.mv.dy, other.mv.dx)
    }
}

/// Windowed exhaustive block matcher
pub struct BlockMatcher {
    radius: isize,
    threshold: f32,
}

impl Default for BlockMatcher {
    fn default() -> Self {
        BlockMatcher {
            radius: SEARCH_RADIUS,
            threshold: SAD_THRESHOLD,
        }
    }
}

impl BlockMatcher {
    /// Create a matcher with the default window and threshold
    pub fn new() -> Self {
        BlockMatcher::default()
    }

    /// Create a matcher with an explicit window radius and SAD threshold
    pub fn with_policy(radius: usize, threshold: f32) -> Self {
        BlockMatcher {
            radius: radius as isize,
            threshold,
        }
    }

    /// Match every block of `current` against `prev`
    ///
    /// Returns the match map for the current frame and the sample stream to
    /// serialize: per block, in row-major block order, 64 row-major samples
    /// that are either the residual against the matched previous block
    /// (inter) or the raw current samples (intra). The returned map is the
    /// bookkeeping the caller carries into the next frame's call as
    /// `prev_map`.
    pub fn match_plane(
        &self,
        prev: &Plane,
        current: &Plane,
        prev_map: &MatchMap,
    ) -> Result<(MatchMap, Vec<i32>)> {
        current.ensure_block_aligned()?;
        if prev.rows() != current.rows() || prev.cols() != current.cols() {
            return Err(WmcError::PlaneMismatch {
                actual_rows: prev.rows(),
                actual_cols: prev.cols(),
                expected_rows: current.rows(),
                expected_cols: current.cols(),
            });
        }

        let block_rows = current.block_rows();
        let block_cols = current.block_cols();
        let mut map = MatchMap::intra(block_rows, block_cols);
        let mut samples = Vec::with_capacity(current.len());

        for block_row in 0..block_rows {
            for block_col in 0..block_cols {
                let row0 = block_row * BLOCK_SIZE;
                let col0 = block_col * BLOCK_SIZE;

                let predictor = if block_row < prev_map.block_rows()
                    && block_col < prev_map.block_cols()
                {
                    prev_map.get(block_row, block_col).motion().unwrap_or_default()
                } else {
                    MotionVector::zero()
                };

                let best = self.search(prev, current, row0, col0, predictor);
                match best {
                    Some(candidate) if candidate.sad < self.threshold => {
                        map.set(block_row, block_col, BlockMatch::Inter(candidate.mv));
                        emit_residual(prev, current, row0, col0, candidate.mv, &mut samples);
                    }
                    _ => {
                        emit_raw(current, row0, col0, &mut samples);
                    }
                }
            }
        }

        Ok((map, samples))
    }

    fn search(
        &self,
        prev: &Plane,
        current: &Plane,
        row0: usize,
        col0: usize,
        predictor: MotionVector,
    ) -> Option<Candidate> {
        let rows = prev.rows() as isize;
        let cols = prev.cols() as isize;
        let mut best: Option<Candidate> = None;

        for dy_offset in -self.radius..=self.radius {
            for dx_offset in -self.radius..=self.radius {
                let dy = isize::from(predictor.dy) + dy_offset;
                let dx = isize::from(predictor.dx) + dx_offset;
                let prev_row = row0 as isize + dy;
                let prev_col = col0 as isize + dx;
                if prev_row < 0
                    || prev_col < 0
                    || prev_row + BLOCK_SIZE as isize > rows
                    || prev_col + BLOCK_SIZE as isize > cols
                {
                    continue;
                }

                let mv = MotionVector {
                    dy: dy as i16,
                    dx: dx as i16,
                };
                let candidate = Candidate {
                    sad: block_sad(prev, current, prev_row as usize, prev_col as usize, row0, col0),
                    magnitude_sq: mv.magnitude_sq(),
                    mv,
                };
                let better = match &best {
                    None => true,
                    Some(current_best) => candidate.beats(current_best),
                };
                if better {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}

fn block_sad(
    prev: &Plane,
    current: &Plane,
    prev_row: usize,
    prev_col: usize,
    row0: usize,
    col0: usize,
) -> f32 {
    let mut sad = 0.0f32;
    for r in 0..BLOCK_SIZE {
        for c in 0..BLOCK_SIZE {
            sad += (current.get(row0 + r, col0 + c) - prev.get(prev_row + r, prev_col + c)).abs();
        }
    }
    sad
}

fn emit_residual(
    prev: &Plane,
    current: &Plane,
    row0: usize,
    col0: usize,
    mv: MotionVector,
    out: &mut Vec<i32>,
) {
    let prev_row = (row0 as isize + isize::from(mv.dy)) as usize;
    let prev_col = (col0 as isize + isize::from(mv.dx)) as usize;
    for r in 0..BLOCK_SIZE {
        for c in 0..BLOCK_SIZE {
            let diff = current.get(row0 + r, col0 + c) - prev.get(prev_row + r, prev_col + c);
            out.push(diff.round() as i32);
        }
    }
}

fn emit_raw(current: &Plane, row0: usize, col0: usize, out: &mut Vec<i32>) {
    for r in 0..BLOCK_SIZE {
        for c in 0..BLOCK_SIZE {
            out.push(current.get(row0 + r, col0 + c).round() as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rle;

    fn textured_plane(rows: usize, cols: usize) -> Plane {
        Plane::from_fn(rows, cols, |r, c| ((r * 31 + c * 17 + r * c) % 97) as f32)
    }

    #[test]
    fn test_match_map_dimensions() {
        let prev = Plane::zeros(32, 24);
        let current = Plane::zeros(32, 24);
        let (map, samples) = BlockMatcher::new()
            .match_plane(&prev, &current, &MatchMap::for_plane(&current))
            .expect("match");
        assert_eq!((map.block_rows(), map.block_cols()), (4, 3));
        assert_eq!(samples.len(), 32 * 24);
    }

    #[test]
    fn test_zero_motion_identity() {
        let prev = textured_plane(16, 16);
        let current = prev.clone();
        let (map, samples) = BlockMatcher::new()
            .match_plane(&prev, &current, &MatchMap::for_plane(&current))
            .expect("match");

        for entry in map.iter() {
            assert_eq!(*entry, BlockMatch::Inter(MotionVector::zero()));
        }
        assert!(samples.iter().all(|&s| s == 0));

        // The residual stream collapses to a single zero run.
        assert_eq!(rle::encode(&samples), vec![0, 256]);
    }

    #[test]
    fn test_large_difference_forces_intra() {
        let prev = Plane::zeros(16, 16);
        let current = Plane::from_fn(16, 16, |r, c| ((r * 53 + c * 97) % 211) as f32 + 100.0);
        let (map, samples) = BlockMatcher::new()
            .match_plane(&prev, &current, &MatchMap::for_plane(&current))
            .expect("match");

        assert_eq!(map.intra_count(), 4);
        // Intra blocks carry the raw current samples in block order.
        assert_eq!(samples[0], current.get(0, 0).round() as i32);
        assert_eq!(samples[1], current.get(0, 1).round() as i32);
    }

    #[test]
    fn test_translation_detected() {
        // Current content is the previous content shifted two columns right;
        // the interior block matches at dx = -2 with a zero residual.
        let prev = textured_plane(24, 24);
        let current = Plane::from_fn(24, 24, |r, c| {
            if c >= 2 {
                prev.get(r, c - 2)
            } else {
                0.0
            }
        });

        let (map, samples) = BlockMatcher::new()
            .match_plane(&prev, &current, &MatchMap::for_plane(&current))
            .expect("match");

        let middle = map.get(1, 1);
        assert_eq!(middle, BlockMatch::Inter(MotionVector { dy: 0, dx: -2 }));

        let block_index = 1 * map.block_cols() + 1;
        let chunk = &samples[block_index * 64..(block_index + 1) * 64];
        assert!(chunk.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_predictor_extends_search_window() {
        // A shift of 6 exceeds the +/-4 window around zero, but the previous
        // map predicts (0, -6), centering the window on the true motion.
        let prev = textured_plane(24, 24);
        let current = Plane::from_fn(24, 24, |r, c| {
            if c >= 6 {
                prev.get(r, c - 6)
            } else {
                0.0
            }
        });

        let mut prev_map = MatchMap::for_plane(&current);
        for block_row in 0..prev_map.block_rows() {
            for block_col in 0..prev_map.block_cols() {
                prev_map.set(
                    block_row,
                    block_col,
                    BlockMatch::Inter(MotionVector { dy: 0, dx: -6 }),
                );
            }
        }

        let (map, _) = BlockMatcher::new()
            .match_plane(&prev, &current, &prev_map)
            .expect("match");
        assert_eq!(
            map.get(1, 1),
            BlockMatch::Inter(MotionVector { dy: 0, dx: -6 })
        );
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let prev = Plane::zeros(16, 16);
        let current = Plane::zeros(24, 16);
        let err = BlockMatcher::new()
            .match_plane(&prev, &current, &MatchMap::for_plane(&current))
            .unwrap_err();
        assert!(matches!(err, WmcError::PlaneMismatch { .. }));
    }
}
