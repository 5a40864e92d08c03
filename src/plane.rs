//! Component planes
//!
//! A [`Plane`] holds one color component (Y, Cb or Cr) of one frame as a
//! 2D matrix of `f32` samples. Before the block transform a plane carries
//! pixel values; afterwards it carries quantized DCT coefficients. The
//! transform and match stages require dimensions that tile into 8x8 blocks;
//! the frame source is responsible for padding to that grid.

use crate::error::{Result, WmcError};
use ndarray::Array2;

/// Side length of the transform/match block grid
pub const BLOCK_SIZE: usize = 8;

/// Single-component 2D sample matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    samples: Array2<f32>,
}

impl Plane {
    /// Create a zero-filled plane
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Plane {
            samples: Array2::zeros((rows, cols)),
        }
    }

    /// Create a plane by evaluating `f(row, col)` at every position
    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        Plane {
            samples: Array2::from_shape_fn((rows, cols), |(r, c)| f(r, c)),
        }
    }

    /// Wrap an existing sample matrix
    pub fn from_array(samples: Array2<f32>) -> Self {
        Plane { samples }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.samples.ncols()
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the plane holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.samples[[row, col]]
    }

    /// Overwrite the sample at `(row, col)`
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.samples[[row, col]] = value;
    }

    /// Number of 8-sample block rows
    pub fn block_rows(&self) -> usize {
        self.rows() / BLOCK_SIZE
    }

    /// Number of 8-sample block columns
    pub fn block_cols(&self) -> usize {
        self.cols() / BLOCK_SIZE
    }

    /// Check that the plane tiles exactly into 8x8 blocks
    pub fn is_block_aligned(&self) -> bool {
        self.rows() % BLOCK_SIZE == 0 && self.cols() % BLOCK_SIZE == 0
    }

    /// Fail fast if the plane does not tile into 8x8 blocks
    ///
    /// Silently truncating would corrupt the block grid and every match map
    /// derived from it, so misaligned planes are rejected before any
    /// transform runs.
    pub fn ensure_block_aligned(&self) -> Result<()> {
        if self.is_block_aligned() {
            Ok(())
        } else {
            Err(WmcError::DimensionNotAligned {
                rows: self.rows(),
                cols: self.cols(),
                alignment: BLOCK_SIZE,
            })
        }
    }

    /// Append every sample in raster (row-major) order, rounded to `i32`
    pub fn flatten_raster(&self, out: &mut Vec<i32>) {
        out.reserve(self.len());
        for &sample in self.samples.iter() {
            out.push(sample.round() as i32);
        }
    }

    /// Borrow the underlying sample matrix
    pub fn as_array(&self) -> &Array2<f32> {
        &self.samples
    }

    /// Mutably borrow the underlying sample matrix
    pub fn as_array_mut(&mut self) -> &mut Array2<f32> {
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_grid_dimensions() {
        let plane = Plane::zeros(32, 24);
        assert_eq!(plane.block_rows(), 4);
        assert_eq!(plane.block_cols(), 3);
        assert!(plane.ensure_block_aligned().is_ok());
    }

    #[test]
    fn test_misaligned_plane_rejected() {
        let plane = Plane::zeros(12, 16);
        let err = plane.ensure_block_aligned().unwrap_err();
        assert!(matches!(
            err,
            WmcError::DimensionNotAligned {
                rows: 12,
                cols: 16,
                alignment: 8
            }
        ));
    }

    #[test]
    fn test_flatten_raster_order() {
        let plane = Plane::from_fn(2, 3, |r, c| (r * 3 + c) as f32 + 0.4);
        let mut out = Vec::new();
        plane.flatten_raster(&mut out);
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_get_set() {
        let mut plane = Plane::zeros(8, 8);
        plane.set(3, 5, -7.5);
        assert_eq!(plane.get(3, 5), -7.5);
    }
}
