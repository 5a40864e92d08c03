//! Chroma subsampling
//!
//! Halves a chroma plane in both axes by averaging 2x2 cells, discarding
//! high-frequency chroma the eye is least sensitive to. Applied to Cb and Cr
//! only, never to Y. All downstream block-grid sizing (transform tiling,
//! match maps) is computed from the post-subsampling dimensions.

use crate::plane::Plane;
use ndarray::Array2;

/// In-place 2x2 mean decimator for chroma planes
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromaSubsampler;

impl ChromaSubsampler {
    /// Create a new subsampler
    pub fn new() -> Self {
        ChromaSubsampler
    }

    /// Reduce the plane to `rows/2 x cols/2`, each output sample the mean of
    /// the corresponding 2x2 input cell
    ///
    /// Odd trailing rows/columns are dropped; the frame source pads to
    /// multiples of 16, which keeps subsampled planes on the 8x8 block grid.
    pub fn subsample(&self, plane: &mut Plane) {
        let rows = plane.rows() / 2;
        let cols = plane.cols() / 2;
        let src = plane.as_array();

        let reduced = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let (sr, sc) = (r * 2, c * 2);
            (src[[sr, sc]] + src[[sr, sc + 1]] + src[[sr + 1, sc]] + src[[sr + 1, sc + 1]]) * 0.25
        });

        *plane = Plane::from_array(reduced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_halved() {
        let mut plane = Plane::zeros(32, 48);
        ChromaSubsampler::new().subsample(&mut plane);
        assert_eq!((plane.rows(), plane.cols()), (16, 24));
    }

    #[test]
    fn test_cell_averaging() {
        let mut plane = Plane::from_fn(2, 4, |r, c| (r * 4 + c) as f32);
        // cells: [0 1 / 4 5] -> 2.5, [2 3 / 6 7] -> 4.5
        ChromaSubsampler::new().subsample(&mut plane);
        assert_eq!((plane.rows(), plane.cols()), (1, 2));
        assert_eq!(plane.get(0, 0), 2.5);
        assert_eq!(plane.get(0, 1), 4.5);
    }

    #[test]
    fn test_odd_tail_dropped() {
        let mut plane = Plane::from_fn(3, 5, |_, _| 9.0);
        ChromaSubsampler::new().subsample(&mut plane);
        assert_eq!((plane.rows(), plane.cols()), (1, 2));
        assert_eq!(plane.get(0, 0), 9.0);
    }

    #[test]
    fn test_flat_plane_unchanged_in_value() {
        let mut plane = Plane::from_fn(16, 16, |_, _| 128.0);
        ChromaSubsampler::new().subsample(&mut plane);
        for r in 0..plane.rows() {
            for c in 0..plane.cols() {
                assert_eq!(plane.get(r, c), 128.0);
            }
        }
    }
}
