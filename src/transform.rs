//! 8x8 block DCT and quantization
//!
//! Tiles a plane into non-overlapping 8x8 blocks and applies a 2D DCT-II per
//! block, optionally dividing each coefficient by a quality-scaled entry of
//! the standard luminance quantization table and rounding. The inverse path
//! multiplies the quantization back out and applies the iDCT; with
//! quantization disabled the two directions are exact inverses up to
//! floating-point tolerance.
//!
//! Forward and inverse are separate methods on one configured
//! [`BlockTransform`] value rather than a runtime direction flag, keeping the
//! numeric hot path branch-free.
//!
//! Independent 8-row bands are transformed in parallel; each band reads and
//! writes only its own samples.

use crate::config::Quality;
use crate::error::Result;
use crate::plane::{Plane, BLOCK_SIZE};
use ndarray::parallel::prelude::*;
use ndarray::{ArrayViewMut2, Axis};
use std::sync::OnceLock;

/// Base luminance quantization table (ITU-T T.81 Annex K)
const BASE_QUANT_TABLE: [[f32; BLOCK_SIZE]; BLOCK_SIZE] = [
    [16.0, 11.0, 10.0, 16.0, 24.0, 40.0, 51.0, 61.0],
    [12.0, 12.0, 14.0, 19.0, 26.0, 58.0, 60.0, 55.0],
    [14.0, 13.0, 16.0, 24.0, 40.0, 57.0, 69.0, 56.0],
    [14.0, 17.0, 22.0, 29.0, 51.0, 87.0, 80.0, 62.0],
    [18.0, 22.0, 37.0, 56.0, 68.0, 109.0, 103.0, 77.0],
    [24.0, 35.0, 55.0, 64.0, 81.0, 104.0, 113.0, 92.0],
    [49.0, 64.0, 78.0, 87.0, 103.0, 121.0, 120.0, 101.0],
    [72.0, 92.0, 95.0, 98.0, 112.0, 100.0, 103.0, 99.0],
];

/// Precomputed DCT-II basis: cosines and normalization factors
struct CosTable {
    /// `cos[k][x] = cos((2x + 1) * k * PI / 16)`
    cos: [[f32; BLOCK_SIZE]; BLOCK_SIZE],
    /// `alpha[0] = 1/sqrt(2)`, otherwise 1
    alpha: [f32; BLOCK_SIZE],
}

fn cos_table() -> &'static CosTable {
    static TABLE: OnceLock<CosTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut cos = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        let mut alpha = [1.0f32; BLOCK_SIZE];
        alpha[0] = 1.0 / 2.0f32.sqrt();
        for (k, row) in cos.iter_mut().enumerate() {
            for (x, entry) in row.iter_mut().enumerate() {
                *entry = ((2.0 * x as f32 + 1.0) * k as f32 * std::f32::consts::PI / 16.0).cos();
            }
        }
        CosTable { cos, alpha }
    })
}

/// Quality-scaled quantization table
///
/// Entries follow the JPEG convention `floor((base * scale + 50) / 100)`
/// clamped to `[1, 255]`; at quality 100 the table degenerates to all ones.
fn quant_table(quality: Quality) -> [[f32; BLOCK_SIZE]; BLOCK_SIZE] {
    let scale = quality.table_scale();
    let mut table = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
    for (u, row) in table.iter_mut().enumerate() {
        for (v, entry) in row.iter_mut().enumerate() {
            *entry = ((BASE_QUANT_TABLE[u][v] * scale + 50.0) / 100.0)
                .floor()
                .clamp(1.0, 255.0);
        }
    }
    table
}

/// Block-wise forward/inverse 2D DCT-II with optional quantization
pub struct BlockTransform {
    quant: Option<[[f32; BLOCK_SIZE]; BLOCK_SIZE]>,
}

impl BlockTransform {
    /// Create a quantizing transform for the given quality
    pub fn new(quality: Quality) -> Self {
        BlockTransform {
            quant: Some(quant_table(quality)),
        }
    }

    /// Create a transform without quantization (lossless round trip)
    pub fn lossless() -> Self {
        BlockTransform { quant: None }
    }

    /// Check whether quantization is enabled
    pub fn is_quantizing(&self) -> bool {
        self.quant.is_some()
    }

    /// Replace every 8x8 block with its (optionally quantized) DCT
    /// coefficients, in place
    pub fn forward(&self, plane: &mut Plane) -> Result<()> {
        plane.ensure_block_aligned()?;
        let quant = self.quant;
        plane
            .as_array_mut()
            .axis_chunks_iter_mut(Axis(0), BLOCK_SIZE)
            .into_par_iter()
            .for_each(|mut band| forward_band(&mut band, quant.as_ref()));
        Ok(())
    }

    /// Replace every 8x8 coefficient block with reconstructed samples
    /// (de-quantizing first if quantization is enabled), in place
    pub fn inverse(&self, plane: &mut Plane) -> Result<()> {
        plane.ensure_block_aligned()?;
        let quant = self.quant;
        plane
            .as_array_mut()
            .axis_chunks_iter_mut(Axis(0), BLOCK_SIZE)
            .into_par_iter()
            .for_each(|mut band| inverse_band(&mut band, quant.as_ref()));
        Ok(())
    }
}

fn forward_band(band: &mut ArrayViewMut2<f32>, quant: Option<&[[f32; BLOCK_SIZE]; BLOCK_SIZE]>) {
    let table = cos_table();
    let cols = band.ncols();

    for block_col in (0..cols).step_by(BLOCK_SIZE) {
        let mut spatial = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        for (x, row) in spatial.iter_mut().enumerate() {
            for (y, sample) in row.iter_mut().enumerate() {
                *sample = band[[x, block_col + y]];
            }
        }

        for u in 0..BLOCK_SIZE {
            for v in 0..BLOCK_SIZE {
                let mut sum = 0.0f32;
                for x in 0..BLOCK_SIZE {
                    for y in 0..BLOCK_SIZE {
                        sum += spatial[x][y] * table.cos[u][x] * table.cos[v][y];
                    }
                }
                let mut coefficient = 0.25 * table.alpha[u] * table.alpha[v] * sum;
                if let Some(q) = quant {
                    coefficient = (coefficient / q[u][v]).round();
                }
                band[[u, block_col + v]] = coefficient;
            }
        }
    }
}

fn inverse_band(band: &mut ArrayViewMut2<f32>, quant: Option<&[[f32; BLOCK_SIZE]; BLOCK_SIZE]>) {
    let table = cos_table();
    let cols = band.ncols();

    for block_col in (0..cols).step_by(BLOCK_SIZE) {
        let mut coefficients = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        for (u, row) in coefficients.iter_mut().enumerate() {
            for (v, coefficient) in row.iter_mut().enumerate() {
                let mut value = band[[u, block_col + v]];
                if let Some(q) = quant {
                    value *= q[u][v];
                }
                *coefficient = value;
            }
        }

        for x in 0..BLOCK_SIZE {
            for y in 0..BLOCK_SIZE {
                let mut sum = 0.0f32;
                for u in 0..BLOCK_SIZE {
                    for v in 0..BLOCK_SIZE {
                        sum += table.alpha[u]
                            * table.alpha[v]
                            * coefficients[u][v]
                            * table.cos[u][x]
                            * table.cos[v][y];
                    }
                }
                band[[x, block_col + y]] = 0.25 * sum;
            }
        }
    }
}
