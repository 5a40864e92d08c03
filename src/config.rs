//! Encoder configuration
//!
//! The only tunable exposed by the reference pipeline is the quantization
//! quality. Search window and subsampling mode are fixed design constants
//! (see `motion` and `subsample`); they are candidates for future options.

use crate::error::{Result, WmcError};
use std::fmt;

/// Quantization quality for WMC encoding (1-100)
///
/// Higher values divide DCT coefficients by a finer-grained table, retaining
/// more of them at the cost of a larger bitstream. Lower values zero out more
/// high-frequency coefficients, which the run-length coder then collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    /// Lowest accepted quality
    pub const MIN: Quality = Quality(1);
    /// Highest accepted quality (quantization table becomes all ones)
    pub const MAX: Quality = Quality(100);

    /// Create a quality value, rejecting anything outside 1..=100
    pub fn new(value: u8) -> Result<Self> {
        if (1..=100).contains(&value) {
            Ok(Quality(value))
        } else {
            Err(WmcError::InvalidQuality { value })
        }
    }

    /// Get the quality as a numeric value (1-100)
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Scale percentage applied to the base quantization table
    ///
    /// Uses the conventional JPEG mapping: below 50 the table is inflated by
    /// 5000/q, above 50 it shrinks linearly toward zero at q = 100.
    pub fn table_scale(&self) -> f32 {
        let q = f32::from(self.0);
        if q < 50.0 {
            5000.0 / q
        } else {
            200.0 - 2.0 * q
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality(50)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

impl TryFrom<u8> for Quality {
    type Error = WmcError;

    fn try_from(value: u8) -> Result<Self> {
        Quality::new(value)
    }
}

/// Configuration for the WMC encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderConfig {
    /// Quantization quality
    pub quality: Quality,
}

impl EncoderConfig {
    /// Create a configuration with the given quality
    pub fn new(quality: Quality) -> Self {
        EncoderConfig { quality }
    }

    /// Builder method: set quality
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}
