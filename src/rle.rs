//! Zero-run-length coding
//!
//! Quantized coefficient streams are dominated by runs of zeros; every
//! maximal run is collapsed to a single `0` followed by the run length.
//! Non-zero samples pass through unchanged. The coding is exactly
//! invertible: [`decode`] reproduces the input of [`encode`] bit for bit.

use crate::error::{Result, WmcError};

/// Collapse every maximal run of zeros in `samples` to a `(0, run_len)` pair
pub fn encode(samples: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(samples.len());
    let mut i = 0;
    while i < samples.len() {
        let sample = samples[i];
        if sample == 0 {
            let run_start = i;
            while i < samples.len() && samples[i] == 0 {
                i += 1;
            }
            out.push(0);
            out.push((i - run_start) as i32);
        } else {
            out.push(sample);
            i += 1;
        }
    }
    out
}

/// Expand a stream produced by [`encode`] back to the original samples
///
/// Fails on a zero marker with no following run length, or a run length
/// that is not strictly positive.
pub fn decode(encoded: &[i32]) -> Result<Vec<i32>> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut i = 0;
    while i < encoded.len() {
        let sample = encoded[i];
        if sample == 0 {
            let run = *encoded
                .get(i + 1)
                .ok_or_else(|| WmcError::rle_decode("zero marker at end of stream"))?;
            if run <= 0 {
                return Err(WmcError::rle_decode(format!(
                    "non-positive run length {}",
                    run
                )));
            }
            out.extend(std::iter::repeat(0).take(run as usize));
            i += 2;
        } else {
            out.push(sample);
            i += 1;
        }
    }
    Ok(out)
}
