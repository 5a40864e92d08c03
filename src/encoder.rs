//! Per-frame pipeline orchestration
//!
//! The encoder drives a two-state machine: the first frame is INTRA (no
//! predecessor, every block raw) and every later frame is INTER (block
//! matched against the stored previous frame). Per frame, in strict order:
//! pull → subsample chroma → block transform → per-plane encode → run-length
//! code → save record → replace the previous-frame state.
//!
//! Exactly one previous frame is retained; it is owned by the encode loop
//! and swapped atomically after each frame, never aliased across iterations.
//!
//! Error policy: the container is finalized only on clean source exhaustion.
//! On any failure the run aborts and the file keeps its placeholder frame
//! count of zero, which a reader treats as an empty container — a partial
//! file can never masquerade as a complete one. A source that yields no
//! frames at all is an error, not an empty encode.

use std::io::{Seek, Write};

use tracing::{debug, info};

use crate::bitstream::{ContainerHeader, ContainerWriter, FrameRecord};
use crate::config::EncoderConfig;
use crate::error::{Result, WmcError};
use crate::motion::{BlockMatcher, MatchMap};
use crate::plane::Plane;
use crate::rle;
use crate::source::{FrameSource, YcbcrFrame};
use crate::subsample::ChromaSubsampler;
use crate::transform::BlockTransform;

/// Summary of a completed encode
#[derive(Debug, Clone, Copy)]
pub struct EncodeStats {
    /// Number of frames written
    pub frames: u32,
    /// Total container size in bytes
    pub bytes_written: u64,
}

/// The single retained previous-frame state
struct PrevFrame {
    planes: [Plane; 3],
    maps: [MatchMap; 3],
}

/// WMC encoder
pub struct Encoder {
    subsampler: ChromaSubsampler,
    transform: BlockTransform,
    matcher: BlockMatcher,
}

impl Encoder {
    /// Create an encoder from a configuration
    pub fn new(config: EncoderConfig) -> Self {
        Encoder {
            subsampler: ChromaSubsampler::new(),
            transform: BlockTransform::new(config.quality),
            matcher: BlockMatcher::new(),
        }
    }

    /// Encode every frame of `source` into a finalized container on `sink`
    pub fn encode<S: FrameSource, W: Write + Seek>(
        &self,
        source: &mut S,
        sink: W,
    ) -> Result<EncodeStats> {
        let first = source.next_frame()?.ok_or(WmcError::EmptySource)?;
        ensure_frame_geometry(&first, source.width(), source.height())?;

        let header = ContainerHeader::new(
            source.width(),
            source.height(),
            source.width_padding(),
            source.height_padding(),
        );
        let mut writer = ContainerWriter::new(sink, header)?;

        let mut prev: Option<PrevFrame> = None;
        let mut pending = Some(first);
        let mut frame_index: u32 = 0;

        while let Some(frame) = pending.take() {
            info!(
                frame = frame_index,
                kind = if prev.is_some() { "inter" } else { "intra" },
                "processing frame"
            );
            let (record, state) = self.encode_frame(frame, prev.as_ref())?;

            debug!(frame = frame_index, "saving frame record");
            writer.save_frame(&record)?;

            prev = Some(state);
            frame_index += 1;
            pending = source.next_frame()?;
        }

        info!("no more frames to read");
        let mut inner = writer.finalize()?;
        let bytes_written = inner.stream_position()?;
        info!(frames = frame_index, bytes = bytes_written, "container finalized");

        Ok(EncodeStats {
            frames: frame_index,
            bytes_written,
        })
    }

    /// Run the per-frame pipeline, producing the container record and the
    /// state to carry into the next frame
    fn encode_frame(
        &self,
        frame: YcbcrFrame,
        prev: Option<&PrevFrame>,
    ) -> Result<(FrameRecord, PrevFrame)> {
        let YcbcrFrame { mut y, mut cb, mut cr } = frame;

        debug!("chroma subsampling Cb and Cr");
        self.subsampler.subsample(&mut cb);
        self.subsampler.subsample(&mut cr);

        debug!("applying block transform to Y, Cb, Cr");
        self.transform.forward(&mut y)?;
        self.transform.forward(&mut cb)?;
        self.transform.forward(&mut cr)?;

        let planes = [y, cb, cr];
        let (y_map, y_samples) =
            self.encode_plane(&planes[0], prev.map(|p| (&p.planes[0], &p.maps[0])))?;
        let (cb_map, cb_samples) =
            self.encode_plane(&planes[1], prev.map(|p| (&p.planes[1], &p.maps[1])))?;
        let (cr_map, cr_samples) =
            self.encode_plane(&planes[2], prev.map(|p| (&p.planes[2], &p.maps[2])))?;

        debug!(
            y = y_samples.len(),
            cb = cb_samples.len(),
            cr = cr_samples.len(),
            "run-length coding component streams"
        );
        let record = FrameRecord {
            planes: [
                rle::encode(&y_samples),
                rle::encode(&cb_samples),
                rle::encode(&cr_samples),
            ],
            maps: [y_map.clone(), cb_map.clone(), cr_map.clone()],
        };

        let state = PrevFrame {
            planes,
            maps: [y_map, cb_map, cr_map],
        };
        Ok((record, state))
    }

    /// Encode one component plane
    ///
    /// With previous state the plane is block matched; without it (first
    /// frame) every sample is emitted raw in raster order under an all-intra
    /// map. The same operation serves Y, Cb and Cr.
    fn encode_plane(
        &self,
        plane: &Plane,
        prev: Option<(&Plane, &MatchMap)>,
    ) -> Result<(MatchMap, Vec<i32>)> {
        match prev {
            Some((prev_plane, prev_map)) => self.matcher.match_plane(prev_plane, plane, prev_map),
            None => {
                plane.ensure_block_aligned()?;
                let mut samples = Vec::with_capacity(plane.len());
                plane.flatten_raster(&mut samples);
                Ok((MatchMap::for_plane(plane), samples))
            }
        }
    }
}

fn ensure_frame_geometry(frame: &YcbcrFrame, width: u32, height: u32) -> Result<()> {
    if frame.y.rows() != height as usize || frame.y.cols() != width as usize {
        return Err(WmcError::PlaneMismatch {
            actual_rows: frame.y.rows(),
            actual_cols: frame.y.cols(),
            expected_rows: height as usize,
            expected_cols: width as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::source::MemorySource;
    use std::io::Cursor;

    fn textured_frame(rows: usize, cols: usize, seed: usize) -> YcbcrFrame {
        YcbcrFrame {
            y: Plane::from_fn(rows, cols, |r, c| ((r * 31 + c * 17 + seed) % 200) as f32),
            cb: Plane::from_fn(rows, cols, |r, c| ((r * 13 + c * 7 + seed) % 200) as f32),
            cr: Plane::from_fn(rows, cols, |r, c| ((r * 5 + c * 23 + seed) % 200) as f32),
        }
    }

    fn encoder() -> Encoder {
        Encoder::new(EncoderConfig::new(Quality::new(50).expect("valid quality")))
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let mut source = MemorySource::new(16, 16, Vec::new());
        let mut buf = Vec::new();
        let err = encoder()
            .encode(&mut source, Cursor::new(&mut buf))
            .unwrap_err();
        assert!(matches!(err, WmcError::EmptySource));
    }

    #[test]
    fn test_geometry_mismatch_is_fatal() {
        // Source declares 32x32 but delivers 16x16 planes.
        let mut source = MemorySource::new(32, 32, vec![textured_frame(16, 16, 0)]);
        let mut buf = Vec::new();
        let err = encoder()
            .encode(&mut source, Cursor::new(&mut buf))
            .unwrap_err();
        assert!(matches!(err, WmcError::PlaneMismatch { .. }));
    }

    #[test]
    fn test_single_frame_encode() {
        let mut source = MemorySource::new(16, 16, vec![textured_frame(16, 16, 0)]);
        let mut buf = Vec::new();
        let stats = encoder()
            .encode(&mut source, Cursor::new(&mut buf))
            .expect("encode");
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.bytes_written, buf.len() as u64);
        assert!(stats.bytes_written > crate::bitstream::HEADER_SIZE);
    }

    #[test]
    fn test_misaligned_source_fails_fast() {
        let mut source = MemorySource::new(12, 12, vec![textured_frame(12, 12, 0)]);
        let mut buf = Vec::new();
        let err = encoder()
            .encode(&mut source, Cursor::new(&mut buf))
            .unwrap_err();
        assert!(matches!(err, WmcError::DimensionNotAligned { .. }));
    }
}
