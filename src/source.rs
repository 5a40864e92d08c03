//! Frame sources
//!
//! A [`FrameSource`] hands the encoder frames already decomposed into Y, Cb
//! and Cr planes, plus the fixed geometry of the run: padded dimensions and
//! how much of them is padding. Planes must arrive padded so that Y and the
//! not-yet-subsampled chroma planes tile into 8x8 blocks after subsampling,
//! i.e. dimensions must be multiples of [`SOURCE_ALIGNMENT`].

use std::collections::VecDeque;
use std::io::Read;

use crate::error::{Result, WmcError};
use crate::plane::Plane;

/// Required alignment of source plane dimensions
///
/// 16 rather than 8 because chroma planes are halved by subsampling and must
/// still land on the 8x8 block grid.
pub const SOURCE_ALIGNMENT: usize = 16;

/// One frame decomposed into component planes
#[derive(Debug, Clone)]
pub struct YcbcrFrame {
    /// Luminance plane
    pub y: Plane,
    /// Blue-difference chroma plane
    pub cb: Plane,
    /// Red-difference chroma plane
    pub cr: Plane,
}

/// Supplier of decomposed frames with fixed geometry
pub trait FrameSource {
    /// Padded frame width, fixed for the whole run
    fn width(&self) -> u32;
    /// Padded frame height, fixed for the whole run
    fn height(&self) -> u32;
    /// Columns of padding included in `width`
    fn width_padding(&self) -> u32;
    /// Rows of padding included in `height`
    fn height_padding(&self) -> u32;
    /// Pull the next frame, or `None` on exhaustion
    fn next_frame(&mut self) -> Result<Option<YcbcrFrame>>;
}

/// Round `value` up to the next multiple of [`SOURCE_ALIGNMENT`]
fn align_up(value: usize) -> usize {
    value.div_ceil(SOURCE_ALIGNMENT) * SOURCE_ALIGNMENT
}

/// Copy a raw 8-bit plane into a padded [`Plane`], replicating edge samples
/// into the padding region
fn pad_plane(data: &[u8], width: usize, height: usize, padded_width: usize, padded_height: usize) -> Plane {
    Plane::from_fn(padded_height, padded_width, |r, c| {
        let src_r = r.min(height - 1);
        let src_c = c.min(width - 1);
        f32::from(data[src_r * width + src_c])
    })
}

/// YUV4MPEG2 frame source
///
/// Accepts 4:4:4 input only: the pipeline owns chroma subsampling, so
/// pre-subsampled colorspaces are rejected rather than subsampled twice.
pub struct Y4mSource<R: Read> {
    decoder: y4m::Decoder<R>,
    display_width: usize,
    display_height: usize,
    padded_width: usize,
    padded_height: usize,
}

impl<R: Read> Y4mSource<R> {
    /// Parse the stream header and fix the run geometry
    pub fn new(reader: R) -> Result<Self> {
        let decoder = y4m::decode(reader)
            .map_err(|e| WmcError::source(format!("failed to parse YUV4MPEG2 header: {}", e)))?;

        match decoder.get_colorspace() {
            y4m::Colorspace::C444 => {}
            other => {
                return Err(WmcError::UnsupportedPixelFormat {
                    format: format!("{:?}", other),
                })
            }
        }

        let display_width = decoder.get_width();
        let display_height = decoder.get_height();
        if display_width == 0 || display_height == 0 {
            return Err(WmcError::source("stream declares zero dimensions"));
        }

        Ok(Y4mSource {
            decoder,
            display_width,
            display_height,
            padded_width: align_up(display_width),
            padded_height: align_up(display_height),
        })
    }
}

impl<R: Read> FrameSource for Y4mSource<R> {
    fn width(&self) -> u32 {
        self.padded_width as u32
    }

    fn height(&self) -> u32 {
        self.padded_height as u32
    }

    fn width_padding(&self) -> u32 {
        (self.padded_width - self.display_width) as u32
    }

    fn height_padding(&self) -> u32 {
        (self.padded_height - self.display_height) as u32
    }

    fn next_frame(&mut self) -> Result<Option<YcbcrFrame>> {
        let (w, h) = (self.display_width, self.display_height);
        let (pw, ph) = (self.padded_width, self.padded_height);

        match self.decoder.read_frame() {
            Ok(frame) => Ok(Some(YcbcrFrame {
                y: pad_plane(frame.get_y_plane(), w, h, pw, ph),
                cb: pad_plane(frame.get_u_plane(), w, h, pw, ph),
                cr: pad_plane(frame.get_v_plane(), w, h, pw, ph),
            })),
            Err(y4m::Error::EOF) => Ok(None),
            Err(e) => Err(WmcError::source(format!("failed to read frame: {}", e))),
        }
    }
}

/// In-memory frame source for synthetic input and tests
pub struct MemorySource {
    frames: VecDeque<YcbcrFrame>,
    width: u32,
    height: u32,
    width_padding: u32,
    height_padding: u32,
}

impl MemorySource {
    /// Create a source over pre-built frames with no padding
    pub fn new(width: u32, height: u32, frames: Vec<YcbcrFrame>) -> Self {
        MemorySource {
            frames: frames.into(),
            width,
            height,
            width_padding: 0,
            height_padding: 0,
        }
    }

    /// Builder method: declare padding amounts included in the dimensions
    pub fn with_padding(mut self, width_padding: u32, height_padding: u32) -> Self {
        self.width_padding = width_padding;
        self.height_padding = height_padding;
        self
    }
}

impl FrameSource for MemorySource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn width_padding(&self) -> u32 {
        self.width_padding
    }

    fn height_padding(&self) -> u32 {
        self.height_padding
    }

    fn next_frame(&mut self) -> Result<Option<YcbcrFrame>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(1), 16);
        assert_eq!(align_up(16), 16);
        assert_eq!(align_up(17), 32);
        assert_eq!(align_up(176), 176);
    }

    #[test]
    fn test_pad_plane_replicates_edges() {
        let data: Vec<u8> = vec![1, 2, 3, 4, 5, 6]; // 3x2
        let plane = pad_plane(&data, 3, 2, 5, 4);
        assert_eq!((plane.rows(), plane.cols()), (4, 5));
        assert_eq!(plane.get(0, 0), 1.0);
        assert_eq!(plane.get(0, 4), 3.0); // last column replicated
        assert_eq!(plane.get(3, 1), 5.0); // last row replicated
        assert_eq!(plane.get(3, 4), 6.0); // corner
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let frame = |fill: f32| YcbcrFrame {
            y: Plane::from_fn(16, 16, |_, _| fill),
            cb: Plane::from_fn(16, 16, |_, _| fill),
            cr: Plane::from_fn(16, 16, |_, _| fill),
        };
        let mut source = MemorySource::new(16, 16, vec![frame(1.0), frame(2.0)]);
        assert_eq!(source.width(), 16);

        let first = source.next_frame().expect("read").expect("frame");
        assert_eq!(first.y.get(0, 0), 1.0);
        let second = source.next_frame().expect("read").expect("frame");
        assert_eq!(second.y.get(0, 0), 2.0);
        assert!(source.next_frame().expect("read").is_none());
    }
}
