//! WMC: a motion-compensated DCT video codec
//!
//! The encode pipeline per frame:
//!
//! 1. Chroma subsampling (2x2 mean decimation of Cb and Cr)
//! 2. 8x8 block DCT with quality-scaled quantization
//! 3. Block matching against the previous frame's coefficient planes
//! 4. Zero-run-length coding of the sample streams
//! 5. Serialization into the WMC container
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{BufReader, BufWriter};
//! use wmc_lib::{Encoder, EncoderConfig, Quality};
//! use wmc_lib::source::Y4mSource;
//!
//! # fn run() -> wmc_lib::Result<()> {
//! let mut source = Y4mSource::new(BufReader::new(File::open("input.y4m")?))?;
//! let sink = BufWriter::new(File::create("output.wmc")?);
//! let encoder = Encoder::new(EncoderConfig::new(Quality::new(75)?));
//! let stats = encoder.encode(&mut source, sink)?;
//! println!("{} frames, {} bytes", stats.frames, stats.bytes_written);
//! # Ok(())
//! # }
//! ```

pub mod bitstream;
pub mod config;
pub mod encoder;
pub mod error;
pub mod motion;
pub mod plane;
pub mod rle;
pub mod source;
pub mod subsample;
pub mod transform;

pub use config::{EncoderConfig, Quality};
pub use encoder::{EncodeStats, Encoder};
pub use error::{Result, WmcError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
