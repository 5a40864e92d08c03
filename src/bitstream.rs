//! WMC container format
//!
//! ## Layout (Little Endian)
//!
//! File header (24 bytes):
//!
//! | Offset | Size | Field          | Description                                |
//! |--------|------|----------------|--------------------------------------------|
//! | 0x00   | 4    | magic          | "WMC1"                                     |
//! | 0x04   | 4    | frame_count    | Written as 0, patched at finalize          |
//! | 0x08   | 4    | width          | Padded (block-aligned) frame width         |
//! | 0x0C   | 4    | height         | Padded (block-aligned) frame height        |
//! | 0x10   | 4    | width_padding  | Columns to strip at reconstruction         |
//! | 0x14   | 4    | height_padding | Rows to strip at reconstruction            |
//!
//! Followed by `frame_count` records, each:
//!
//! ```text
//! [RLE(Y)] [RLE(Cb)] [RLE(Cr)] [Map(Y)] [Map(Cb)] [Map(Cr)]
//! ```
//!
//! where an RLE stream is `[len: u32][len x i32]` and a match map is
//! `[block_rows: u32][block_cols: u32]` followed by one
//! `(tag: u8, dy: i16, dx: i16)` triple per block (tag 0 = intra with a
//! zeroed vector, tag 1 = inter). The sample stream of frame 0 is in raster
//! order; matched frames are in block-scan order.
//!
//! Writing is two-phase: the header goes out with a zero frame count and
//! [`ContainerWriter::finalize`] seeks back to patch the real count. A file
//! abandoned before finalize therefore still carries the placeholder and a
//! reader sees zero frames instead of a trailing partial record.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::{Result, WmcError};
use crate::motion::{BlockMatch, MatchMap, MotionVector};

/// Magic bytes for the WMC container
pub const MAGIC: &[u8; 4] = b"WMC1";

/// Size of the file header in bytes
pub const HEADER_SIZE: u64 = 24;

/// Byte offset of the frame-count field inside the header
const FRAME_COUNT_OFFSET: u64 = 4;

/// Upper bound on a single length prefix, to reject absurd allocations
/// from corrupt input before they happen
const MAX_PREFIX_LEN: u32 = 1 << 28;

const TAG_INTRA: u8 = 0;
const TAG_INTER: u8 = 1;

/// WMC file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Number of frame records (0 until finalize)
    pub frame_count: u32,
    /// Padded frame width in samples
    pub width: u32,
    /// Padded frame height in samples
    pub height: u32,
    /// Horizontal padding added by the frame source
    pub width_padding: u32,
    /// Vertical padding added by the frame source
    pub height_padding: u32,
}

impl ContainerHeader {
    /// Create a header with a placeholder frame count
    pub fn new(width: u32, height: u32, width_padding: u32, height_padding: u32) -> Self {
        ContainerHeader {
            frame_count: 0,
            width,
            height,
            width_padding,
            height_padding,
        }
    }

    /// Validate the header contents
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(WmcError::invalid_header("zero frame dimensions"));
        }
        if self.width_padding >= self.width || self.height_padding >= self.height {
            return Err(WmcError::invalid_header(format!(
                "padding {}x{} exceeds dimensions {}x{}",
                self.width_padding, self.height_padding, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Frame width before padding was applied
    pub fn display_width(&self) -> u32 {
        self.width - self.width_padding
    }

    /// Frame height before padding was applied
    pub fn display_height(&self) -> u32 {
        self.height - self.height_padding
    }
}

/// One frame's worth of container payload
///
/// The three RLE-coded component streams (Y, Cb, Cr) and their match maps.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// RLE-coded sample streams, in Y, Cb, Cr order
    pub planes: [Vec<i32>; 3],
    /// Match maps, in Y, Cb, Cr order
    pub maps: [MatchMap; 3],
}

impl FrameRecord {
    /// Serialize this record to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for stream in &self.planes {
            writer.write_u32::<LittleEndian>(stream.len() as u32)?;
            for &sample in stream {
                writer.write_i32::<LittleEndian>(sample)?;
            }
        }
        for map in &self.maps {
            write_map(writer, map)?;
        }
        Ok(())
    }

    /// Deserialize one record from `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut planes: [Vec<i32>; 3] = Default::default();
        for (index, stream) in planes.iter_mut().enumerate() {
            let context = ["Y stream", "Cb stream", "Cr stream"][index];
            let len = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| map_read_err(e, context))?;
            if len > MAX_PREFIX_LEN {
                return Err(WmcError::corrupt_record(format!(
                    "{} length {} exceeds limit",
                    context, len
                )));
            }
            let mut samples = Vec::with_capacity(len as usize);
            for _ in 0..len {
                samples.push(
                    reader
                        .read_i32::<LittleEndian>()
                        .map_err(|e| map_read_err(e, context))?,
                );
            }
            *stream = samples;
        }

        let maps = [
            read_map(reader, "Y match map")?,
            read_map(reader, "Cb match map")?,
            read_map(reader, "Cr match map")?,
        ];

        Ok(FrameRecord { planes, maps })
    }
}

fn write_map<W: Write>(writer: &mut W, map: &MatchMap) -> Result<()> {
    writer.write_u32::<LittleEndian>(map.block_rows() as u32)?;
    writer.write_u32::<LittleEndian>(map.block_cols() as u32)?;
    for entry in map.iter() {
        match entry {
            BlockMatch::Intra => {
                writer.write_u8(TAG_INTRA)?;
                writer.write_i16::<LittleEndian>(0)?;
                writer.write_i16::<LittleEndian>(0)?;
            }
            BlockMatch::Inter(mv) => {
                writer.write_u8(TAG_INTER)?;
                writer.write_i16::<LittleEndian>(mv.dy)?;
                writer.write_i16::<LittleEndian>(mv.dx)?;
            }
        }
    }
    Ok(())
}

fn read_map<R: Read>(reader: &mut R, context: &str) -> Result<MatchMap> {
    let block_rows = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| map_read_err(e, context))?;
    let block_cols = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| map_read_err(e, context))?;
    let entry_count = u64::from(block_rows) * u64::from(block_cols);
    if entry_count > u64::from(MAX_PREFIX_LEN) {
        return Err(WmcError::corrupt_record(format!(
            "{} size {}x{} exceeds limit",
            context, block_rows, block_cols
        )));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let tag = reader.read_u8().map_err(|e| map_read_err(e, context))?;
        let dy = reader
            .read_i16::<LittleEndian>()
            .map_err(|e| map_read_err(e, context))?;
        let dx = reader
            .read_i16::<LittleEndian>()
            .map_err(|e| map_read_err(e, context))?;
        let entry = match tag {
            TAG_INTRA => BlockMatch::Intra,
            TAG_INTER => BlockMatch::Inter(MotionVector { dy, dx }),
            other => {
                return Err(WmcError::corrupt_record(format!(
                    "{} entry tag {}",
                    context, other
                )))
            }
        };
        entries.push(entry);
    }

    MatchMap::from_entries(block_rows as usize, block_cols as usize, entries)
}

fn map_read_err(err: std::io::Error, context: &str) -> WmcError {
    if err.kind() == ErrorKind::UnexpectedEof {
        WmcError::truncated(context)
    } else {
        WmcError::Io(err)
    }
}

/// Two-phase writer for the WMC container
///
/// Construction writes the header with a zero frame count;
/// [`finalize`](ContainerWriter::finalize) patches the real count and
/// consumes the writer, so saving a frame after finalize does not compile.
pub struct ContainerWriter<W: Write + Seek> {
    writer: W,
    frame_count: u32,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Open a container: validates the header and writes it with a
    /// placeholder frame count
    pub fn new(mut writer: W, header: ContainerHeader) -> Result<Self> {
        header.validate()?;
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_u32::<LittleEndian>(header.width)?;
        writer.write_u32::<LittleEndian>(header.height)?;
        writer.write_u32::<LittleEndian>(header.width_padding)?;
        writer.write_u32::<LittleEndian>(header.height_padding)?;
        Ok(ContainerWriter {
            writer,
            frame_count: 0,
        })
    }

    /// Number of frames saved so far
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Append one frame record
    pub fn save_frame(&mut self, record: &FrameRecord) -> Result<()> {
        record.write_to(&mut self.writer)?;
        self.frame_count += 1;
        Ok(())
    }

    /// Patch the header's frame count, flush, and return the inner writer
    /// positioned at the end of the container
    pub fn finalize(mut self) -> Result<W> {
        let count = self.frame_count;
        self.writer.flush()?;
        self.writer.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
        self.writer.write_u32::<LittleEndian>(count)?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Reader for the WMC container
#[derive(Debug)]
pub struct ContainerReader<R: Read> {
    reader: R,
    header: ContainerHeader,
    frames_read: u32,
}

impl<R: Read> ContainerReader<R> {
    /// Parse and validate the header
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| map_read_err(e, "header magic"))?;
        if &magic != MAGIC {
            return Err(WmcError::invalid_header(format!(
                "bad magic {:02x?}",
                magic
            )));
        }

        let frame_count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| map_read_err(e, "header"))?;
        let width = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| map_read_err(e, "header"))?;
        let height = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| map_read_err(e, "header"))?;
        let width_padding = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| map_read_err(e, "header"))?;
        let height_padding = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| map_read_err(e, "header"))?;

        let header = ContainerHeader {
            frame_count,
            width,
            height,
            width_padding,
            height_padding,
        };
        header.validate()?;

        Ok(ContainerReader {
            reader,
            header,
            frames_read: 0,
        })
    }

    /// The parsed file header
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Read the next frame record in write order, or `None` once all
    /// `frame_count` records have been yielded
    pub fn next_frame(&mut self) -> Result<Option<FrameRecord>> {
        if self.frames_read == self.header.frame_count {
            return Ok(None);
        }
        let record = FrameRecord::read_from(&mut self.reader)?;
        self.frames_read += 1;
        Ok(Some(record))
    }
}
