//! End-to-end encode tests over the in-memory source

use std::io::Cursor;

use wmc_lib::bitstream::ContainerReader;
use wmc_lib::motion::{BlockMatch, MotionVector};
use wmc_lib::plane::Plane;
use wmc_lib::source::{MemorySource, YcbcrFrame};
use wmc_lib::{Encoder, EncoderConfig, Quality};

fn flat_frame(rows: usize, cols: usize, fill: f32) -> YcbcrFrame {
    YcbcrFrame {
        y: Plane::from_fn(rows, cols, |_, _| fill),
        cb: Plane::from_fn(rows, cols, |_, _| fill),
        cr: Plane::from_fn(rows, cols, |_, _| fill),
    }
}

fn textured_frame(rows: usize, cols: usize) -> YcbcrFrame {
    YcbcrFrame {
        y: Plane::from_fn(rows, cols, |r, c| ((r * 37 + c * 113) % 251) as f32),
        cb: Plane::from_fn(rows, cols, |r, c| ((r * 7 + c * 3) % 120) as f32),
        cr: Plane::from_fn(rows, cols, |r, c| ((r * 11 + c * 5) % 120) as f32),
    }
}

fn encode_to_buf(quality: u8, frames: Vec<YcbcrFrame>) -> Vec<u8> {
    let mut source = MemorySource::new(16, 16, frames);
    let mut buf = Vec::new();
    let encoder = Encoder::new(EncoderConfig::new(
        Quality::new(quality).expect("valid quality"),
    ));
    let stats = encoder
        .encode(&mut source, Cursor::new(&mut buf))
        .expect("encode");
    assert_eq!(stats.bytes_written, buf.len() as u64);
    buf
}

#[test]
fn test_first_frame_is_all_intra() {
    let buf = encode_to_buf(50, vec![textured_frame(16, 16)]);

    let mut reader = ContainerReader::new(Cursor::new(&buf)).expect("reader");
    assert_eq!(reader.header().frame_count, 1);
    assert_eq!(reader.header().width, 16);
    assert_eq!(reader.header().height, 16);

    let record = reader.next_frame().expect("read").expect("record");
    // Y is 16x16 (2x2 blocks); chroma is subsampled to 8x8 (one block).
    assert_eq!(record.maps[0].block_rows(), 2);
    assert_eq!(record.maps[0].block_cols(), 2);
    assert_eq!(record.maps[1].block_rows(), 1);
    assert_eq!(record.maps[2].block_cols(), 1);
    for map in &record.maps {
        assert_eq!(map.intra_count(), map.block_rows() * map.block_cols());
    }
    assert!(reader.next_frame().expect("read").is_none());
}

#[test]
fn test_identical_frames_collapse_to_zero_runs() {
    let frame = textured_frame(16, 16);
    let buf = encode_to_buf(50, vec![frame.clone(), frame]);

    let mut reader = ContainerReader::new(Cursor::new(&buf)).expect("reader");
    assert_eq!(reader.header().frame_count, 2);

    let _first = reader.next_frame().expect("read").expect("record");
    let second = reader.next_frame().expect("read").expect("record");

    // Every block matches its co-located predecessor exactly.
    for map in &second.maps {
        for entry in map.iter() {
            assert_eq!(*entry, BlockMatch::Inter(MotionVector { dy: 0, dx: 0 }));
        }
    }
    // Each residual stream is one maximal zero run: 256 Y samples, 64 per
    // subsampled chroma plane.
    assert_eq!(second.planes[0], vec![0, 256]);
    assert_eq!(second.planes[1], vec![0, 64]);
    assert_eq!(second.planes[2], vec![0, 64]);
}

#[test]
fn test_scene_change_forces_intra() {
    // At quality 100 the quantization table is all ones, so the DC gap
    // between a black and a bright flat frame dominates the block metric
    // and no candidate clears the acceptance threshold.
    let buf = encode_to_buf(100, vec![flat_frame(16, 16, 0.0), flat_frame(16, 16, 200.0)]);

    let mut reader = ContainerReader::new(Cursor::new(&buf)).expect("reader");
    let _first = reader.next_frame().expect("read").expect("record");
    let second = reader.next_frame().expect("read").expect("record");

    for map in &second.maps {
        assert_eq!(map.intra_count(), map.block_rows() * map.block_cols());
    }
}

#[test]
fn test_lower_quality_never_grows_the_stream() {
    let frames = || vec![textured_frame(16, 16), textured_frame(16, 16)];
    let high = encode_to_buf(90, frames());
    let low = encode_to_buf(10, frames());
    assert!(
        low.len() <= high.len(),
        "quality 10 produced {} bytes, quality 90 produced {}",
        low.len(),
        high.len()
    );
}
