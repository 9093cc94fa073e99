//! Behavioural properties of the sequence decoder on full-size frames.

use lightshow_fseq::{
    CompressionKind, DecodeError, FrameLayout, SequenceDecoder, SequenceWriter,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cell::RefCell;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::ops::Range;
use std::rc::Rc;

const CHANNELS: usize = 3367;

fn random_frames(count: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut frame = vec![0u8; CHANNELS];
            rng.fill(&mut frame[..]);
            frame
        })
        .collect()
}

fn open(data: Vec<u8>) -> SequenceDecoder<Cursor<Vec<u8>>> {
    SequenceDecoder::from_reader(Cursor::new(data), FrameLayout::default())
        .expect("sequence should open")
}

/// Cursor that records the byte ranges it serves.
struct RecordingReader {
    inner: Cursor<Vec<u8>>,
    reads: Rc<RefCell<Vec<Range<u64>>>>,
}

impl Read for RecordingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = self.inner.position();
        let n = self.inner.read(buf)?;
        self.reads.borrow_mut().push(start..start + n as u64);
        Ok(n)
    }
}

impl Seek for RecordingReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn time_lookup_floors_to_frame_boundary() {
    let frames = random_frames(10, 1);
    let data = SequenceWriter::new(CHANNELS as u32, 50).encode(&frames).unwrap();
    let mut decoder = open(data);

    let at_75 = decoder.frame_at_time_ms(75).unwrap();
    assert_eq!(at_75, decoder.frame_at_index(1).unwrap());

    let at_49 = decoder.frame_at_time_ms(49).unwrap();
    assert_eq!(at_49, decoder.frame_at_index(0).unwrap());

    // boundary belongs to the later frame
    let at_100 = decoder.frame_at_time_ms(100).unwrap();
    assert_eq!(at_100.as_bytes(), &frames[2][..]);
}

#[test]
fn uncompressed_frames_round_trip() {
    let frames = random_frames(24, 2);
    let data = SequenceWriter::new(CHANNELS as u32, 25).encode(&frames).unwrap();
    let mut decoder = open(data);

    assert_eq!(decoder.frame_count(), 24);
    for (i, expected) in frames.iter().enumerate() {
        let frame = decoder.frame_at_index(i as u64).unwrap();
        assert_eq!(frame.as_bytes(), &expected[..], "frame {i}");
    }
}

#[test]
fn compressed_lookup_reads_only_the_owning_block() {
    let frames = random_frames(10, 3);
    let data = SequenceWriter::new(CHANNELS as u32, 50)
        .with_compression(CompressionKind::ZstdBlocks)
        .with_frames_per_block(5)
        .encode(&frames)
        .unwrap();

    let reads = Rc::new(RefCell::new(Vec::new()));
    let reader = RecordingReader {
        inner: Cursor::new(data),
        reads: Rc::clone(&reads),
    };
    let mut decoder = SequenceDecoder::from_reader(reader, FrameLayout::default()).unwrap();

    let blocks = decoder.header().blocks.clone();
    assert_eq!(blocks.len(), 3, "two blocks plus sentinel");
    assert_eq!(blocks[1].first_frame, 5);
    let block0 = blocks[0].offset..blocks[1].offset;

    reads.borrow_mut().clear();
    let frame = decoder.frame_at_index(7).unwrap();
    assert_eq!(frame.as_bytes(), &frames[7][..]);

    let reads = reads.borrow();
    assert!(!reads.is_empty());
    for range in reads.iter() {
        assert!(
            range.end <= block0.start || range.start >= block0.end,
            "read {range:?} touched block 0 ({block0:?})"
        );
    }
}

#[test]
fn compressed_lookup_survives_corrupt_neighbour_block() {
    let frames = random_frames(10, 4);
    let mut data = SequenceWriter::new(CHANNELS as u32, 50)
        .with_compression(CompressionKind::ZstdBlocks)
        .with_frames_per_block(5)
        .encode(&frames)
        .unwrap();

    let (start, end) = {
        let decoder = open(data.clone());
        let blocks = &decoder.header().blocks;
        (blocks[0].offset as usize, blocks[1].offset as usize)
    };
    data[start..end].fill(0xA5);

    let mut decoder = open(data);
    assert_eq!(decoder.frame_at_index(7).unwrap().as_bytes(), &frames[7][..]);
    assert!(matches!(
        decoder.frame_at_index(2).unwrap_err(),
        DecodeError::Malformed(_)
    ));
}

#[test]
fn inflated_frame_count_is_malformed_not_an_allocation() {
    let frames = random_frames(10, 8);
    let mut data = SequenceWriter::new(CHANNELS as u32, 50)
        .with_compression(CompressionKind::ZstdBlocks)
        .with_frames_per_block(10)
        .encode(&frames)
        .unwrap();
    // frame_count lives at bytes 14..18; the single block now claims u32::MAX frames
    data[14..18].copy_from_slice(&u32::MAX.to_le_bytes());

    let mut decoder = open(data);
    assert_eq!(decoder.frame_count(), u32::MAX);
    let err = decoder.frame_at_index(0).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err}");

    let first = decoder.frames().next().unwrap();
    assert!(matches!(first, Err(DecodeError::Malformed(_))));
}

#[test]
fn frames_split_into_disjoint_contiguous_sections() {
    let frames = random_frames(3, 5);
    let data = SequenceWriter::new(CHANNELS as u32, 50)
        .with_compression(CompressionKind::ZstdBlocks)
        .encode(&frames)
        .unwrap();
    let mut decoder = open(data);

    for i in 0..3 {
        let frame = decoder.frame_at_index(i).unwrap();
        assert_eq!(frame.relay_bytes().len(), 16);
        assert_eq!(frame.left_bytes().len(), 1662);
        assert_eq!(frame.right_bytes().len(), 1689);

        let mut joined = Vec::with_capacity(CHANNELS);
        joined.extend_from_slice(frame.relay_bytes());
        joined.extend_from_slice(frame.left_bytes());
        joined.extend_from_slice(frame.right_bytes());
        assert_eq!(joined, frames[i as usize]);
    }
}

fn valid_file() -> Vec<u8> {
    SequenceWriter::new(CHANNELS as u32, 50)
        .encode(&random_frames(2, 6))
        .unwrap()
}

#[test]
fn bad_magic_fails_construction() {
    let mut data = valid_file();
    data[0] = b'F';
    let err = SequenceDecoder::from_reader(Cursor::new(data), FrameLayout::default()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err}");
}

#[test]
fn bad_flags_fail_construction() {
    let mut data = valid_file();
    data[19] = 1;
    let err = SequenceDecoder::from_reader(Cursor::new(data), FrameLayout::default()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err}");
}

#[test]
fn gzip_fails_construction() {
    let mut data = valid_file();
    data[20] = 2;
    let err = SequenceDecoder::from_reader(Cursor::new(data), FrameLayout::default()).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedCompression(_)), "{err}");
}

#[test]
fn opens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.fseq");
    let frames = random_frames(4, 7);
    SequenceWriter::new(CHANNELS as u32, 50)
        .write_to_path(&path, &frames)
        .unwrap();

    let mut decoder = SequenceDecoder::open(&path).unwrap();
    assert_eq!(decoder.duration_ms(), 200);
    assert_eq!(decoder.frame_at_time_ms(199).unwrap().as_bytes(), &frames[3][..]);
}

#[test]
fn missing_file_is_io_error() {
    let err = SequenceDecoder::open("/nonexistent/definitely/missing.fseq").unwrap_err();
    assert!(matches!(err, DecodeError::Io(_)));
}
