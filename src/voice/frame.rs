//! Fixed-size frame extraction from an arbitrary PCM byte stream
//!
//! Clients send signed 16-bit little-endian samples in chunks of any length.
//! The assembler accumulates bytes and slices off complete frames in arrival
//! order, carrying any partial frame (including a dangling odd byte) over to
//! the next chunk.

use std::collections::VecDeque;

use crate::{Error, Result};

/// Bytes per signed 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// One fixed-length slice of audio, consumed once by scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    samples: Vec<i16>,
}

impl Frame {
    /// Wrap samples as a frame
    #[must_use]
    pub const fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Decode little-endian PCM bytes; a trailing odd byte is ignored
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { samples }
    }

    /// Samples in this frame
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak absolute amplitude
    #[must_use]
    pub fn peak(&self) -> u16 {
        self.samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
    }

    /// Encode back to little-endian PCM bytes
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Take ownership of the samples
    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

/// Accumulates raw bytes and yields whole frames
#[derive(Debug)]
pub struct FrameAssembler {
    frame_size: usize,
    buffer: VecDeque<u8>,
}

impl FrameAssembler {
    /// Create an assembler producing frames of `frame_size` samples
    ///
    /// # Panics
    ///
    /// Panics if `frame_size` is zero
    #[must_use]
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be positive");
        Self {
            frame_size,
            buffer: VecDeque::with_capacity(frame_size * BYTES_PER_SAMPLE * 2),
        }
    }

    /// Append a chunk and return the frames it completes, oldest first
    ///
    /// Frames are extracted lazily; bytes not yet drained by the iterator stay
    /// buffered for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.append(bytes);
        Frames { assembler: self }
    }

    /// Append a chunk without extracting frames
    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Remove the oldest complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Frame> {
        let frame_bytes = self.frame_bytes();
        if self.buffer.len() < frame_bytes {
            return None;
        }

        // Consumed from the head; the rest of the buffer stays in place
        let mut bytes = self.buffer.drain(..frame_bytes);
        let samples = std::iter::from_fn(|| Some(i16::from_le_bytes([bytes.next()?, bytes.next()?])))
            .collect();
        Some(Frame::new(samples))
    }

    /// Number of bytes currently buffered
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Copy of the buffered bytes (always less than one frame after draining)
    #[must_use]
    pub fn buffered(&self) -> Vec<u8> {
        self.buffer.iter().copied().collect()
    }

    /// Samples per frame
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Consume the assembler at end of stream, returning the leftover bytes
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the stream ended mid-sample
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.buffer.len() % BYTES_PER_SAMPLE != 0 {
            return Err(Error::MalformedInput(format!(
                "stream ended with {} buffered bytes, not a whole number of samples",
                self.buffer.len()
            )));
        }
        Ok(self.buffer.into())
    }

    const fn frame_bytes(&self) -> usize {
        self.frame_size * BYTES_PER_SAMPLE
    }
}

/// Lazy sequence of frames completed by one [`FrameAssembler::push`]
#[derive(Debug)]
pub struct Frames<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.assembler.next_frame()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.assembler.buffer.len() / self.assembler.frame_bytes();
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_exact_frame() {
        let mut assembler = FrameAssembler::new(4);
        let frames: Vec<Frame> = assembler.push(&pcm(&[1, -2, 3, -4])).collect();

        assert_eq!(frames, vec![Frame::new(vec![1, -2, 3, -4])]);
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_short_chunk_is_buffered() {
        let mut assembler = FrameAssembler::new(4);
        assert_eq!(assembler.push(&pcm(&[1, 2, 3])).count(), 0);
        assert_eq!(assembler.buffered_len(), 6);

        let frames: Vec<Frame> = assembler.push(&pcm(&[4, 5])).collect();
        assert_eq!(frames, vec![Frame::new(vec![1, 2, 3, 4])]);
        assert_eq!(assembler.buffered(), pcm(&[5]));
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut assembler = FrameAssembler::new(2);
        let frames: Vec<Frame> = assembler.push(&pcm(&[1, 2, 3, 4, 5, 6, 7])).collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].samples(), &[5, 6]);
        assert_eq!(assembler.buffered(), pcm(&[7]));
    }

    #[test]
    fn test_odd_byte_waits_for_its_pair() {
        let mut assembler = FrameAssembler::new(2);
        let bytes = pcm(&[0x0102, 0x0304]);

        assert_eq!(assembler.push(&bytes[..3]).count(), 0);
        let frames: Vec<Frame> = assembler.push(&bytes[3..]).collect();

        assert_eq!(frames, vec![Frame::new(vec![0x0102, 0x0304])]);
    }

    #[test]
    fn test_finish_reports_dangling_byte() {
        let mut assembler = FrameAssembler::new(4);
        assert_eq!(assembler.push(&[1, 2, 3]).count(), 0);
        assert!(matches!(assembler.finish(), Err(Error::MalformedInput(_))));

        let mut assembler = FrameAssembler::new(4);
        assert_eq!(assembler.push(&[1, 2]).count(), 0);
        assert_eq!(assembler.finish().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_undrained_frames_stay_buffered() {
        let mut assembler = FrameAssembler::new(1);
        let first = assembler.push(&pcm(&[9, 8])).next();

        assert_eq!(first, Some(Frame::new(vec![9])));
        assert_eq!(assembler.buffered(), pcm(&[8]));
    }

    #[test]
    fn test_no_sample_lost_across_arbitrary_chunking() {
        let samples: Vec<i16> = (0..1000).map(|i| (i * 37 % 2000 - 1000) as i16).collect();
        let bytes = pcm(&samples);

        for frame_size in [1, 7, 64, 160] {
            for chunk_len in [1, 3, 5, 128, 333] {
                let mut assembler = FrameAssembler::new(frame_size);
                let mut out = Vec::new();
                for chunk in bytes.chunks(chunk_len) {
                    for frame in assembler.push(chunk) {
                        assert_eq!(frame.len(), frame_size);
                        out.extend(frame.to_le_bytes());
                    }
                    assert!(assembler.buffered_len() < frame_size * BYTES_PER_SAMPLE);
                }
                out.extend(assembler.buffered());
                assert_eq!(out, bytes, "frame_size={frame_size} chunk_len={chunk_len}");
            }
        }
    }

    #[test]
    fn test_large_chunk_drains_in_order() {
        // One 10 MiB message worth of 1280-sample frames plus a partial frame
        let frame_size = 1280;
        let frames_in_chunk = 4096;
        let mut samples: Vec<i16> = (0..frame_size * frames_in_chunk).map(|i| (i % 32_000) as i16).collect();
        samples.extend([1, 2, 3]);
        let bytes = pcm(&samples);

        let mut assembler = FrameAssembler::new(frame_size);
        let mut count = 0;
        for (i, frame) in assembler.push(&bytes).enumerate() {
            assert_eq!(frame.len(), frame_size);
            assert_eq!(frame.samples()[0], (i * frame_size % 32_000) as i16);
            count += 1;
        }

        assert_eq!(count, frames_in_chunk);
        assert_eq!(assembler.buffered(), pcm(&[1, 2, 3]));
    }

    #[test]
    fn test_peak() {
        assert_eq!(Frame::new(vec![0, 0]).peak(), 0);
        assert_eq!(Frame::new(vec![3, -7, 5]).peak(), 7);
        assert_eq!(Frame::new(vec![i16::MIN]).peak(), 32768);
    }
}
