//! Fixed-size playback chunk assembly
//!
//! Resampled output arrives in per-tick batches whose length wobbles by a
//! frame or so. The assembler stitches batches together and slices off
//! chunks of exactly one tick's audio budget, carrying the sub-chunk
//! remainder into the next call.

use super::CHANNELS;
use crate::{PipelineError, Result};
use std::sync::Arc;

/// One tick's worth of interleaved stereo output samples. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackChunk {
    samples: Arc<[i16]>,
}

impl PlaybackChunk {
    /// Wrap a block of interleaved samples
    pub fn new(samples: impl Into<Arc<[i16]>>) -> Self {
        PlaybackChunk {
            samples: samples.into(),
        }
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// Number of individual samples (frames × channels)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True for a zero-length chunk
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Accumulates output-rate samples into fixed-size playback chunks
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    /// Chunk size in samples (frames × channels)
    chunk_samples: usize,
    /// Samples carried over from previous calls, always < one chunk after a call
    leftover: Vec<i16>,
}

impl ChunkAssembler {
    /// Create an assembler emitting chunks of `frames_per_chunk` stereo frames
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a zero chunk size.
    pub fn new(frames_per_chunk: usize) -> Result<Self> {
        let chunk_samples = Self::validate(frames_per_chunk)?;
        Ok(ChunkAssembler {
            chunk_samples,
            leftover: Vec::with_capacity(chunk_samples),
        })
    }

    fn validate(frames_per_chunk: usize) -> Result<usize> {
        if frames_per_chunk == 0 {
            return Err(PipelineError::ConfigError(
                "Chunk size must be greater than 0 frames".into(),
            ));
        }
        Ok(frames_per_chunk * CHANNELS)
    }

    /// Append `resampled` to the carry-over and slice off every full chunk.
    ///
    /// Emitted samples plus the new leftover always equal the old leftover
    /// plus `resampled`. An empty input emits nothing.
    pub fn produce_chunks(&mut self, resampled: &[i16]) -> Vec<PlaybackChunk> {
        if self.leftover.is_empty() {
            return self.slice_chunks(resampled);
        }

        let mut pending = std::mem::take(&mut self.leftover);
        pending.extend_from_slice(resampled);
        self.slice_chunks(&pending)
    }

    /// Cut `samples` into full chunks; the remainder becomes the leftover.
    /// Callers must have emptied the leftover first.
    fn slice_chunks(&mut self, samples: &[i16]) -> Vec<PlaybackChunk> {
        let mut blocks = samples.chunks_exact(self.chunk_samples);
        let chunks = blocks.by_ref().map(PlaybackChunk::new).collect();
        self.leftover.extend_from_slice(blocks.remainder());
        chunks
    }

    /// Change the chunk size for subsequent calls.
    ///
    /// The current leftover is not resized; the next `produce_chunks`
    /// concatenation absorbs it.
    pub fn update_chunk_size(&mut self, frames_per_chunk: usize) -> Result<()> {
        self.chunk_samples = Self::validate(frames_per_chunk)?;
        Ok(())
    }

    /// Drop carried samples so audio is never stitched across a stream restart
    pub fn reset(&mut self) {
        self.leftover.clear();
    }

    /// Chunk size in stereo frames
    pub fn chunk_frames(&self) -> usize {
        self.chunk_samples / CHANNELS
    }

    /// Chunk size in samples
    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Samples waiting for the next call
    pub fn leftover(&self) -> &[i16] {
        &self.leftover
    }
}
