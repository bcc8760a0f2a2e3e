//! One iteration of the pipeline
//!
//! ```text
//! input ─► core.run_frame ─┬─► RGB555→RGB565 ─► display
//!                          └─► decode ─► resample ─► chunk ─► playback queue
//! ```
//!
//! Everything here runs on the tick thread and never blocks: the only
//! hand-off is the non-blocking enqueue.

use crate::audio::{
    decode_offset_binary, ChunkAssembler, EnqueueResult, PlaybackQueue, ResamplerStats,
    SampleRateConverter,
};
use crate::config::PipelineConfig;
use crate::emulator::{EmulationCore, SampleEncoding};
use crate::input::InputAggregator;
use crate::timing::VideoTiming;
use crate::video::{convert_frame, VideoSink, FRAME_PIXELS};
use crate::{PipelineError, Result};

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Native frames the core produced
    pub native_frames: usize,
    /// Output frames after resampling
    pub output_frames: usize,
    /// Chunks accepted by the playback queue
    pub chunks_queued: usize,
    /// Chunks dropped because the queue was full
    pub chunks_dropped: usize,
    /// Whether a new controller state went to the core
    pub input_forwarded: bool,
}

/// Owns the per-session conversion state and runs ticks
#[derive(Debug)]
pub struct TickOrchestrator {
    resampler: SampleRateConverter,
    assembler: ChunkAssembler,
    output_sample_rate: u32,
    display: Vec<u16>,
    decoded: Vec<i16>,
    resampled: Vec<i16>,
}

impl TickOrchestrator {
    /// Build the conversion chain for a configuration
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(TickOrchestrator {
            resampler: SampleRateConverter::new(
                config.native_sample_rate,
                config.output_sample_rate,
            )?,
            assembler: ChunkAssembler::new(config.frames_per_tick())?,
            output_sample_rate: config.output_sample_rate,
            display: vec![0; FRAME_PIXELS],
            decoded: Vec::new(),
            resampled: Vec::new(),
        })
    }

    /// Run one tick: forward input, advance the core, present video, queue audio.
    ///
    /// # Errors
    ///
    /// Core failures propagate unchanged. A picture of the wrong size is
    /// reported as `CoreError`. A full queue is not an error.
    pub fn tick<C>(
        &mut self,
        core: &mut C,
        input: &InputAggregator,
        queue: &mut PlaybackQueue,
        video: &mut dyn VideoSink,
    ) -> Result<TickReport>
    where
        C: EmulationCore + ?Sized,
    {
        let mut report = TickReport::default();

        if let Some(pressed) = input.take_power() {
            core.set_power_button(pressed);
        }
        if let Some(state) = input.take_changed() {
            core.update_input(&state);
            report.input_forwarded = true;
        }

        let encoding = core.audio_encoding();
        let frame = core.run_frame()?;

        if frame.picture.len() != FRAME_PIXELS {
            return Err(PipelineError::CoreError(format!(
                "Core produced {} pixels, expected {FRAME_PIXELS}",
                frame.picture.len()
            )));
        }
        convert_frame(frame.picture, &mut self.display)?;
        video.present(&self.display);

        let audio: &[i16] = match encoding {
            SampleEncoding::Signed => frame.audio,
            SampleEncoding::Unsigned => {
                self.decoded.clear();
                self.decoded.extend_from_slice(frame.audio);
                decode_offset_binary(&mut self.decoded);
                &self.decoded
            }
        };
        report.native_frames = frame.audio_frames();

        self.resampled.clear();
        self.resampler.resample_into(audio, &mut self.resampled);
        report.output_frames = self.resampled.len() / crate::audio::CHANNELS;

        for chunk in self.assembler.produce_chunks(&self.resampled) {
            match queue.try_enqueue(chunk) {
                EnqueueResult::Queued => report.chunks_queued += 1,
                EnqueueResult::Dropped => report.chunks_dropped += 1,
                EnqueueResult::Closed => {}
            }
        }

        log::trace!(
            "Tick: {} native -> {} output frames, {} queued, {} dropped",
            report.native_frames,
            report.output_frames,
            report.chunks_queued,
            report.chunks_dropped
        );
        Ok(report)
    }

    /// Restart the audio stream from a new origin and size chunks for `timing`
    pub fn reset(&mut self, timing: VideoTiming) -> Result<()> {
        self.resampler.reset();
        self.assembler.reset();
        self.assembler
            .update_chunk_size(timing.frames_per_tick(self.output_sample_rate))
    }

    /// Last converted display frame
    pub fn display_frame(&self) -> &[u16] {
        &self.display
    }

    /// Chunk size in output frames
    pub fn chunk_frames(&self) -> usize {
        self.assembler.chunk_frames()
    }

    /// Output frames waiting for the next chunk
    pub fn pending_frames(&self) -> usize {
        self.assembler.leftover().len() / crate::audio::CHANNELS
    }

    /// Resampler counters since the last reset
    pub fn resampler_stats(&self) -> ResamplerStats {
        self.resampler.stats()
    }
}
