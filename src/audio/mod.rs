//! Audio path from the core's native sample stream to the output device
//!
//! Per tick the core hands over a variable-length batch of interleaved stereo
//! samples at its native rate. The batch is resampled to the output rate,
//! cut into fixed-size chunks worth one tick of playback each, and handed to
//! a bounded queue that a dedicated thread drains into the (blocking) sink.

pub mod chunker;
pub mod playback_queue;
pub mod resampler;
pub mod sink;

pub use chunker::{ChunkAssembler, PlaybackChunk};
pub use playback_queue::{ChunkChannel, EnqueueResult, PlaybackQueue, QueueStats};
pub use resampler::{ResamplerStats, SampleRateConverter};
#[cfg(feature = "streaming")]
pub use sink::DeviceSink;
pub use sink::{AudioSink, NullSink, SinkFactory};

/// Native SPU sample rate of the V.Smile core (27 MHz / 96)
pub const NATIVE_SAMPLE_RATE: u32 = 281_250;

/// Default device output rate
pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;

/// Interleaved stereo
pub const CHANNELS: usize = 2;

/// Default playback queue depth, in chunks (~80 ms at PAL)
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Sink backoff time in microseconds while the device buffer is full
pub const BUFFER_BACKOFF_MICROS: u64 = 500;

/// Convert unsigned (offset-binary) 16-bit samples to signed in place.
///
/// The SPU output is centred on 0x8000; flipping the sign bit recentres it on 0.
pub fn decode_offset_binary(samples: &mut [i16]) {
    for sample in samples.iter_mut() {
        *sample = ((*sample as u16) ^ 0x8000) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_binary_decoding() {
        let mut samples = [
            0x8000u16 as i16, // silence
            0xFFFFu16 as i16, // max
            0x0000,           // min
            0x8001u16 as i16,
        ];
        decode_offset_binary(&mut samples);
        assert_eq!(samples, [0, i16::MAX, i16::MIN, 1]);
    }

    #[test]
    fn test_native_rate_per_tick() {
        // 5625 native frames per PAL tick, 4687.5 per NTSC tick
        assert_eq!(NATIVE_SAMPLE_RATE % 50, 0);
        assert_eq!(NATIVE_SAMPLE_RATE / 50, 5625);
    }
}
