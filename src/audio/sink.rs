//! Audio sink boundary
//!
//! A sink consumes interleaved signed 16-bit stereo at the output rate with a
//! blocking write. Sinks are opened on the audio thread itself (device
//! handles are frequently not `Send`), so the pipeline passes around a
//! factory rather than a sink.

use crate::{PipelineError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chunk durations a blocking write may wait for the device before giving up
pub const STALL_TIMEOUT_CHUNKS: u32 = 8;

/// Blocking consumer of output-rate audio
pub trait AudioSink {
    /// Write one chunk of interleaved samples, blocking while the device
    /// buffer is full. Returns the number of stereo frames written.
    fn write(&mut self, samples: &[i16]) -> Result<usize>;
}

/// Opens a sink on the audio thread
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn AudioSink>> + Send + Sync>;

/// Sink that discards audio, optionally taking as long as a real device would
#[derive(Debug, Clone, Default)]
pub struct NullSink {
    /// Simulated device rate; `None` returns immediately
    sample_rate: Option<u32>,
    frames_written: u64,
}

impl NullSink {
    /// Discard audio immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard audio, blocking for the chunk's playback duration
    pub fn realtime(sample_rate: u32) -> Self {
        NullSink {
            sample_rate: Some(sample_rate),
            frames_written: 0,
        }
    }

    /// Factory for immediate null sinks
    pub fn factory() -> SinkFactory {
        Arc::new(|| -> Result<Box<dyn AudioSink>> { Ok(Box::new(NullSink::new())) })
    }

    /// Factory for device-paced null sinks
    pub fn realtime_factory(sample_rate: u32) -> SinkFactory {
        Arc::new(move || -> Result<Box<dyn AudioSink>> {
            Ok(Box::new(NullSink::realtime(sample_rate)))
        })
    }

    /// Total frames accepted
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioSink for NullSink {
    fn write(&mut self, samples: &[i16]) -> Result<usize> {
        let frames = samples.len() / super::CHANNELS;
        if let Some(rate) = self.sample_rate.filter(|&rate| rate > 0) {
            std::thread::sleep(Duration::from_secs_f64(frames as f64 / rate as f64));
        }
        self.frames_written += frames as u64;
        Ok(frames)
    }
}

/// Poll `has_room` every `backoff` until it reports space or `timeout` passes.
///
/// # Errors
///
/// `AudioDeviceError` when the device made no room in time.
#[cfg_attr(not(feature = "streaming"), allow(dead_code))]
pub(crate) fn wait_for_room(
    timeout: Duration,
    backoff: Duration,
    mut has_room: impl FnMut() -> bool,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !has_room() {
        if Instant::now() >= deadline {
            return Err(PipelineError::AudioDeviceError(format!(
                "Audio device stalled for {timeout:?}"
            )));
        }
        std::thread::sleep(backoff);
    }
    Ok(())
}

#[cfg(feature = "streaming")]
mod device {
    use super::{wait_for_room, AudioSink, SinkFactory, STALL_TIMEOUT_CHUNKS};
    use crate::audio::{BUFFER_BACKOFF_MICROS, CHANNELS};
    use crate::{PipelineError, Result};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};
    use std::sync::Arc;
    use std::time::Duration;

    /// Chunks rodio may hold before `write` blocks (~2 ticks of audio)
    const MAX_QUEUED_BUFFERS: usize = 2;

    /// System audio output through rodio
    pub struct DeviceSink {
        _stream: OutputStream,
        sink: Sink,
        sample_rate: u32,
    }

    impl DeviceSink {
        /// Open the default output device
        pub fn open(sample_rate: u32) -> Result<Self> {
            let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
                PipelineError::AudioDeviceError(format!("Failed to create audio stream: {e}"))
            })?;

            let sink = Sink::try_new(&stream_handle).map_err(|e| {
                PipelineError::AudioDeviceError(format!("Failed to create audio sink: {e}"))
            })?;

            log::info!("Audio device opened at {sample_rate} Hz");
            Ok(DeviceSink {
                _stream: stream,
                sink,
                sample_rate,
            })
        }

        /// Factory opening the default device on the audio thread
        pub fn factory(sample_rate: u32) -> SinkFactory {
            Arc::new(move || -> Result<Box<dyn AudioSink>> {
                Ok(Box::new(DeviceSink::open(sample_rate)?))
            })
        }
    }

    impl AudioSink for DeviceSink {
        fn write(&mut self, samples: &[i16]) -> Result<usize> {
            // Backpressure: wait for the device to play out queued buffers
            let frames = samples.len() / CHANNELS;
            let chunk = Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64);
            wait_for_room(
                chunk * STALL_TIMEOUT_CHUNKS,
                Duration::from_micros(BUFFER_BACKOFF_MICROS),
                || self.sink.len() < MAX_QUEUED_BUFFERS,
            )?;

            self.sink.append(SamplesBuffer::new(
                CHANNELS as u16,
                self.sample_rate,
                samples.to_vec(),
            ));
            Ok(frames)
        }
    }

    impl Drop for DeviceSink {
        fn drop(&mut self) {
            self.sink.stop();
        }
    }
}

#[cfg(feature = "streaming")]
pub use device::DeviceSink;
