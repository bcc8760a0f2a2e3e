//! Pipeline configuration
//!
//! Plain numeric parameters: the video standard, the two sample rates and the
//! playback queue depth. Loadable from JSON; missing fields take defaults.

use crate::audio::{CHANNELS, DEFAULT_QUEUE_CAPACITY, NATIVE_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
use crate::timing::VideoTiming;
use crate::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Video standard; fixes the tick rate and chunk size
    pub video_timing: VideoTiming,

    /// Core audio rate in Hz
    pub native_sample_rate: u32,

    /// Device audio rate in Hz
    pub output_sample_rate: u32,

    /// Playback queue depth in chunks.
    /// Deeper queues absorb more jitter at the cost of latency.
    pub queue_capacity: usize,
}

impl PipelineConfig {
    /// 50 Hz configuration, 960-frame chunks at 48 kHz
    pub fn pal() -> Self {
        PipelineConfig {
            video_timing: VideoTiming::Pal,
            native_sample_rate: NATIVE_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// 60 Hz configuration, 800-frame chunks at 48 kHz
    pub fn ntsc() -> Self {
        PipelineConfig {
            video_timing: VideoTiming::Ntsc,
            ..Self::pal()
        }
    }

    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.native_sample_rate == 0 {
            return Err(PipelineError::ConfigError(
                "native_sample_rate must be greater than 0".into(),
            ));
        }
        if self.output_sample_rate == 0 {
            return Err(PipelineError::ConfigError(
                "output_sample_rate must be greater than 0".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::ConfigError(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if self.frames_per_tick() == 0 {
            return Err(PipelineError::ConfigError(format!(
                "output_sample_rate {} is below the {} tick rate",
                self.output_sample_rate, self.video_timing
            )));
        }
        Ok(())
    }

    /// Output frames per tick (the chunk size)
    pub fn frames_per_tick(&self) -> usize {
        self.video_timing.frames_per_tick(self.output_sample_rate)
    }

    /// Interleaved samples per chunk
    pub fn samples_per_chunk(&self) -> usize {
        self.frames_per_tick() * CHANNELS
    }

    /// Audio latency budget of a full queue in milliseconds
    pub fn latency_ms(&self) -> f32 {
        let frames = (self.frames_per_tick() * self.queue_capacity) as f32;
        frames / self.output_sample_rate as f32 * 1000.0
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::pal()
    }
}
