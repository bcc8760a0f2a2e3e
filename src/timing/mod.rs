//! Video timing and frame pacing
//!
//! The console's video standard gates everything downstream: the tick
//! interval the loop is paced at, and how many output-rate audio frames one
//! tick is worth. Both are fixed for the lifetime of a session.

pub mod frame_pacer;
pub mod stop_signal;

pub use frame_pacer::{FpsCounter, FramePacer, FrameTimingState, PacerStats, TickOutcome};
pub use stop_signal::StopSignal;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// PAL field rate in Hz
pub const PAL_FRAME_RATE: u32 = 50;

/// NTSC field rate in Hz
pub const NTSC_FRAME_RATE: u32 = 60;

/// Window over which realized FPS is averaged
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Console video timing standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoTiming {
    /// 50 Hz, 20.000 ms per tick
    #[default]
    Pal,
    /// 60 Hz, 16.667 ms per tick
    Ntsc,
}

impl VideoTiming {
    /// Ticks per second
    pub const fn frame_rate(self) -> u32 {
        match self {
            VideoTiming::Pal => PAL_FRAME_RATE,
            VideoTiming::Ntsc => NTSC_FRAME_RATE,
        }
    }

    /// Wall-clock budget of one tick
    pub fn tick_interval(self) -> Duration {
        Duration::from_nanos(NANOS_PER_SEC / self.frame_rate() as u64)
    }

    /// Output-rate sample frames consumed by the device during one tick.
    ///
    /// 960 for PAL and 800 for NTSC at 48 kHz.
    pub fn frames_per_tick(self, output_sample_rate: u32) -> usize {
        (output_sample_rate / self.frame_rate()) as usize
    }

    /// Parse a timing name (`pal` / `ntsc`, case-insensitive)
    pub fn from_name(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pal" => Some(VideoTiming::Pal),
            "ntsc" => Some(VideoTiming::Ntsc),
            _ => None,
        }
    }

    /// Short display name
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoTiming::Pal => "PAL",
            VideoTiming::Ntsc => "NTSC",
        }
    }
}

impl fmt::Display for VideoTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pal_timing() {
        let timing = VideoTiming::Pal;
        assert_eq!(timing.frame_rate(), 50);
        assert_eq!(timing.tick_interval(), Duration::from_millis(20));
        assert_eq!(timing.frames_per_tick(48_000), 960);
    }

    #[test]
    fn test_ntsc_timing() {
        let timing = VideoTiming::Ntsc;
        assert_eq!(timing.frame_rate(), 60);
        assert_abs_diff_eq!(
            timing.tick_interval().as_secs_f64() * 1000.0,
            16.667,
            epsilon = 0.001
        );
        assert_eq!(timing.frames_per_tick(48_000), 800);
    }

    #[test]
    fn test_timing_names() {
        assert_eq!(VideoTiming::from_name("PAL"), Some(VideoTiming::Pal));
        assert_eq!(VideoTiming::from_name("ntsc"), Some(VideoTiming::Ntsc));
        assert_eq!(VideoTiming::from_name("secam"), None);
        assert_eq!(VideoTiming::Ntsc.to_string(), "NTSC");
    }

    #[test]
    fn test_timing_serde_names() {
        let json = serde_json::to_string(&VideoTiming::Ntsc).unwrap();
        assert_eq!(json, "\"ntsc\"");
        let parsed: VideoTiming = serde_json::from_str("\"pal\"").unwrap();
        assert_eq!(parsed, VideoTiming::Pal);
    }
}
