//! Linear-interpolation sample rate converter
//!
//! Converts one tick's batch of interleaved stereo frames from the core's
//! native rate to the device rate. Source addressing is batch-local: every
//! batch starts at read position 0, so no phase is carried between ticks.

use super::CHANNELS;
use crate::{PipelineError, Result};

/// Resampling diagnostics since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResamplerStats {
    /// Non-empty batches converted
    pub batches: u64,
    /// Native-rate frames consumed
    pub frames_in: u64,
    /// Output-rate frames produced
    pub frames_out: u64,
}

/// Stereo linear-interpolation resampler
#[derive(Debug, Clone)]
pub struct SampleRateConverter {
    native_rate: u32,
    output_rate: u32,
    /// Source frames advanced per output frame (native / output)
    step: f64,
    stats: ResamplerStats,
}

impl SampleRateConverter {
    /// Create a converter from `native_rate` to `output_rate` (both in Hz)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either rate is zero.
    pub fn new(native_rate: u32, output_rate: u32) -> Result<Self> {
        if output_rate == 0 {
            return Err(PipelineError::ConfigError(
                "Output sample rate must be greater than 0".into(),
            ));
        }
        if native_rate == 0 {
            return Err(PipelineError::ConfigError(
                "Native sample rate must be greater than 0".into(),
            ));
        }

        Ok(SampleRateConverter {
            native_rate,
            output_rate,
            step: native_rate as f64 / output_rate as f64,
            stats: ResamplerStats::default(),
        })
    }

    /// Number of output frames produced for `input_frames` native frames.
    ///
    /// round-half-up of `input_frames * output / native`, at least 1 for a
    /// non-empty batch and 0 for an empty one.
    pub fn output_len(&self, input_frames: usize) -> usize {
        if input_frames == 0 {
            return 0;
        }
        let native = self.native_rate as u128;
        let scaled = input_frames as u128 * self.output_rate as u128;
        let rounded = (2 * scaled + native) / (2 * native);
        (rounded as usize).max(1)
    }

    /// Resample an interleaved stereo batch.
    ///
    /// A trailing odd sample (half a frame) is ignored.
    pub fn resample(&mut self, batch: &[i16]) -> Vec<i16> {
        let mut output = Vec::new();
        self.resample_into(batch, &mut output);
        output
    }

    /// Resample an interleaved stereo batch, appending to `output`
    pub fn resample_into(&mut self, batch: &[i16], output: &mut Vec<i16>) {
        let input_frames = batch.len() / CHANNELS;
        let output_frames = self.output_len(input_frames);
        if output_frames == 0 {
            return;
        }

        let last = input_frames - 1;
        output.reserve(output_frames * CHANNELS);

        for k in 0..output_frames {
            let pos = k as f64 * self.step;
            let i = (pos.floor() as usize).min(last);
            let next = (i + 1).min(last);
            // A single-frame batch holds its only sample
            let frac = if input_frames == 1 { 0.0 } else { pos - i as f64 };

            for ch in 0..CHANNELS {
                let a = batch[i * CHANNELS + ch] as f64;
                let b = batch[next * CHANNELS + ch] as f64;
                let value = a + (b - a) * frac;
                output.push(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            }
        }

        self.stats.batches += 1;
        self.stats.frames_in += input_frames as u64;
        self.stats.frames_out += output_frames as u64;
    }

    /// Native-to-output rate ratio
    pub fn ratio(&self) -> f64 {
        self.step
    }

    /// Native (input) rate in Hz
    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Output rate in Hz
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Conversion counters since the last reset
    pub fn stats(&self) -> ResamplerStats {
        self.stats
    }

    /// Restart from a new stream origin (session reset or reload)
    pub fn reset(&mut self) {
        self.stats = ResamplerStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NATIVE_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};

    fn vsmile() -> SampleRateConverter {
        SampleRateConverter::new(NATIVE_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap()
    }

    fn stereo_ramp(frames: usize) -> Vec<i16> {
        (0..frames)
            .flat_map(|i| [i as i16, -(i as i16)])
            .collect()
    }

    #[test]
    fn test_zero_rates_rejected() {
        assert!(matches!(
            SampleRateConverter::new(NATIVE_SAMPLE_RATE, 0),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(SampleRateConverter::new(0, OUTPUT_SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_empty_batch_yields_empty_output() {
        let mut rs = vsmile();
        assert!(rs.resample(&[]).is_empty());
        // Half a frame is still no frame
        assert!(rs.resample(&[42]).is_empty());
        assert_eq!(rs.stats().batches, 0);
    }

    #[test]
    fn test_pal_tick_length() {
        let mut rs = vsmile();
        // 5625 native frames per PAL tick -> exactly 960 output frames
        let out = rs.resample(&vec![0i16; 5625 * 2]);
        assert_eq!(out.len(), 960 * 2);
    }

    #[test]
    fn test_output_length_within_one_of_ideal() {
        let rs = vsmile();
        let ratio = OUTPUT_SAMPLE_RATE as f64 / NATIVE_SAMPLE_RATE as f64;
        for input in (1..20_000).step_by(7) {
            let ideal = (input as f64 * ratio).round() as i64;
            let actual = rs.output_len(input) as i64;
            assert!(
                (actual - ideal).abs() <= 1,
                "input {input}: got {actual}, ideal {ideal}"
            );
            assert!(actual >= 1);
        }
    }

    #[test]
    fn test_round_half_up() {
        // 1:2 downsampling makes the half case exact
        let rs = SampleRateConverter::new(2, 1).unwrap();
        assert_eq!(rs.output_len(1), 1); // 0.5 -> 1
        assert_eq!(rs.output_len(3), 2); // 1.5 -> 2
        assert_eq!(rs.output_len(4), 2);
    }

    #[test]
    fn test_single_frame_holds_sample() {
        let mut rs = SampleRateConverter::new(1, 4).unwrap();
        let out = rs.resample(&[1000, -1000]);
        assert_eq!(out, vec![1000, -1000, 1000, -1000, 1000, -1000, 1000, -1000]);
    }

    #[test]
    fn test_upsampling_interpolates_linearly() {
        let mut rs = SampleRateConverter::new(1, 2).unwrap();
        let out = rs.resample(&[0, 100, 100, 0]);
        // pos 0.0, 0.5, 1.0 (clamped), 1.5 (clamped)
        assert_eq!(out, vec![0, 100, 50, 50, 100, 0, 100, 0]);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut rs = vsmile();
        let out = rs.resample(&stereo_ramp(5625));
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], -frame[1]);
        }
        // Positions advance by ~5.86 source frames per output frame
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 6); // round(5.859375)
    }

    #[test]
    fn test_extremes_do_not_wrap() {
        let mut rs = SampleRateConverter::new(3, 7).unwrap();
        let batch = [i16::MAX, i16::MIN, i16::MAX, i16::MIN, i16::MIN, i16::MAX];
        let out = rs.resample(&batch);
        assert_eq!(out.len(), rs.output_len(3) * 2);
        assert_eq!(out[0], i16::MAX);
        assert_eq!(out[1], i16::MIN);
    }

    #[test]
    fn test_phase_restarts_each_batch() {
        let mut rs = vsmile();
        let batch = stereo_ramp(4687);
        let first = rs.resample(&batch);
        let second = rs.resample(&batch);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stats_and_reset() {
        let mut rs = vsmile();
        rs.resample(&vec![0; 5625 * 2]);
        rs.resample(&vec![0; 5625 * 2]);
        let stats = rs.stats();
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.frames_in, 11_250);
        assert_eq!(stats.frames_out, 1920);

        rs.reset();
        assert_eq!(rs.stats(), ResamplerStats::default());
    }
}
