//! Test-pattern core
//!
//! Produces SMPTE-style colour bars and a sine tone at the native sample
//! rate, spreading fractional samples-per-tick across ticks the way the real
//! core's SPU does (4687/4688 alternating for NTSC, a steady 5625 for PAL).
//! Used by the demo binary and the integration tests.

use super::{CoreFrame, EmulationCore, SampleEncoding};
use crate::audio::{CHANNELS, NATIVE_SAMPLE_RATE};
use crate::input::ControllerState;
use crate::timing::VideoTiming;
use crate::video::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_PIXELS, TRANSPARENT_BIT};
use crate::{PipelineError, Result};
use std::f64::consts::TAU;

/// Bar colours in RGB555: white, yellow, cyan, green, magenta, red, blue, black
const BARS: [u16; 8] = [
    0x7FFF, 0x7FE0, 0x03FF, 0x03E0, 0x7C1F, 0x7C00, 0x001F, 0x0000,
];

/// Base tone frequency in Hz
const TONE_HZ: f64 = 440.0;

/// Tone amplitude (about −12 dBFS)
const TONE_AMPLITUDE: f64 = 8192.0;

/// Colour-bar and sine-tone core
#[derive(Debug, Clone)]
pub struct SyntheticCore {
    loaded: bool,
    timing: VideoTiming,
    native_rate: u32,
    encoding: SampleEncoding,
    picture: Vec<u16>,
    audio: Vec<i16>,
    /// Fractional samples carried between ticks, in units of 1/frame_rate
    sample_remainder: u64,
    phase: f64,
    frame_count: u64,
    input: ControllerState,
    power: bool,
    fail_at: Option<u64>,
    silent: bool,
}

impl Default for SyntheticCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticCore {
    /// Unloaded core at the V.Smile native rate
    pub fn new() -> Self {
        SyntheticCore {
            loaded: false,
            timing: VideoTiming::default(),
            native_rate: NATIVE_SAMPLE_RATE,
            encoding: SampleEncoding::Signed,
            picture: vec![0; FRAME_PIXELS],
            audio: Vec::new(),
            sample_remainder: 0,
            phase: 0.0,
            frame_count: 0,
            input: ControllerState::NEUTRAL,
            power: false,
            fail_at: None,
            silent: false,
        }
    }

    /// Emit audio in the given encoding
    pub fn with_encoding(mut self, encoding: SampleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Fail with `CoreError` on the given frame (0-based)
    pub fn fail_at_frame(mut self, frame: u64) -> Self {
        self.fail_at = Some(frame);
        self
    }

    /// Return empty audio batches
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// True once a ROM has been loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Frames run since the last reset
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Last controller state latched by `update_input`
    pub fn input(&self) -> ControllerState {
        self.input
    }

    /// Power button state
    pub fn power_pressed(&self) -> bool {
        self.power
    }

    /// Video standard chosen at load
    pub fn timing(&self) -> VideoTiming {
        self.timing
    }

    /// Native samples owed to this tick
    fn next_batch_frames(&mut self) -> usize {
        let rate = self.timing.frame_rate() as u64;
        let total = self.sample_remainder + self.native_rate as u64;
        self.sample_remainder = total % rate;
        (total / rate) as usize
    }

    fn render_picture(&mut self) {
        let bar_width = DISPLAY_WIDTH / BARS.len();
        // A transparent scan line scrolls down the bars
        let marker = (self.frame_count as usize) % DISPLAY_HEIGHT;

        for (y, row) in self.picture.chunks_exact_mut(DISPLAY_WIDTH).enumerate() {
            for (x, px) in row.iter_mut().enumerate() {
                *px = if y == marker {
                    TRANSPARENT_BIT
                } else {
                    BARS[(x / bar_width).min(BARS.len() - 1)]
                };
            }
        }
    }

    fn render_audio(&mut self) {
        let frames = self.next_batch_frames();
        self.audio.clear();
        if self.silent {
            return;
        }

        // Each held button raises the tone a semitone
        let semitones = self.input.buttons.bits().count_ones() as f64;
        let increment = TAU * TONE_HZ * 2f64.powf(semitones / 12.0) / self.native_rate as f64;

        self.audio.reserve(frames * CHANNELS);
        for _ in 0..frames {
            let value = (self.phase.sin() * TONE_AMPLITUDE) as i16;
            let sample = match self.encoding {
                SampleEncoding::Signed => value,
                SampleEncoding::Unsigned => value ^ i16::MIN,
            };
            self.audio.push(sample);
            self.audio.push(sample);
            self.phase = (self.phase + increment) % TAU;
        }
    }
}

impl EmulationCore for SyntheticCore {
    fn load(&mut self, _bios: Option<&[u8]>, rom: &[u8], timing: VideoTiming) -> Result<()> {
        if rom.is_empty() {
            return Err(PipelineError::RomError("Cartridge ROM is empty".into()));
        }
        self.timing = timing;
        self.loaded = true;
        self.reset();
        log::debug!("Synthetic core loaded ({} byte ROM, {timing})", rom.len());
        Ok(())
    }

    fn reset(&mut self) {
        self.sample_remainder = 0;
        self.phase = 0.0;
        self.frame_count = 0;
        self.input = ControllerState::NEUTRAL;
    }

    fn update_input(&mut self, state: &ControllerState) {
        self.input = *state;
    }

    fn run_frame(&mut self) -> Result<CoreFrame<'_>> {
        if !self.loaded {
            return Err(PipelineError::NotInitialized);
        }
        if self.fail_at == Some(self.frame_count) {
            return Err(PipelineError::CoreError(format!(
                "Synthetic failure at frame {}",
                self.frame_count
            )));
        }

        self.render_picture();
        self.render_audio();
        self.frame_count += 1;

        Ok(CoreFrame {
            picture: &self.picture,
            audio: &self.audio,
        })
    }

    fn set_power_button(&mut self, pressed: bool) {
        self.power = pressed;
    }

    fn audio_encoding(&self) -> SampleEncoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(timing: VideoTiming) -> SyntheticCore {
        let mut core = SyntheticCore::new();
        core.load(None, &[0xAA; 16], timing).unwrap();
        core
    }

    #[test]
    fn test_not_initialized_before_load() {
        let mut core = SyntheticCore::new();
        assert!(matches!(core.run_frame(), Err(PipelineError::NotInitialized)));
    }

    #[test]
    fn test_empty_rom_rejected() {
        let mut core = SyntheticCore::new();
        assert!(matches!(
            core.load(None, &[], VideoTiming::Pal),
            Err(PipelineError::RomError(_))
        ));
        assert!(!core.is_loaded());
    }

    #[test]
    fn test_pal_batches_are_steady() {
        let mut core = loaded(VideoTiming::Pal);
        for _ in 0..5 {
            let frame = core.run_frame().unwrap();
            assert_eq!(frame.picture.len(), FRAME_PIXELS);
            assert_eq!(frame.audio_frames(), 5625);
        }
    }

    #[test]
    fn test_ntsc_batches_alternate() {
        let mut core = loaded(VideoTiming::Ntsc);
        let sizes: Vec<usize> = (0..4)
            .map(|_| core.run_frame().unwrap().audio_frames())
            .collect();
        assert_eq!(sizes, vec![4687, 4688, 4687, 4688]);
    }

    #[test]
    fn test_unsigned_encoding_is_offset_binary() {
        let mut signed = loaded(VideoTiming::Pal);
        let mut unsigned = loaded(VideoTiming::Pal).with_encoding(SampleEncoding::Unsigned);
        let a = signed.run_frame().unwrap().audio.to_vec();
        let b = unsigned.run_frame().unwrap().audio.to_vec();
        assert_eq!(a.len(), b.len());
        for (s, u) in a.iter().zip(&b) {
            assert_eq!(*s, u ^ i16::MIN);
        }
        // Silence at the start of the sine sits at 0x8000
        assert_eq!(b[0] as u16, 0x8000);
    }

    #[test]
    fn test_scheduled_failure() {
        let mut core = loaded(VideoTiming::Pal).fail_at_frame(2);
        assert!(core.run_frame().is_ok());
        assert!(core.run_frame().is_ok());
        assert!(matches!(core.run_frame(), Err(PipelineError::CoreError(_))));
    }

    #[test]
    fn test_marker_line_is_transparent() {
        let mut core = loaded(VideoTiming::Pal);
        let frame = core.run_frame().unwrap();
        assert!(frame.picture[..DISPLAY_WIDTH]
            .iter()
            .all(|&px| px & TRANSPARENT_BIT != 0));
        assert_eq!(frame.picture[DISPLAY_WIDTH], BARS[0]);
    }

    #[test]
    fn test_reset_restarts_sample_schedule() {
        let mut core = loaded(VideoTiming::Ntsc);
        core.run_frame().unwrap();
        core.reset();
        assert_eq!(core.frame_count(), 0);
        assert_eq!(core.run_frame().unwrap().audio_frames(), 4687);
    }
}
