//! Emulation core boundary
//!
//! The pipeline treats the V.Smile core as an opaque tick function: feed it
//! controller state, run one frame, get back one native picture and one batch
//! of native-rate audio. Lifecycle calls (load, reset, power button) round
//! out the contract.

pub mod synthetic;

pub use synthetic::SyntheticCore;

use crate::input::ControllerState;
use crate::timing::VideoTiming;
use crate::Result;

/// How the core encodes its 16-bit audio samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleEncoding {
    /// Two's complement, silence at 0
    #[default]
    Signed,
    /// Offset binary, silence at 0x8000 (stored bit-for-bit in the `i16`)
    Unsigned,
}

/// Output of one core tick, borrowed from the core until the next call
#[derive(Debug, Clone, Copy)]
pub struct CoreFrame<'a> {
    /// 320×240 packed RGB555 words, bit 15 = transparent
    pub picture: &'a [u16],
    /// Interleaved stereo samples at the native rate; may be empty
    pub audio: &'a [i16],
}

impl CoreFrame<'_> {
    /// Number of stereo audio frames in this tick's batch
    pub fn audio_frames(&self) -> usize {
        self.audio.len() / crate::audio::CHANNELS
    }
}

/// A V.Smile emulation core
pub trait EmulationCore: Send {
    /// Load a cartridge and optional system ROM and configure the video standard.
    ///
    /// `bios` of `None` selects the core's built-in stand-in BIOS.
    fn load(&mut self, bios: Option<&[u8]>, rom: &[u8], timing: VideoTiming) -> Result<()>;

    /// Reset CPU and peripherals to their power-on state
    fn reset(&mut self);

    /// Latch the controller state seen by subsequent frames
    fn update_input(&mut self, state: &ControllerState);

    /// Run one video frame.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before a successful `load`, `CoreError` on emulation
    /// failure. Either is fatal to the session.
    fn run_frame(&mut self) -> Result<CoreFrame<'_>>;

    /// Console power (ON) button
    fn set_power_button(&mut self, _pressed: bool) {}

    /// Encoding of the samples in [`CoreFrame::audio`]
    fn audio_encoding(&self) -> SampleEncoding {
        SampleEncoding::Signed
    }
}
