//! V.Smile tick/audio/video synchronization pipeline
//!
//! Bridges a fixed-rate emulation core to host audio and video output.
//! The core advances one tick per video frame (50 Hz PAL or 60 Hz NTSC) and
//! hands back one RGB555 picture plus a variable-length batch of stereo
//! samples at its native 281 250 Hz rate. This crate turns that into:
//!
//! - a display-ready RGB565 frame per tick
//! - fixed-size 48 kHz stereo chunks, one tick's worth each, handed to a
//!   bounded queue drained by a dedicated audio thread
//! - a tick loop paced against wall-clock time without catch-up
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output through rodio (`audio::DeviceSink`)
//!
//! # Quick start
//! ```no_run
//! use vsmile_pipeline::emulator::SyntheticCore;
//! use vsmile_pipeline::session::Session;
//! use vsmile_pipeline::video::NullDisplay;
//! use vsmile_pipeline::PipelineConfig;
//!
//! let config = PipelineConfig::pal();
//! let mut session = Session::new(SyntheticCore::new(), config).unwrap();
//! session.start(None, &[0u8; 1024]).unwrap();
//!
//! let handle = session.handle();
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(2));
//!     handle.stop();
//! });
//! session.run(&mut NullDisplay).unwrap();
//! ```

#![warn(missing_docs)]

pub mod audio; // Resampling, chunking & playback queue
pub mod config; // Numeric pipeline parameters
pub mod emulator; // Emulation core boundary
pub mod input; // Controller state aggregation
pub mod session; // Session lifecycle & tick orchestration
pub mod timing; // Video timing & frame pacing
pub mod video; // Pixel format conversion

/// Error types for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The emulation core failed while ticking
    #[error("Core error: {0}")]
    CoreError(String),

    /// The core was ticked before a ROM was loaded
    #[error("Core is not initialized")]
    NotInitialized,

    /// ROM or BIOS image rejected at session start
    #[error("ROM error: {0}")]
    RomError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PipelineError {
    /// Converts a String into `PipelineError::Other`.
    ///
    /// Prefer the specific variants (`CoreError`, `ConfigError`, ...) where the
    /// failure class is known; this conversion exists for ad hoc messages.
    fn from(msg: String) -> Self {
        PipelineError::Other(msg)
    }
}

impl From<&str> for PipelineError {
    /// Converts a string slice into `PipelineError::Other`.
    fn from(msg: &str) -> Self {
        PipelineError::Other(msg.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

// Public API exports
pub use audio::{ChunkAssembler, PlaybackChunk, PlaybackQueue, SampleRateConverter};
pub use config::PipelineConfig;
pub use emulator::{CoreFrame, EmulationCore, SampleEncoding};
pub use input::{combine, Buttons, ControllerState, InputAggregator, InputEvent, InputSource};
pub use session::{Session, SessionHandle, TickOrchestrator};
pub use timing::{FramePacer, StopSignal, VideoTiming};
pub use video::{convert_frame, convert_pixel};
