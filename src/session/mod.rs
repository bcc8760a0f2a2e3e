//! Emulation session
//!
//! A [`Session`] owns one emulation core plus every piece of per-session
//! pipeline state (conversion chain, pacer, playback queue). The tick loop
//! runs on whichever thread calls [`Session::run`]; other threads steer it
//! through a cloneable [`SessionHandle`].
//!
//! # Lifecycle
//! - `new` → `start(bios, rom)` → `run` (blocks until stopped or the core fails)
//! - `pause`/`resume` skip ticks while keeping the loop paced
//! - `reset` restarts the core and the audio stream from a new origin; a
//!   running loop picks up `SessionHandle::reset` at its next iteration
//! - `stop` ends `run` after its current tick and releases the audio device
//! - a new video timing takes effect at the next `start`

pub mod orchestrator;
pub mod rom;

pub use orchestrator::{TickOrchestrator, TickReport};
pub use rom::{validate_images, MAX_CART_ROM_SIZE, SYSTEM_ROM_SIZE};

use crate::audio::{PlaybackQueue, QueueStats, ResamplerStats, SinkFactory};
use crate::config::PipelineConfig;
use crate::emulator::EmulationCore;
use crate::input::{InputAggregator, InputEvent};
use crate::timing::{FramePacer, PacerStats, StopSignal, TickOutcome, VideoTiming};
use crate::video::VideoSink;
use crate::{PipelineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// State shared between the tick thread and controllers
#[derive(Debug, Default)]
struct SessionShared {
    stop: StopSignal,
    paused: AtomicBool,
    reset_requested: AtomicBool,
    input: InputAggregator,
}

/// Cross-thread control of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Ask the tick loop to exit after its current iteration
    pub fn stop(&self) {
        self.shared.stop.stop();
    }

    /// Has a stop been requested?
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.is_stopped()
    }

    /// Sleep for at most `timeout`, waking early on a stop request.
    ///
    /// Returns true when the session is stopping.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        self.shared.stop.sleep(timeout)
    }

    /// Skip ticks until resumed
    pub fn pause(&self) {
        if !self.shared.paused.swap(true, Ordering::AcqRel) {
            log::info!("Session paused");
        }
    }

    /// Continue ticking
    pub fn resume(&self) {
        if self.shared.paused.swap(false, Ordering::AcqRel) {
            log::info!("Session resumed");
        }
    }

    /// Is the session paused?
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Ask the tick loop to reset the core and audio stream before its next tick
    pub fn reset(&self) {
        self.shared.reset_requested.store(true, Ordering::Release);
    }

    /// Is a reset waiting for the tick loop?
    pub fn reset_pending(&self) -> bool {
        self.shared.reset_requested.load(Ordering::Acquire)
    }

    /// Post an input event from a platform callback
    pub fn submit(&self, event: InputEvent) {
        self.shared.input.submit(event);
    }

    /// Press or release the console power (ON) button
    pub fn set_power_button(&self, pressed: bool) {
        self.shared.input.submit(InputEvent::Power { pressed });
    }

    /// The session's input aggregator
    pub fn input(&self) -> &InputAggregator {
        &self.shared.input
    }
}

/// One emulation session
pub struct Session<C: EmulationCore> {
    core: C,
    config: PipelineConfig,
    pending_timing: Option<VideoTiming>,
    orchestrator: TickOrchestrator,
    pacer: FramePacer,
    queue: PlaybackQueue,
    sink_factory: Option<SinkFactory>,
    shared: Arc<SessionShared>,
    loaded: bool,
}

impl<C: EmulationCore> Session<C> {
    /// Create an unloaded session with audio disabled
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(core: C, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Session {
            orchestrator: TickOrchestrator::new(&config)?,
            pacer: FramePacer::new(config.video_timing),
            queue: PlaybackQueue::new(config.queue_capacity)?,
            core,
            config,
            pending_timing: None,
            sink_factory: None,
            shared: Arc::new(SessionShared::default()),
            loaded: false,
        })
    }

    /// Play audio through sinks opened by `factory`
    pub fn with_audio(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = Some(factory);
        self
    }

    /// Load images into the core and prepare every pipeline stage.
    ///
    /// Audio device failures are logged and the session runs silent.
    ///
    /// # Errors
    ///
    /// `RomError` for rejected images, or whatever the core's `load` returns.
    /// The session is left unloaded.
    pub fn start(&mut self, bios: Option<&[u8]>, rom: &[u8]) -> Result<()> {
        self.queue.stop();
        self.loaded = false;

        let bios = rom::validate_images(bios, rom)?;
        if let Some(timing) = self.pending_timing.take() {
            self.config.video_timing = timing;
        }
        let timing = self.config.video_timing;

        self.core.load(bios, rom, timing)?;
        self.core.reset();
        self.orchestrator.reset(timing)?;
        self.pacer.set_timing(timing);
        self.pacer.reset();

        self.shared.input.reset_forwarded();
        self.shared.stop.clear();
        self.shared.paused.store(false, Ordering::Release);
        self.shared.reset_requested.store(false, Ordering::Release);

        self.start_audio();
        self.loaded = true;

        log::info!(
            "Session started: {timing}, {} byte ROM, {}",
            rom.len(),
            if bios.is_some() {
                "system ROM"
            } else {
                "built-in BIOS"
            }
        );
        Ok(())
    }

    fn start_audio(&mut self) {
        let Some(factory) = &self.sink_factory else {
            log::debug!("No audio sink configured, running silent");
            return;
        };

        if let Err(err) = self.queue.start(factory) {
            log::warn!("Audio unavailable, continuing without sound: {err}");
        }
    }

    /// Run the paced tick loop until stopped.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before `start`. A core failure tears the session down
    /// and is returned.
    pub fn run(&mut self, video: &mut dyn VideoSink) -> Result<()> {
        if !self.loaded {
            return Err(PipelineError::NotInitialized);
        }

        let shared = Arc::clone(&self.shared);
        let timing = self.config.video_timing;
        let Session {
            core,
            orchestrator,
            pacer,
            queue,
            ..
        } = self;

        let result = pacer.run(&shared.stop, || {
            if shared.reset_requested.swap(false, Ordering::AcqRel) {
                core.reset();
                orchestrator.reset(timing)?;
                shared.input.reset_forwarded();
                log::info!("Session reset");
                return Ok(TickOutcome::Restarted);
            }
            if shared.paused.load(Ordering::Acquire) {
                return Ok(TickOutcome::Skipped);
            }
            orchestrator.tick(&mut *core, &shared.input, &mut *queue, &mut *video)?;
            Ok(TickOutcome::Ticked)
        });

        match result {
            Ok(()) => {
                let stats = self.pacer.stats();
                log::info!(
                    "Session stopped after {} ticks ({} overruns)",
                    stats.ticks,
                    stats.overruns
                );
                self.queue.stop();
                Ok(())
            }
            Err(err) => {
                log::error!("Emulation failed, tearing down session: {err}");
                self.teardown();
                Err(err)
            }
        }
    }

    /// Run a single unpaced tick. Returns `None` while paused.
    pub fn step(&mut self, video: &mut dyn VideoSink) -> Result<Option<TickReport>> {
        if !self.loaded {
            return Err(PipelineError::NotInitialized);
        }
        if self.shared.reset_requested.load(Ordering::Acquire) {
            self.reset()?;
        }
        if self.is_paused() {
            return Ok(None);
        }

        match self
            .orchestrator
            .tick(&mut self.core, &self.shared.input, &mut self.queue, video)
        {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                log::error!("Emulation failed, tearing down session: {err}");
                self.teardown();
                Err(err)
            }
        }
    }

    fn teardown(&mut self) {
        self.shared.stop.stop();
        self.queue.stop();
        self.loaded = false;
    }

    /// Reset the core and restart the audio stream from a new origin.
    ///
    /// A stopped session is re-armed: the stop request is cleared and the
    /// audio thread reopened, so the next `run` ticks again.
    pub fn reset(&mut self) -> Result<()> {
        if !self.loaded {
            return Err(PipelineError::NotInitialized);
        }

        self.core.reset();
        self.orchestrator.reset(self.config.video_timing)?;
        self.pacer.reset();
        self.shared.input.reset_forwarded();
        self.shared.reset_requested.store(false, Ordering::Release);
        self.shared.stop.clear();
        if !self.queue.is_running() {
            self.start_audio();
        }

        if let Some(timing) = self.pending_timing {
            log::info!("Session reset; {timing} timing applies at next start");
        } else {
            log::info!("Session reset");
        }
        Ok(())
    }

    /// Select the video timing for the next `start`
    pub fn set_video_timing(&mut self, timing: VideoTiming) {
        if timing == self.config.video_timing {
            self.pending_timing = None;
        } else {
            self.pending_timing = Some(timing);
        }
    }

    /// Skip ticks until resumed
    pub fn pause(&self) {
        self.handle().pause();
    }

    /// Continue ticking
    pub fn resume(&self) {
        self.handle().resume();
    }

    /// Is the session paused?
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Stop ticking and release the audio device. `start` again to continue.
    pub fn stop(&mut self) {
        self.shared.stop.stop();
        self.queue.stop();
    }

    /// End the session, releasing the core and the audio device
    pub fn destroy(mut self) {
        self.teardown();
        log::info!("Session destroyed");
    }

    /// Cloneable control handle
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Post an input event
    pub fn submit_input(&self, event: InputEvent) {
        self.shared.input.submit(event);
    }

    /// Has a ROM been loaded successfully?
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Is the audio thread running?
    pub fn audio_enabled(&self) -> bool {
        self.queue.is_running()
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Video timing of the current session
    pub fn video_timing(&self) -> VideoTiming {
        self.config.video_timing
    }

    /// Timing selected for the next start, if different
    pub fn pending_video_timing(&self) -> Option<VideoTiming> {
        self.pending_timing
    }

    /// Chunk size in output frames
    pub fn chunk_frames(&self) -> usize {
        self.orchestrator.chunk_frames()
    }

    /// Output frames waiting for the next chunk
    pub fn pending_frames(&self) -> usize {
        self.orchestrator.pending_frames()
    }

    /// Realized FPS over the last window
    pub fn fps(&self) -> f32 {
        self.pacer.fps()
    }

    /// Pacing diagnostics
    pub fn pacer_stats(&self) -> PacerStats {
        self.pacer.stats()
    }

    /// Playback queue diagnostics
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Resampler diagnostics
    pub fn resampler_stats(&self) -> ResamplerStats {
        self.orchestrator.resampler_stats()
    }

    /// Last converted display frame
    pub fn display_frame(&self) -> &[u16] {
        self.orchestrator.display_frame()
    }

    /// The emulation core
    pub fn core(&self) -> &C {
        &self.core
    }

    /// The emulation core, mutably
    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }
}

impl<C: EmulationCore> Drop for Session<C> {
    fn drop(&mut self) {
        self.shared.stop.stop();
        self.queue.stop();
    }
}
