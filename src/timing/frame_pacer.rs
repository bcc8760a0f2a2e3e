//! Frame pacing
//!
//! Paces the tick loop at the video standard's interval. Each iteration
//! records its start time, runs the tick body, then sleeps whatever is left
//! of the interval. A tick that overruns its budget is simply allowed to run
//! long: no catch-up ticks, no skipped frames.

use super::{StopSignal, VideoTiming, FPS_WINDOW};
use crate::Result;
use std::time::{Duration, Instant};

/// Whether an iteration actually advanced the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was produced
    Ticked,
    /// The body ran but the core did not advance (e.g. paused)
    Skipped,
    /// The session restarted this iteration; timing history starts over
    Restarted,
}

/// Realized-throughput counter over a one second window
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_count: u32,
    window_start: Instant,
    current_fps: f32,
}

impl FpsCounter {
    /// Create a counter whose first window opens at `now`
    pub fn new(now: Instant) -> Self {
        FpsCounter {
            frame_count: 0,
            window_start: now,
            current_fps: 0.0,
        }
    }

    /// Count one completed frame.
    ///
    /// Returns the new FPS figure when the window elapsed and was reset.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < FPS_WINDOW {
            return None;
        }

        self.current_fps = (self.frame_count as f64 / elapsed.as_secs_f64()) as f32;
        self.frame_count = 0;
        self.window_start = now;
        Some(self.current_fps)
    }

    /// FPS measured over the last completed window
    pub fn fps(&self) -> f32 {
        self.current_fps
    }

    /// Open a fresh window at `now`
    pub fn reset(&mut self, now: Instant) {
        *self = FpsCounter::new(now);
    }
}

/// Per-tick timing bookkeeping, owned by the tick thread
#[derive(Debug, Clone)]
pub struct FrameTimingState {
    /// Start of the tick currently in flight
    pub tick_start: Option<Instant>,
    /// Wall-clock budget per tick
    pub target_interval: Duration,
    /// Rolling FPS window
    pub fps: FpsCounter,
}

/// Pacing diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacerStats {
    /// Completed iterations that advanced the core
    pub ticks: u64,
    /// Iterations that exceeded the target interval
    pub overruns: u64,
    /// Total time spent sleeping
    pub total_sleep: Duration,
    /// Last realized FPS figure
    pub fps: f32,
}

/// Drives the tick loop at a fixed target interval
#[derive(Debug, Clone)]
pub struct FramePacer {
    state: FrameTimingState,
    stats: PacerStats,
}

impl FramePacer {
    /// Create a pacer for a video timing standard
    pub fn new(timing: VideoTiming) -> Self {
        Self::with_interval(timing.tick_interval())
    }

    /// Create a pacer with an explicit target interval
    pub fn with_interval(target_interval: Duration) -> Self {
        FramePacer {
            state: FrameTimingState {
                tick_start: None,
                target_interval,
                fps: FpsCounter::new(Instant::now()),
            },
            stats: PacerStats::default(),
        }
    }

    /// Remaining budget after a tick that took `elapsed`, if any
    pub fn remaining(target_interval: Duration, elapsed: Duration) -> Option<Duration> {
        target_interval
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    /// Target interval per tick
    pub fn target_interval(&self) -> Duration {
        self.state.target_interval
    }

    /// Retarget to another video standard. Only valid between sessions.
    pub fn set_timing(&mut self, timing: VideoTiming) {
        self.state.target_interval = timing.tick_interval();
    }

    /// Record the wall-clock start of a tick
    pub fn begin_tick(&mut self) -> Instant {
        let now = Instant::now();
        self.begin_tick_at(now);
        now
    }

    /// Record a tick start at a given instant
    pub fn begin_tick_at(&mut self, now: Instant) {
        self.state.tick_start = Some(now);
    }

    /// Close the current tick and compute how long to sleep
    pub fn end_tick(&mut self, outcome: TickOutcome) -> Option<Duration> {
        self.end_tick_at(Instant::now(), outcome)
    }

    /// Close the current tick at `now` and compute how long to sleep.
    ///
    /// Returns `None` when the tick used its whole budget (or more).
    pub fn end_tick_at(&mut self, now: Instant, outcome: TickOutcome) -> Option<Duration> {
        let start = self.state.tick_start.take()?;
        let elapsed = now.saturating_duration_since(start);

        if outcome == TickOutcome::Restarted {
            self.stats = PacerStats::default();
            self.state.fps.reset(now);
        }
        if outcome == TickOutcome::Ticked {
            self.stats.ticks += 1;
            if let Some(fps) = self.state.fps.record(now) {
                self.stats.fps = fps;
                log::trace!("Realized {fps:.2} FPS");
            }
        }

        let remaining = Self::remaining(self.state.target_interval, elapsed);
        if remaining.is_none() {
            self.stats.overruns += 1;
        }
        remaining
    }

    /// Run `tick` once per interval until `stop` is raised.
    ///
    /// The stop flag is checked only between iterations, so a tick in flight
    /// always completes. The first error returned by `tick` ends the loop and
    /// is propagated.
    pub fn run<F>(&mut self, stop: &StopSignal, mut tick: F) -> Result<()>
    where
        F: FnMut() -> Result<TickOutcome>,
    {
        while !stop.is_stopped() {
            self.begin_tick();
            let outcome = tick()?;

            if let Some(remaining) = self.end_tick(outcome) {
                self.stats.total_sleep += remaining;
                if stop.sleep(remaining) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// FPS measured over the last completed window
    pub fn fps(&self) -> f32 {
        self.state.fps.fps()
    }

    /// Pacing diagnostics
    pub fn stats(&self) -> PacerStats {
        self.stats
    }

    /// Forget timing history (session restart)
    pub fn reset(&mut self) {
        self.state.tick_start = None;
        self.state.fps.reset(Instant::now());
        self.stats = PacerStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_remaining_budget() {
        let target = Duration::from_millis(20);
        assert_eq!(
            FramePacer::remaining(target, Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
        assert_eq!(FramePacer::remaining(target, Duration::from_millis(20)), None);
        assert_eq!(FramePacer::remaining(target, Duration::from_millis(35)), None);
    }

    #[test]
    fn test_end_tick_without_begin() {
        let mut pacer = FramePacer::new(VideoTiming::Pal);
        assert_eq!(pacer.end_tick(TickOutcome::Ticked), None);
        assert_eq!(pacer.stats().ticks, 0);
    }

    #[test]
    fn test_overrun_is_counted_not_compensated() {
        let mut pacer = FramePacer::new(VideoTiming::Pal);
        let start = Instant::now();

        pacer.begin_tick_at(start);
        let sleep = pacer.end_tick_at(start + Duration::from_millis(30), TickOutcome::Ticked);
        assert_eq!(sleep, None);

        // The following tick still gets its full budget, not a shortened one
        let next = start + Duration::from_millis(30);
        pacer.begin_tick_at(next);
        let sleep = pacer.end_tick_at(next + Duration::from_millis(2), TickOutcome::Ticked);
        assert_eq!(sleep, Some(Duration::from_millis(18)));

        let stats = pacer.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.overruns, 1);
    }

    #[test]
    fn test_skipped_ticks_do_not_count() {
        let mut pacer = FramePacer::new(VideoTiming::Ntsc);
        let start = Instant::now();
        pacer.begin_tick_at(start);
        assert!(pacer
            .end_tick_at(start + Duration::from_millis(1), TickOutcome::Skipped)
            .is_some());
        assert_eq!(pacer.stats().ticks, 0);
    }

    #[test]
    fn test_restarted_iteration_clears_history() {
        let mut pacer = FramePacer::new(VideoTiming::Pal);
        let start = Instant::now();
        for i in 0..3 {
            let at = start + Duration::from_millis(20 * i);
            pacer.begin_tick_at(at);
            pacer.end_tick_at(at + Duration::from_millis(25), TickOutcome::Ticked);
        }
        assert_eq!(pacer.stats().ticks, 3);
        assert_eq!(pacer.stats().overruns, 3);

        let at = start + Duration::from_millis(60);
        pacer.begin_tick_at(at);
        let sleep = pacer.end_tick_at(at + Duration::from_millis(1), TickOutcome::Restarted);
        assert_eq!(sleep, Some(Duration::from_millis(19)));
        assert_eq!(pacer.stats(), PacerStats::default());
    }

    #[test]
    fn test_fps_counter_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);

        for i in 1..50 {
            assert_eq!(counter.record(start + Duration::from_millis(20 * i)), None);
        }
        let fps = counter.record(start + Duration::from_millis(1000)).unwrap();
        assert_relative_eq!(fps, 50.0, epsilon = 0.01);
        assert_relative_eq!(counter.fps(), 50.0, epsilon = 0.01);

        // Window restarted
        assert_eq!(counter.record(start + Duration::from_millis(1020)), None);
    }

    #[test]
    fn test_run_sleeps_target_interval_for_free_ticks() {
        let target = Duration::from_millis(10);
        let mut pacer = FramePacer::with_interval(target);
        let stop = StopSignal::new();
        let mut count = 0;

        let start = Instant::now();
        pacer
            .run(&stop, || {
                count += 1;
                if count == 6 {
                    stop.stop();
                }
                Ok(TickOutcome::Ticked)
            })
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(count, 6);
        // Five full sleeps between six ticks
        assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
        assert_eq!(pacer.stats().overruns, 0);
    }

    #[test]
    fn test_run_never_sleeps_for_slow_ticks() {
        let mut pacer = FramePacer::with_interval(Duration::from_millis(2));
        let stop = StopSignal::new();
        let mut count = 0;

        pacer
            .run(&stop, || {
                std::thread::sleep(Duration::from_millis(5));
                count += 1;
                if count == 4 {
                    stop.stop();
                }
                Ok(TickOutcome::Ticked)
            })
            .unwrap();

        let stats = pacer.stats();
        assert_eq!(count, 4);
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.overruns, 4);
        assert_eq!(stats.total_sleep, Duration::ZERO);
    }

    #[test]
    fn test_run_propagates_tick_error() {
        let mut pacer = FramePacer::with_interval(Duration::from_millis(1));
        let stop = StopSignal::new();
        let mut count = 0;

        let result = pacer.run(&stop, || {
            count += 1;
            if count == 3 {
                return Err(crate::PipelineError::CoreError("bus fault".into()));
            }
            Ok(TickOutcome::Ticked)
        });

        assert!(matches!(result, Err(crate::PipelineError::CoreError(_))));
        assert_eq!(count, 3);
    }

    #[test]
    fn test_set_timing() {
        let mut pacer = FramePacer::new(VideoTiming::Pal);
        assert_eq!(pacer.target_interval(), Duration::from_millis(20));
        pacer.set_timing(VideoTiming::Ntsc);
        assert_eq!(pacer.target_interval(), VideoTiming::Ntsc.tick_interval());
    }
}
