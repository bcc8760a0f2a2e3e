//! Bounded hand-off from the tick loop to the audio thread
//!
//! The tick thread pushes chunks without ever blocking; when the queue is
//! full the chunk is dropped and counted. A dedicated thread pops chunks and
//! performs the blocking sink write, so device backpressure never reaches
//! emulation pacing.
//!
//! # Thread Safety
//! - One producer (tick loop) and one consumer (audio thread)
//! - Queue contents behind a `parking_lot::Mutex`, never held across a sink write
//! - Counters are atomics so diagnostics can be read from any thread

use super::sink::SinkFactory;
use super::{AudioSink, PlaybackChunk};
use crate::{PipelineError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Chunk accepted
    Queued,
    /// Queue full; chunk discarded and counted
    Dropped,
    /// Queue stopped (or audio disabled); chunk discarded, not counted
    Closed,
}

/// Queue diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Chunks accepted by the queue
    pub enqueued: u64,
    /// Chunks dropped because the queue was full
    pub dropped: u64,
    /// Chunks written to the sink
    pub chunks_written: u64,
    /// Stereo frames written to the sink
    pub frames_written: u64,
}

#[derive(Debug, Default)]
struct ChannelState {
    chunks: VecDeque<PlaybackChunk>,
    closed: bool,
}

/// Bounded single-producer/single-consumer chunk channel.
///
/// Non-blocking push, blocking pop. Once closed it cannot be reopened.
#[derive(Debug)]
pub struct ChunkChannel {
    state: Mutex<ChannelState>,
    ready: Condvar,
    capacity: usize,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    chunks_written: AtomicU64,
    frames_written: AtomicU64,
}

impl ChunkChannel {
    /// Create a channel holding at most `capacity` chunks
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::ConfigError(
                "Playback queue capacity must be greater than 0".into(),
            ));
        }

        Ok(ChunkChannel {
            state: Mutex::new(ChannelState {
                chunks: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
            capacity,
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            chunks_written: AtomicU64::new(0),
            frames_written: AtomicU64::new(0),
        })
    }

    /// Push a chunk without blocking
    pub fn try_push(&self, chunk: PlaybackChunk) -> EnqueueResult {
        let mut state = self.state.lock();
        if state.closed {
            return EnqueueResult::Closed;
        }
        if state.chunks.len() >= self.capacity {
            drop(state);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return EnqueueResult::Dropped;
        }

        state.chunks.push_back(chunk);
        drop(state);

        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.ready.notify_one();
        EnqueueResult::Queued
    }

    /// Pop the oldest chunk, blocking while the channel is empty and open.
    ///
    /// Returns `None` once the channel is closed and drained.
    pub fn pop_blocking(&self) -> Option<PlaybackChunk> {
        let mut state = self.state.lock();
        loop {
            if let Some(chunk) = state.chunks.pop_front() {
                return Some(chunk);
            }
            if state.closed {
                return None;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Refuse further pushes and wake the consumer so it can drain and exit
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    /// Has the channel been closed?
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Chunks currently queued
    pub fn len(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum queued chunks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn record_written(&self, frames: usize) {
        self.chunks_written.fetch_add(1, Ordering::Relaxed);
        self.frames_written
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            frames_written: self.frames_written.load(Ordering::Relaxed),
        }
    }
}

/// Drain `channel` into `sink` until it is closed and empty
fn run_consumer(channel: &ChunkChannel, sink: &mut dyn AudioSink) {
    while let Some(chunk) = channel.pop_blocking() {
        match sink.write(chunk.samples()) {
            Ok(frames) => channel.record_written(frames),
            Err(err) => {
                log::warn!("Audio sink write failed, disabling audio: {err}");
                channel.close();
                break;
            }
        }
    }
}

/// Playback queue plus the audio thread that drains it
#[derive(Debug)]
pub struct PlaybackQueue {
    capacity: usize,
    channel: Option<Arc<ChunkChannel>>,
    worker: Option<JoinHandle<()>>,
    drop_reported: bool,
}

impl PlaybackQueue {
    /// Create a stopped queue of `capacity` chunks
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::ConfigError(
                "Playback queue capacity must be greater than 0".into(),
            ));
        }

        Ok(PlaybackQueue {
            capacity,
            channel: None,
            worker: None,
            drop_reported: false,
        })
    }

    /// Open a sink on a fresh audio thread and start draining.
    ///
    /// Any previous run is stopped first; the channel and its counters are
    /// always recreated.
    ///
    /// # Errors
    ///
    /// Returns the sink factory's error (typically `AudioDeviceError`) if the
    /// device cannot be opened; the queue then stays closed.
    pub fn start(&mut self, open_sink: &SinkFactory) -> Result<()> {
        self.stop();

        let channel = Arc::new(ChunkChannel::new(self.capacity)?);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<()>>(1);

        let worker_channel = Arc::clone(&channel);
        let open_sink = Arc::clone(open_sink);
        let worker = std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let mut sink = match open_sink() {
                    Ok(sink) => sink,
                    Err(err) => {
                        worker_channel.close();
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run_consumer(&worker_channel, sink.as_mut());
                // Sink is released here, on the thread that opened it
            })?;

        let opened = ready_rx.recv().unwrap_or_else(|_| {
            Err(PipelineError::AudioDeviceError(
                "Audio thread exited during initialization".into(),
            ))
        });

        self.channel = Some(channel);
        self.drop_reported = false;
        if let Err(err) = opened {
            let _ = worker.join();
            return Err(err);
        }

        log::debug!("Playback queue started ({} chunks)", self.capacity);
        self.worker = Some(worker);
        Ok(())
    }

    /// Hand a chunk to the audio thread without blocking
    pub fn try_enqueue(&mut self, chunk: PlaybackChunk) -> EnqueueResult {
        let Some(channel) = &self.channel else {
            return EnqueueResult::Closed;
        };

        let result = channel.try_push(chunk);
        if result == EnqueueResult::Dropped && !self.drop_reported {
            log::warn!("Audio output falling behind, dropping chunks");
            self.drop_reported = true;
        }
        result
    }

    /// Close the queue, let the audio thread drain it, and release the sink.
    ///
    /// Counters stay readable until the next `start`.
    pub fn stop(&mut self) {
        let Some(channel) = &self.channel else {
            return;
        };
        channel.close();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Audio thread panicked during shutdown");
            }
            let stats = channel.stats();
            log::info!(
                "Playback stopped: {} chunks written, {} dropped",
                stats.chunks_written,
                stats.dropped
            );
        }
    }

    /// Is an audio thread currently draining the queue?
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Capacity in chunks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counters of the current (or last) run
    pub fn stats(&self) -> QueueStats {
        self.channel
            .as_ref()
            .map(|channel| channel.stats())
            .unwrap_or_default()
    }

    /// Chunks dropped in the current (or last) run
    pub fn dropped(&self) -> u64 {
        self.stats().dropped
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        self.stop();
    }
}
