//! Headless pipeline demo: runs the synthetic core through the full
//! tick/audio/video path and prints timing and queue statistics.

use anyhow::{bail, Context};
use std::env;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use vsmile_pipeline::audio::SinkFactory;
use vsmile_pipeline::emulator::SyntheticCore;
use vsmile_pipeline::input::{Buttons, InputEvent, InputSource};
use vsmile_pipeline::session::Session;
use vsmile_pipeline::video::VideoSink;
use vsmile_pipeline::{PipelineConfig, VideoTiming};

const DEFAULT_SECONDS: u64 = 5;

/// Stand-in cartridge for the synthetic core
const DEMO_ROM: &[u8] = b"VSMILE-PIPELINE-DEMO";

const USAGE: &str = "Usage:
  vsmile-pipeline [--pal|--ntsc] [--seconds N] [--config file.json] [--rom file.bin]

Flags:
  --pal                Run at 50 Hz (default)
  --ntsc               Run at 60 Hz
  --seconds N          Stop after N seconds (default 5)
  --config FILE        Load pipeline parameters from JSON
  --rom FILE           Cartridge image to validate and hand to the core
  -h, --help           Show this help

Set RUST_LOG=debug for pipeline detail.";

/// Display that only counts presented frames
#[derive(Default)]
struct FrameCounter {
    frames: u64,
}

impl VideoSink for FrameCounter {
    fn present(&mut self, _frame: &[u16]) {
        self.frames += 1;
    }
}

struct Options {
    timing: Option<VideoTiming>,
    seconds: u64,
    config_path: Option<String>,
    rom_path: Option<String>,
}

fn parse_args() -> anyhow::Result<Option<Options>> {
    let mut options = Options {
        timing: None,
        seconds: DEFAULT_SECONDS,
        config_path: None,
        rom_path: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pal" => options.timing = Some(VideoTiming::Pal),
            "--ntsc" => options.timing = Some(VideoTiming::Ntsc),
            "--seconds" => {
                let value = args.next().context("--seconds requires a value")?;
                options.seconds = value
                    .parse()
                    .with_context(|| format!("Invalid --seconds value: {value}"))?;
            }
            "--config" => {
                options.config_path = Some(args.next().context("--config requires a file")?);
            }
            "--rom" => {
                options.rom_path = Some(args.next().context("--rom requires a file")?);
            }
            "--help" | "-h" => return Ok(None),
            _ => bail!("Unknown argument: {arg}\n\n{USAGE}"),
        }
    }
    Ok(Some(options))
}

#[cfg(feature = "streaming")]
fn audio_factory(sample_rate: u32) -> SinkFactory {
    vsmile_pipeline::audio::DeviceSink::factory(sample_rate)
}

#[cfg(not(feature = "streaming"))]
fn audio_factory(sample_rate: u32) -> SinkFactory {
    log::info!("Built without \"streaming\"; audio goes to a device-paced null sink");
    vsmile_pipeline::audio::NullSink::realtime_factory(sample_rate)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(options) = parse_args()? else {
        println!("{USAGE}");
        return Ok(());
    };

    let mut config = match &options.config_path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config '{path}'"))?,
        None => PipelineConfig::default(),
    };
    if let Some(timing) = options.timing {
        config.video_timing = timing;
    }

    let rom = match &options.rom_path {
        Some(path) => fs::read(path).with_context(|| format!("Failed to read ROM '{path}'"))?,
        None => DEMO_ROM.to_vec(),
    };

    println!("V.Smile Pipeline Demo");
    println!("=====================\n");
    println!("Video timing:      {}", config.video_timing);
    println!("Tick interval:     {:?}", config.video_timing.tick_interval());
    println!(
        "Audio:             {} Hz -> {} Hz, {} frames per chunk",
        config.native_sample_rate,
        config.output_sample_rate,
        config.frames_per_tick()
    );
    println!(
        "Queue:             {} chunks ({:.1} ms)\n",
        config.queue_capacity,
        config.latency_ms()
    );

    let factory = audio_factory(config.output_sample_rate);
    let mut session = Session::new(SyntheticCore::new(), config)?.with_audio(factory);
    session.start(None, &rom)?;

    let handle = session.handle();
    let seconds = options.seconds;
    let controller = thread::spawn(move || {
        // Hold Enter through the middle of the run to exercise the input path.
        // A core failure raises stop, which ends the waits early.
        let third = Duration::from_millis(seconds * 1000 / 3);
        if handle.wait_for_stop(third) {
            return;
        }
        handle.submit(InputEvent::Button {
            source: InputSource::Virtual,
            button: Buttons::ENTER,
            pressed: true,
        });
        if handle.wait_for_stop(third) {
            return;
        }
        handle.submit(InputEvent::Disconnected(InputSource::Virtual));
        if !handle.wait_for_stop(third) {
            handle.stop();
        }
    });

    let started = Instant::now();
    let mut display = FrameCounter::default();
    let result = session.run(&mut display);
    let elapsed = started.elapsed();

    if controller.join().is_err() {
        log::warn!("Controller thread panicked");
    }
    result?;

    let pacer = session.pacer_stats();
    let queue = session.queue_stats();
    let resampler = session.resampler_stats();

    println!("\n=== Pipeline Statistics ===");
    println!("Duration:          {:.2} seconds", elapsed.as_secs_f32());
    println!("Frames presented:  {}", display.frames);
    println!("Realized FPS:      {:.2}", pacer.fps);
    println!("Tick overruns:     {}", pacer.overruns);
    println!(
        "Audio frames:      {} native -> {} output",
        resampler.frames_in, resampler.frames_out
    );
    println!(
        "Chunks:            {} queued, {} written, {} dropped",
        queue.enqueued, queue.chunks_written, queue.dropped
    );

    Ok(())
}
