use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::frame_sink::{FrameSink, SinkControl};
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::face_finder::FaceFinder;
use crate::tracking::domain::frame_observation::FrameObservation;
use crate::tracking::domain::tracking_summary::TrackingSummary;
use crate::tracking::pipeline_executor::{PipelineConfig, PipelineExecutor};

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Runs tracking on dedicated threads.
///
/// Layout: `capture → finder → caller [sinks, progress, logging]`
///
/// Sinks stay on the calling thread because preview windows must be
/// driven from the thread that created them.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            channel_capacity: capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// True when either the caller or the run itself asked to stop.
#[derive(Clone)]
struct StopFlags {
    cancelled: Arc<AtomicBool>,
    halted: Arc<AtomicBool>,
}

impl StopFlags {
    fn should_stop(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.halted.load(Ordering::Relaxed)
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        mut source: Box<dyn FrameSource>,
        finder: FaceFinder,
        mut sinks: Vec<Box<dyn FrameSink>>,
        metadata: &SourceMetadata,
        mut config: PipelineConfig,
    ) -> Result<TrackingSummary, Box<dyn std::error::Error>> {
        if let Err(e) = open_sinks(&mut sinks, metadata) {
            source.close();
            return Err(e);
        }

        let stop = StopFlags {
            cancelled: config.cancelled.clone(),
            halted: Arc::new(AtomicBool::new(false)),
        };
        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (observed_tx, observed_rx) =
            crossbeam_channel::bounded::<Result<FrameObservation, SendError>>(cap);

        let capture_handle = spawn_capture(
            source,
            frame_tx,
            stop.clone(),
            config.max_frames,
            config.frame_delay,
        );
        let finder_handle = spawn_finder(finder, frame_rx, observed_tx, stop.clone());

        let mut summary = TrackingSummary::default();
        let main_error = run_main_loop(
            observed_rx,
            &mut sinks,
            &mut summary,
            metadata.total_frames,
            &mut config,
            &stop,
        );
        stop.halted.store(true, Ordering::Relaxed);

        let result = join_threads(capture_handle, finder_handle, &mut sinks, main_error);
        config.logger.summary();

        let finder = result?;
        summary.accuracy_percent = finder.accuracy().percent();
        summary.retunes = finder.retunes();
        Ok(summary)
    }
}

fn open_sinks(
    sinks: &mut [Box<dyn FrameSink>],
    metadata: &SourceMetadata,
) -> Result<(), Box<dyn std::error::Error>> {
    for i in 0..sinks.len() {
        if let Err(e) = sinks[i].open(metadata) {
            for opened in &mut sinks[..i] {
                let _ = opened.close();
            }
            return Err(e);
        }
    }
    Ok(())
}

fn spawn_capture(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Result<Frame, SendError>>,
    stop: StopFlags,
    max_frames: Option<usize>,
    frame_delay: Duration,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let limit = max_frames.unwrap_or(usize::MAX);
        for frame_result in source.frames().take(limit) {
            if stop.should_stop() {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            let failed = mapped.is_err();
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
            if !frame_delay.is_zero() {
                std::thread::sleep(frame_delay);
            }
        }
        source.close();
    })
}

fn spawn_finder(
    mut finder: FaceFinder,
    frame_rx: Receiver<Result<Frame, SendError>>,
    observed_tx: Sender<Result<FrameObservation, SendError>>,
    stop: StopFlags,
) -> JoinHandle<FaceFinder> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if stop.should_stop() {
                break;
            }
            let result = match frame_result {
                Ok(frame) => finder
                    .process(frame)
                    .map_err(|e| -> SendError { e.to_string().into() }),
                Err(e) => Err(e),
            };
            let failed = result.is_err();
            if observed_tx.send(result).is_err() || failed {
                break;
            }
        }
        finder
    })
}

/// Caller-thread loop: hand observations to the sinks, update counters,
/// log, and report progress.
fn run_main_loop(
    observed_rx: Receiver<Result<FrameObservation, SendError>>,
    sinks: &mut [Box<dyn FrameSink>],
    summary: &mut TrackingSummary,
    total_frames: Option<usize>,
    config: &mut PipelineConfig,
    stop: &StopFlags,
) -> Option<Box<dyn std::error::Error>> {
    for observed in observed_rx {
        if stop.should_stop() {
            break;
        }
        let observation = match observed {
            Ok(o) => o,
            Err(e) => return Some(e.to_string().into()),
        };

        summary.frames_processed += 1;
        if observation.is_located() {
            summary.frames_located += 1;
        }

        let logger = &mut config.logger;
        for (stage, ms) in observation.timings.stages() {
            if stage != "tune" || ms > 0.0 {
                logger.timing(stage, ms);
            }
        }
        logger.metric("accuracy", observation.accuracy_percent);
        if let Some(reason) = observation.retuned {
            logger.info(&format!(
                "Frame {}: retuned lighting ({reason}) -> {}",
                observation.index(),
                observation.enhancement
            ));
        }

        let mut halt = false;
        for sink in sinks.iter_mut() {
            match sink.write(&observation) {
                Ok(SinkControl::Continue) => {}
                Ok(SinkControl::Stop) => halt = true,
                Err(e) => return Some(e),
            }
        }

        logger.progress(summary.frames_processed, total_frames);
        if let Some(ref callback) = config.on_progress {
            if !callback(summary.frames_processed, total_frames) {
                return Some("Cancelled".into());
            }
        }

        if halt {
            break;
        }
    }
    None
}

/// Joins the worker threads, closes all sinks and keeps the first error.
fn join_threads(
    capture_handle: JoinHandle<()>,
    finder_handle: JoinHandle<FaceFinder>,
    sinks: &mut [Box<dyn FrameSink>],
    mut first_error: Option<Box<dyn std::error::Error>>,
) -> Result<FaceFinder, Box<dyn std::error::Error>> {
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    if capture_handle.join().is_err() {
        set_if_none(&mut first_error, "Capture thread panicked".into());
    }

    let finder = match finder_handle.join() {
        Ok(f) => Some(f),
        Err(_) => {
            set_if_none(&mut first_error, "Finder thread panicked".into());
            None
        }
    };

    for sink in sinks.iter_mut() {
        if let Err(e) = sink.close() {
            set_if_none(&mut first_error, e);
        }
    }

    match (first_error, finder) {
        (Some(e), _) => Err(e),
        (None, Some(f)) => Ok(f),
        (None, None) => Err("Finder thread panicked".into()),
    }
}
