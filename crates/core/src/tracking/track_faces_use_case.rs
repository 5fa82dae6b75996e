use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::FrameSource;
use crate::tracking::domain::face_finder::FaceFinder;
use crate::tracking::domain::tracking_summary::TrackingSummary;

use super::pipeline_executor::{PipelineConfig, PipelineExecutor, ProgressFn};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Orchestrates continuous tracking over a frame source.
///
/// Opens the source, then hands it, the finder and the sinks to a
/// `PipelineExecutor`. This is a single-use struct: `execute` consumes
/// the owned components, so calling it twice will fail.
pub struct TrackFacesUseCase {
    source: Option<Box<dyn FrameSource>>,
    finder: Option<FaceFinder>,
    sinks: Option<Vec<Box<dyn FrameSink>>>,
    executor: Box<dyn PipelineExecutor>,
    max_frames: Option<usize>,
    frame_delay: Duration,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
    logger: Option<Box<dyn PipelineLogger>>,
}

impl TrackFacesUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        finder: FaceFinder,
        sinks: Vec<Box<dyn FrameSink>>,
        executor: Box<dyn PipelineExecutor>,
    ) -> Self {
        Self {
            source: Some(source),
            finder: Some(finder),
            sinks: Some(sinks),
            executor,
            max_frames: None,
            frame_delay: Duration::ZERO,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: None,
        }
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn execute(&mut self) -> Result<TrackingSummary, Box<dyn std::error::Error>> {
        let mut source = self.source.take().ok_or("Pipeline already executed")?;
        let finder = self.finder.take().ok_or("Pipeline already executed")?;
        let sinks = self.sinks.take().ok_or("Pipeline already executed")?;

        let metadata = source.open()?;
        log::info!(
            "Tracking {} ({}x{} @ {:.1} fps, {})",
            metadata.description,
            metadata.width,
            metadata.height,
            metadata.fps,
            match metadata.total_frames {
                Some(n) => format!("{n} frames"),
                None => "live".to_string(),
            }
        );

        let config = PipelineConfig {
            max_frames: self.max_frames,
            frame_delay: self.frame_delay,
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullPipelineLogger)),
        };

        let summary = self
            .executor
            .execute(source, finder, sinks, &metadata, config)?;
        log::info!("{summary}");
        Ok(summary)
    }
}
