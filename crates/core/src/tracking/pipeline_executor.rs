use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::domain::frame_sink::FrameSink;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::face_finder::FaceFinder;
use crate::tracking::domain::tracking_summary::TrackingSummary;
use crate::tracking::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Progress callback: `(frames_done, total)`; return `false` to cancel.
pub type ProgressFn = Box<dyn Fn(usize, Option<usize>) -> bool + Send>;

/// Configuration for one tracking run.
pub struct PipelineConfig {
    /// Stop after this many frames (`None` runs until the source ends).
    pub max_frames: Option<usize>,
    /// Pause between captured frames.
    pub frame_delay: Duration,
    pub on_progress: Option<ProgressFn>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            frame_delay: Duration::ZERO,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// Abstracts how the capture → find → sink loop is executed.
///
/// `source` must already be open; `metadata` is what its `open` returned.
/// Implementations close the source and every sink on all paths.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        finder: FaceFinder,
        sinks: Vec<Box<dyn FrameSink>>,
        metadata: &SourceMetadata,
        config: PipelineConfig,
    ) -> Result<TrackingSummary, Box<dyn std::error::Error>>;
}
