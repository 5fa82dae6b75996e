use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::frame_observation::FrameObservation;

/// Whether the pipeline should keep feeding a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    /// Ends the run cleanly (e.g. the user pressed space in the preview).
    Stop,
}

/// Consumes per-frame observations: preview windows, exports, snapshots.
pub trait FrameSink: Send {
    fn open(&mut self, metadata: &SourceMetadata) -> Result<(), Box<dyn std::error::Error>>;

    fn write(
        &mut self,
        observation: &FrameObservation,
    ) -> Result<SinkControl, Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
