use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Produces frames from a camera, video file or still image.
///
/// File sources are finite; camera sources run until the consumer stops
/// pulling or the device fails for good.
pub trait FrameSource: Send {
    /// Acquires the device or file and returns its metadata.
    fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in capture order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases the device or file. Safe to call more than once.
    fn close(&mut self);
}
