use crate::preprocessing::domain::enhancement_params::EnhancementParams;
use crate::shared::frame::Frame;
use crate::shared::gray_frame::GrayFrame;

/// Domain interface for turning a captured frame into the luma image the
/// classifiers run on.
///
/// Implementations must not modify the source frame; it is still needed
/// for annotation and display.
pub trait FramePreprocessor: Send {
    fn preprocess(&self, frame: &Frame, params: &EnhancementParams) -> GrayFrame;
}
