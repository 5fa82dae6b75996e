use crate::shared::bounding_box::BoundingBox;
use crate::shared::gray_frame::GrayFrame;

/// Domain interface for a single-class feature detector (eyes, nose).
///
/// Implementations may hold native state, hence `&mut self`.
pub trait FeatureDetector: Send {
    fn detect(&mut self, frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
