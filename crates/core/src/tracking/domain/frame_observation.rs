use crate::detection::domain::face_coords::FaceCoords;
use crate::preprocessing::domain::enhancement_params::EnhancementParams;
use crate::shared::frame::Frame;
use crate::shared::gray_frame::GrayFrame;
use crate::tracking::domain::accuracy_tracker::RetuneReason;

/// Wall-clock time spent in each finder stage for one frame, in ms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub preprocess_ms: f64,
    pub detect_ms: f64,
    pub locate_ms: f64,
    /// Zero unless the lighting search ran on this frame.
    pub tune_ms: f64,
}

impl StageTimings {
    pub fn stages(&self) -> [(&'static str, f64); 4] {
        [
            ("preprocess", self.preprocess_ms),
            ("detect", self.detect_ms),
            ("locate", self.locate_ms),
            ("tune", self.tune_ms),
        ]
    }
}

/// Everything the finder produced for one frame.
#[derive(Clone, Debug)]
pub struct FrameObservation {
    /// Source frame, annotated with markers when annotation is enabled.
    pub frame: Frame,
    /// Optimized luma frame the detectors ran on.
    pub gray: GrayFrame,
    pub coords: Option<FaceCoords>,
    pub accuracy_percent: f64,
    /// Parameters in effect after this frame (post-retune if one ran).
    pub enhancement: EnhancementParams,
    pub retuned: Option<RetuneReason>,
    pub timings: StageTimings,
}

impl FrameObservation {
    pub fn index(&self) -> usize {
        self.frame.index()
    }

    pub fn is_located(&self) -> bool {
        self.coords.is_some()
    }
}
