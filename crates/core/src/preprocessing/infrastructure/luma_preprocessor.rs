use crate::preprocessing::domain::enhancement_params::EnhancementParams;
use crate::preprocessing::domain::frame_preprocessor::FramePreprocessor;
use crate::shared::frame::Frame;
use crate::shared::gray_frame::GrayFrame;

use super::histogram;

/// CPU preprocessor: BT.601 grayscale, optional histogram equalization,
/// then the contrast/brightness/gamma curve.
#[derive(Clone, Copy, Debug, Default)]
pub struct LumaPreprocessor;

impl LumaPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl FramePreprocessor for LumaPreprocessor {
    fn preprocess(&self, frame: &Frame, params: &EnhancementParams) -> GrayFrame {
        let mut luma = histogram::to_luma(frame.data(), frame.channels() as usize);

        if params.equalize {
            histogram::equalize(&mut luma);
        }

        if !params.is_identity_tone() {
            let lut = histogram::tone_lut(params);
            for v in luma.iter_mut() {
                *v = lut[*v as usize];
            }
        }

        GrayFrame::new(luma, frame.width(), frame.height(), frame.index())
    }
}
