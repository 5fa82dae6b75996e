use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::{SourceKind, SourceMetadata};

/// Presents a still image as a one-frame [`FrameSource`], so on-demand
/// lookups and tests can run without a camera.
pub struct ImageFileSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
        let img = image::open(&self.path)
            .map_err(|e| format!("Failed to read image {}: {e}", self.path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        self.frame = Some(Frame::new(img.into_raw(), width, height, 3, 0));

        Ok(SourceMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: Some(1),
            kind: SourceKind::Image,
            description: self.path.display().to_string(),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileSource: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
