use std::path::PathBuf;

use crate::capture::domain::frame_sink::{FrameSink, SinkControl};
use crate::capture::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::frame_observation::FrameObservation;

/// Saves every observed frame as `frame_NNNNNN.png` in a directory, and
/// optionally the optimized grayscale frame as `gray_NNNNNN.png`.
pub struct ImageSequenceSink {
    dir: PathBuf,
    save_gray: bool,
    writer: Box<dyn ImageWriter>,
    written: usize,
}

impl ImageSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, save_gray: bool, writer: Box<dyn ImageWriter>) -> Self {
        Self {
            dir: dir.into(),
            save_gray,
            writer,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn open(&mut self, metadata: &SourceMetadata) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.dir)?;
        log::info!(
            "Saving frames from {} to {}",
            metadata.description,
            self.dir.display()
        );
        Ok(())
    }

    fn write(
        &mut self,
        observation: &FrameObservation,
    ) -> Result<SinkControl, Box<dyn std::error::Error>> {
        let index = observation.index();
        self.writer.write(
            &self.dir.join(format!("frame_{index:06}.png")),
            &observation.frame,
            None,
        )?;

        if self.save_gray {
            let gray = &observation.gray;
            let luma = Frame::new(gray.data().to_vec(), gray.width(), gray.height(), 1, index);
            self.writer
                .write(&self.dir.join(format!("gray_{index:06}.png")), &luma, None)?;
        }

        self.written += 1;
        Ok(SinkControl::Continue)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!("Wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}
