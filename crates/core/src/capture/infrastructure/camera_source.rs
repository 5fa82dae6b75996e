use std::time::Duration;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::{DEFAULT_CAMERA_INDEX, DEFAULT_MAX_REOPEN_ATTEMPTS};
use crate::shared::frame::Frame;
use crate::shared::source_metadata::{SourceKind, SourceMetadata};

use super::mat_convert;

const DEFAULT_REOPEN_DELAY: Duration = Duration::from_millis(250);

/// Live webcam source backed by OpenCV's `VideoCapture`.
///
/// The frame sequence is unbounded. A failed or empty read closes and
/// reopens the device, with a growing back-off, up to
/// `max_reopen_attempts` times in a row before the error is surfaced.
pub struct CameraSource {
    device_index: i32,
    mirror: bool,
    max_reopen_attempts: usize,
    reopen_delay: Duration,
    capture: Option<VideoCapture>,
}

// Safety: the capture handle is moved into the capture thread and only
// touched there.
unsafe impl Send for CameraSource {}

impl CameraSource {
    pub fn new(device_index: i32) -> Self {
        Self {
            device_index,
            mirror: false,
            max_reopen_attempts: DEFAULT_MAX_REOPEN_ATTEMPTS,
            reopen_delay: DEFAULT_REOPEN_DELAY,
            capture: None,
        }
    }

    /// Flip frames horizontally so the preview behaves like a mirror.
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_reopen_policy(mut self, max_attempts: usize, delay: Duration) -> Self {
        self.max_reopen_attempts = max_attempts;
        self.reopen_delay = delay;
        self
    }

    fn connect(&self) -> Result<VideoCapture, Box<dyn std::error::Error>> {
        let capture = VideoCapture::new(self.device_index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(format!("Failed to open camera {}", self.device_index).into());
        }
        Ok(capture)
    }
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::new(DEFAULT_CAMERA_INDEX)
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
        let capture = self.connect()?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?.max(0.0);
        self.capture = Some(capture);

        log::info!("Camera {} opened at {width}x{height}", self.device_index);
        Ok(SourceMetadata {
            width,
            height,
            fps,
            total_frames: None,
            kind: SourceKind::Camera,
            description: format!("camera {}", self.device_index),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if self.capture.is_none() {
            return Box::new(std::iter::once(Err("CameraSource: not opened".into())));
        }
        Box::new(CameraFrameIter {
            source: self,
            mat: Mat::default(),
            frame_index: 0,
            done: false,
        })
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            let _ = capture.release();
        }
    }
}

struct CameraFrameIter<'a> {
    source: &'a mut CameraSource,
    mat: Mat,
    frame_index: usize,
    done: bool,
}

impl CameraFrameIter<'_> {
    fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let capture = self.source.capture.as_mut().ok_or("Camera closed")?;
        if !capture.read(&mut self.mat)? || self.mat.empty() {
            return Err("Camera returned no frame".into());
        }
        let mut frame = mat_convert::frame_from_mat(&self.mat, self.frame_index)?;
        if self.source.mirror {
            frame.flip_horizontal();
        }
        Ok(frame)
    }

    fn reopen(&mut self, attempt: usize) -> Result<(), Box<dyn std::error::Error>> {
        self.source.close();
        std::thread::sleep(self.source.reopen_delay * attempt as u32);
        self.source.capture = Some(self.source.connect()?);
        Ok(())
    }
}

impl Iterator for CameraFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut attempt = 0;
        loop {
            let err = match self.read() {
                Ok(frame) => {
                    self.frame_index += 1;
                    return Some(Ok(frame));
                }
                Err(e) => e,
            };

            if attempt >= self.source.max_reopen_attempts {
                self.done = true;
                return Some(Err(format!(
                    "Camera {} failed after {attempt} reopen attempts: {err}",
                    self.source.device_index
                )
                .into()));
            }
            attempt += 1;
            log::warn!(
                "Camera read failed ({err}), reopening ({attempt}/{})",
                self.source.max_reopen_attempts
            );
            if let Err(e) = self.reopen(attempt) {
                log::warn!("Reopen failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cam = CameraSource::default();
        assert_eq!(cam.device_index, 0);
        assert_eq!(cam.max_reopen_attempts, 3);
        assert!(!cam.mirror);
    }

    #[test]
    fn test_builders() {
        let cam = CameraSource::new(2)
            .with_mirror(true)
            .with_reopen_policy(1, Duration::from_millis(5));
        assert!(cam.mirror);
        assert_eq!(cam.max_reopen_attempts, 1);
        assert_eq!(cam.reopen_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_frames_without_open_is_error() {
        let mut cam = CameraSource::new(0);
        assert!(cam.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_without_open() {
        let mut cam = CameraSource::new(0);
        cam.close();
        cam.close();
    }
}
