use std::path::PathBuf;

use crate::capture::domain::frame_source::FrameSource;
use crate::capture::domain::image_writer::ImageWriter;
use crate::tracking::domain::face_finder::FaceFinder;
use crate::tracking::domain::frame_observation::FrameObservation;

/// Captures one frame, locates the eyes and nose on it, and optionally
/// saves the (annotated) frame as a snapshot.
pub struct LocateOnceUseCase {
    source: Box<dyn FrameSource>,
    finder: FaceFinder,
    snapshot: Option<(PathBuf, Box<dyn ImageWriter>)>,
}

impl LocateOnceUseCase {
    pub fn new(source: Box<dyn FrameSource>, finder: FaceFinder) -> Self {
        Self {
            source,
            finder,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>, writer: Box<dyn ImageWriter>) -> Self {
        self.snapshot = Some((path.into(), writer));
        self
    }

    pub fn execute(&mut self) -> Result<FrameObservation, Box<dyn std::error::Error>> {
        let metadata = self.source.open()?;
        log::info!("Locating on one frame from {}", metadata.description);

        let first = self.source.frames().next();
        self.source.close();
        let frame = first.ok_or("No frames from source")??;

        let observation = self.finder.process(frame)?;
        match &observation.coords {
            Some(coords) => log::info!("Located {coords}"),
            None => log::info!("No face located on frame {}", observation.index()),
        }

        if let Some((path, writer)) = &self.snapshot {
            writer.write(path, &observation.frame, None)?;
            log::info!("Snapshot saved to {}", path.display());
        }

        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_locator::FaceLocator;
    use crate::detection::domain::feature_detector::FeatureDetector;
    use crate::preprocessing::infrastructure::luma_preprocessor::LumaPreprocessor;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use crate::shared::gray_frame::GrayFrame;
    use crate::shared::point::Point;
    use crate::shared::source_metadata::{SourceKind, SourceMetadata};
    use crate::tracking::domain::accuracy_tracker::AccuracyTracker;
    use crate::tracking::domain::frame_annotator::{FrameAnnotator, MarkerStyle};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    // ── Stubs ──

    struct StubSource {
        frames: Vec<Frame>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubSource {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
            Ok(SourceMetadata {
                width: 64,
                height: 16,
                fps: 0.0,
                total_frames: Some(self.frames.len()),
                kind: SourceKind::Image,
                description: "still.png".to_string(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct StubDetector(Vec<BoundingBox>);

    impl FeatureDetector for StubDetector {
        fn detect(&mut self, _frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct StubImageWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for StubImageWriter {
        fn write(
            &self,
            path: &Path,
            frame: &Frame,
            _size: Option<(u32, u32)>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    // ── Helpers ──

    fn make_frame(index: usize) -> Frame {
        Frame::new(vec![0; 64 * 16 * 3], 64, 16, 3, index)
    }

    fn finder(eyes: Vec<BoundingBox>) -> FaceFinder {
        FaceFinder::new(
            Box::new(LumaPreprocessor),
            Box::new(StubDetector(eyes)),
            Box::new(StubDetector(vec![BoundingBox::new(28, 8, 4, 4)])),
            FaceLocator::default(),
            AccuracyTracker::default(),
        )
    }

    fn two_eyes() -> Vec<BoundingBox> {
        vec![BoundingBox::new(44, 2, 8, 8), BoundingBox::new(4, 2, 8, 8)]
    }

    // ── Tests ──

    #[test]
    fn test_locates_on_first_frame_only() {
        let source = StubSource::new(vec![make_frame(0), make_frame(1)]);
        let closed = source.closed.clone();
        let mut uc = LocateOnceUseCase::new(Box::new(source), finder(two_eyes()));

        let observation = uc.execute().unwrap();
        assert_eq!(observation.index(), 0);
        let coords = observation.coords.unwrap();
        assert_eq!(coords.left_eye, Point::new(8.0, 6.0));
        assert_eq!(coords.right_eye, Point::new(48.0, 6.0));
        assert_eq!(coords.nose, Some(Point::new(30.0, 10.0)));
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_single_eye_not_located() {
        let source = StubSource::new(vec![make_frame(0)]);
        let mut uc = LocateOnceUseCase::new(
            Box::new(source),
            finder(vec![BoundingBox::new(4, 2, 8, 8)]),
        );

        let observation = uc.execute().unwrap();
        assert!(observation.coords.is_none());
        assert_eq!(observation.accuracy_percent, 0.0);
    }

    #[test]
    fn test_empty_source_errors_and_closes() {
        let source = StubSource::new(Vec::new());
        let closed = source.closed.clone();
        let mut uc = LocateOnceUseCase::new(Box::new(source), finder(two_eyes()));

        let err = uc.execute().unwrap_err();
        assert_eq!(err.to_string(), "No frames from source");
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_snapshot_written_with_markers() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = StubImageWriter {
            written: written.clone(),
        };
        let finder = finder(two_eyes()).with_annotator(FrameAnnotator::new(MarkerStyle::Dot));
        let mut uc = LocateOnceUseCase::new(Box::new(StubSource::new(vec![make_frame(0)])), finder)
            .with_snapshot("snap.png", Box::new(writer));

        uc.execute().unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("snap.png"));
        let frame = &written[0].1;
        // ring pixel just right of the left eye center
        let ring = (6 * 64 + 9) * 3;
        assert_eq!(&frame.data()[ring..ring + 3], &[0, 255, 0]);
        let center = (6 * 64 + 8) * 3;
        assert_eq!(&frame.data()[center..center + 3], &[0, 0, 0]);
    }
}
