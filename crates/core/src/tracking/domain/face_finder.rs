use std::time::Instant;

use crate::detection::domain::coord_smoother::CoordSmoother;
use crate::detection::domain::face_coords::FaceCoords;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::feature_detector::FeatureDetector;
use crate::preprocessing::domain::enhancement_params::EnhancementParams;
use crate::preprocessing::domain::frame_preprocessor::FramePreprocessor;
use crate::preprocessing::domain::lighting_tuner::LightingTuner;
use crate::shared::frame::Frame;
use crate::shared::gray_frame::GrayFrame;
use crate::tracking::domain::accuracy_tracker::AccuracyTracker;
use crate::tracking::domain::frame_annotator::FrameAnnotator;
use crate::tracking::domain::frame_observation::{FrameObservation, StageTimings};

/// Points awarded to a lighting candidate that yields a located face.
const LOCATED_SCORE: u32 = 4;

/// Per-frame eye and nose finder.
///
/// Each call to [`FaceFinder::process`] runs preprocess → detect → locate,
/// records the outcome in the accuracy window and, when the window reports
/// a problem and a tuner is configured, searches for better lighting
/// parameters on the same frame. Coordinates never carry over from one
/// frame to the next except through the optional smoother.
pub struct FaceFinder {
    preprocessor: Box<dyn FramePreprocessor>,
    eye_detector: Box<dyn FeatureDetector>,
    nose_detector: Box<dyn FeatureDetector>,
    locator: FaceLocator,
    accuracy: AccuracyTracker,
    params: EnhancementParams,
    tuner: Option<LightingTuner>,
    smoother: Option<CoordSmoother>,
    annotator: Option<FrameAnnotator>,
    retunes: usize,
}

/// Raw detector output for one luma frame.
struct Detections {
    eyes: usize,
    noses: usize,
    coords: Option<FaceCoords>,
}

fn run_detectors(
    gray: &GrayFrame,
    eye_detector: &mut dyn FeatureDetector,
    nose_detector: &mut dyn FeatureDetector,
    locator: &FaceLocator,
    timings: Option<&mut StageTimings>,
) -> Result<Detections, Box<dyn std::error::Error>> {
    let t = Instant::now();
    let eyes = eye_detector.detect(gray)?;
    let noses = nose_detector.detect(gray)?;
    let detect_ms = t.elapsed().as_secs_f64() * 1000.0;

    let t = Instant::now();
    let coords = locator.locate(&eyes, &noses);
    if let Some(timings) = timings {
        timings.detect_ms = detect_ms;
        timings.locate_ms = t.elapsed().as_secs_f64() * 1000.0;
    }

    Ok(Detections {
        eyes: eyes.len(),
        noses: noses.len(),
        coords,
    })
}

fn lighting_score(d: &Detections) -> u32 {
    let located = if d.coords.is_some() { LOCATED_SCORE } else { 0 };
    located + d.eyes.min(2) as u32 + d.noses.min(1) as u32
}

impl FaceFinder {
    pub fn new(
        preprocessor: Box<dyn FramePreprocessor>,
        eye_detector: Box<dyn FeatureDetector>,
        nose_detector: Box<dyn FeatureDetector>,
        locator: FaceLocator,
        accuracy: AccuracyTracker,
    ) -> Self {
        Self {
            preprocessor,
            eye_detector,
            nose_detector,
            locator,
            accuracy,
            params: EnhancementParams::default(),
            tuner: None,
            smoother: None,
            annotator: None,
            retunes: 0,
        }
    }

    pub fn with_enhancement(mut self, params: EnhancementParams) -> Self {
        self.params = params;
        self
    }

    /// Enables automatic lighting search when accuracy drops.
    pub fn with_tuner(mut self, tuner: LightingTuner) -> Self {
        self.tuner = Some(tuner);
        self
    }

    pub fn with_smoother(mut self, smoother: CoordSmoother) -> Self {
        self.smoother = Some(smoother);
        self
    }

    pub fn with_annotator(mut self, annotator: FrameAnnotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn enhancement(&self) -> EnhancementParams {
        self.params
    }

    pub fn accuracy(&self) -> &AccuracyTracker {
        &self.accuracy
    }

    pub fn retunes(&self) -> usize {
        self.retunes
    }

    pub fn process(&mut self, mut frame: Frame) -> Result<FrameObservation, Box<dyn std::error::Error>> {
        let mut timings = StageTimings::default();

        let t = Instant::now();
        let gray = self.preprocessor.preprocess(&frame, &self.params);
        timings.preprocess_ms = t.elapsed().as_secs_f64() * 1000.0;

        let detections = run_detectors(
            &gray,
            self.eye_detector.as_mut(),
            self.nose_detector.as_mut(),
            &self.locator,
            Some(&mut timings),
        )?;

        let reason = self.accuracy.record(detections.coords.is_some());
        let mut retuned = None;
        if let Some(reason) = reason {
            if self.tuner.is_some() {
                let t = Instant::now();
                self.retune(&frame)?;
                timings.tune_ms = t.elapsed().as_secs_f64() * 1000.0;
                self.retunes += 1;
                retuned = Some(reason);
                log::info!("Retuned lighting ({reason}): {}", self.params);
            } else {
                log::debug!("Accuracy check fired ({reason}) with auto-tune disabled");
            }
        }

        let coords = match self.smoother.as_mut() {
            Some(smoother) => smoother.smooth(detections.coords),
            None => detections.coords,
        };

        if let (Some(annotator), Some(c)) = (&self.annotator, &coords) {
            annotator.annotate(&mut frame, c);
        }

        Ok(FrameObservation {
            frame,
            gray,
            coords,
            accuracy_percent: self.accuracy.percent(),
            enhancement: self.params,
            retuned,
            timings,
        })
    }

    /// Hill-climbs the lighting parameters on `frame` and adopts the best.
    fn retune(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let Self {
            preprocessor,
            eye_detector,
            nose_detector,
            locator,
            params,
            tuner,
            ..
        } = self;
        let Some(tuner) = tuner.as_ref() else {
            return Ok(());
        };

        let outcome = tuner.search(*params, |candidate| {
            let gray = preprocessor.preprocess(frame, candidate);
            let d = run_detectors(
                &gray,
                &mut **eye_detector,
                &mut **nose_detector,
                locator,
                None,
            )?;
            Ok::<_, Box<dyn std::error::Error>>(lighting_score(&d))
        })?;

        *params = outcome.params;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_locator::NosePolicy;
    use crate::preprocessing::infrastructure::luma_preprocessor::LumaPreprocessor;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::point::Point;
    use crate::tracking::domain::accuracy_tracker::RetuneReason;
    use crate::tracking::domain::frame_annotator::MarkerStyle;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    // ── Stubs ──

    /// Replays a fixed script of detections, one entry per call.
    struct ScriptedDetector {
        script: VecDeque<Vec<BoundingBox>>,
    }

    impl ScriptedDetector {
        fn boxed(script: Vec<Vec<BoundingBox>>) -> Box<dyn FeatureDetector> {
            Box::new(Self {
                script: script.into(),
            })
        }
    }

    impl FeatureDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.script.pop_front().unwrap_or_default())
        }
    }

    /// Finds two eyes only when the luma plane is bright enough on average.
    struct BrightnessGatedDetector {
        threshold: f64,
    }

    impl FeatureDetector for BrightnessGatedDetector {
        fn detect(&mut self, frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            let mean = frame.data().iter().map(|&v| v as f64).sum::<f64>() / frame.data().len() as f64;
            if mean >= self.threshold {
                Ok(vec![eye(10), eye(60)])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct FailingDetector;

    impl FeatureDetector for FailingDetector {
        fn detect(&mut self, _frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Err("classifier exploded".into())
        }
    }

    // ── Helpers ──

    fn eye(x: i32) -> BoundingBox {
        BoundingBox::new(x, 20, 10, 10)
    }

    fn make_frame(value: u8, index: usize) -> Frame {
        Frame::new(vec![value; 100 * 50 * 3], 100, 50, 3, index)
    }

    fn finder(eyes: Box<dyn FeatureDetector>, accuracy: AccuracyTracker) -> FaceFinder {
        FaceFinder::new(
            Box::new(LumaPreprocessor),
            eyes,
            ScriptedDetector::boxed(Vec::new()),
            FaceLocator::new(20.0, NosePolicy::Optional),
            accuracy,
        )
    }

    // ── Tests ──

    #[test]
    fn test_located_frame_reports_coords() {
        let mut f = finder(
            ScriptedDetector::boxed(vec![vec![eye(60), eye(10)]]),
            AccuracyTracker::default(),
        );
        let obs = f.process(make_frame(128, 3)).unwrap();
        let coords = obs.coords.unwrap();
        assert_eq!(coords.left_eye, Point::new(15.0, 25.0));
        assert_eq!(coords.right_eye, Point::new(65.0, 25.0));
        assert_eq!(obs.index(), 3);
        assert_relative_eq!(obs.accuracy_percent, 100.0);
        assert_eq!(obs.gray.width(), 100);
    }

    #[test]
    fn test_coords_reset_every_frame() {
        let mut f = finder(
            ScriptedDetector::boxed(vec![vec![eye(10), eye(60)], vec![eye(10)]]),
            AccuracyTracker::default(),
        );
        assert!(f.process(make_frame(128, 0)).unwrap().is_located());
        let second = f.process(make_frame(128, 1)).unwrap();
        assert!(second.coords.is_none());
        assert_relative_eq!(second.accuracy_percent, 50.0);
    }

    #[test]
    fn test_annotator_marks_frame() {
        let mut f = finder(
            ScriptedDetector::boxed(vec![vec![eye(10), eye(60)]]),
            AccuracyTracker::default(),
        )
        .with_annotator(FrameAnnotator::new(MarkerStyle::Cross));
        let obs = f.process(make_frame(0, 0)).unwrap();
        let o = (25 * 100 + 15) * 3;
        assert_eq!(&obs.frame.data()[o..o + 3], &[0, 255, 0]);
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut f = finder(Box::new(FailingDetector), AccuracyTracker::default());
        let err = f.process(make_frame(0, 0)).unwrap_err();
        assert_eq!(err.to_string(), "classifier exploded");
    }

    #[test]
    fn test_without_tuner_params_stay() {
        let accuracy = AccuracyTracker::new(10, 2, 60.0).unwrap();
        let mut f = finder(Box::new(BrightnessGatedDetector { threshold: 200.0 }), accuracy);
        for i in 0..4 {
            let obs = f.process(make_frame(100, i)).unwrap();
            assert!(obs.retuned.is_none());
        }
        assert_eq!(f.enhancement(), EnhancementParams::default());
        assert_eq!(f.retunes(), 0);
    }

    #[test]
    fn test_retune_brightens_dark_scene() {
        // Luma 100 stays under the detector's threshold until the tuner lifts it.
        let accuracy = AccuracyTracker::new(10, 2, 60.0).unwrap();
        let mut f = finder(Box::new(BrightnessGatedDetector { threshold: 120.0 }), accuracy)
            .with_tuner(LightingTuner::default());

        assert!(f.process(make_frame(100, 0)).unwrap().retuned.is_none());
        let obs = f.process(make_frame(100, 1)).unwrap();
        assert_eq!(obs.retuned, Some(RetuneReason::SuccessiveFailures));
        assert_eq!(f.retunes(), 1);
        assert_ne!(obs.enhancement, EnhancementParams::default());

        // Next frame uses the tuned parameters and is located.
        assert!(f.process(make_frame(100, 2)).unwrap().is_located());
    }

    #[test]
    fn test_low_accuracy_window_triggers_retune() {
        // Streak trigger disabled; only the full-window rate can fire.
        let accuracy = AccuracyTracker::new(4, 0, 60.0).unwrap();
        let mut f = finder(Box::new(BrightnessGatedDetector { threshold: 120.0 }), accuracy)
            .with_tuner(LightingTuner::default());

        for i in 0..3 {
            assert!(f.process(make_frame(100, i)).unwrap().retuned.is_none());
        }
        let obs = f.process(make_frame(100, 3)).unwrap();
        assert_eq!(obs.retuned, Some(RetuneReason::LowAccuracy));
        assert!(!obs.is_located());
        assert_eq!(f.retunes(), 1);
        assert_ne!(f.enhancement(), EnhancementParams::default());

        let next = f.process(make_frame(100, 4)).unwrap();
        assert!(next.is_located());
        assert!(next.retuned.is_none());
    }

    #[test]
    fn test_smoother_blends_consecutive_hits() {
        let mut f = finder(
            ScriptedDetector::boxed(vec![vec![eye(10), eye(60)], vec![eye(20), eye(70)]]),
            AccuracyTracker::default(),
        )
        .with_smoother(CoordSmoother::new(0.5));
        f.process(make_frame(0, 0)).unwrap();
        let obs = f.process(make_frame(0, 1)).unwrap();
        assert_relative_eq!(obs.coords.unwrap().left_eye.x, 20.0);
    }

    #[test]
    fn test_lighting_score() {
        let located = Detections {
            eyes: 2,
            noses: 3,
            coords: Some(FaceCoords::new(Point::new(0.0, 0.0), Point::new(30.0, 0.0), None)),
        };
        assert_eq!(lighting_score(&located), 7);
        let partial = Detections {
            eyes: 5,
            noses: 0,
            coords: None,
        };
        assert_eq!(lighting_score(&partial), 2);
    }
}
