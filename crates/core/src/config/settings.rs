use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::domain::coord_smoother::CoordSmoother;
use crate::detection::domain::face_locator::{FaceLocator, NosePolicy};
use crate::detection::domain::feature_detector::FeatureDetector;
use crate::preprocessing::domain::enhancement_params::EnhancementParams;
use crate::preprocessing::domain::frame_preprocessor::FramePreprocessor;
use crate::preprocessing::domain::lighting_tuner::LightingTuner;
use crate::shared::constants::{
    DEFAULT_ACCURACY_WINDOW, DEFAULT_CAMERA_INDEX, DEFAULT_MAX_SUCCESSIVE_FAILURES,
    DEFAULT_MIN_ACCURACY_PERCENT, DEFAULT_MIN_EYE_SEPARATION, DEFAULT_MIN_NEIGHBORS,
    DEFAULT_SCALE_FACTOR,
};
use crate::tracking::domain::accuracy_tracker::AccuracyTracker;
use crate::tracking::domain::face_finder::FaceFinder;
use crate::tracking::domain::frame_annotator::{FrameAnnotator, MarkerStyle};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Every tunable of a tracking run, persisted as JSON.
///
/// Fields missing from the file take their defaults, so old files keep
/// loading as settings are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub camera_index: i32,
    /// Explicit eye cascade; resolved through the model cache when unset.
    pub eye_model: Option<PathBuf>,
    pub nose_model: Option<PathBuf>,
    /// Directory searched for bundled cascades before downloading.
    pub models_dir: Option<PathBuf>,
    pub scale_factor: f64,
    pub min_neighbors: i32,
    /// Smallest detection (pixels, square); 0 lets the classifier decide.
    pub min_feature_size: i32,
    pub min_eye_separation: f64,
    pub nose_policy: NosePolicy,
    pub accuracy_window: usize,
    /// 0 disables the consecutive-miss trigger.
    pub max_successive_failures: usize,
    pub min_accuracy_percent: f64,
    pub auto_tune: bool,
    pub enhancement: EnhancementParams,
    pub mirror: bool,
    /// EMA weight of the newest coordinates; `None` disables smoothing.
    pub smoothing: Option<f64>,
    pub frame_delay_ms: u64,
    pub marker: MarkerStyle,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            camera_index: DEFAULT_CAMERA_INDEX,
            eye_model: None,
            nose_model: None,
            models_dir: None,
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_feature_size: 0,
            min_eye_separation: DEFAULT_MIN_EYE_SEPARATION,
            nose_policy: NosePolicy::default(),
            accuracy_window: DEFAULT_ACCURACY_WINDOW,
            max_successive_failures: DEFAULT_MAX_SUCCESSIVE_FAILURES,
            min_accuracy_percent: DEFAULT_MIN_ACCURACY_PERCENT,
            auto_tune: false,
            enhancement: EnhancementParams::default(),
            mirror: false,
            smoothing: None,
            frame_delay_ms: 0,
            marker: MarkerStyle::default(),
        }
    }
}

impl TrackerSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("EyeTrack").join("settings.json"))
    }

    /// Loads from the default location, falling back to defaults when the
    /// file is missing or unusable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings: {e}");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.camera_index < 0 {
            return Err(invalid("camera_index", "must be 0 or greater"));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(invalid(
                "scale_factor",
                format!("must be greater than 1.0, got {}", self.scale_factor),
            ));
        }
        if self.min_neighbors < 0 {
            return Err(invalid("min_neighbors", "must be 0 or greater"));
        }
        if self.min_feature_size < 0 {
            return Err(invalid("min_feature_size", "must be 0 or greater"));
        }
        if !self.min_eye_separation.is_finite() || self.min_eye_separation < 0.0 {
            return Err(invalid("min_eye_separation", "must be a finite value of 0 or greater"));
        }
        if self.accuracy_window == 0 {
            return Err(invalid("accuracy_window", "must be at least 1"));
        }
        if !(0.0..=100.0).contains(&self.min_accuracy_percent) {
            return Err(invalid(
                "min_accuracy_percent",
                format!("must be between 0 and 100, got {}", self.min_accuracy_percent),
            ));
        }
        if let Some(alpha) = self.smoothing {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(invalid(
                    "smoothing",
                    format!("must be in (0, 1], got {alpha}"),
                ));
            }
        }
        let e = &self.enhancement;
        if !e.alpha.is_finite() || e.alpha <= 0.0 {
            return Err(invalid("enhancement.alpha", "must be finite and greater than 0"));
        }
        if !e.beta.is_finite() {
            return Err(invalid("enhancement.beta", "must be finite"));
        }
        if !e.gamma.is_finite() || e.gamma <= 0.0 {
            return Err(invalid("enhancement.gamma", "must be finite and greater than 0"));
        }
        Ok(())
    }

    pub fn locator(&self) -> FaceLocator {
        FaceLocator::new(self.min_eye_separation, self.nose_policy)
    }

    pub fn accuracy_tracker(&self) -> Result<AccuracyTracker, SettingsError> {
        AccuracyTracker::new(
            self.accuracy_window,
            self.max_successive_failures,
            self.min_accuracy_percent,
        )
        .map_err(|e| invalid("accuracy_window", e.to_string()))
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Wires a [`FaceFinder`] from these settings around the given stages.
    pub fn build_finder(
        &self,
        preprocessor: Box<dyn FramePreprocessor>,
        eye_detector: Box<dyn FeatureDetector>,
        nose_detector: Box<dyn FeatureDetector>,
        annotate: bool,
    ) -> Result<FaceFinder, SettingsError> {
        self.validate()?;
        let mut finder = FaceFinder::new(
            preprocessor,
            eye_detector,
            nose_detector,
            self.locator(),
            self.accuracy_tracker()?,
        )
        .with_enhancement(self.enhancement);

        if self.auto_tune {
            finder = finder.with_tuner(LightingTuner::default());
        }
        if let Some(alpha) = self.smoothing {
            finder = finder.with_smoother(CoordSmoother::new(alpha));
        }
        if annotate {
            finder = finder.with_annotator(FrameAnnotator::new(self.marker));
        }
        Ok(finder)
    }
}
