//! Haar cascade feature detector backed by OpenCV's `objdetect` module.

use std::path::Path;

use opencv::core::{self, Mat, Rect, Scalar, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detection::domain::feature_detector::FeatureDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR};
use crate::shared::gray_frame::GrayFrame;

/// Multi-scale detection parameters passed to `detect_multi_scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    /// Smallest feature side in pixels; 0 lets OpenCV choose.
    pub min_size: i32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: 0,
        }
    }
}

pub struct CascadeDetector {
    classifier: CascadeClassifier,
    params: CascadeParams,
    label: String,
    gray: Mat,
    hits: Vector<Rect>,
}

// Safety: each CascadeDetector is owned by exactly one finder thread; the
// classifier handle is never shared.
unsafe impl Send for CascadeDetector {}

impl CascadeDetector {
    /// Load a cascade from an OpenCV XML file.
    pub fn new(model_path: &Path, params: CascadeParams) -> Result<Self, Box<dyn std::error::Error>> {
        let path_str = model_path
            .to_str()
            .ok_or_else(|| format!("Cascade path is not valid UTF-8: {}", model_path.display()))?;
        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(format!("Failed to load cascade: {}", model_path.display()).into());
        }

        let label = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cascade".to_string());
        log::debug!("Loaded cascade {label} from {}", model_path.display());

        Ok(Self {
            classifier,
            params,
            label,
            gray: Mat::default(),
            hits: Vector::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn upload(&mut self, frame: &GrayFrame) -> Result<(), Box<dyn std::error::Error>> {
        let rows = frame.height() as i32;
        let cols = frame.width() as i32;
        if self.gray.rows() != rows || self.gray.cols() != cols {
            self.gray = Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0))?;
        }
        self.gray.data_bytes_mut()?.copy_from_slice(frame.data());
        Ok(())
    }
}

impl FeatureDetector for CascadeDetector {
    fn detect(&mut self, frame: &GrayFrame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        self.upload(frame)?;

        self.hits.clear();
        self.classifier.detect_multi_scale(
            &self.gray,
            &mut self.hits,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            Size::new(self.params.min_size, self.params.min_size),
            Size::default(),
        )?;

        Ok(self
            .hits
            .iter()
            .map(|r| BoundingBox::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
