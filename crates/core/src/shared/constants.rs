pub const EYE_CASCADE_NAME: &str = "haarcascade_eye.xml";
pub const EYE_CASCADE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_eye.xml";

pub const NOSE_CASCADE_NAME: &str = "haarcascade_mcs_nose.xml";
pub const NOSE_CASCADE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv_contrib/4.x/modules/face/data/cascades/haarcascade_mcs_nose.xml";

/// Multi-scale pyramid step passed to the cascade classifiers.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_MIN_NEIGHBORS: i32 = 5;

/// Eye centers closer than this (pixels, horizontally) are treated as a
/// double detection of the same eye.
pub const DEFAULT_MIN_EYE_SEPARATION: f64 = 20.0;

/// Number of recent frames the find-rate is computed over.
pub const DEFAULT_ACCURACY_WINDOW: usize = 100;
pub const DEFAULT_MAX_SUCCESSIVE_FAILURES: usize = 15;
pub const DEFAULT_MIN_ACCURACY_PERCENT: f64 = 60.0;

pub const DEFAULT_CAMERA_INDEX: i32 = 0;
pub const DEFAULT_MAX_REOPEN_ATTEMPTS: usize = 3;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
