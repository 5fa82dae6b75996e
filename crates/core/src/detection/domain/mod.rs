pub mod coord_smoother;
pub mod face_coords;
pub mod face_locator;
pub mod feature_detector;
