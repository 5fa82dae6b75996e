pub mod accuracy_tracker;
pub mod face_finder;
pub mod frame_annotator;
pub mod frame_observation;
pub mod tracking_summary;
