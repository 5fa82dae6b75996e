#[cfg(feature = "opencv")]
pub mod cascade_detector;
pub mod model_resolver;
