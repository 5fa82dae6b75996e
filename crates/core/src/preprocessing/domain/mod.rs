pub mod enhancement_params;
pub mod frame_preprocessor;
pub mod lighting_tuner;
