mod histogram;
pub mod luma_preprocessor;
