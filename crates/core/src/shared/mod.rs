pub mod bounding_box;
pub mod constants;
pub mod frame;
pub mod gray_frame;
pub mod point;
pub mod rolling_window;
pub mod source_metadata;
