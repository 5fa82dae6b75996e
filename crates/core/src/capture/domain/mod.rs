pub mod frame_sink;
pub mod frame_source;
pub mod image_writer;
