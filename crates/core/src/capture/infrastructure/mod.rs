#[cfg(feature = "opencv")]
pub mod camera_source;
pub mod coordinate_log_sink;
#[cfg(feature = "opencv")]
pub mod display_window_sink;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_file_source;
pub mod image_file_source;
pub mod image_file_writer;
pub mod image_sequence_sink;
#[cfg(feature = "opencv")]
mod mat_convert;
