use serde::Serialize;

/// What kind of device or file a frame source reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Camera,
    VideoFile,
    Image,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// `None` for live sources, which run until stopped.
    pub total_frames: Option<usize>,
    pub kind: SourceKind,
    /// Device index or file path, for log messages.
    pub description: String,
}

impl SourceMetadata {
    pub fn is_live(&self) -> bool {
        self.kind == SourceKind::Camera
    }
}
