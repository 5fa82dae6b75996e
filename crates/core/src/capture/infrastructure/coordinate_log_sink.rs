use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::capture::domain::frame_sink::{FrameSink, SinkControl};
use crate::detection::domain::face_coords::FaceCoords;
use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::frame_observation::FrameObservation;

/// One JSON line per frame.
#[derive(Serialize)]
struct CoordRecord<'a> {
    frame: usize,
    found: bool,
    coords: Option<&'a FaceCoords>,
    accuracy_percent: f64,
    retuned: bool,
}

/// Exports located coordinates as JSON lines, one record per frame, for
/// downstream consumers.
pub struct CoordinateLogSink {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl CoordinateLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            out: None,
        }
    }
}

impl FrameSink for CoordinateLogSink {
    fn open(&mut self, _metadata: &SourceMetadata) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)
            .map_err(|e| format!("Failed to create {}: {e}", self.path.display()))?;
        self.out = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(
        &mut self,
        observation: &FrameObservation,
    ) -> Result<SinkControl, Box<dyn std::error::Error>> {
        let out = self.out.as_mut().ok_or("CoordinateLogSink: not opened")?;
        let record = CoordRecord {
            frame: observation.index(),
            found: observation.is_located(),
            coords: observation.coords.as_ref(),
            accuracy_percent: observation.accuracy_percent,
            retuned: observation.retuned.is_some(),
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
        Ok(SinkControl::Continue)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::domain::enhancement_params::EnhancementParams;
    use crate::shared::frame::Frame;
    use crate::shared::gray_frame::GrayFrame;
    use crate::shared::point::Point;
    use crate::shared::source_metadata::SourceKind;
    use crate::tracking::domain::frame_observation::StageTimings;

    fn metadata() -> SourceMetadata {
        SourceMetadata {
            width: 2,
            height: 2,
            fps: 30.0,
            total_frames: None,
            kind: SourceKind::Camera,
            description: "camera 0".to_string(),
        }
    }

    fn observation(index: usize, coords: Option<FaceCoords>) -> FrameObservation {
        FrameObservation {
            frame: Frame::new(vec![0; 12], 2, 2, 3, index),
            gray: GrayFrame::new(vec![0; 4], 2, 2, index),
            coords,
            accuracy_percent: 50.0,
            enhancement: EnhancementParams::default(),
            retuned: None,
            timings: StageTimings::default(),
        }
    }

    #[test]
    fn test_writes_one_line_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("coords.jsonl");
        let coords = FaceCoords::new(Point::new(10.0, 20.0), Point::new(50.0, 21.0), None);

        let mut sink = CoordinateLogSink::new(&path);
        sink.open(&metadata()).unwrap();
        sink.write(&observation(0, Some(coords))).unwrap();
        sink.write(&observation(1, None)).unwrap();
        sink.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["frame"], 0);
        assert_eq!(lines[0]["found"], true);
        assert_eq!(lines[0]["coords"]["right_eye"]["x"], 50.0);
        assert_eq!(lines[1]["found"], false);
        assert!(lines[1]["coords"].is_null());
        assert_eq!(lines[1]["accuracy_percent"], 50.0);
    }

    #[test]
    fn test_write_before_open_is_error() {
        let mut sink = CoordinateLogSink::new("unused.jsonl");
        assert!(sink.write(&observation(0, None)).is_err());
    }

    #[test]
    fn test_close_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CoordinateLogSink::new(dir.path().join("c.jsonl"));
        sink.open(&metadata()).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
    }
}
