use std::str::FromStr;

use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::detection::domain::face_coords::FaceCoords;
use crate::shared::frame::Frame;
use crate::shared::point::Point;

const GREEN: [u8; 3] = [0, 255, 0];
const CROSS_ARM: i64 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// One-pixel-radius ring around the point.
    #[default]
    Dot,
    /// Horizontal and vertical strokes through the point.
    Cross,
}

impl FromStr for MarkerStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "cross" => Ok(Self::Cross),
            other => Err(format!("unknown marker style '{other}' (expected dot or cross)")),
        }
    }
}

/// Marks located pupils and nose on the RGB frame in place.
#[derive(Clone, Copy, Debug)]
pub struct FrameAnnotator {
    style: MarkerStyle,
    color: [u8; 3],
}

impl FrameAnnotator {
    pub fn new(style: MarkerStyle) -> Self {
        Self {
            style,
            color: GREEN,
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn annotate(&self, frame: &mut Frame, coords: &FaceCoords) {
        for p in coords.points() {
            self.mark(frame, p);
        }
    }

    fn mark(&self, frame: &mut Frame, p: Point) {
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        match self.style {
            MarkerStyle::Dot => {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx != 0 || dy != 0 {
                            self.put(frame, cx + dx, cy + dy);
                        }
                    }
                }
            }
            MarkerStyle::Cross => {
                for d in -CROSS_ARM..=CROSS_ARM {
                    self.put(frame, cx + d, cy);
                    self.put(frame, cx, cy + d);
                }
            }
        }
    }

    /// Writes one pixel, ignoring coordinates outside the frame.
    fn put(&self, frame: &mut Frame, x: i64, y: i64) {
        let (w, h) = (frame.width() as i64, frame.height() as i64);
        if x < 0 || y < 0 || x >= w || y >= h {
            return;
        }
        let mut pixels = frame.as_ndarray_mut();
        let mut px = pixels.slice_mut(s![y as usize, x as usize, ..]);
        if px.len() >= 3 {
            for (dst, &src) in px.iter_mut().zip(self.color.iter()) {
                *dst = src;
            }
        } else {
            px.fill(u8::MAX);
        }
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new(MarkerStyle::default())
    }
}
