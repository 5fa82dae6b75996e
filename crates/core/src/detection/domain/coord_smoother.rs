use crate::detection::domain::face_coords::FaceCoords;
use crate::shared::point::Point;

/// EMA (Exponential Moving Average) smoother for located coordinates.
///
/// Formula: `ema[t] = alpha * current + (1 - alpha) * ema[t-1]`.
/// State is dropped whenever a frame fails to locate a face, so the
/// next hit starts fresh.
pub struct CoordSmoother {
    alpha: f64,
    state: Option<FaceCoords>,
}

pub const DEFAULT_ALPHA: f64 = 0.6;

impl CoordSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    pub fn smooth(&mut self, coords: Option<FaceCoords>) -> Option<FaceCoords> {
        let Some(current) = coords else {
            self.state = None;
            return None;
        };

        let smoothed = match self.state {
            None => current,
            Some(prev) => FaceCoords {
                left_eye: self.blend(current.left_eye, prev.left_eye),
                right_eye: self.blend(current.right_eye, prev.right_eye),
                nose: match (current.nose, prev.nose) {
                    (Some(c), Some(p)) => Some(self.blend(c, p)),
                    (c, _) => c,
                },
            },
        };

        self.state = Some(smoothed);
        Some(smoothed)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    fn blend(&self, current: Point, prev: Point) -> Point {
        Point::new(
            self.alpha * current.x + (1.0 - self.alpha) * prev.x,
            self.alpha * current.y + (1.0 - self.alpha) * prev.y,
        )
    }
}

impl Default for CoordSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
