use serde::{Deserialize, Serialize};

use crate::shared::point::Point;

/// Pupil and nose positions located in one frame, in image pixels.
///
/// `left_eye` is the eye with the smaller horizontal coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceCoords {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Option<Point>,
}

impl FaceCoords {
    pub fn new(left_eye: Point, right_eye: Point, nose: Option<Point>) -> Self {
        Self {
            left_eye,
            right_eye,
            nose,
        }
    }

    /// Located points in the order left eye, right eye, nose.
    pub fn points(&self) -> Vec<Point> {
        let mut out = vec![self.left_eye, self.right_eye];
        out.extend(self.nose);
        out
    }

    pub fn eye_separation(&self) -> f64 {
        self.right_eye.x - self.left_eye.x
    }
}

impl std::fmt::Display for FaceCoords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "left eye {:.1},{:.1}  right eye {:.1},{:.1}",
            self.left_eye.x, self.left_eye.y, self.right_eye.x, self.right_eye.y
        )?;
        match self.nose {
            Some(n) => write!(f, "  nose {:.1},{:.1}", n.x, n.y),
            None => write!(f, "  nose -"),
        }
    }
}
