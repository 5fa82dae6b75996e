use serde::{Deserialize, Serialize};

use crate::detection::domain::face_coords::FaceCoords;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_MIN_EYE_SEPARATION;

/// How nose detections gate a located face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NosePolicy {
    /// Exactly one nose box must be present.
    Required,
    /// The first nose box is used when any are present.
    #[default]
    Optional,
}

/// Turns raw eye and nose boxes into a left/right-labelled [`FaceCoords`].
///
/// A face is located only when exactly two eye boxes are present and their
/// centers are at least `min_eye_separation` pixels apart horizontally.
#[derive(Clone, Copy, Debug)]
pub struct FaceLocator {
    min_eye_separation: f64,
    nose_policy: NosePolicy,
}

impl FaceLocator {
    pub fn new(min_eye_separation: f64, nose_policy: NosePolicy) -> Self {
        Self {
            min_eye_separation,
            nose_policy,
        }
    }

    pub fn min_eye_separation(&self) -> f64 {
        self.min_eye_separation
    }

    pub fn nose_policy(&self) -> NosePolicy {
        self.nose_policy
    }

    pub fn locate(&self, eyes: &[BoundingBox], noses: &[BoundingBox]) -> Option<FaceCoords> {
        let [a, b] = eyes else {
            return None;
        };

        let nose = match (self.nose_policy, noses) {
            (NosePolicy::Required, [n]) => Some(n.center()),
            (NosePolicy::Required, _) => return None,
            (NosePolicy::Optional, ns) => ns.first().map(BoundingBox::center),
        };

        let (ca, cb) = (a.center(), b.center());
        let (left, right) = if ca.x <= cb.x { (ca, cb) } else { (cb, ca) };

        if right.x - left.x < self.min_eye_separation {
            log::debug!(
                "Eyes too close together ({:.1}px < {:.1}px)",
                right.x - left.x,
                self.min_eye_separation
            );
            return None;
        }

        Some(FaceCoords::new(left, right, nose))
    }
}

impl Default for FaceLocator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_EYE_SEPARATION, NosePolicy::default())
    }
}
