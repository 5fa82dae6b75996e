use serde::{Deserialize, Serialize};

use super::point::Point;

/// Axis-aligned detector hit in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box center, kept fractional so odd-sized boxes don't lose half a pixel.
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        inter / (self.area() as f64 + other.area() as f64 - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_center_even_size() {
        let b = BoundingBox::new(10, 20, 40, 30);
        assert_eq!(b.center(), Point::new(30.0, 35.0));
    }

    #[test]
    fn test_center_odd_size_is_fractional() {
        let b = BoundingBox::new(0, 0, 5, 3);
        assert_eq!(b.center(), Point::new(2.5, 1.5));
    }

    #[test]
    fn test_area_ignores_negative_extent() {
        assert_eq!(BoundingBox::new(0, 0, -4, 10).area(), 0);
        assert_eq!(BoundingBox::new(0, 0, 4, 10).area(), 40);
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50*100, union 15000
        let a = BoundingBox::new(0, 0, 100, 100);
        let b = BoundingBox::new(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[rstest]
    #[case::disjoint(BoundingBox::new(0, 0, 50, 50), BoundingBox::new(100, 100, 50, 50))]
    #[case::touching(BoundingBox::new(0, 0, 50, 50), BoundingBox::new(50, 0, 50, 50))]
    #[case::zero_width(BoundingBox::new(0, 0, 0, 100), BoundingBox::new(0, 0, 50, 50))]
    fn test_iou_zero(#[case] a: BoundingBox, #[case] b: BoundingBox) {
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
