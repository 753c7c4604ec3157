use serde::{Deserialize, Serialize};

/// A position on the 2D map plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Point2D { x, y }
    }

    /// Coordinate along `axis` (0 = x, 1 = y).
    #[inline]
    pub fn axis(&self, axis: usize) -> f32 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }

    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// atan2 bearing from `self` towards `other`, in `(-π, π]`.
    pub fn bearing_to(&self, other: &Point2D) -> f32 {
        super::normalize_angle((other.y - self.y).atan2(other.x - self.x))
    }

    /// The point `distance` away from `self` along `angle`.
    pub fn offset_polar(&self, distance: f32, angle: f32) -> Point2D {
        Point2D {
            x: self.x + distance * angle.cos(),
            y: self.y + distance * angle.sin(),
        }
    }
}

impl From<[f32; 2]> for Point2D {
    fn from(p: [f32; 2]) -> Self {
        Point2D { x: p[0], y: p[1] }
    }
}

impl From<Point2D> for [f32; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}
