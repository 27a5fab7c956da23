//! Joint geometry and included-angle calculation
//!
//! Coordinates are image-relative (normalized to 0.0-1.0) as reported by the
//! pose model, but any consistent unit works since only directions matter.

use serde::{Deserialize, Serialize};

/// A 2D joint coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPoint {
    pub x: f64,
    pub y: f64,
}

impl JointPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &JointPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for JointPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Ordered triple of joints whose included angle is measured at `b`
///
/// For curl counting: `a` = shoulder, `b` = elbow, `c` = wrist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnglePoints {
    pub a: JointPoint,
    pub b: JointPoint,
    pub c: JointPoint,
}

impl AnglePoints {
    pub fn new(a: JointPoint, b: JointPoint, c: JointPoint) -> Self {
        Self { a, b, c }
    }

    /// Included angle at `b` in degrees, see [`calculate_angle`]
    pub fn angle(&self) -> f64 {
        calculate_angle(self)
    }

    /// Either segment (b→a or b→c) is shorter than `min_length`
    ///
    /// The angle of a degenerate triple is still defined but meaningless, so
    /// callers discard the measurement instead of feeding it to the counter.
    pub fn is_degenerate(&self, min_length: f64) -> bool {
        self.b.distance_to(&self.a) < min_length || self.b.distance_to(&self.c) < min_length
    }
}

/// Unsigned angle at vertex `b` between segments b→a and b→c, in degrees
///
/// The raw atan2 difference spans [0°, 360°); anything past 180° is folded
/// back so the result is the included angle in [0°, 180°] regardless of
/// the rotational direction of the two segments. Coincident points never
/// panic since `atan2(0, 0)` is 0.
pub fn calculate_angle(points: &AnglePoints) -> f64 {
    let AnglePoints { a, b, c } = points;

    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.to_degrees().abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
