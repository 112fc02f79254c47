//! 2D vector math used by the router and the hit tester.
//!
//! Everything here is plain `f32` arithmetic on [`Vec2`] and [`Rect`]. Angles
//! are reported in degrees to match how corner rounding is specified.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A point or direction in graph space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for (near) zero-length input.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 1e-5 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Component-wise [`approximately`].
    pub fn approx_eq(self, other: Vec2) -> bool {
        approximately(self.x, other.x) && approximately(self.y, other.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        rhs * self
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vec2::new(x, y)
    }
}

/// Axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle containing both points.
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Rect::new(min_x, min_y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x_max() && p.y >= self.y && p.y <= self.y_max()
    }

    /// Strict overlap: rectangles that only touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x_max()
            && self.x_max() > other.x
            && self.y < other.y_max()
            && self.y_max() > other.y
    }

    /// Grow the rectangle so it also contains `p`.
    pub fn include(&mut self, p: Vec2) {
        let x_min = self.x.min(p.x);
        let y_min = self.y.min(p.y);
        let x_max = self.x_max().max(p.x);
        let y_max = self.y_max().max(p.y);
        *self = Rect::new(x_min, y_min, x_max - x_min, y_max - y_min);
    }

    /// Expand by `margin` on every side.
    pub fn inflate(&self, margin: f32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    pub fn translate(&self, delta: Vec2) -> Rect {
        Rect::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Whether the segment `a..b` touches the rectangle.
    ///
    /// Liang-Barsky clipping of the segment against the four slabs.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }

        let d = b - a;
        let mut t0 = 0.0_f32;
        let mut t1 = 1.0_f32;
        let checks = [
            (-d.x, a.x - self.x),
            (d.x, self.x_max() - a.x),
            (-d.y, a.y - self.y),
            (d.y, self.y_max() - a.y),
        ];

        for (p, q) in checks {
            if p == 0.0 {
                // Parallel to this slab
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }

        t0 <= t1
    }
}

/// Tolerant float comparison: relative for large magnitudes, a few ulps near zero.
pub fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

/// Clamp that never panics: the lower bound wins when the bounds are inverted.
pub fn clamp_lenient(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).length()
}

/// Unsigned angle between two vectors in degrees, 0 when either is zero.
pub fn angle_between(a: Vec2, b: Vec2) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    let cos = (a.dot(b) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Linear interpolation between two points
pub fn lerp_point(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Evaluate the quadratic bezier `p0 -> control -> p2` at `t`.
pub fn quadratic_bezier(p0: Vec2, control: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let mt = 1.0 - t;
    mt * mt * p0 + 2.0 * mt * t * control + t * t * p2
}

/// Squared distance from a point to a line segment
pub fn distance_to_segment_sq(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let ap = point - a;

    let ab_len_sq = ab.length_squared();

    if ab_len_sq < f32::EPSILON {
        // Degenerate segment (a == b)
        return ap.length_squared();
    }

    // Project point onto line, clamped to segment
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (point - closest).length_squared()
}

pub fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    distance_to_segment_sq(point, a, b).sqrt()
}
