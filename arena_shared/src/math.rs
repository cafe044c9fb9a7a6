//! Math types.
//!
//! This module intentionally stays small and deterministic.
//! Screen convention: +x is right, +y is down, so "up" is `(0, -1)`.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// 2D vector used for every position and direction in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: -1.0 };
    pub const DOWN: Self = Self { x: 0.0, y: 1.0 };
    pub const LEFT: Self = Self { x: -1.0, y: 0.0 };
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    pub fn len_sq(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.len_sq().sqrt()
    }

    /// Unit vector in the same direction. The zero vector is returned unchanged.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Angle in degrees measured clockwise from "up"; negative when pointing left.
    pub fn to_angle(self) -> f64 {
        let n = self.normalize();
        let mut theta = (-n.y).clamp(-1.0, 1.0).acos();
        if n.x < 0.0 {
            theta = -theta;
        }
        theta.to_degrees()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl AxisBox {
    /// Box spanning two corners given in any order.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Square box of half-width `half` centred on `center`.
    pub fn around(center: Vec2, half: f64) -> Self {
        Self {
            min: Vec2::new(center.x - half, center.y - half),
            max: Vec2::new(center.x + half, center.y + half),
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn expand(self, margin: f64) -> Self {
        Self {
            min: Vec2::new(self.min.x - margin, self.min.y - margin),
            max: Vec2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Ray–circle intersection.
///
/// Solves `|origin + t*dir - center|^2 = r^2` for `t`. A hit needs a real
/// solution with both roots positive, so circles behind the origin (or
/// containing it) never count.
pub fn ray_hits_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f64) -> bool {
    let to_origin = origin - center;
    let a = dir.dot(dir);
    let b = 2.0 * to_origin.dot(dir);
    let c = to_origin.dot(to_origin) - radius * radius;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return false;
    }

    // Only the signs matter, so the division by 2a is skipped.
    let root = disc.sqrt();
    -b + root > 0.0 && -b - root > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_zero_is_noop() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert_eq!(n, Vec2::new(0.6, 0.8));
    }

    #[test]
    fn operators_compose() {
        let p = Vec2::new(1.0, 2.0) + Vec2::new(0.5, -1.0) * 2.0;
        assert_eq!(p, Vec2::new(2.0, 0.0));
        assert_eq!(p - Vec2::new(2.0, 0.0), Vec2::ZERO);
        assert_eq!(Vec2::new(1.0, 2.0).dot(Vec2::new(3.0, -1.0)), 1.0);
    }

    #[test]
    fn angle_is_measured_from_up() {
        assert!((Vec2::UP.to_angle()).abs() < 1e-9);
        assert!((Vec2::RIGHT.to_angle() - 90.0).abs() < 1e-9);
        assert!((Vec2::LEFT.to_angle() + 90.0).abs() < 1e-9);
        assert!((Vec2::DOWN.to_angle() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn axis_box_is_inclusive_and_order_free() {
        let b = AxisBox::from_corners(Vec2::new(10.0, 5.0), Vec2::new(-10.0, 5.0)).expand(2.0);
        assert!(b.contains(Vec2::new(-12.0, 7.0)));
        assert!(b.contains(Vec2::new(0.0, 3.0)));
        assert!(!b.contains(Vec2::new(0.0, 7.5)));
    }

    #[test]
    fn beam_hits_target_on_ray() {
        let hit = ray_hits_circle(Vec2::ZERO, Vec2::UP, Vec2::new(0.0, -100.0), 30.0);
        assert!(hit);
    }

    #[test]
    fn beam_misses_offset_target() {
        let hit = ray_hits_circle(Vec2::ZERO, Vec2::UP, Vec2::new(50.0, -100.0), 30.0);
        assert!(!hit);
    }

    #[test]
    fn beam_ignores_target_behind_origin() {
        let hit = ray_hits_circle(Vec2::ZERO, Vec2::UP, Vec2::new(0.0, 100.0), 30.0);
        assert!(!hit);
    }
}
