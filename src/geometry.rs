//! Planar geometry shared by organisms, food and obstacles.
//!
//! The arena is the ground plane of a 3-D scene, so the two axes are named
//! `x` and `z` to match the renderer's coordinate system.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point or direction on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, z: 0.0 };

    #[inline]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Random vector with both components in [-1, 1), not normalized
    pub fn random_unit_square<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    }

    /// Random unit vector
    pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::random_unit_square(rng).normalized()
    }

    /// Uniform random point inside the square [-bound, bound]²
    pub fn random_in_square<R: Rng + ?Sized>(rng: &mut R, bound: f32) -> Self {
        Self::random_unit_square(rng) * bound
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.z * self.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction; the zero vector is returned unchanged
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.z / len)
        } else {
            self
        }
    }

    /// Rotate counter-clockwise by `angle` radians
    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.z * sin, self.x * sin + self.z * cos)
    }

    /// Point at `distance` from the origin along `angle`
    pub fn from_polar(angle: f32, distance: f32) -> Self {
        Self::new(angle.cos() * distance, angle.sin() * distance)
    }

    /// Clamp both components into [-bound, bound]
    pub fn clamped(self, bound: f32) -> Self {
        Self::new(self.x.clamp(-bound, bound), self.z.clamp(-bound, bound))
    }

    /// Heading around the vertical axis, as the renderer expects it
    pub fn heading(self) -> f32 {
        self.x.atan2(self.z)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.z * rhs)
    }
}

/// Circle-circle overlap test using squared distances
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let min = ra + rb;
    a.distance_squared(b) < min * min
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_normalize() {
        let v = Vec2::new(3.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let v = Vec2::new(1.0, 0.0).rotated(std::f32::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 1.0, Vec2::new(1.5, 0.0), 1.0));
        assert!(!circles_overlap(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0));
    }

    #[test]
    fn test_random_in_square_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let p = Vec2::random_in_square(&mut rng, 5.0);
            assert!(p.x.abs() <= 5.0 && p.z.abs() <= 5.0);
        }
    }
}
