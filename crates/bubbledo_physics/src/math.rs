// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D vector and rectangle math in screen orientation (y grows downward).

use serde::{Deserialize, Serialize};

/// 2D vector operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component
    pub x: f32,
    /// Vertical component (down is positive)
    pub y: f32,
}

impl Vec2 {
    /// The zero vector
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a new vector
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared length, avoids the square root
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or `self` when too short to normalize
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            *self
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Scalar (z component of the 3D) cross product
    pub fn cross(&self, other: &Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Perpendicular vector, rotated a quarter turn
    pub fn perp(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Rotate by `angle` radians
    pub fn rotate(&self, angle: f32) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Distance to another point
    pub fn distance(&self, other: &Vec2) -> f32 {
        (*other - *self).length()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2 {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: Vec2,
    /// Bottom-right corner
    pub max: Vec2,
}

impl Rect {
    /// Create from two corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create from a center point and full size
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Create from a top-left corner and full size
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self { min, max: min + size }
    }

    /// Center point
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Full size
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Width
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Point-in-rectangle test, edges included
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Whether a circle touches or overlaps this rectangle
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = Vec2::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
        );
        (center - closest).length_squared() <= radius * radius
    }

    /// The same rectangle shifted by `offset`
    pub fn translate(&self, offset: Vec2) -> Rect {
        Rect {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(20.0, 30.0));
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(rect.contains(Vec2::new(20.0, 30.0)));
        assert!(rect.contains(Vec2::new(15.0, 20.0)));
        assert!(!rect.contains(Vec2::new(9.9, 20.0)));
        assert!(!rect.contains(Vec2::new(15.0, 30.1)));
    }

    #[test]
    fn test_rect_intersects_circle() {
        let rect = Rect::from_center_size(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(rect.intersects_circle(Vec2::new(8.0, 0.0), 3.0));
        assert!(!rect.intersects_circle(Vec2::new(9.0, 0.0), 3.0));
        // Corner: distance from (5,5) to (8,9) is 5
        assert!(rect.intersects_circle(Vec2::new(8.0, 9.0), 5.0));
        assert!(!rect.intersects_circle(Vec2::new(8.0, 9.0), 4.9));
    }

    #[test]
    fn test_vec2_rotate_quarter_turn() {
        let v = Vec2::new(1.0, 0.0).rotate(std::f32::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
