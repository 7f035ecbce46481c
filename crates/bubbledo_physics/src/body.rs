// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rigid bodies: bubbles (dynamic circles) and walls (static boxes).

use crate::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Opaque handle to a body inside one [`Engine`](crate::Engine).
///
/// Handles are never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u64);

impl BodyHandle {
    /// Get the raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Physics material properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Bounciness, 0 = no bounce, 1 = perfectly elastic
    pub restitution: f32,
    /// Surface friction coefficient
    pub friction: f32,
    /// Fraction of velocity lost to the air each step
    pub air_friction: f32,
    /// Mass per square pixel
    pub density: f32,
}

impl Material {
    /// Bouncy, lightly damped bubble
    pub fn bubble() -> Self {
        Self {
            restitution: 0.9,
            friction: 0.005,
            air_friction: 0.01,
            density: 0.001,
        }
    }

    /// Boundary wall
    pub fn wall() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.1,
            air_friction: 0.0,
            density: 0.0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::bubble()
    }
}

/// Collider shape, centered on the body position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Circle of the given radius
    Circle {
        /// Radius (px)
        radius: f32,
    },
    /// Axis-aligned box; static bodies only, so it never rotates
    Rect {
        /// Half of the width and height (px)
        half_extents: Vec2,
    },
}

/// Physics body state during simulation
#[derive(Debug, Clone)]
pub struct Body {
    /// Collider shape
    pub shape: Shape,
    /// Center position
    pub position: Vec2,
    /// Orientation in radians
    pub angle: f32,
    /// Linear velocity (px/s)
    pub velocity: Vec2,
    /// Angular velocity (rad/s)
    pub angular_velocity: f32,
    /// Mass
    pub mass: f32,
    /// Inverse mass (0 for static)
    pub inv_mass: f32,
    /// Inverse rotational inertia (0 for static)
    pub inv_inertia: f32,
    /// Surface material
    pub material: Material,
    /// Static bodies never move
    pub is_static: bool,
}

impl Body {
    /// Dynamic circle, mass derived from area and density
    pub fn circle(position: Vec2, radius: f32, material: Material) -> Self {
        let radius = radius.max(0.5);
        let mass = (std::f32::consts::PI * radius * radius * material.density).max(1e-6);
        // Solid disc
        let inertia = 0.5 * mass * radius * radius;

        Self {
            shape: Shape::Circle { radius },
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia: 1.0 / inertia,
            material,
            is_static: false,
        }
    }

    /// Static axis-aligned box
    pub fn static_rect(center: Vec2, size: Vec2, material: Material) -> Self {
        Self {
            shape: Shape::Rect {
                half_extents: size * 0.5,
            },
            position: center,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            material,
            is_static: true,
        }
    }

    /// Check if this body can move
    pub fn is_dynamic(&self) -> bool {
        !self.is_static
    }

    /// Circle radius, `None` for boxes
    pub fn radius(&self) -> Option<f32> {
        match self.shape {
            Shape::Circle { radius } => Some(radius),
            Shape::Rect { .. } => None,
        }
    }

    /// World-space bounding box
    pub fn bounds(&self) -> Rect {
        match self.shape {
            Shape::Circle { radius } => {
                Rect::from_center_size(self.position, Vec2::new(radius * 2.0, radius * 2.0))
            }
            Shape::Rect { half_extents } => {
                Rect::from_center_size(self.position, half_extents * 2.0)
            }
        }
    }

    /// Whether the point lies on or inside the shape
    pub fn contains_point(&self, point: Vec2) -> bool {
        match self.shape {
            Shape::Circle { radius } => (point - self.position).length_squared() <= radius * radius,
            Shape::Rect { .. } => self.bounds().contains(point),
        }
    }

    /// Replace the box geometry of a static body in place
    pub fn set_rect_geometry(&mut self, center: Vec2, size: Vec2) {
        if let Shape::Rect { half_extents } = &mut self.shape {
            *half_extents = size * 0.5;
            self.position = center;
        }
    }

    /// Velocity of a world point attached to this body
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        let r = point - self.position;
        self.velocity + r.perp() * self.angular_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_mass_from_density() {
        let body = Body::circle(Vec2::ZERO, 10.0, Material::bubble());
        let expected = std::f32::consts::PI * 100.0 * 0.001;
        assert!((body.mass - expected).abs() < 1e-5);
        assert!(body.is_dynamic());
        assert_eq!(body.radius(), Some(10.0));
    }

    #[test]
    fn test_static_rect_is_immovable() {
        let wall = Body::static_rect(Vec2::new(5.0, 5.0), Vec2::new(10.0, 2.0), Material::wall());
        assert_eq!(wall.inv_mass, 0.0);
        assert!(!wall.is_dynamic());
        assert_eq!(wall.bounds(), Rect::new(Vec2::new(0.0, 4.0), Vec2::new(10.0, 6.0)));
    }

    #[test]
    fn test_contains_point() {
        let body = Body::circle(Vec2::new(100.0, 100.0), 20.0, Material::bubble());
        assert!(body.contains_point(Vec2::new(100.0, 100.0)));
        assert!(body.contains_point(Vec2::new(120.0, 100.0)));
        assert!(!body.contains_point(Vec2::new(115.0, 115.0)));
    }

    #[test]
    fn test_set_rect_geometry_ignores_circles() {
        let mut body = Body::circle(Vec2::ZERO, 10.0, Material::bubble());
        body.set_rect_geometry(Vec2::new(50.0, 50.0), Vec2::new(4.0, 4.0));
        assert_eq!(body.position, Vec2::ZERO);
    }
}
