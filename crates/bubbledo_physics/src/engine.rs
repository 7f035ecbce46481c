// SPDX-License-Identifier: MIT OR Apache-2.0
//! 2D rigid-body simulation engine.
//!
//! This module provides the physics world behind the bubbles:
//! - Rigid body dynamics (gravity, air friction, speed cap)
//! - Collision detection (circle-circle, circle-box)
//! - Collision response with restitution, friction and spin
//! - An elastic drag constraint pulling one body toward the pointer
//!
//! Results are never returned from [`Engine::step`]; callers read body state
//! back through [`Engine::body`].

use crate::body::{Body, BodyHandle, Shape};
use crate::math::Vec2;
use crate::settings::SimulationSettings;
use indexmap::IndexMap;

/// Approach speed below which contacts stop bouncing, so resting bodies settle
const RESTING_SPEED: f32 = 60.0;

/// Fraction of the penetration removed per solver pass (Baumgarte)
const POSITION_CORRECTION: f32 = 0.8;

/// Penetration tolerated without correction, keeps resting contacts stable
const PENETRATION_SLOP: f32 = 0.5;

/// Contact point from collision detection
#[derive(Debug, Clone)]
pub struct Contact {
    /// Body A
    pub body_a: BodyHandle,
    /// Body B
    pub body_b: BodyHandle,
    /// Contact point in world space
    pub point: Vec2,
    /// Contact normal (from A to B)
    pub normal: Vec2,
    /// Penetration depth
    pub depth: f32,
    /// Combined friction
    pub friction: f32,
    /// Combined restitution
    pub restitution: f32,
}

/// Elastic link between a body and a target point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConstraint {
    /// Body being pulled
    pub body: BodyHandle,
    /// Point the anchor is pulled toward
    pub target: Vec2,
    /// Anchor on the body, in body-local coordinates
    pub offset: Vec2,
    /// Fraction of the remaining distance covered per step
    pub stiffness: f32,
}

/// Narrow-phase result before materials are combined
struct Manifold {
    normal: Vec2,
    depth: f32,
    point: Vec2,
}

/// Physics world managing the simulation
pub struct Engine {
    /// Gravity vector (px/s²)
    pub gravity: Vec2,
    /// Fixed timestep for one step (seconds)
    pub fixed_timestep: f32,
    /// Contact solver passes per step
    pub solver_iterations: u32,
    /// Speed cap (px/s)
    pub max_speed: f32,
    /// All bodies, in insertion order
    bodies: IndexMap<BodyHandle, Body>,
    /// Next handle value
    next_handle: u64,
    /// Contacts found by the first solver pass of the last step
    contacts: Vec<Contact>,
    /// Active drag constraint
    drag: Option<DragConstraint>,
    /// Simulated time (seconds)
    elapsed: f64,
    /// Steps taken
    step_count: u64,
}

impl Engine {
    /// Create an empty world from settings
    pub fn new(settings: &SimulationSettings) -> Self {
        tracing::info!(
            "Creating physics engine: gravity ({}, {}), timestep {:.4}s",
            settings.gravity.x,
            settings.gravity.y,
            settings.fixed_timestep
        );

        Self {
            gravity: settings.gravity,
            fixed_timestep: settings.fixed_timestep,
            solver_iterations: settings.solver_iterations.max(1),
            max_speed: settings.max_speed,
            bodies: IndexMap::new(),
            next_handle: 1,
            contacts: Vec::new(),
            drag: None,
            elapsed: 0.0,
            step_count: 0,
        }
    }

    /// Add a body; it takes part in integration and collision from the next step
    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, body);
        handle
    }

    /// Remove a body, releasing any drag constraint bound to it
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        if self.drag.is_some_and(|d| d.body == handle) {
            self.drag = None;
        }
        self.bodies.shift_remove(&handle)
    }

    /// Get a body
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(&handle)
    }

    /// Get a mutable body
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(&handle)
    }

    /// All bodies in insertion order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter().map(|(h, b)| (*h, b))
    }

    /// Number of bodies, static ones included
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Contacts found at the start of the last step
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Simulated time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Steps taken since creation
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Remove every body and constraint
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.drag = None;
    }

    /// Bind the drag constraint to a dynamic body.
    ///
    /// `offset` is the grabbed point relative to the body center, unrotated.
    /// Returns `false` when the body does not exist or is static.
    pub fn set_drag_constraint(&mut self, handle: BodyHandle, target: Vec2, offset: Vec2, stiffness: f32) -> bool {
        match self.bodies.get(&handle) {
            Some(body) if body.is_dynamic() => {
                self.drag = Some(DragConstraint {
                    body: handle,
                    target,
                    offset,
                    stiffness: stiffness.clamp(0.0, 1.0),
                });
                true
            }
            _ => false,
        }
    }

    /// Release the drag constraint
    pub fn clear_drag_constraint(&mut self) {
        self.drag = None;
    }

    /// Current drag constraint
    pub fn drag_constraint(&self) -> Option<DragConstraint> {
        self.drag
    }

    /// Dynamic bodies whose shape contains `point`, in insertion order
    pub fn query_point(&self, point: Vec2) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.is_dynamic() && body.contains_point(point))
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Advance the simulation by one fixed timestep
    pub fn step(&mut self) {
        let dt = self.fixed_timestep;

        let previous: Vec<(BodyHandle, Vec2)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic())
            .map(|(h, b)| (*h, b.position))
            .collect();

        // Apply gravity, damping and the drag constraint
        self.integrate_forces(dt);

        // Integrate velocities to positions
        self.integrate_velocities(dt);

        // Detect and resolve collisions
        self.contacts.clear();
        for iteration in 0..self.solver_iterations {
            let contacts = self.detect_collisions();
            if contacts.is_empty() {
                break;
            }
            self.resolve_collisions(&contacts);
            if iteration == 0 {
                self.contacts = contacts;
            }
        }

        self.recover_non_finite(&previous);

        self.elapsed += dt as f64;
        self.step_count += 1;
    }

    fn integrate_forces(&mut self, dt: f32) {
        let drag = self.drag;
        let gravity = self.gravity;
        let max_speed = self.max_speed;

        for (handle, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() {
                continue;
            }

            body.velocity += gravity * dt;

            let damping = (1.0 - body.material.air_friction).clamp(0.0, 1.0);
            body.velocity = body.velocity * damping;
            body.angular_velocity *= damping;

            // The constraint dominates gravity while bound
            if let Some(constraint) = drag.filter(|d| d.body == *handle) {
                let anchor = body.position + constraint.offset.rotate(body.angle);
                body.velocity = (constraint.target - anchor) * (constraint.stiffness / dt);
            }

            let speed = body.velocity.length();
            if speed > max_speed {
                body.velocity = body.velocity * (max_speed / speed);
            }
        }
    }

    fn integrate_velocities(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if !body.is_dynamic() {
                continue;
            }

            body.position += body.velocity * dt;
            body.angle = (body.angle + body.angular_velocity * dt) % std::f32::consts::TAU;
        }
    }

    fn detect_collisions(&self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let entries: Vec<(BodyHandle, &Body)> = self.bodies.iter().map(|(h, b)| (*h, b)).collect();

        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (id_a, body_a) = entries[i];
                let (id_b, body_b) = entries[j];

                if !body_a.is_dynamic() && !body_b.is_dynamic() {
                    continue;
                }

                if let Some(manifold) = test_collision(body_a, body_b) {
                    contacts.push(Contact {
                        body_a: id_a,
                        body_b: id_b,
                        point: manifold.point,
                        normal: manifold.normal,
                        depth: manifold.depth,
                        friction: body_a.material.friction.min(body_b.material.friction),
                        restitution: body_a.material.restitution.max(body_b.material.restitution),
                    });
                }
            }
        }

        contacts
    }

    fn resolve_collisions(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            let (Some(a), Some(b)) = (self.bodies.get(&contact.body_a), self.bodies.get(&contact.body_b)) else {
                continue;
            };

            let total_inv_mass = a.inv_mass + b.inv_mass;
            if total_inv_mass <= 0.0 {
                continue; // Both objects are static
            }

            let (inv_mass_a, inv_mass_b) = (a.inv_mass, b.inv_mass);
            let (inv_inertia_a, inv_inertia_b) = (a.inv_inertia, b.inv_inertia);
            let ra = contact.point - a.position;
            let rb = contact.point - b.position;
            let mut vel_a = a.velocity;
            let mut vel_b = b.velocity;
            let mut spin_a = a.angular_velocity;
            let mut spin_b = b.angular_velocity;

            let relative = b.velocity_at(contact.point) - a.velocity_at(contact.point);
            let normal_vel = relative.dot(&contact.normal);

            // Only apply impulses if the bodies are approaching
            if normal_vel < 0.0 {
                let restitution = if -normal_vel < RESTING_SPEED {
                    0.0
                } else {
                    contact.restitution
                };
                let j = -(1.0 + restitution) * normal_vel / total_inv_mass;
                let impulse = contact.normal * j;
                vel_a -= impulse * inv_mass_a;
                vel_b += impulse * inv_mass_b;

                // Coulomb friction along the tangent
                let relative = (vel_b + rb.perp() * spin_b) - (vel_a + ra.perp() * spin_a);
                let tangent_vel = relative - contact.normal * relative.dot(&contact.normal);
                if tangent_vel.length_squared() > 1e-8 {
                    let tangent = tangent_vel.normalize();
                    let ra_t = ra.cross(&tangent);
                    let rb_t = rb.cross(&tangent);
                    let denom = total_inv_mass
                        + ra_t * ra_t * inv_inertia_a
                        + rb_t * rb_t * inv_inertia_b;
                    let max_friction = contact.friction * j;
                    let jt = (-relative.dot(&tangent) / denom).clamp(-max_friction, max_friction);
                    let friction = tangent * jt;

                    vel_a -= friction * inv_mass_a;
                    spin_a -= ra.cross(&friction) * inv_inertia_a;
                    vel_b += friction * inv_mass_b;
                    spin_b += rb.cross(&friction) * inv_inertia_b;
                }
            }

            // Position correction (prevent sinking)
            let correction_amount =
                (contact.depth - PENETRATION_SLOP).max(0.0) * POSITION_CORRECTION / total_inv_mass;
            let correction = contact.normal * correction_amount;

            if let Some(body) = self.bodies.get_mut(&contact.body_a) {
                if body.is_dynamic() {
                    body.velocity = vel_a;
                    body.angular_velocity = spin_a;
                    body.position -= correction * inv_mass_a;
                }
            }
            if let Some(body) = self.bodies.get_mut(&contact.body_b) {
                if body.is_dynamic() {
                    body.velocity = vel_b;
                    body.angular_velocity = spin_b;
                    body.position += correction * inv_mass_b;
                }
            }
        }
    }

    /// Degenerate input must never poison the world
    fn recover_non_finite(&mut self, previous: &[(BodyHandle, Vec2)]) {
        for (handle, last_position) in previous {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };

            if body.position.is_finite()
                && body.velocity.is_finite()
                && body.angle.is_finite()
                && body.angular_velocity.is_finite()
            {
                continue;
            }

            tracing::warn!("Body {:?} diverged, restoring last finite state", handle);
            body.position = if last_position.is_finite() {
                *last_position
            } else {
                Vec2::ZERO
            };
            body.velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
            if !body.angle.is_finite() {
                body.angle = 0.0;
            }
        }
    }
}

fn test_collision(a: &Body, b: &Body) -> Option<Manifold> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            test_circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Circle { radius }, Shape::Rect { half_extents }) => {
            test_circle_rect(a.position, radius, b.position, half_extents)
        }
        (Shape::Rect { half_extents }, Shape::Circle { radius }) => {
            // Swap order and negate normal
            test_circle_rect(b.position, radius, a.position, half_extents).map(|mut m| {
                m.normal = -m.normal;
                m
            })
        }
        // Boxes are always static walls
        (Shape::Rect { .. }, Shape::Rect { .. }) => None,
    }
}

fn test_circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Manifold> {
    let diff = pos_b - pos_a;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0001 {
        diff * (1.0 / dist)
    } else {
        Vec2::new(0.0, 1.0)
    };

    Some(Manifold {
        normal,
        depth: min_dist - dist,
        point: pos_a + normal * radius_a,
    })
}

/// Normal points from the circle toward the box
fn test_circle_rect(center: Vec2, radius: f32, box_pos: Vec2, half: Vec2) -> Option<Manifold> {
    let local = center - box_pos;
    let closest = Vec2::new(local.x.clamp(-half.x, half.x), local.y.clamp(-half.y, half.y));

    if closest == local {
        // Center inside the box: push out along the shallowest axis
        let dx = half.x - local.x.abs();
        let dy = half.y - local.y.abs();
        let (normal, depth, surface) = if dx < dy {
            let sign = if local.x >= 0.0 { 1.0 } else { -1.0 };
            (Vec2::new(-sign, 0.0), radius + dx, Vec2::new(sign * half.x, local.y))
        } else {
            let sign = if local.y >= 0.0 { 1.0 } else { -1.0 };
            (Vec2::new(0.0, -sign), radius + dy, Vec2::new(local.x, sign * half.y))
        };
        return Some(Manifold {
            normal,
            depth,
            point: box_pos + surface,
        });
    }

    let diff = local - closest;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    Some(Manifold {
        normal: -(diff * (1.0 / dist)),
        depth: radius - dist,
        point: box_pos + closest,
    })
}
