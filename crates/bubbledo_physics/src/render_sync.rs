// SPDX-License-Identifier: MIT OR Apache-2.0
//! Projection of body state onto visual elements.

use crate::engine::Engine;
use crate::math::Vec2;
use crate::registry::BodyRegistry;
use crate::task::TaskId;
use std::fmt;

/// Receives per-bubble transforms each frame
pub trait VisualLayer {
    /// Apply a transform to the element of `id`.
    ///
    /// Returns `false` when no element is mounted for that id yet.
    fn apply_transform(&mut self, id: &TaskId, transform: &BubbleTransform) -> bool;
}

/// Screen transform of one bubble element.
///
/// Elements are anchored at their top-left corner, so the body center is
/// reached by translating to the body position and then shifting back by half
/// of the element's own size ([`BubbleTransform::SELF_OFFSET`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleTransform {
    /// Body center in container coordinates
    pub translation: Vec2,
    /// Rotation in radians
    pub rotation: f32,
}

impl BubbleTransform {
    /// Self-relative offset applied after translation and rotation
    pub const SELF_OFFSET: Vec2 = Vec2::new(-0.5, -0.5);

    /// Top-left corner of an element of `size` centered on the body
    pub fn top_left(&self, size: Vec2) -> Vec2 {
        self.translation + Vec2::new(size.x * Self::SELF_OFFSET.x, size.y * Self::SELF_OFFSET.y)
    }

    /// Element center in screen space, given the container's screen origin
    pub fn screen_center(&self, origin: Vec2) -> Vec2 {
        origin + self.translation
    }
}

impl fmt::Display for BubbleTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate3d({}px, {}px, 0) rotate({}rad) translate({}%, {}%)",
            self.translation.x,
            self.translation.y,
            self.rotation,
            Self::SELF_OFFSET.x * 100.0,
            Self::SELF_OFFSET.y * 100.0
        )
    }
}

/// Counters for one projection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Elements updated
    pub applied: usize,
    /// Bodies without a mounted element
    pub skipped: usize,
}

/// Read-only projection pass
pub struct RenderSync;

impl RenderSync {
    /// Write every registered body's transform to the visual layer.
    ///
    /// Takes only shared borrows of the simulation, so projecting can never
    /// change it. Bodies without an element are skipped for this frame.
    pub fn project(registry: &BodyRegistry, engine: &Engine, layer: &mut dyn VisualLayer) -> SyncStats {
        let mut stats = SyncStats::default();

        for (id, handle) in registry.iter() {
            let Some(body) = engine.body(handle) else {
                stats.skipped += 1;
                continue;
            };

            let transform = BubbleTransform {
                translation: body.position,
                rotation: body.angle,
            };

            if layer.apply_transform(id, &transform) {
                stats.applied += 1;
            } else {
                stats.skipped += 1;
            }
        }

        if stats.skipped > 0 {
            tracing::trace!("Render sync skipped {} bodies without elements", stats.skipped);
        }

        stats
    }
}
