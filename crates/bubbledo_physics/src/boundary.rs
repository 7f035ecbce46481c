// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary walls enclosing the play area.
//!
//! Four static boxes (floor, ceiling, left and right wall) follow the
//! viewport. They are created once and afterwards only reshaped, so their
//! handles stay valid for the whole simulation lifetime.

use crate::body::{Body, BodyHandle};
use crate::engine::Engine;
use crate::math::{Rect, Vec2};
use crate::settings::SimulationSettings;
use serde::{Deserialize, Serialize};

/// Size of the area bubbles live in, in simulation pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamp degenerate dimensions to `min_extent`
    pub fn sanitized(&self, min_extent: f32) -> Self {
        let clamp = |v: f32| if v.is_finite() && v >= min_extent { v } else { min_extent };
        Self {
            width: clamp(self.width),
            height: clamp(self.height),
        }
    }
}

/// Which wall a body is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallSide {
    /// Below the visible area
    Floor,
    /// High above the visible area
    Ceiling,
    /// Left of x=0
    Left,
    /// Right of x=width
    Right,
}

impl WallSide {
    /// All sides, in layout order
    pub fn all() -> [WallSide; 4] {
        [WallSide::Floor, WallSide::Ceiling, WallSide::Left, WallSide::Right]
    }
}

/// Geometry of one wall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometry {
    /// Which wall
    pub side: WallSide,
    /// Center point
    pub center: Vec2,
    /// Full size
    pub size: Vec2,
}

impl WallGeometry {
    /// Bounding rectangle
    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.center, self.size)
    }
}

/// The four boundary bodies
#[derive(Debug, Clone)]
pub struct Boundaries {
    /// Floor handle
    pub floor: BodyHandle,
    /// Ceiling handle
    pub ceiling: BodyHandle,
    /// Left wall handle
    pub left_wall: BodyHandle,
    /// Right wall handle
    pub right_wall: BodyHandle,
    thickness: f32,
    ceiling_multiple: f32,
    min_extent: f32,
    viewport: Viewport,
}

impl Boundaries {
    /// Compute wall geometry for a viewport.
    ///
    /// Floor and ceiling overhang both sides by one thickness and the side
    /// walls span from the top of the ceiling to the bottom of the floor, so
    /// the corners are closed.
    pub fn layout(viewport: Viewport, thickness: f32, ceiling_multiple: f32) -> [WallGeometry; 4] {
        let (w, h, t) = (viewport.width, viewport.height, thickness);
        let ceiling_y = -ceiling_multiple * t;
        let top = ceiling_y - t * 0.5;
        let bottom = h + t;
        let side_height = bottom - top;
        let side_y = (top + bottom) * 0.5;

        [
            WallGeometry {
                side: WallSide::Floor,
                center: Vec2::new(w * 0.5, h + t * 0.5),
                size: Vec2::new(w + t * 2.0, t),
            },
            WallGeometry {
                side: WallSide::Ceiling,
                center: Vec2::new(w * 0.5, ceiling_y),
                size: Vec2::new(w + t * 2.0, t),
            },
            WallGeometry {
                side: WallSide::Left,
                center: Vec2::new(-t * 0.5, side_y),
                size: Vec2::new(t, side_height),
            },
            WallGeometry {
                side: WallSide::Right,
                center: Vec2::new(w + t * 0.5, side_y),
                size: Vec2::new(t, side_height),
            },
        ]
    }

    /// Create the four walls in the engine
    pub fn initialize(engine: &mut Engine, viewport: Viewport, settings: &SimulationSettings) -> Self {
        let viewport = viewport.sanitized(settings.min_viewport_extent);
        let [floor, ceiling, left, right] =
            Self::layout(viewport, settings.wall_thickness, settings.ceiling_multiple)
                .map(|g| engine.add_body(Body::static_rect(g.center, g.size, settings.wall_material)));

        tracing::info!(
            "Boundaries created for {}x{} viewport",
            viewport.width,
            viewport.height
        );

        Self {
            floor,
            ceiling,
            left_wall: left,
            right_wall: right,
            thickness: settings.wall_thickness,
            ceiling_multiple: settings.ceiling_multiple,
            min_extent: settings.min_viewport_extent,
            viewport,
        }
    }

    /// Reshape the existing walls for a new viewport.
    ///
    /// Returns the sanitized viewport actually applied.
    pub fn resize(&mut self, engine: &mut Engine, viewport: Viewport) -> Viewport {
        let viewport = viewport.sanitized(self.min_extent);

        for geometry in Self::layout(viewport, self.thickness, self.ceiling_multiple) {
            let handle = self.handle(geometry.side);
            match engine.body_mut(handle) {
                Some(body) => body.set_rect_geometry(geometry.center, geometry.size),
                None => tracing::warn!("Wall {:?} missing from engine", geometry.side),
            }
        }

        if viewport != self.viewport {
            tracing::info!(
                "Boundaries resized from {}x{} to {}x{}",
                self.viewport.width,
                self.viewport.height,
                viewport.width,
                viewport.height
            );
        }
        self.viewport = viewport;
        viewport
    }

    /// Handle of one wall
    pub fn handle(&self, side: WallSide) -> BodyHandle {
        match side {
            WallSide::Floor => self.floor,
            WallSide::Ceiling => self.ceiling,
            WallSide::Left => self.left_wall,
            WallSide::Right => self.right_wall,
        }
    }

    /// Whether a handle belongs to one of the walls
    pub fn is_wall(&self, handle: BodyHandle) -> bool {
        WallSide::all().iter().any(|side| self.handle(*side) == handle)
    }

    /// Current (sanitized) viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Wall thickness
    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    /// The region bubbles may occupy, from the ceiling's inner face to the floor
    pub fn play_area(&self) -> Rect {
        Rect::new(
            Vec2::new(0.0, -self.ceiling_multiple * self.thickness + self.thickness * 0.5),
            Vec2::new(self.viewport.width, self.viewport.height),
        )
    }
}
