// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bubble physics core for `BubbleDo`.
//!
//! This crate owns everything between the task list and the pixels:
//! - A 2D rigid-body engine (gravity, circle/box collision, bounce, drag constraint)
//! - Boundary walls that follow the viewport size
//! - A registry keeping one simulation body per task
//! - A render sync pass projecting body state onto visual elements
//! - Pointer interaction (drag, pop on double-click, drop on trash)
//!
//! ## Architecture
//!
//! [`Simulation`] is the single owner of all of the above. The host drives it
//! once per animation frame through [`Simulation::frame`] and feeds it task
//! list changes, viewport changes and pointer input. Outbound effects are
//! deletion requests ([`InteractionEvent`]) and per-body transforms written
//! through the [`VisualLayer`] trait.

pub mod body;
pub mod boundary;
pub mod clock;
pub mod engine;
pub mod frame_loop;
pub mod math;
pub mod pointer;
pub mod radius;
pub mod registry;
pub mod render_sync;
pub mod settings;
pub mod simulation;
pub mod task;

pub use body::{Body, BodyHandle, Material, Shape};
pub use boundary::{Boundaries, Viewport, WallGeometry, WallSide};
pub use clock::FixedStepClock;
pub use engine::Engine;
pub use frame_loop::{CancellationToken, FrameLoop};
pub use math::{Rect, Vec2};
pub use pointer::{
    BodyLocator, BodyState, DeleteReason, DragTarget, InteractionEvent, PointerController,
    PointerInput,
};
pub use radius::{bubble_radius, MAX_RADIUS, MIN_RADIUS};
pub use registry::{BodyRegistry, ReconcileReport};
pub use render_sync::{BubbleTransform, RenderSync, SyncStats, VisualLayer};
pub use settings::{SettingsError, SimulationSettings, ZoneHitTest};
pub use simulation::{FrameReport, Simulation, ViewportSignal};
pub use task::{Task, TaskId};
