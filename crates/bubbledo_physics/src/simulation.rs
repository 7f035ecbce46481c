// SPDX-License-Identifier: MIT OR Apache-2.0
//! The simulation as one owned, scoped unit.
//!
//! [`Simulation`] holds the engine, the walls, the registry, the pointer
//! controller and the frame loop. Dropping it (or calling
//! [`Simulation::teardown`]) stops the loop and releases every body and
//! constraint, whatever path the host takes out.

use crate::boundary::{Boundaries, Viewport};
use crate::clock::FixedStepClock;
use crate::engine::Engine;
use crate::frame_loop::{CancellationToken, FrameLoop};
use crate::math::{Rect, Vec2};
use crate::pointer::{BodyLocator, BodyState, InteractionEvent, PointerController, PointerInput};
use crate::registry::{BodyRegistry, ReconcileReport};
use crate::render_sync::{RenderSync, SyncStats, VisualLayer};
use crate::settings::{Result, SimulationSettings};
use crate::task::{Task, TaskId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Mailbox for viewport changes.
///
/// May be posted from any thread; the latest value wins and is applied at the
/// start of the next frame.
#[derive(Debug, Clone, Default)]
pub struct ViewportSignal(Arc<Mutex<Option<Viewport>>>);

impl ViewportSignal {
    /// Post a new viewport size
    pub fn post(&self, viewport: Viewport) {
        *self.0.lock() = Some(viewport);
    }

    /// Take the pending viewport, if any
    pub fn take(&self) -> Option<Viewport> {
        self.0.lock().take()
    }
}

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Engine ticks run
    pub steps: u32,
    /// Render sync counters
    pub sync: SyncStats,
    /// Whether the grabbed bubble is over the trash zone
    pub zone_hovered: bool,
    /// Whether the host should request another frame
    pub running: bool,
}

/// Read-only view answering pointer queries against live bubbles
struct BodyView<'a> {
    registry: &'a BodyRegistry,
    engine: &'a Engine,
}

impl BodyLocator for BodyView<'_> {
    fn find_body_at(&self, point: Vec2, exclude: &HashSet<TaskId>) -> Option<TaskId> {
        self.engine
            .query_point(point)
            .into_iter()
            .filter_map(|handle| self.registry.task_id(handle))
            .find(|id| !exclude.contains(*id))
            .cloned()
    }

    fn body_center(&self, id: &TaskId) -> Option<Vec2> {
        let handle = self.registry.handle(id)?;
        self.engine.body(handle).map(|body| body.position)
    }

    fn body_angle(&self, id: &TaskId) -> Option<f32> {
        let handle = self.registry.handle(id)?;
        self.engine.body(handle).map(|body| body.angle)
    }

    fn body_radius(&self, id: &TaskId) -> Option<f32> {
        let handle = self.registry.handle(id)?;
        self.engine.body(handle).and_then(|body| body.radius())
    }

    fn contains(&self, id: &TaskId) -> bool {
        self.registry.contains(id)
    }
}

/// Bubble simulation with guaranteed teardown
pub struct Simulation {
    settings: SimulationSettings,
    engine: Engine,
    boundaries: Boundaries,
    registry: BodyRegistry,
    controller: PointerController,
    frame_loop: FrameLoop,
    clock: FixedStepClock,
    signal: ViewportSignal,
    torn_down: bool,
}

impl Simulation {
    /// Validate settings, build the world and start the frame loop
    pub fn new(settings: SimulationSettings, viewport: Viewport) -> Result<Self> {
        settings.validate()?;

        let mut engine = Engine::new(&settings);
        let boundaries = Boundaries::initialize(&mut engine, viewport, &settings);
        let registry = BodyRegistry::new(&settings);
        let controller = PointerController::new(settings.zone_hit_test, settings.drag_stiffness);
        let clock = FixedStepClock::new(settings.fixed_timestep, settings.max_substeps);
        let mut frame_loop = FrameLoop::new();
        frame_loop.start();

        tracing::info!("Simulation started");

        Ok(Self {
            settings,
            engine,
            boundaries,
            registry,
            controller,
            frame_loop,
            clock,
            signal: ViewportSignal::default(),
            torn_down: false,
        })
    }

    /// Sync the body set with the task list
    pub fn reconcile(&mut self, tasks: &[Task]) -> ReconcileReport {
        if self.torn_down {
            return ReconcileReport::default();
        }

        let report = self
            .registry
            .reconcile(tasks, &mut self.engine, self.boundaries.viewport());
        for id in &report.removed {
            self.controller.forget(id);
        }
        if !report.is_empty() {
            self.sync_drag();
        }
        report
    }

    /// Apply a new viewport immediately.
    ///
    /// Walls are reshaped in place. Bubbles left outside the new bounds are
    /// moved back in and stopped.
    pub fn resize(&mut self, viewport: Viewport) -> Viewport {
        if self.torn_down {
            return self.boundaries.viewport();
        }

        let applied = self.boundaries.resize(&mut self.engine, viewport);
        let margin = self.settings.spawn.margin;
        let mut clamped = 0;

        for (_, handle) in self.registry.iter() {
            let Some(body) = self.engine.body_mut(handle) else {
                continue;
            };
            let radius = body.radius().unwrap_or(0.0);
            let mut moved = false;

            if body.position.x > applied.width {
                body.position.x = applied.width - margin;
                moved = true;
            } else if body.position.x < 0.0 {
                body.position.x = margin;
                moved = true;
            }
            if body.position.y > applied.height {
                body.position.y = applied.height - radius;
                moved = true;
            }

            if moved {
                body.velocity = Vec2::ZERO;
                body.angular_velocity = 0.0;
                clamped += 1;
            }
        }

        if clamped > 0 {
            tracing::debug!("Moved {} bubbles back inside after resize", clamped);
        }
        applied
    }

    /// Mailbox for viewport changes, applied at the start of the next frame
    pub fn viewport_signal(&self) -> ViewportSignal {
        self.signal.clone()
    }

    /// Screen position of the simulation container
    pub fn set_container_origin(&mut self, origin: Vec2) {
        self.controller.set_container_origin(origin);
    }

    /// Screen rectangle of the trash zone
    pub fn set_zone(&mut self, zone: Option<Rect>) {
        self.controller.set_zone(zone);
    }

    /// Feed one pointer input
    pub fn handle_pointer(&mut self, input: PointerInput) -> Vec<InteractionEvent> {
        if self.torn_down {
            return Vec::new();
        }

        let view = BodyView {
            registry: &self.registry,
            engine: &self.engine,
        };
        let events = self.controller.handle(input, &view);
        self.sync_drag();
        events
    }

    /// Mirror the controller's grab into the engine's drag constraint
    fn sync_drag(&mut self) {
        let stiffness = self.controller.stiffness();
        let bound = self
            .controller
            .drag_target()
            .and_then(|target| Some((self.registry.handle(target.id)?, target.point, target.offset)));

        match bound {
            Some((handle, target, offset)) => {
                if !self.engine.set_drag_constraint(handle, target, offset, stiffness) {
                    self.engine.clear_drag_constraint();
                }
            }
            None => self.engine.clear_drag_constraint(),
        }
    }

    /// Run one animation frame: pending resize, physics ticks, hover check,
    /// then projection onto the visual layer.
    pub fn frame(&mut self, delta_seconds: f32, layer: &mut dyn VisualLayer) -> FrameReport {
        if !self.frame_loop.tick() {
            return FrameReport::default();
        }

        if let Some(viewport) = self.signal.take() {
            self.resize(viewport);
        }

        let steps = self.clock.advance(delta_seconds);
        self.sync_drag();
        for _ in 0..steps {
            self.engine.step();
        }

        let view = BodyView {
            registry: &self.registry,
            engine: &self.engine,
        };
        let zone_hovered = self.controller.update_hover(&view);
        let sync = RenderSync::project(&self.registry, &self.engine, layer);

        tracing::trace!(
            "Frame {}: {} steps, {} applied, {} skipped",
            self.frame_loop.frames(),
            steps,
            sync.applied,
            sync.skipped
        );

        FrameReport {
            steps,
            sync,
            zone_hovered,
            running: self.frame_loop.is_running(),
        }
    }

    /// Whether the grabbed bubble is over the trash zone
    pub fn zone_hovered(&self) -> bool {
        self.controller.zone_hovered()
    }

    /// Interaction state of a bubble
    pub fn body_state(&self, id: &TaskId) -> BodyState {
        let view = BodyView {
            registry: &self.registry,
            engine: &self.engine,
        };
        self.controller.body_state(id, &view)
    }

    /// Number of bubble bodies
    pub fn body_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the frame loop is still running
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Token that stops the frame loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.frame_loop.token()
    }

    /// Task ↔ body registry
    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    /// Physics engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Boundary walls
    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    /// Pointer controller
    pub fn controller(&self) -> &PointerController {
        &self.controller
    }

    /// Frame-to-tick clock
    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    /// Settings in use
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Stop the loop and release every body and constraint. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        self.frame_loop.stop();
        self.engine.clear_drag_constraint();
        self.controller.reset();
        let released = self.registry.teardown(&mut self.engine);
        self.engine.clear();
        self.clock.reset();
        self.torn_down = true;

        tracing::info!("Simulation torn down, released {} bubbles", released);
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::DeleteReason;
    use crate::radius::{MAX_RADIUS, MIN_RADIUS};
    use crate::render_sync::BubbleTransform;
    use std::collections::HashMap;

    #[derive(Default)]
    struct AcceptAll(HashMap<TaskId, BubbleTransform>);

    impl VisualLayer for AcceptAll {
        fn apply_transform(&mut self, id: &TaskId, transform: &BubbleTransform) -> bool {
            self.0.insert(id.clone(), *transform);
            true
        }
    }

    const FRAME: f32 = 1.0 / 60.0;

    fn simulation() -> Simulation {
        let mut settings = SimulationSettings::default();
        settings.spawn.seed = Some(9);
        Simulation::new(settings, Viewport::new(800.0, 600.0)).unwrap()
    }

    fn run_frames(sim: &mut Simulation, layer: &mut AcceptAll, frames: usize) {
        for _ in 0..frames {
            sim.frame(FRAME, layer);
        }
    }

    fn position(sim: &Simulation, id: &str) -> Vec2 {
        let handle = sim.registry().handle(&TaskId::from(id)).unwrap();
        sim.engine().body(handle).unwrap().position
    }

    fn place(sim: &mut Simulation, id: &str, at: Vec2) {
        let handle = sim.registry.handle(&TaskId::from(id)).unwrap();
        let body = sim.engine.body_mut(handle).unwrap();
        body.position = at;
        body.velocity = Vec2::ZERO;
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let mut settings = SimulationSettings::default();
        settings.drag_stiffness = 0.0;
        assert!(Simulation::new(settings, Viewport::new(800.0, 600.0)).is_err());
    }

    #[test]
    fn test_task_list_scenario() {
        let mut sim = simulation();
        let mut tasks = Vec::new();
        assert!(sim.reconcile(&tasks).is_empty());

        tasks.push(Task::with_id("hi", "Hi", 1));
        sim.reconcile(&tasks);
        assert_eq!(sim.body_count(), 1);
        let handle = sim.registry().handle(&TaskId::from("hi")).unwrap();
        assert_eq!(sim.engine().body(handle).unwrap().radius(), Some(MIN_RADIUS + 4.0));

        tasks.push(Task::with_id("long", "A much longer piece of text here", 2));
        sim.reconcile(&tasks);
        let handle = sim.registry().handle(&TaskId::from("long")).unwrap();
        assert_eq!(sim.engine().body(handle).unwrap().radius(), Some(MAX_RADIUS));

        tasks.remove(0);
        sim.reconcile(&tasks);
        assert_eq!(sim.body_count(), 1);
        assert!(sim.registry().contains(&TaskId::from("long")));
    }

    #[test]
    fn test_bubbles_fall_in_and_stay_inside() {
        let mut sim = simulation();
        let tasks: Vec<Task> = ["a", "bb", "a longer task", "d", "another one here"]
            .iter()
            .enumerate()
            .map(|(i, text)| Task::with_id(format!("t{i}").as_str(), *text, i as u64))
            .collect();
        sim.reconcile(&tasks);

        let mut layer = AcceptAll::default();
        for frame in 0..900 {
            sim.frame(FRAME, &mut layer);
            // Spawns near the margin may start slightly inside a side wall
            if frame < 10 {
                continue;
            }
            for (_, handle) in sim.registry().iter() {
                let body = sim.engine().body(handle).unwrap();
                let r = body.radius().unwrap();
                assert!(body.position.x >= r - 5.0 && body.position.x <= 800.0 - r + 5.0);
                assert!(body.position.y <= 600.0 - r + 5.0);
            }
        }

        for task in &tasks {
            let p = position(&sim, task.id.as_str());
            assert!(p.y > 0.0, "bubble {} never fell into view", task.id);
        }
        assert_eq!(layer.0.len(), tasks.len());
    }

    #[test]
    fn test_resize_clamps_out_of_bounds_bubble() {
        let mut sim = simulation();
        sim.reconcile(&[Task::with_id("a", "edge", 1)]);
        place(&mut sim, "a", Vec2::new(750.0, 300.0));

        let applied = sim.resize(Viewport::new(400.0, 600.0));
        assert_eq!(applied, Viewport::new(400.0, 600.0));

        let right = sim
            .engine()
            .body(sim.boundaries().right_wall)
            .unwrap()
            .bounds();
        assert!((right.min.x - 400.0).abs() < 1e-3);

        let handle = sim.registry().handle(&TaskId::from("a")).unwrap();
        let body = sim.engine().body(handle).unwrap();
        assert!(body.position.x <= 400.0);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_viewport_signal_applies_next_frame() {
        let mut sim = simulation();
        let signal = sim.viewport_signal();
        std::thread::spawn(move || signal.post(Viewport::new(500.0, 400.0)))
            .join()
            .unwrap();

        assert_eq!(sim.boundaries().viewport(), Viewport::new(800.0, 600.0));
        sim.frame(FRAME, &mut AcceptAll::default());
        assert_eq!(sim.boundaries().viewport(), Viewport::new(500.0, 400.0));
        assert_eq!(sim.clock().frame_count(), 1);
    }

    #[test]
    fn test_drag_binds_and_releases_constraint() {
        let mut sim = simulation();
        sim.reconcile(&[Task::with_id("a", "drag me", 1)]);
        place(&mut sim, "a", Vec2::new(200.0, 300.0));

        let events = sim.handle_pointer(PointerInput::Down(Vec2::new(200.0, 300.0)));
        assert_eq!(events, vec![InteractionEvent::DragStarted(TaskId::from("a"))]);
        assert!(sim.engine().drag_constraint().is_some());
        assert_eq!(sim.body_state(&TaskId::from("a")), BodyState::Dragged);

        sim.handle_pointer(PointerInput::Move(Vec2::new(400.0, 200.0)));
        run_frames(&mut sim, &mut AcceptAll::default(), 60);
        let p = position(&sim, "a");
        assert!(p.distance(&Vec2::new(400.0, 200.0)) < 20.0);

        sim.handle_pointer(PointerInput::Up(Vec2::new(400.0, 200.0)));
        assert!(sim.engine().drag_constraint().is_none());
        assert_eq!(sim.body_state(&TaskId::from("a")), BodyState::Free);
    }

    #[test]
    fn test_off_center_grab_hangs_from_grab_point() {
        let mut settings = SimulationSettings::default();
        settings.spawn.seed = Some(9);
        settings.gravity = Vec2::ZERO;
        let mut sim = Simulation::new(settings, Viewport::new(800.0, 600.0)).unwrap();
        sim.reconcile(&[Task::with_id("a", "drag me", 1)]);
        place(&mut sim, "a", Vec2::new(300.0, 300.0));

        // Grab near the rim and hold still: the center stays put
        sim.handle_pointer(PointerInput::Down(Vec2::new(330.0, 300.0)));
        let constraint = sim.engine().drag_constraint().unwrap();
        assert_eq!(constraint.offset, Vec2::new(30.0, 0.0));

        let mut layer = AcceptAll::default();
        run_frames(&mut sim, &mut layer, 60);
        let p = position(&sim, "a");
        assert!((p.x - 300.0).abs() < 1.0 && (p.y - 300.0).abs() < 1.0, "center moved to {p:?}");

        // Moving the pointer carries the grab point, not the center, to it
        sim.handle_pointer(PointerInput::Move(Vec2::new(500.0, 300.0)));
        run_frames(&mut sim, &mut layer, 60);
        let p = position(&sim, "a");
        assert!(p.distance(&Vec2::new(470.0, 300.0)) < 5.0, "center at {p:?}");
    }

    #[test]
    fn test_resize_during_drag_keeps_constraint() {
        let mut sim = simulation();
        sim.reconcile(&[Task::with_id("a", "drag me", 1)]);
        place(&mut sim, "a", Vec2::new(200.0, 300.0));

        sim.handle_pointer(PointerInput::Down(Vec2::new(200.0, 300.0)));
        sim.handle_pointer(PointerInput::Move(Vec2::new(250.0, 250.0)));
        sim.viewport_signal().post(Viewport::new(400.0, 500.0));

        let mut layer = AcceptAll::default();
        sim.frame(FRAME, &mut layer);
        assert_eq!(sim.boundaries().viewport(), Viewport::new(400.0, 500.0));
        let constraint = sim.engine().drag_constraint().unwrap();
        assert_eq!(Some(constraint.body), sim.registry().handle(&TaskId::from("a")));
        assert_eq!(sim.body_state(&TaskId::from("a")), BodyState::Dragged);

        run_frames(&mut sim, &mut layer, 60);
        assert!(sim.engine().drag_constraint().is_some());
        assert!(position(&sim, "a").distance(&Vec2::new(250.0, 250.0)) < 20.0);
    }

    #[test]
    fn test_drop_on_trash_then_reconcile_removes_body() {
        let mut sim = simulation();
        let zone = Rect::new(Vec2::new(650.0, 450.0), Vec2::new(780.0, 580.0));
        sim.set_zone(Some(zone));
        let mut tasks = vec![Task::with_id("a", "trash me", 1)];
        sim.reconcile(&tasks);
        place(&mut sim, "a", Vec2::new(200.0, 300.0));

        sim.handle_pointer(PointerInput::Down(Vec2::new(200.0, 300.0)));
        sim.handle_pointer(PointerInput::Move(Vec2::new(715.0, 515.0)));
        let mut layer = AcceptAll::default();
        let mut hovered = false;
        for _ in 0..60 {
            hovered |= sim.frame(FRAME, &mut layer).zone_hovered;
        }
        assert!(hovered);

        let events = sim.handle_pointer(PointerInput::Up(Vec2::new(715.0, 515.0)));
        let deletes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, InteractionEvent::DeleteRequested { reason: DeleteReason::Trashed, .. }))
            .collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(sim.body_state(&TaskId::from("a")), BodyState::Removed);

        tasks.clear();
        let report = sim.reconcile(&tasks);
        assert_eq!(report.removed, vec![TaskId::from("a")]);
        assert_eq!(sim.body_count(), 0);
        assert!(!sim.zone_hovered());
    }

    #[test]
    fn test_activate_pops_bubble() {
        let mut sim = simulation();
        sim.set_container_origin(Vec2::new(10.0, 10.0));
        sim.reconcile(&[Task::with_id("a", "pop", 1), Task::with_id("b", "stay", 2)]);
        place(&mut sim, "a", Vec2::new(200.0, 300.0));
        place(&mut sim, "b", Vec2::new(500.0, 300.0));

        let events = sim.handle_pointer(PointerInput::Activate(Vec2::new(210.0, 310.0)));
        assert_eq!(
            events,
            vec![InteractionEvent::DeleteRequested {
                id: TaskId::from("a"),
                reason: DeleteReason::Popped,
            }]
        );
        assert_eq!(sim.body_state(&TaskId::from("b")), BodyState::Free);
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut sim = simulation();
        let token = sim.cancellation_token();
        sim.reconcile(&[Task::with_id("a", "one", 1)]);
        sim.handle_pointer(PointerInput::Down(position(&sim, "a")));

        sim.teardown();
        assert!(token.is_cancelled());
        assert!(!sim.is_running());
        assert_eq!(sim.body_count(), 0);
        assert_eq!(sim.engine().body_count(), 0);
        assert!(sim.engine().drag_constraint().is_none());

        let report = sim.frame(FRAME, &mut AcceptAll::default());
        assert!(!report.running);
        assert_eq!(report.steps, 0);

        // Second teardown and later input are harmless
        sim.teardown();
        assert!(sim.handle_pointer(PointerInput::Up(Vec2::ZERO)).is_empty());
        assert!(sim.reconcile(&[Task::with_id("b", "two", 2)]).is_empty());
    }

    #[test]
    fn test_cancelled_token_stops_frames() {
        let mut sim = simulation();
        sim.cancellation_token().cancel();
        let report = sim.frame(FRAME, &mut AcceptAll::default());
        assert!(!report.running);
        assert!(!sim.is_running());
    }
}
