// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer interaction: drag, pop on activate, drop on the trash zone.
//!
//! The controller never touches the engine. It asks a [`BodyLocator`] where
//! bodies are and answers with [`InteractionEvent`]s plus a drag target the
//! owner turns into an engine constraint. Grab and pending-removal state live
//! here, so the gesture logic can be tested against a plain list of circles.

use crate::math::{Rect, Vec2};
use crate::settings::ZoneHitTest;
use crate::task::TaskId;
use std::collections::HashSet;

/// Raw pointer input in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Primary button pressed
    Down(Vec2),
    /// Pointer moved
    Move(Vec2),
    /// Primary button released
    Up(Vec2),
    /// Activation gesture (double-click)
    Activate(Vec2),
}

impl PointerInput {
    /// Screen position carried by the input
    pub fn position(&self) -> Vec2 {
        match *self {
            PointerInput::Down(p)
            | PointerInput::Move(p)
            | PointerInput::Up(p)
            | PointerInput::Activate(p) => p,
        }
    }
}

/// Spatial queries the controller needs, in simulation coordinates
pub trait BodyLocator {
    /// First bubble containing `point`, skipping ids in `exclude`
    fn find_body_at(&self, point: Vec2, exclude: &HashSet<TaskId>) -> Option<TaskId>;
    /// Current center of a bubble
    fn body_center(&self, id: &TaskId) -> Option<Vec2>;
    /// Current rotation of a bubble (radians)
    fn body_angle(&self, id: &TaskId) -> Option<f32>;
    /// Radius of a bubble
    fn body_radius(&self, id: &TaskId) -> Option<f32>;
    /// Whether the bubble still exists
    fn contains(&self, id: &TaskId) -> bool {
        self.body_center(id).is_some()
    }
}

/// Why a deletion was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// Activated (double-clicked)
    Popped,
    /// Released over the trash zone
    Trashed,
}

/// Outbound effect of a pointer gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    /// A bubble was grabbed
    DragStarted(TaskId),
    /// The grabbed bubble was released
    DragEnded(TaskId),
    /// The owning task should be deleted
    DeleteRequested {
        /// Task to delete
        id: TaskId,
        /// Gesture that caused it
        reason: DeleteReason,
    },
}

/// Interaction state of one bubble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Simulated freely
    Free,
    /// Bound to the pointer
    Dragged,
    /// Deleted or awaiting deletion; terminal
    Removed,
}

/// Where the grabbed bubble is pulled, in simulation coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTarget<'a> {
    /// Grabbed bubble
    pub id: &'a TaskId,
    /// Pointer position
    pub point: Vec2,
    /// Grab point relative to the body center, in body-local coordinates
    pub offset: Vec2,
}

/// Turns pointer input into drag, pop and trash behavior
#[derive(Debug, Clone)]
pub struct PointerController {
    grabbed: Option<TaskId>,
    /// Grab point in body-local coordinates
    grab_offset: Vec2,
    pending_removal: HashSet<TaskId>,
    /// Last pointer position in simulation coordinates
    pointer: Option<Vec2>,
    container_origin: Vec2,
    /// Trash zone in screen coordinates
    zone: Option<Rect>,
    hit_test: ZoneHitTest,
    zone_hovered: bool,
    stiffness: f32,
}

impl PointerController {
    /// Create an idle controller
    pub fn new(hit_test: ZoneHitTest, stiffness: f32) -> Self {
        Self {
            grabbed: None,
            grab_offset: Vec2::ZERO,
            pending_removal: HashSet::new(),
            pointer: None,
            container_origin: Vec2::ZERO,
            zone: None,
            hit_test,
            zone_hovered: false,
            stiffness,
        }
    }

    /// Screen position of the simulation container's top-left corner
    pub fn set_container_origin(&mut self, origin: Vec2) {
        self.container_origin = origin;
    }

    /// Screen rectangle of the trash zone
    pub fn set_zone(&mut self, zone: Option<Rect>) {
        self.zone = zone;
    }

    /// Trash zone in screen coordinates
    pub fn zone(&self) -> Option<Rect> {
        self.zone
    }

    /// Drag constraint stiffness
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Whether the grabbed bubble is over the zone
    pub fn zone_hovered(&self) -> bool {
        self.zone_hovered
    }

    /// Currently grabbed bubble
    pub fn grabbed(&self) -> Option<&TaskId> {
        self.grabbed.as_ref()
    }

    /// Process one pointer input
    pub fn handle(&mut self, input: PointerInput, locator: &dyn BodyLocator) -> Vec<InteractionEvent> {
        let point = input.position() - self.container_origin;
        let mut events = Vec::new();

        match input {
            PointerInput::Down(_) => {
                self.pointer = Some(point);
                if self.grabbed.is_some() {
                    return events;
                }
                if let Some(id) = self.hit(point, locator) {
                    tracing::debug!("Drag started on {}", id);
                    // The bubble hangs from the grabbed point, not its center
                    self.grab_offset = match (locator.body_center(&id), locator.body_angle(&id)) {
                        (Some(center), Some(angle)) => (point - center).rotate(-angle),
                        _ => Vec2::ZERO,
                    };
                    self.grabbed = Some(id.clone());
                    events.push(InteractionEvent::DragStarted(id));
                }
            }
            PointerInput::Move(_) => {
                self.pointer = Some(point);
                if let Some(id) = &self.grabbed {
                    if !locator.contains(id) {
                        tracing::warn!("Grabbed bubble {} disappeared during drag", id);
                        self.grabbed = None;
                        self.zone_hovered = false;
                    }
                }
            }
            PointerInput::Up(_) => {
                self.pointer = Some(point);
                self.zone_hovered = false;
                let Some(id) = self.grabbed.take() else {
                    return events;
                };

                if !locator.contains(&id) {
                    tracing::warn!("Released stale bubble {}", id);
                    return events;
                }

                tracing::debug!("Drag ended on {}", id);
                let trashed = self.in_zone(&id, locator);
                events.push(InteractionEvent::DragEnded(id.clone()));
                if trashed {
                    tracing::debug!("Bubble {} dropped on trash", id);
                    self.pending_removal.insert(id.clone());
                    events.push(InteractionEvent::DeleteRequested {
                        id,
                        reason: DeleteReason::Trashed,
                    });
                }
            }
            PointerInput::Activate(_) => {
                if let Some(id) = self.hit(point, locator) {
                    if self.grabbed.as_ref() == Some(&id) {
                        self.grabbed = None;
                        self.zone_hovered = false;
                        events.push(InteractionEvent::DragEnded(id.clone()));
                    }
                    tracing::debug!("Bubble {} popped", id);
                    self.pending_removal.insert(id.clone());
                    events.push(InteractionEvent::DeleteRequested {
                        id,
                        reason: DeleteReason::Popped,
                    });
                }
            }
        }

        events
    }

    fn hit(&self, point: Vec2, locator: &dyn BodyLocator) -> Option<TaskId> {
        locator.find_body_at(point, &self.pending_removal)
    }

    fn in_zone(&self, id: &TaskId, locator: &dyn BodyLocator) -> bool {
        let (Some(zone), Some(center)) = (self.zone, locator.body_center(id)) else {
            return false;
        };
        let screen = center + self.container_origin;

        match self.hit_test {
            ZoneHitTest::Center => zone.contains(screen),
            ZoneHitTest::Circle => {
                let radius = locator.body_radius(id).unwrap_or(0.0);
                zone.intersects_circle(screen, radius)
            }
        }
    }

    /// Per-frame hover check for the grabbed bubble
    pub fn update_hover(&mut self, locator: &dyn BodyLocator) -> bool {
        self.zone_hovered = match &self.grabbed {
            Some(id) if locator.contains(id) => self.in_zone(id, locator),
            _ => false,
        };
        self.zone_hovered
    }

    /// Grabbed bubble, the point it is pulled toward and where it was grabbed
    pub fn drag_target(&self) -> Option<DragTarget<'_>> {
        match (&self.grabbed, self.pointer) {
            (Some(id), Some(point)) => Some(DragTarget {
                id,
                point,
                offset: self.grab_offset,
            }),
            _ => None,
        }
    }

    /// Drop all state about a bubble that left the registry
    pub fn forget(&mut self, id: &TaskId) {
        if self.grabbed.as_ref() == Some(id) {
            self.grabbed = None;
            self.zone_hovered = false;
        }
        self.pending_removal.remove(id);
    }

    /// Interaction state of a bubble
    pub fn body_state(&self, id: &TaskId, locator: &dyn BodyLocator) -> BodyState {
        if self.pending_removal.contains(id) || !locator.contains(id) {
            BodyState::Removed
        } else if self.grabbed.as_ref() == Some(id) {
            BodyState::Dragged
        } else {
            BodyState::Free
        }
    }

    /// Release everything except the container and zone geometry
    pub fn reset(&mut self) {
        self.grabbed = None;
        self.pending_removal.clear();
        self.pointer = None;
        self.zone_hovered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Circles in simulation space, earliest first
    #[derive(Default)]
    struct Circles(Vec<(TaskId, Vec2, f32)>);

    impl Circles {
        fn with(mut self, id: &str, center: Vec2, radius: f32) -> Self {
            self.0.push((TaskId::from(id), center, radius));
            self
        }

        fn remove(&mut self, id: &str) {
            self.0.retain(|(other, _, _)| other.as_str() != id);
        }

        fn move_to(&mut self, id: &str, center: Vec2) {
            if let Some(entry) = self.0.iter_mut().find(|(other, _, _)| other.as_str() == id) {
                entry.1 = center;
            }
        }
    }

    impl BodyLocator for Circles {
        fn find_body_at(&self, point: Vec2, exclude: &HashSet<TaskId>) -> Option<TaskId> {
            self.0
                .iter()
                .find(|(id, center, radius)| !exclude.contains(id) && point.distance(center) <= *radius)
                .map(|(id, _, _)| id.clone())
        }

        fn body_center(&self, id: &TaskId) -> Option<Vec2> {
            self.0.iter().find(|(other, _, _)| other == id).map(|(_, c, _)| *c)
        }

        fn body_angle(&self, id: &TaskId) -> Option<f32> {
            self.body_center(id).map(|_| 0.0)
        }

        fn body_radius(&self, id: &TaskId) -> Option<f32> {
            self.0.iter().find(|(other, _, _)| other == id).map(|(_, _, r)| *r)
        }
    }

    fn controller() -> PointerController {
        let mut controller = PointerController::new(ZoneHitTest::Center, 0.2);
        controller.set_zone(Some(Rect::new(Vec2::new(700.0, 500.0), Vec2::new(780.0, 580.0))));
        controller
    }

    fn deletions(events: &[InteractionEvent]) -> Vec<(TaskId, DeleteReason)> {
        events
            .iter()
            .filter_map(|event| match event {
                InteractionEvent::DeleteRequested { id, reason } => Some((id.clone(), *reason)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_drag_start_and_end() {
        let circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();

        let events = controller.handle(PointerInput::Down(Vec2::new(105.0, 100.0)), &circles);
        assert_eq!(events, vec![InteractionEvent::DragStarted(TaskId::from("a"))]);
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Dragged);

        controller.handle(PointerInput::Move(Vec2::new(200.0, 150.0)), &circles);
        let target = controller.drag_target().unwrap();
        assert_eq!(target.id, &TaskId::from("a"));
        assert_eq!(target.point, Vec2::new(200.0, 150.0));
        assert_eq!(target.offset, Vec2::new(5.0, 0.0));

        let events = controller.handle(PointerInput::Up(Vec2::new(200.0, 150.0)), &circles);
        assert_eq!(events, vec![InteractionEvent::DragEnded(TaskId::from("a"))]);
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Free);
        assert!(controller.drag_target().is_none());
    }

    #[test]
    fn test_down_on_empty_space_grabs_nothing() {
        let circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();
        assert!(controller.handle(PointerInput::Down(Vec2::new(400.0, 400.0)), &circles).is_empty());
        assert!(controller.handle(PointerInput::Up(Vec2::new(400.0, 400.0)), &circles).is_empty());
    }

    #[test]
    fn test_drop_inside_zone_deletes_once() {
        let mut circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();

        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);
        circles.move_to("a", Vec2::new(740.0, 540.0));
        assert!(controller.update_hover(&circles));

        let events = controller.handle(PointerInput::Up(Vec2::new(740.0, 540.0)), &circles);
        assert_eq!(deletions(&events), vec![(TaskId::from("a"), DeleteReason::Trashed)]);
        assert!(!controller.zone_hovered());
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Removed);

        // A second release without a grab does nothing
        let events = controller.handle(PointerInput::Up(Vec2::new(740.0, 540.0)), &circles);
        assert!(events.is_empty());
    }

    #[test]
    fn test_hover_then_leave_zone_does_not_delete() {
        let mut circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();

        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);
        circles.move_to("a", Vec2::new(740.0, 540.0));
        assert!(controller.update_hover(&circles));

        circles.move_to("a", Vec2::new(300.0, 300.0));
        assert!(!controller.update_hover(&circles));

        let events = controller.handle(PointerInput::Up(Vec2::new(300.0, 300.0)), &circles);
        assert!(deletions(&events).is_empty());
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Free);
    }

    #[test]
    fn test_center_hit_test_ignores_edge_overlap() {
        // Circle overlaps the zone edge but its center is outside
        let mut circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();
        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);
        circles.move_to("a", Vec2::new(680.0, 540.0));
        assert!(!controller.update_hover(&circles));
        let events = controller.handle(PointerInput::Up(Vec2::new(680.0, 540.0)), &circles);
        assert!(deletions(&events).is_empty());
    }

    #[test]
    fn test_circle_hit_test_counts_edge_overlap() {
        let mut circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = PointerController::new(ZoneHitTest::Circle, 0.2);
        controller.set_zone(Some(Rect::new(Vec2::new(700.0, 500.0), Vec2::new(780.0, 580.0))));

        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);
        circles.move_to("a", Vec2::new(680.0, 540.0));
        assert!(controller.update_hover(&circles));
        let events = controller.handle(PointerInput::Up(Vec2::new(680.0, 540.0)), &circles);
        assert_eq!(deletions(&events).len(), 1);
    }

    #[test]
    fn test_activate_pops_body_at_center() {
        let circles = Circles::default()
            .with("a", Vec2::new(100.0, 100.0), 30.0)
            .with("b", Vec2::new(300.0, 100.0), 30.0);
        let mut controller = controller();

        let events = controller.handle(PointerInput::Activate(Vec2::new(300.0, 100.0)), &circles);
        assert_eq!(deletions(&events), vec![(TaskId::from("b"), DeleteReason::Popped)]);
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Free);

        // Already pending: a second activation is ignored
        let events = controller.handle(PointerInput::Activate(Vec2::new(300.0, 100.0)), &circles);
        assert!(events.is_empty());
    }

    #[test]
    fn test_activate_on_overlap_picks_first() {
        let circles = Circles::default()
            .with("old", Vec2::new(100.0, 100.0), 30.0)
            .with("new", Vec2::new(110.0, 100.0), 30.0);
        let mut controller = controller();
        let events = controller.handle(PointerInput::Activate(Vec2::new(105.0, 100.0)), &circles);
        assert_eq!(deletions(&events), vec![(TaskId::from("old"), DeleteReason::Popped)]);
    }

    #[test]
    fn test_pending_body_does_not_shadow_body_below() {
        let circles = Circles::default()
            .with("old", Vec2::new(100.0, 100.0), 30.0)
            .with("new", Vec2::new(110.0, 100.0), 30.0);
        let mut controller = controller();
        controller.handle(PointerInput::Activate(Vec2::new(105.0, 100.0)), &circles);

        // "old" still exists until the owner reconciles; the next hit is "new"
        let events = controller.handle(PointerInput::Activate(Vec2::new(105.0, 100.0)), &circles);
        assert_eq!(deletions(&events), vec![(TaskId::from("new"), DeleteReason::Popped)]);

        let events = controller.handle(PointerInput::Down(Vec2::new(105.0, 100.0)), &circles);
        assert!(events.is_empty());
    }

    #[test]
    fn test_grab_offset_is_body_local() {
        let circles = Circles::default().with("a", Vec2::new(300.0, 300.0), 80.0);
        let mut controller = controller();
        controller.handle(PointerInput::Down(Vec2::new(370.0, 290.0)), &circles);

        let target = controller.drag_target().unwrap();
        assert_eq!(target.point, Vec2::new(370.0, 290.0));
        assert_eq!(target.offset, Vec2::new(70.0, -10.0));
    }

    #[test]
    fn test_container_origin_translates_points() {
        let circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();
        controller.set_container_origin(Vec2::new(50.0, 20.0));

        let events = controller.handle(PointerInput::Activate(Vec2::new(150.0, 120.0)), &circles);
        assert_eq!(deletions(&events).len(), 1);
    }

    #[test]
    fn test_stale_grab_is_noop() {
        let mut circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();
        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);

        circles.remove("a");
        assert!(!controller.update_hover(&circles));
        let events = controller.handle(PointerInput::Up(Vec2::new(740.0, 540.0)), &circles);
        assert!(events.is_empty());
        assert_eq!(controller.body_state(&TaskId::from("a"), &circles), BodyState::Removed);
    }

    #[test]
    fn test_forget_clears_grab_and_pending() {
        let circles = Circles::default().with("a", Vec2::new(100.0, 100.0), 30.0);
        let mut controller = controller();
        controller.handle(PointerInput::Down(Vec2::new(100.0, 100.0)), &circles);
        controller.forget(&TaskId::from("a"));
        assert!(controller.grabbed().is_none());
        assert!(controller.drag_target().is_none());
    }
}
