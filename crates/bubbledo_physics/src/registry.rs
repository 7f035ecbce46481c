// SPDX-License-Identifier: MIT OR Apache-2.0
//! Task ↔ body registry.
//!
//! The registry is the only place that creates or destroys bubble bodies.
//! After every [`BodyRegistry::reconcile`] it holds exactly one dynamic body
//! per task in the observed list and nothing else.

use crate::body::{Body, BodyHandle, Material};
use crate::boundary::Viewport;
use crate::engine::Engine;
use crate::math::Vec2;
use crate::radius::bubble_radius;
use crate::settings::{SimulationSettings, SpawnSettings};
use crate::task::{Task, TaskId};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tasks that received a new body
    pub created: Vec<TaskId>,
    /// Tasks whose body was removed
    pub removed: Vec<TaskId>,
}

impl ReconcileReport {
    /// True when the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Owns the bijection between live tasks and bubble bodies
pub struct BodyRegistry {
    bodies: IndexMap<TaskId, BodyHandle>,
    tasks_by_body: HashMap<BodyHandle, TaskId>,
    rng: StdRng,
    spawn: SpawnSettings,
    material: Material,
}

impl BodyRegistry {
    /// Create an empty registry
    pub fn new(settings: &SimulationSettings) -> Self {
        let rng = match settings.spawn.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            bodies: IndexMap::new(),
            tasks_by_body: HashMap::new(),
            rng,
            spawn: settings.spawn.clone(),
            material: settings.bubble_material,
        }
    }

    /// Bring the body set in line with `tasks`.
    ///
    /// Bodies of tasks no longer listed are removed from the engine; tasks
    /// without a body get one spawned above the visible area.
    pub fn reconcile(&mut self, tasks: &[Task], engine: &mut Engine, viewport: Viewport) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let live: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();

        let stale: Vec<TaskId> = self
            .bodies
            .keys()
            .filter(|id| !live.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handle) = self.bodies.shift_remove(&id) {
                self.tasks_by_body.remove(&handle);
                engine.remove_body(handle);
                tracing::debug!("Removed body {} for task {}", handle.value(), id);
                report.removed.push(id);
            }
        }

        for task in tasks {
            if self.bodies.contains_key(&task.id) {
                continue;
            }

            let radius = bubble_radius(&task.text);
            let position = self.spawn_position(viewport);
            let handle = engine.add_body(Body::circle(position, radius, self.material));
            self.bodies.insert(task.id.clone(), handle);
            self.tasks_by_body.insert(handle, task.id.clone());
            tracing::debug!(
                "Created body {} for task {} at ({:.0}, {:.0}) r={}",
                handle.value(),
                task.id,
                position.x,
                position.y,
                radius
            );
            report.created.push(task.id.clone());
        }

        report
    }

    fn spawn_position(&mut self, viewport: Viewport) -> Vec2 {
        let low = self.spawn.margin;
        let high = (viewport.width - self.spawn.margin).max(low);
        Vec2::new(self.rng.random_range(low..=high), self.spawn.spawn_y)
    }

    /// Body bound to a task
    pub fn handle(&self, id: &TaskId) -> Option<BodyHandle> {
        self.bodies.get(id).copied()
    }

    /// Task bound to a body; `None` for walls and removed bodies
    pub fn task_id(&self, handle: BodyHandle) -> Option<&TaskId> {
        self.tasks_by_body.get(&handle)
    }

    /// Whether a task currently has a body
    pub fn contains(&self, id: &TaskId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Number of bubble bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// True when no bubble bodies exist
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate in creation order
    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, BodyHandle)> {
        self.bodies.iter().map(|(id, handle)| (id, *handle))
    }

    /// Remove every bubble body from the engine
    pub fn teardown(&mut self, engine: &mut Engine) -> usize {
        let count = self.bodies.len();
        for (_, handle) in self.bodies.drain(..) {
            engine.remove_body(handle);
        }
        self.tasks_by_body.clear();
        count
    }
}
