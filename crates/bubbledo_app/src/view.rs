// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bubble painting.
//!
//! [`BubbleLayer`] keeps one element per task. The simulation writes body
//! transforms into it through [`VisualLayer`]; the app then paints every
//! element that has received a transform.

use crate::colors::ColorAssignments;
use bubbledo_physics::{bubble_radius, BubbleTransform, Task, TaskId, Vec2, VisualLayer};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Bubble fill opacity
const FILL_OPACITY: f32 = 0.8;

/// Bubble label size
const FONT_SIZE: f32 = 14.0;

/// Fraction of the diameter available to the label
const TEXT_WIDTH_FACTOR: f32 = 0.75;

/// One mounted bubble
#[derive(Debug, Clone)]
pub struct BubbleElement {
    /// Label
    pub text: String,
    /// Radius from the task text
    pub radius: f32,
    /// Fill colour
    pub color: egui::Color32,
    /// Last transform written by the simulation
    pub transform: Option<BubbleTransform>,
}

/// Visual layer holding every mounted bubble
#[derive(Debug, Default)]
pub struct BubbleLayer {
    elements: IndexMap<TaskId, BubbleElement>,
}

impl BubbleLayer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount elements for new tasks and unmount those of deleted ones
    pub fn sync_elements(&mut self, tasks: &[Task], colors: &ColorAssignments) {
        let live: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        self.elements.retain(|id, _| live.contains(id));

        for task in tasks {
            let color = colors.color(&task.id);
            match self.elements.get_mut(&task.id) {
                Some(element) => element.color = color,
                None => {
                    self.elements.insert(
                        task.id.clone(),
                        BubbleElement {
                            text: task.text.clone(),
                            radius: bubble_radius(&task.text),
                            color,
                            transform: None,
                        },
                    );
                }
            }
        }
    }

    /// Mounted element of a task
    pub fn element(&self, id: &TaskId) -> Option<&BubbleElement> {
        self.elements.get(id)
    }

    /// Number of mounted elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Paint all positioned bubbles relative to the container origin
    pub fn paint(&self, painter: &egui::Painter, origin: egui::Pos2) {
        for element in self.elements.values() {
            let Some(transform) = element.transform else {
                continue;
            };
            let center = transform.screen_center(Vec2::new(origin.x, origin.y));
            paint_bubble(painter, egui::pos2(center.x, center.y), transform.rotation, element);
        }
    }
}

impl VisualLayer for BubbleLayer {
    fn apply_transform(&mut self, id: &TaskId, transform: &BubbleTransform) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.transform = Some(*transform);
                true
            }
            None => false,
        }
    }
}

fn paint_bubble(painter: &egui::Painter, center: egui::Pos2, angle: f32, element: &BubbleElement) {
    let radius = element.radius;

    painter.circle_filled(center, radius, element.color.gamma_multiply(FILL_OPACITY));

    // Shine
    painter.circle_filled(
        center - egui::vec2(radius * 0.35, radius * 0.35),
        radius * 0.3,
        egui::Color32::from_white_alpha(40),
    );
    painter.circle_stroke(
        center,
        radius,
        egui::Stroke::new(1.0, egui::Color32::from_white_alpha(77)),
    );

    let galley = painter.layout(
        element.text.clone(),
        egui::FontId::proportional(FONT_SIZE),
        egui::Color32::WHITE,
        radius * 2.0 * TEXT_WIDTH_FACTOR,
    );

    // Text rotates about its top-left corner; place that corner so the
    // galley's center lands on the bubble center.
    let half = Vec2::new(galley.size().x * 0.5, galley.size().y * 0.5);
    let offset = (-half).rotate(angle);
    let anchor = center + egui::vec2(offset.x, offset.y);

    let shadow = egui::epaint::TextShape::new(anchor + egui::vec2(0.0, 1.0), galley.clone(), egui::Color32::WHITE)
        .with_override_text_color(egui::Color32::from_black_alpha(60))
        .with_angle(angle);
    painter.add(shadow);
    painter.add(egui::epaint::TextShape::new(anchor, galley, egui::Color32::WHITE).with_angle(angle));
}
