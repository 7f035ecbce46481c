// SPDX-License-Identifier: MIT OR Apache-2.0
//! Overlays drawn on top of the bubble area.
//!
//! - Title and instructions in the top-left corner
//! - Trash zone in the bottom-right corner
//! - Text entry behind a "+" toggle at the bottom center
//! - Debug wireframe (F1)

use crate::view::BubbleLayer;
use bubbledo_physics::{Rect, Shape, Simulation};

/// Diameter of the trash zone
const TRASH_SIZE: f32 = 64.0;

/// Distance of the trash zone from the window corner
const TRASH_INSET: f32 = 16.0;

/// Scale of the trash zone while a bubble hovers it
const TRASH_HOVER_SCALE: f32 = 1.2;

/// Trash icon colours
const TRASH_IDLE: egui::Color32 = egui::Color32::from_rgb(0x9c, 0xa3, 0xaf);
const TRASH_HOT: egui::Color32 = egui::Color32::from_rgb(0xef, 0x44, 0x44);

/// Screen-space trash zone.
///
/// Hit testing always uses the unscaled rectangle so the zone does not
/// grow under a hovering bubble.
#[derive(Debug, Default)]
pub struct TrashZone;

impl TrashZone {
    /// Hit rectangle for a screen
    pub fn rect(&self, screen: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            screen.max - egui::vec2(TRASH_INSET + TRASH_SIZE, TRASH_INSET + TRASH_SIZE),
            egui::vec2(TRASH_SIZE, TRASH_SIZE),
        )
    }

    /// Paint the zone, enlarged and red while hovered
    pub fn paint(&self, painter: &egui::Painter, rect: egui::Rect, hovered: bool) {
        let scale = if hovered { TRASH_HOVER_SCALE } else { 1.0 };
        let radius = rect.width() * 0.5 * scale;
        let center = rect.center();
        let tint = if hovered { TRASH_HOT } else { TRASH_IDLE };

        painter.circle_filled(center, radius, egui::Color32::from_white_alpha(204));
        if hovered {
            painter.circle_stroke(center, radius, egui::Stroke::new(2.0, TRASH_HOT));
        }

        // Bin: lid, body and slats
        let s = radius * 0.5;
        let stroke = egui::Stroke::new(2.0, tint);
        let body = egui::Rect::from_center_size(center + egui::vec2(0.0, s * 0.15), egui::vec2(s * 1.2, s * 1.3));
        painter.rect_stroke(body, 2.0, stroke);
        painter.line_segment(
            [
                egui::pos2(center.x - s * 0.8, body.top() - s * 0.15),
                egui::pos2(center.x + s * 0.8, body.top() - s * 0.15),
            ],
            stroke,
        );
        painter.line_segment(
            [
                egui::pos2(center.x - s * 0.25, body.top() - s * 0.35),
                egui::pos2(center.x + s * 0.25, body.top() - s * 0.35),
            ],
            stroke,
        );
        for dx in [-0.25, 0.25] {
            painter.line_segment(
                [
                    egui::pos2(center.x + s * dx, body.top() + s * 0.25),
                    egui::pos2(center.x + s * dx, body.bottom() - s * 0.25),
                ],
                stroke,
            );
        }
    }
}

/// Convert an egui rectangle to a simulation rectangle
pub fn to_sim_rect(rect: egui::Rect) -> Rect {
    Rect::new(
        bubbledo_physics::Vec2::new(rect.min.x, rect.min.y),
        bubbledo_physics::Vec2::new(rect.max.x, rect.max.y),
    )
}

/// Title and usage hint
pub fn instructions(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("instructions"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(16.0, 16.0))
        .interactable(false)
        .order(egui::Order::Middle)
        .show(ctx, |ui| {
            let color = egui::Color32::from_rgba_unmultiplied(0x9c, 0xa3, 0xaf, 128);
            ui.label(egui::RichText::new("BubbleDo").size(24.0).strong().color(color));
            ui.label(egui::RichText::new("Drag to trash, Double-click to pop").size(14.0).color(color));
        });
}

/// Text entry behind a "+" toggle
#[derive(Debug, Default)]
pub struct InputOverlay {
    open: bool,
    text: String,
    focus_pending: bool,
}

impl InputOverlay {
    /// Whether the entry form is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open or close the form; opening focuses the field
    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.focus_pending = self.open;
    }

    /// Take the trimmed text if it is not blank; the form stays open
    pub fn submit(&mut self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.text.clear();
        Some(text)
    }

    /// Draw the overlay and return submitted text
    pub fn show(&mut self, ctx: &egui::Context) -> Option<String> {
        let mut submitted = None;

        egui::Area::new(egui::Id::new("input_overlay"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    if self.open {
                        egui::Frame::popup(ui.style())
                            .fill(egui::Color32::from_white_alpha(204))
                            .rounding(16.0)
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    let response = ui.add(
                                        egui::TextEdit::singleline(&mut self.text)
                                            .hint_text("New Task...")
                                            .desired_width(280.0)
                                            .font(egui::TextStyle::Heading),
                                    );
                                    if self.focus_pending {
                                        response.request_focus();
                                        self.focus_pending = false;
                                    }

                                    // Handle enter key
                                    let entered = response.lost_focus()
                                        && ui.input(|i| i.key_pressed(egui::Key::Enter));
                                    let can_add = !self.text.trim().is_empty();
                                    let clicked = ui
                                        .add_enabled(can_add, egui::Button::new(egui::RichText::new("+").size(20.0)))
                                        .clicked();

                                    if entered || clicked {
                                        submitted = self.submit();
                                        response.request_focus();
                                    }
                                });
                            });
                        ui.add_space(8.0);
                    }

                    let (label, fill) = if self.open {
                        ("✕", egui::Color32::from_rgb(0xef, 0x44, 0x44))
                    } else {
                        ("+", egui::Color32::BLACK)
                    };
                    let toggle = egui::Button::new(egui::RichText::new(label).size(28.0).color(egui::Color32::WHITE))
                        .fill(fill)
                        .rounding(32.0)
                        .min_size(egui::vec2(64.0, 64.0));
                    if ui.add(toggle).clicked() {
                        self.toggle();
                    }
                });
            });

        submitted
    }
}

/// Wireframe of the physics world
#[derive(Debug, Default)]
pub struct DebugOverlay {
    visible: bool,
}

impl DebugOverlay {
    /// Flip visibility
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        tracing::debug!("Debug overlay {}", if self.visible { "on" } else { "off" });
    }

    /// Whether the wireframe is drawn
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Draw body outlines, the trash zone and counters
    pub fn paint(&self, painter: &egui::Painter, origin: egui::Pos2, simulation: &Simulation, layer: &BubbleLayer) {
        let wire = egui::Stroke::new(1.0, egui::Color32::from_rgb(0x22, 0xc5, 0x5e));
        let wall = egui::Stroke::new(1.0, egui::Color32::from_rgb(0x64, 0x74, 0x8b));
        let font = egui::FontId::monospace(11.0);
        let engine = simulation.engine();

        for (handle, body) in engine.bodies() {
            let center = origin + egui::vec2(body.position.x, body.position.y);
            match body.shape {
                Shape::Circle { radius } => {
                    painter.circle_stroke(center, radius, wire);
                    let tip = center + egui::vec2(body.angle.cos(), body.angle.sin()) * radius;
                    painter.line_segment([center, tip], wire);

                    let label = simulation
                        .registry()
                        .task_id(handle)
                        .and_then(|id| layer.element(id))
                        .map_or_else(|| format!("#{}", handle.value()), |element| element.text.clone());
                    painter.text(center, egui::Align2::CENTER_CENTER, label, font.clone(), wire.color);
                }
                Shape::Rect { half_extents } => {
                    let rect = egui::Rect::from_center_size(
                        center,
                        egui::vec2(half_extents.x * 2.0, half_extents.y * 2.0),
                    );
                    painter.rect_stroke(rect, 0.0, wall);
                }
            }
        }

        for contact in engine.contacts() {
            let point = origin + egui::vec2(contact.point.x, contact.point.y);
            painter.circle_filled(point, 2.0, egui::Color32::RED);
        }

        if let Some(zone) = simulation.controller().zone() {
            let rect = egui::Rect::from_min_max(egui::pos2(zone.min.x, zone.min.y), egui::pos2(zone.max.x, zone.max.y));
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::RED));
        }

        let clock = simulation.clock();
        let stats = format!(
            "bodies {} | bubbles {} | elements {} | frames {} ({:.1}s) | steps {} ({:.1}s)",
            engine.body_count(),
            simulation.body_count(),
            layer.len(),
            clock.frame_count(),
            clock.elapsed_time(),
            engine.step_count(),
            engine.elapsed()
        );
        painter.text(
            origin + egui::vec2(16.0, 72.0),
            egui::Align2::LEFT_TOP,
            stats,
            font,
            egui::Color32::from_rgb(0x47, 0x55, 0x69),
        );
    }
}
