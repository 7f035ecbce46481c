// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bubble radius derived from task text.
//!
//! Body creation, bubble painting and hit testing all size a bubble through
//! [`bubble_radius`]; nothing stores the radius alongside the task.

/// Smallest bubble radius in pixels
pub const MIN_RADIUS: f32 = 30.0;

/// Largest bubble radius in pixels
pub const MAX_RADIUS: f32 = 80.0;

/// Growth per character of text
pub const RADIUS_PER_CHAR: f32 = 2.0;

/// Radius for a bubble showing `text`.
///
/// Length is counted in Unicode scalar values. The result is non-decreasing
/// in length and always within `[MIN_RADIUS, MAX_RADIUS]`.
pub fn bubble_radius(text: &str) -> f32 {
    let length = text.chars().count() as f32;
    MIN_RADIUS + (length * RADIUS_PER_CHAR).min(MAX_RADIUS - MIN_RADIUS)
}
