// SPDX-License-Identifier: MIT OR Apache-2.0
//! Semi-fixed timestep clock.
//!
//! The render clock delivers irregular frame deltas; the engine only knows
//! fixed ticks. [`FixedStepClock`] converts one into the other.

/// Accumulates frame time into fixed simulation ticks
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    /// Length of one tick (seconds)
    fixed_timestep: f64,
    /// Upper bound on ticks per frame
    max_substeps: u32,
    /// Accumulated delta time not yet simulated
    accumulated_time: f64,
    frame_count: u64,
    elapsed_time: f64,
}

impl FixedStepClock {
    /// Create a clock for the given tick length
    pub fn new(fixed_timestep: f32, max_substeps: u32) -> Self {
        Self {
            fixed_timestep: fixed_timestep as f64,
            max_substeps: max_substeps.max(1),
            accumulated_time: 0.0,
            frame_count: 0,
            elapsed_time: 0.0,
        }
    }

    /// Feed one frame's delta and return the number of ticks to run
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        let delta = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time as f64
        } else {
            0.0
        };

        self.elapsed_time += delta;
        self.accumulated_time += delta;
        self.frame_count += 1;

        let mut steps = 0;
        while self.accumulated_time >= self.fixed_timestep {
            self.accumulated_time -= self.fixed_timestep;
            steps += 1;

            // Limit max steps per frame to prevent spiral of death
            if steps >= self.max_substeps {
                self.accumulated_time = 0.0;
                break;
            }
        }

        steps
    }

    /// Frames fed to [`advance`](Self::advance)
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wall-clock time fed to the clock (seconds)
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Drop any pending time
    pub fn reset(&mut self) {
        self.accumulated_time = 0.0;
        self.frame_count = 0;
        self.elapsed_time = 0.0;
    }
}
