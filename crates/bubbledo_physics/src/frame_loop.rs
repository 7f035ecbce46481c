// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scoped, cancelable per-frame loop handle.
//!
//! The host's frame scheduler calls [`FrameLoop::tick`] once per frame and
//! only requests another frame while it returns `true`. Stopping is
//! possible through the handle, through any clone of its
//! [`CancellationToken`], or by dropping the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle owning the lifetime of a frame loop
#[derive(Debug)]
pub struct FrameLoop {
    token: CancellationToken,
    frames: u64,
    running: bool,
}

impl FrameLoop {
    /// Create a stopped loop
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            frames: 0,
            running: false,
        }
    }

    /// Start (or restart) the loop with a fresh token
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.token = CancellationToken::new();
        self.running = true;
        tracing::debug!("Frame loop started");
    }

    /// Stop the loop; idempotent
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("Frame loop stopped after {} frames", self.frames());
        }
        self.running = false;
        self.token.cancel();
    }

    /// Whether the next frame should run
    pub fn is_running(&self) -> bool {
        self.running && !self.token.is_cancelled()
    }

    /// Account for one frame; `false` once stopped or cancelled
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            self.running = false;
            return false;
        }
        self.frames += 1;
        true
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Token that stops this loop when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
