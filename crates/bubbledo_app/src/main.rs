// SPDX-License-Identifier: MIT OR Apache-2.0
//! `BubbleDo` - a to-do list where every task is a physics bubble.
//!
//! Tasks fall into the window as bubbles sized by their text. Drag a bubble
//! onto the trash zone or double-click it to complete the task.
//!
//! ## Architecture
//!
//! The physics, the task ↔ body registry and the pointer gestures live in
//! `bubbledo_physics`. This binary owns everything around them: the window,
//! the egui renderer, the persisted task list and colour assignments, and
//! the overlays.

mod app;
mod colors;
mod config;
mod overlay;
mod storage;
mod tasks;
mod view;

use app::BubbleDoApp;
use config::AppConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log directives used when `RUST_LOG` is not set
const DEFAULT_LOG_DIRECTIVES: &str = "bubbledo_app=debug,bubbledo_physics=info,wgpu=warn,naga=warn";

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BubbleDo v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    if let Err(e) = BubbleDoApp::run(config) {
        tracing::error!("BubbleDo crashed: {e}");
        std::process::exit(1);
    }
}
