// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-task bubble colours.
//!
//! Colours are picked once, when a task first gets a bubble, and kept until
//! the task is deleted. This module is the only writer of that state.

use crate::storage::{JsonFileStore, COLORS_KEY};
use bubbledo_physics::{Task, TaskId};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Bubble palette (Tailwind 400 tones)
pub const PALETTE: [&str; 12] = [
    "#f87171", // red
    "#fb923c", // orange
    "#fbbf24", // amber
    "#a3e635", // lime
    "#4ade80", // green
    "#34d399", // emerald
    "#22d3ee", // cyan
    "#60a5fa", // blue
    "#818cf8", // indigo
    "#a78bfa", // violet
    "#e879f9", // fuchsia
    "#f472b6", // pink
];

/// Colour of a task without an assignment
pub const FALLBACK_COLOR: &str = "#cccccc";

/// Parse `#rgb` or `#rrggbb`
pub fn parse_hex(hex: &str) -> Option<egui::Color32> {
    let digits = hex.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in digits.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(egui::Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(egui::Color32::from_rgb(
            channel(digits.get(0..2)?)?,
            channel(digits.get(2..4)?)?,
            channel(digits.get(4..6)?)?,
        )),
        _ => None,
    }
}

/// Task → colour map, persisted under [`COLORS_KEY`]
pub struct ColorAssignments {
    colors: IndexMap<TaskId, String>,
    rng: StdRng,
}

impl ColorAssignments {
    /// Restore assignments from the store
    pub fn load(store: &mut JsonFileStore, seed: Option<u64>) -> Self {
        let entries = match store.get::<serde_json::Map<String, serde_json::Value>>(COLORS_KEY) {
            Some(entries) => entries,
            None if store.contains(COLORS_KEY) => {
                tracing::warn!("Dropping colour map that is not an object");
                store.remove(COLORS_KEY);
                serde_json::Map::new()
            }
            None => serde_json::Map::new(),
        };

        let mut colors = IndexMap::with_capacity(entries.len());
        for (id, value) in entries {
            match value {
                serde_json::Value::String(hex) => {
                    colors.insert(TaskId(id), hex);
                }
                other => tracing::warn!("Skipping unreadable colour for task {}: {}", id, other),
            }
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self { colors, rng }
    }

    /// Give `id` a random palette colour unless it already has one.
    ///
    /// Returns `true` when a new colour was assigned.
    pub fn assign_if_absent(&mut self, id: &TaskId, store: &mut JsonFileStore) -> bool {
        if self.colors.contains_key(id) {
            return false;
        }

        let color = PALETTE.choose(&mut self.rng).copied().unwrap_or(FALLBACK_COLOR);
        tracing::debug!("Assigned colour {} to task {}", color, id);
        self.colors.insert(id.clone(), color.to_string());
        self.persist(store);
        true
    }

    /// Forget the colour of a deleted task
    pub fn release(&mut self, id: &TaskId, store: &mut JsonFileStore) -> bool {
        let released = self.colors.shift_remove(id).is_some();
        if released {
            self.persist(store);
        }
        released
    }

    /// Drop assignments of tasks that no longer exist
    pub fn prune(&mut self, tasks: &[Task], store: &mut JsonFileStore) -> usize {
        let live: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        let before = self.colors.len();
        self.colors.retain(|id, _| live.contains(id));
        let pruned = before - self.colors.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} stale colour assignments", pruned);
            self.persist(store);
        }
        pruned
    }

    /// Stored hex colour of a task
    pub fn hex(&self, id: &TaskId) -> &str {
        self.colors.get(id).map_or(FALLBACK_COLOR, String::as_str)
    }

    /// Paint colour of a task, grey when unassigned or unparsable
    pub fn color(&self, id: &TaskId) -> egui::Color32 {
        parse_hex(self.hex(id))
            .or_else(|| parse_hex(FALLBACK_COLOR))
            .unwrap_or(egui::Color32::GRAY)
    }

    fn persist(&self, store: &mut JsonFileStore) {
        store.set(COLORS_KEY, &self.colors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("bubbledo-colors-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#f87171"), Some(egui::Color32::from_rgb(0xf8, 0x71, 0x71)));
        assert_eq!(parse_hex("#ccc"), Some(egui::Color32::from_rgb(0xcc, 0xcc, 0xcc)));
        assert_eq!(parse_hex("f87171"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
        assert!(PALETTE.iter().all(|hex| parse_hex(hex).is_some()));
    }

    #[test]
    fn test_assign_once_and_release() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        let mut colors = ColorAssignments::load(&mut store, Some(3));
        let id = TaskId::from("a");

        assert_eq!(colors.hex(&id), FALLBACK_COLOR);
        assert!(colors.assign_if_absent(&id, &mut store));
        let first = colors.hex(&id).to_string();
        assert!(PALETTE.contains(&first.as_str()));

        assert!(!colors.assign_if_absent(&id, &mut store));
        assert_eq!(colors.hex(&id), first);

        assert!(colors.release(&id, &mut store));
        assert_eq!(colors.hex(&id), FALLBACK_COLOR);
        assert_eq!(colors.color(&id), egui::Color32::from_rgb(0xcc, 0xcc, 0xcc));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_assignments_survive_restart() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        let mut colors = ColorAssignments::load(&mut store, Some(3));
        colors.assign_if_absent(&TaskId::from("a"), &mut store);
        let hex = colors.hex(&TaskId::from("a")).to_string();

        let mut reopened = JsonFileStore::open(&path);
        let restored = ColorAssignments::load(&mut reopened, None);
        assert_eq!(restored.hex(&TaskId::from("a")), hex);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_one_bad_colour_keeps_the_rest() {
        let path = temp_path();
        std::fs::write(&path, r##"{"bubbles-colors": {"a": "#60a5fa", "b": 42}}"##).unwrap();
        let mut store = JsonFileStore::open(&path);
        let colors = ColorAssignments::load(&mut store, Some(3));

        assert_eq!(colors.hex(&TaskId::from("a")), "#60a5fa");
        assert_eq!(colors.hex(&TaskId::from("b")), FALLBACK_COLOR);
        assert!(store.contains(COLORS_KEY));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_prune_drops_stale_entries() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path);
        let mut colors = ColorAssignments::load(&mut store, Some(3));
        colors.assign_if_absent(&TaskId::from("a"), &mut store);
        colors.assign_if_absent(&TaskId::from("gone"), &mut store);

        let tasks = vec![Task::with_id("a", "keep", 1)];
        assert_eq!(colors.prune(&tasks, &mut store), 1);
        assert_ne!(colors.hex(&TaskId::from("a")), FALLBACK_COLOR);
        assert_eq!(colors.hex(&TaskId::from("gone")), FALLBACK_COLOR);
        std::fs::remove_file(&path).ok();
    }
}
