// SPDX-License-Identifier: MIT OR Apache-2.0
//! Simulation settings and configuration.
//!
//! This module manages every tunable of the bubble simulation:
//! - World settings (gravity, timestep, substeps, solver iterations)
//! - Boundary settings (wall thickness, ceiling height, minimum viewport)
//! - Bubble and wall materials
//! - Pointer settings (drag stiffness, trash zone hit test)
//! - Spawn placement for new bubbles

use crate::body::Material;
use crate::math::Vec2;
use crate::radius::MAX_RADIUS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "bubbledo.ron";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// File written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// Values that would break simulation invariants
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// How a dragged bubble is tested against the trash zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoneHitTest {
    /// The bubble's center point must lie inside the zone
    #[default]
    Center,
    /// Any part of the bubble's circle touching the zone counts
    Circle,
}

/// Placement of newly created bubbles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Horizontal distance kept from either side wall
    pub margin: f32,
    /// Vertical spawn position, negative means above the visible area
    pub spawn_y: f32,
    /// Fixed RNG seed for reproducible placement
    pub seed: Option<u64>,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            margin: 50.0,
            spawn_y: -100.0,
            seed: None,
        }
    }
}

/// Complete simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Settings format version
    pub version: u32,
    /// Gravity in px/s², y pointing down
    pub gravity: Vec2,
    /// Fixed timestep for physics simulation (seconds)
    pub fixed_timestep: f32,
    /// Maximum substeps per frame
    pub max_substeps: u32,
    /// Contact solver passes per step
    pub solver_iterations: u32,
    /// Speed cap in px/s
    pub max_speed: f32,
    /// Thickness of the boundary walls
    pub wall_thickness: f32,
    /// Ceiling center height above y=0, in wall thicknesses
    pub ceiling_multiple: f32,
    /// Smallest viewport extent accepted by the boundaries
    pub min_viewport_extent: f32,
    /// Material of every bubble
    pub bubble_material: Material,
    /// Material of the boundary walls
    pub wall_material: Material,
    /// Drag constraint stiffness in (0, 1]
    pub drag_stiffness: f32,
    /// New bubble placement
    pub spawn: SpawnSettings,
    /// Trash zone hit test policy
    pub zone_hit_test: ZoneHitTest,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            gravity: Vec2::new(0.0, 1000.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 8,
            solver_iterations: 6,
            max_speed: 1500.0,
            wall_thickness: 60.0,
            ceiling_multiple: 4.0,
            min_viewport_extent: 100.0,
            bubble_material: Material::bubble(),
            wall_material: Material::wall(),
            drag_stiffness: 0.2,
            spawn: SpawnSettings::default(),
            zone_hit_test: ZoneHitTest::default(),
        }
    }
}

impl SimulationSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: SimulationSettings = ron::from_str(&content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No settings at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Vertical position of the ceiling's lower face
    pub fn ceiling_inner_face(&self) -> f32 {
        -self.ceiling_multiple * self.wall_thickness + self.wall_thickness * 0.5
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_timestep > 0.0 && self.fixed_timestep.is_finite()) {
            return Err(SettingsError::Invalid(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }

        if self.max_substeps == 0 {
            return Err(SettingsError::Invalid("max_substeps must be at least 1".into()));
        }

        if !(self.wall_thickness > 0.0) {
            return Err(SettingsError::Invalid("wall_thickness must be positive".into()));
        }

        // A body must never cover more than half a wall in one tick
        let max_step = self.max_speed * self.fixed_timestep;
        if !(max_step < self.wall_thickness * 0.5) {
            return Err(SettingsError::Invalid(format!(
                "max_speed allows {max_step}px per step, walls are {}px thick",
                self.wall_thickness
            )));
        }

        let spawn_top = self.spawn.spawn_y - MAX_RADIUS;
        if spawn_top <= self.ceiling_inner_face() {
            return Err(SettingsError::Invalid(format!(
                "bubbles spawning at y={} overlap the ceiling (inner face y={})",
                self.spawn.spawn_y,
                self.ceiling_inner_face()
            )));
        }

        if self.min_viewport_extent < self.spawn.margin * 2.0 {
            return Err(SettingsError::Invalid(format!(
                "min_viewport_extent {} is narrower than the spawn margins",
                self.min_viewport_extent
            )));
        }

        if !(self.drag_stiffness > 0.0 && self.drag_stiffness <= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "drag_stiffness must be in (0, 1], got {}",
                self.drag_stiffness
            )));
        }

        Ok(())
    }
}
