// Runtime knobs read from the environment at startup.
use bevy::prelude::*;

use crate::scenes::SceneId;

pub const DEBUG_COLLIDERS_VAR: &str = "MEMORY_LANE_DEBUG_COLLIDERS";
pub const START_SCENE_VAR: &str = "MEMORY_LANE_START_SCENE";
pub const PLAYER_SPEED_VAR: &str = "MEMORY_LANE_PLAYER_SPEED";

pub const DEFAULT_PLAYER_SPEED: f32 = 160.0;

/// Reads `GameConfig` from the environment and starts the game in its scene.
pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        let config = GameConfig::from_env();
        info!(
            "starting in {} (speed {}, debug colliders {})",
            config.start_scene, config.player_speed, config.debug_colliders
        );
        app.insert_state(config.start_scene).insert_resource(config);
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Draw collider boxes and their map coordinates.
    pub debug_colliders: bool,
    pub start_scene: SceneId,
    pub player_speed: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            debug_colliders: false,
            start_scene: SceneId::default(),
            player_speed: DEFAULT_PLAYER_SPEED,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `lookup`, keeping the default for anything unset or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(DEBUG_COLLIDERS_VAR) {
            match parse_flag(&raw) {
                Some(flag) => config.debug_colliders = flag,
                None => warn!("{DEBUG_COLLIDERS_VAR}: `{raw}` is not a flag, ignoring"),
            }
        }

        if let Some(raw) = lookup(START_SCENE_VAR) {
            match raw.trim().parse::<SceneId>() {
                Ok(scene) => config.start_scene = scene,
                Err(_) => warn!("{START_SCENE_VAR}: unknown scene `{raw}`, ignoring"),
            }
        }

        if let Some(raw) = lookup(PLAYER_SPEED_VAR) {
            match raw.trim().parse::<f32>() {
                Ok(speed) if speed.is_finite() && speed > 0.0 => config.player_speed = speed,
                _ => warn!("{PLAYER_SPEED_VAR}: `{raw}` is not a positive speed, ignoring"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
