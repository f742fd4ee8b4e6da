// Narrative scenes and the authored data that drives each one.
use bevy::prelude::*;
use strum::{Display, EnumIter, EnumString};

use crate::map::{MapSpec, Placement};
use crate::script::ScriptSpec;
use crate::story;

#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SceneId {
    #[default]
    Bedroom,
    Brucoli,
    MedievalFest,
    StreetFood,
    Final,
}

impl SceneId {
    /// Authored layout for playable scenes; the final screen has none.
    pub fn spec(self) -> Option<&'static SceneSpec> {
        match self {
            SceneId::Bedroom => Some(&story::BEDROOM),
            SceneId::Brucoli => Some(&story::BRUCOLI),
            SceneId::MedievalFest => Some(&story::MEDIEVAL_FEST),
            SceneId::StreetFood => Some(&story::STREET_FOOD),
            SceneId::Final => None,
        }
    }
}

/// Everything a playable scene needs to build itself.
#[derive(Debug)]
pub struct SceneSpec {
    pub title: &'static str,
    pub subtitle: Option<&'static str>,
    pub map: MapSpec,
    pub player_start: Placement,
    pub script: ScriptSpec,
    pub door: DoorSpec,
}

#[derive(Debug, Clone, Copy)]
pub struct DoorSpec {
    pub next: SceneId,
    pub at: Placement,
}
