// Main
mod body;
mod config;
mod door;
mod interactable;
mod map;
mod modal;
mod overlay;
mod player;
mod scenes;
mod script;
mod stage;
mod story;
mod tween;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use body::BodyPlugin;
use config::ConfigPlugin;
use door::DoorPlugin;
use interactable::InteractablePlugin;
use modal::ModalPlugin;
use overlay::OverlayPlugin;
use player::PlayerPlugin;
use script::ScriptPlugin;
use stage::StagePlugin;
use tween::TweenPlugin;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Memory Lane".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: "wgpu=error,naga=warn,memory_lane=debug".into(),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        )
        .add_plugins(ConfigPlugin)
        .add_plugins((
            StagePlugin,
            PlayerPlugin,
            BodyPlugin,
            InteractablePlugin,
            ScriptPlugin,
            ModalPlugin,
            DoorPlugin,
            OverlayPlugin,
            TweenPlugin,
        ))
        .run();
}
