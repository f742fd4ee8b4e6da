// Floating objects the player bumps into to hear a memory.
use bevy::prelude::*;

use crate::body::{Hitbox, Overlap};
use crate::modal::Modal;
use crate::player::Player;
use crate::scenes::SceneId;
use crate::script::Beat;
use crate::stage::{GameplaySet, SceneFlow};
use crate::tween::{Floating, SpriteAnimation};

pub struct InteractablePlugin;

impl Plugin for InteractablePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Interacted>()
            .add_systems(Update, trigger_interactables.in_set(GameplaySet::Trigger));
    }
}

const OBJECT_Z: f32 = 5.0;

#[derive(Component, Debug, Clone)]
pub struct Interactable {
    pub key: &'static str,
    /// Consumed on first touch instead of reporting every frame.
    pub one_shot: bool,
    triggered: bool,
}

impl Interactable {
    pub fn new(key: &'static str, one_shot: bool) -> Self {
        Self {
            key,
            one_shot,
            triggered: false,
        }
    }

    /// Whether this touch should be reported. A one-shot object answers once.
    pub fn claim(&mut self) -> bool {
        if self.one_shot && self.triggered {
            return false;
        }
        self.triggered = true;
        true
    }
}

/// The player touched the object `key`.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interacted {
    pub key: &'static str,
    pub entity: Entity,
}

pub fn spawn_interactable(
    commands: &mut Commands,
    asset_server: &AssetServer,
    beat: &Beat,
    at: Vec2,
    one_shot: bool,
    scene: SceneId,
) -> Entity {
    commands
        .spawn((
            Interactable::new(beat.key, one_shot),
            Sprite {
                image: asset_server.load(beat.sprite),
                custom_size: Some(beat.size),
                ..default()
            },
            Hitbox(beat.size),
            Floating::resting_at(at.y),
            Transform::from_translation(at.extend(OBJECT_Z)).with_scale(Vec3::new(
                beat.scale,
                beat.scale,
                1.0,
            )),
            DespawnOnExit(scene),
        ))
        .id()
}

fn trigger_interactables(
    mut commands: Commands,
    flow: Res<SceneFlow>,
    modal: Res<Modal>,
    mut overlaps: MessageReader<Overlap>,
    mut objects: Query<&mut Interactable>,
    mut player: Query<&mut SpriteAnimation, With<Player>>,
    mut interacted: MessageWriter<Interacted>,
) {
    if flow.is_fading() || modal.is_open() {
        overlaps.clear();
        return;
    }

    for overlap in overlaps.read() {
        let Ok(mut object) = objects.get_mut(overlap.entity) else {
            continue;
        };
        if !object.claim() {
            continue;
        }

        if let Ok(mut animation) = player.single_mut() {
            animation.stop();
        }
        let mut entity = commands.entity(overlap.entity);
        entity.remove::<Floating>();
        if object.one_shot {
            entity.despawn();
        }

        debug!("interacted with `{}`", object.key);
        interacted.write(Interacted {
            key: object.key,
            entity: overlap.entity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_claims_once_persistent_claims_always() {
        let mut phone = Interactable::new("phone", true);
        assert!(phone.claim());
        assert!(!phone.claim());

        let mut granita = Interactable::new("granita", false);
        assert!(granita.claim());
        assert!(granita.claim());
    }

    #[derive(Resource, Default)]
    struct Seen(Vec<&'static str>);

    fn record(mut interacted: MessageReader<Interacted>, mut seen: ResMut<Seen>) {
        seen.0.extend(interacted.read().map(|interaction| interaction.key));
    }

    fn overlap_every_frame(
        objects: Query<Entity, With<Interactable>>,
        mut overlaps: MessageWriter<Overlap>,
    ) {
        for entity in &objects {
            // Twice per frame, as if two hitboxes touched.
            overlaps.write(Overlap { entity });
            overlaps.write(Overlap { entity });
        }
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<SceneFlow>()
            .init_resource::<Modal>()
            .init_resource::<Seen>()
            .add_message::<Overlap>()
            .add_message::<Interacted>()
            .add_systems(
                Update,
                (overlap_every_frame, trigger_interactables, record).chain(),
            );
        app
    }

    #[test]
    fn one_shot_object_fires_once_under_persistent_overlap() {
        let mut app = app();
        let phone = app
            .world_mut()
            .spawn((Interactable::new("phone", true), Floating::resting_at(0.0)))
            .id();

        for _ in 0..5 {
            app.update();
        }

        assert_eq!(app.world().resource::<Seen>().0, vec!["phone"]);
        assert!(app.world().get_entity(phone).is_err());
    }

    #[test]
    fn persistent_object_reports_every_frame_and_stops_floating() {
        let mut app = app();
        let granita = app
            .world_mut()
            .spawn((Interactable::new("granita", false), Floating::resting_at(0.0)))
            .id();

        app.update();
        app.update();

        assert_eq!(app.world().resource::<Seen>().0.len(), 4);
        assert!(app.world().get::<Floating>(granita).is_none());
        assert!(app.world().get::<Interactable>(granita).is_some());
    }

    #[test]
    fn nothing_fires_while_the_scene_fades() {
        let mut app = app();
        app.world_mut().resource_mut::<SceneFlow>().begin_fade();
        app.world_mut().spawn(Interactable::new("phone", true));

        app.update();
        assert!(app.world().resource::<Seen>().0.is_empty());
    }

    #[test]
    fn nothing_fires_while_the_dialogue_is_open() {
        let mut app = app();
        app.world_mut().resource_mut::<Modal>().show("ciao");
        app.world_mut().spawn(Interactable::new("granita", false));

        app.update();
        assert!(app.world().resource::<Seen>().0.is_empty());

        app.world_mut().resource_mut::<Modal>().hide();
        app.update();
        assert_eq!(app.world().resource::<Seen>().0, vec!["granita", "granita"]);
    }
}
