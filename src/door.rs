// The portal at the end of each scene: walk into it to fade out and move on.
use bevy::prelude::*;

use crate::body::{Hitbox, Overlap, Velocity};
use crate::map::ActiveMap;
use crate::modal::Modal;
use crate::player::Player;
use crate::scenes::SceneId;
use crate::stage::{FALLBACK_VIEWPORT, GameplaySet, SceneFlow};
use crate::tween::{Floating, SpriteAnimation, ease_cubic_out};

pub struct DoorPlugin;

impl Plugin for DoorPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<DoorEntered>()
            .init_resource::<PortalSheet>()
            .add_systems(Update, enter_door.in_set(GameplaySet::Trigger))
            .add_systems(Update, (detach_player, drive_fade));
    }
}

pub const PORTAL_FRAME: UVec2 = UVec2::new(64, 64);
const PORTAL_FRAMES: u32 = 8;
const PORTAL_FPS: f32 = 10.0;
const DOOR_Z: f32 = 5.0;

/// Seconds the player takes to drift off screen.
const EXIT_SECS: f32 = 1.0;
const EXIT_SCALE: f32 = 0.1;
/// Seconds of fade to black. Runs alongside the drift.
const FADE_SECS: f32 = 1.0;

#[derive(Component, Debug, Clone, Copy)]
pub struct Door {
    pub next: SceneId,
}

/// The player went through a door. Sent once per scene.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorEntered {
    pub next: SceneId,
}

#[derive(Resource, Debug)]
pub struct PortalSheet {
    image: Handle<Image>,
    layout: Handle<TextureAtlasLayout>,
}

impl FromWorld for PortalSheet {
    fn from_world(world: &mut World) -> Self {
        let image = world.resource::<AssetServer>().load("objects/portal.png");
        let layout = world
            .resource_mut::<Assets<TextureAtlasLayout>>()
            .add(TextureAtlasLayout::from_grid(
                PORTAL_FRAME,
                PORTAL_FRAMES,
                1,
                None,
                None,
            ));
        Self { image, layout }
    }
}

pub fn spawn_door(
    commands: &mut Commands,
    sheet: Option<&PortalSheet>,
    next: SceneId,
    at: Vec2,
    scene: SceneId,
) -> Entity {
    let mut door = commands.spawn((
        Door { next },
        Hitbox(PORTAL_FRAME.as_vec2()),
        Floating::resting_at(at.y),
        Transform::from_translation(at.extend(DOOR_Z)),
        DespawnOnExit(scene),
    ));
    if let Some(sheet) = sheet {
        door.insert((
            Sprite::from_atlas_image(
                sheet.image.clone(),
                TextureAtlas {
                    layout: sheet.layout.clone(),
                    index: 0,
                },
            ),
            SpriteAnimation::looping(PORTAL_FRAMES as usize, PORTAL_FPS),
        ));
    }
    door.id()
}

/// Carries the player off towards the right edge, shrinking and fading.
#[derive(Component, Debug, Clone)]
pub struct ExitTween {
    to: Vec2,
    from: Option<(Vec2, f32)>,
    elapsed: f32,
}

/// Full-screen fade to black that hands over to the next scene.
#[derive(Component, Debug, Clone)]
pub struct ScreenFade {
    next: SceneId,
    elapsed: f32,
    done: bool,
}

impl ScreenFade {
    pub fn new(next: SceneId) -> Self {
        Self {
            next,
            elapsed: 0.0,
            done: false,
        }
    }

    /// Opacity of the black overlay.
    pub fn alpha(&self) -> f32 {
        (self.elapsed / FADE_SECS).clamp(0.0, 1.0)
    }

    /// Advances the fade; yields the next scene exactly once, when fully black.
    pub fn advance(&mut self, delta: f32) -> Option<SceneId> {
        self.elapsed += delta;
        if self.done || self.elapsed < FADE_SECS {
            return None;
        }
        self.done = true;
        Some(self.next)
    }
}

#[allow(clippy::too_many_arguments)]
fn enter_door(
    mut commands: Commands,
    mut flow: ResMut<SceneFlow>,
    modal: Res<Modal>,
    mut overlaps: MessageReader<Overlap>,
    mut doors: Query<(&Door, &Transform, Option<&mut SpriteAnimation>)>,
    mut player: Query<(Entity, &mut Velocity), With<Player>>,
    active_map: Option<Res<ActiveMap>>,
    scene: Res<State<SceneId>>,
    mut entered: MessageWriter<DoorEntered>,
) {
    // The dialogue has to be dismissed before the scene can end.
    if flow.is_fading() || modal.is_open() {
        overlaps.clear();
        return;
    }

    for overlap in overlaps.read() {
        let Ok((door, transform, animation)) = doors.get_mut(overlap.entity) else {
            continue;
        };
        if !flow.begin_fade() {
            break;
        }

        info!("door entered in {}, heading to {}", scene.get(), door.next);
        if let Some(mut animation) = animation {
            animation.stop();
        }
        commands.entity(overlap.entity).remove::<Floating>();

        let viewport = active_map
            .as_ref()
            .map(|map| map.viewport())
            .unwrap_or(FALLBACK_VIEWPORT);
        if let Ok((entity, mut velocity)) = player.single_mut() {
            velocity.0 = Vec2::ZERO;
            commands.entity(entity).remove::<Hitbox>().insert((
                Visibility::Hidden,
                ExitTween {
                    to: Vec2::new(viewport.x / 2.0, transform.translation.y),
                    from: None,
                    elapsed: 0.0,
                },
            ));
        }

        commands.spawn((
            ScreenFade::new(door.next),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                ..default()
            },
            BackgroundColor(Color::NONE),
            GlobalZIndex(200),
            DespawnOnExit(*scene.get()),
        ));
        entered.write(DoorEntered { next: door.next });
        break;
    }
}

fn detach_player(time: Res<Time>, mut query: Query<(&mut ExitTween, &mut Transform, Option<&mut Sprite>)>) {
    for (mut tween, mut transform, sprite) in &mut query {
        let (from, from_scale) = *tween
            .from
            .get_or_insert((transform.translation.truncate(), transform.scale.x));
        tween.elapsed += time.delta_secs();

        let t = ease_cubic_out(tween.elapsed / EXIT_SECS);
        let position = from.lerp(tween.to, t);
        let scale = from_scale + (EXIT_SCALE - from_scale) * t;
        transform.translation.x = position.x;
        transform.translation.y = position.y;
        transform.scale = Vec3::new(scale, scale, 1.0);
        if let Some(mut sprite) = sprite {
            sprite.color = sprite.color.with_alpha(1.0 - t);
        }
    }
}

fn drive_fade(
    time: Res<Time>,
    mut fades: Query<(&mut ScreenFade, &mut BackgroundColor)>,
    mut next_state: ResMut<NextState<SceneId>>,
) {
    for (mut fade, mut background) in &mut fades {
        let next = fade.advance(time.delta_secs());
        background.0 = Color::BLACK.with_alpha(fade.alpha());
        if let Some(next) = next {
            next_state.set(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::state::app::StatesPlugin;
    use bevy::time::TimeUpdateStrategy;

    use super::*;

    #[test]
    fn fade_hands_over_once_when_fully_black() {
        let mut fade = ScreenFade::new(SceneId::Brucoli);
        assert_eq!(fade.advance(0.5), None);
        assert!((fade.alpha() - 0.5).abs() < 1e-6);
        assert_eq!(fade.advance(0.45), None);
        assert_eq!(fade.advance(0.1), Some(SceneId::Brucoli));
        assert_eq!(fade.alpha(), 1.0);
        assert_eq!(fade.advance(0.1), None);
        assert_eq!(fade.advance(5.0), None);
    }

    #[derive(Resource, Default)]
    struct Entered(Vec<SceneId>);

    fn record(mut entered: MessageReader<DoorEntered>, mut seen: ResMut<Entered>) {
        seen.0.extend(entered.read().map(|door| door.next));
    }

    #[derive(Resource, Default)]
    struct Arrivals(usize);

    fn arrive(mut arrivals: ResMut<Arrivals>) {
        arrivals.0 += 1;
    }

    #[derive(Resource, Clone, Copy)]
    struct DoorEntity(Entity);

    fn touch_door(door: Res<DoorEntity>, mut overlaps: MessageWriter<Overlap>) {
        overlaps.write(Overlap { entity: door.0 });
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .init_state::<SceneId>()
            .init_resource::<SceneFlow>()
            .init_resource::<Modal>()
            .init_resource::<Entered>()
            .init_resource::<Arrivals>()
            .add_message::<Overlap>()
            .add_message::<DoorEntered>()
            .add_systems(OnEnter(SceneId::Brucoli), arrive);
        app
    }

    /// Spawns a door to Brucoli and a walking player, returning both.
    fn set_up_door(app: &mut App) -> (Entity, Entity) {
        let door = spawn_door(
            &mut app.world_mut().commands(),
            None,
            SceneId::Brucoli,
            Vec2::new(0.0, 100.0),
            SceneId::Bedroom,
        );
        let player = app
            .world_mut()
            .spawn((
                Player,
                Velocity(Vec2::new(160.0, 0.0)),
                Hitbox(Vec2::splat(20.0)),
                Transform::default(),
            ))
            .id();
        app.world_mut().flush();
        app.insert_resource(DoorEntity(door));
        (door, player)
    }

    #[test]
    fn door_fires_once_under_repeated_overlap() {
        let mut app = app();
        app.add_systems(Update, (touch_door, enter_door, record).chain());
        let (door, player) = set_up_door(&mut app);

        for _ in 0..10 {
            app.update();
        }

        assert_eq!(app.world().resource::<Entered>().0, vec![SceneId::Brucoli]);
        assert!(app.world().resource::<SceneFlow>().is_fading());
        assert_eq!(app.world().get::<Velocity>(player), Some(&Velocity(Vec2::ZERO)));
        assert_eq!(app.world().get::<Visibility>(player), Some(&Visibility::Hidden));
        assert!(app.world().get::<Hitbox>(player).is_none());
        assert!(app.world().get::<ExitTween>(player).is_some());
        assert!(app.world().get::<Floating>(door).is_none());

        let mut fades = app.world_mut().query::<&ScreenFade>();
        assert_eq!(fades.iter(app.world()).count(), 1);
    }

    #[test]
    fn door_starts_the_next_scene_exactly_once() {
        let mut app = app();
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(250)))
            .add_systems(Update, (touch_door, enter_door, record, drive_fade).chain());
        set_up_door(&mut app);

        // Well past the 1 s fade at 250 ms a frame.
        for _ in 0..20 {
            app.update();
        }

        assert_eq!(app.world().resource::<Entered>().0, vec![SceneId::Brucoli]);
        assert_eq!(app.world().resource::<Arrivals>().0, 1);
        assert_eq!(
            *app.world().resource::<State<SceneId>>().get(),
            SceneId::Brucoli
        );
        let mut fades = app.world_mut().query::<&ScreenFade>();
        assert_eq!(fades.iter(app.world()).count(), 0);
    }

    #[test]
    fn door_waits_for_the_dialogue_to_close() {
        let mut app = app();
        app.add_systems(Update, (touch_door, enter_door, record).chain());
        set_up_door(&mut app);
        app.world_mut().resource_mut::<Modal>().show("ciao");

        for _ in 0..3 {
            app.update();
        }
        assert!(app.world().resource::<Entered>().0.is_empty());
        assert!(!app.world().resource::<SceneFlow>().is_fading());

        app.world_mut().resource_mut::<Modal>().hide();
        app.update();
        assert_eq!(app.world().resource::<Entered>().0, vec![SceneId::Brucoli]);
    }
}
