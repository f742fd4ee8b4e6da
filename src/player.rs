// Top-down walker driven by the arrow keys, with one sprite sheet per direction.
use bevy::prelude::*;

use crate::body::{Hitbox, Velocity};
use crate::modal::Modal;
use crate::scenes::SceneId;
use crate::stage::GameplaySet;
use crate::tween::SpriteAnimation;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerSheets>()
            .add_systems(Update, steer_player.in_set(GameplaySet::Input))
            .add_systems(Update, face_player.in_set(GameplaySet::Motion));
    }
}

pub const PLAYER_HITBOX: Vec2 = Vec2::new(28.0, 40.0);
const PLAYER_Z: f32 = 10.0;
const WALK_FPS: f32 = 10.0;
const FRAMES_PER_SHEET: u32 = 4;

#[derive(Component, Debug)]
pub struct Player;

#[derive(Component, Debug, Clone, Copy, Deref)]
pub struct PlayerSpeed(pub f32);

/// Which sheet the player is showing. `Idle` doubles as "no input".
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Idle,
    Left,
    Right,
    Up,
    Down,
}

impl Facing {
    const ALL: [Facing; 5] = [
        Facing::Idle,
        Facing::Left,
        Facing::Right,
        Facing::Up,
        Facing::Down,
    ];

    /// Unit direction in world space (y up).
    pub fn direction(self) -> Vec2 {
        match self {
            Facing::Idle => Vec2::ZERO,
            Facing::Left => Vec2::NEG_X,
            Facing::Right => Vec2::X,
            Facing::Up => Vec2::Y,
            Facing::Down => Vec2::NEG_Y,
        }
    }

    fn sheet(self) -> (&'static str, UVec2) {
        match self {
            Facing::Idle => ("player/idle.png", UVec2::new(36, 44)),
            Facing::Left => ("player/walk_left.png", UVec2::new(38, 44)),
            Facing::Right => ("player/walk_right.png", UVec2::new(29, 44)),
            Facing::Up => ("player/walk_up.png", UVec2::new(25, 43)),
            Facing::Down => ("player/walk_down.png", UVec2::new(24, 44)),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Picks one axis from the held arrows. Horizontal input wins.
pub fn movement_intent(left: bool, right: bool, up: bool, down: bool) -> Facing {
    if left {
        Facing::Left
    } else if right {
        Facing::Right
    } else if up {
        Facing::Up
    } else if down {
        Facing::Down
    } else {
        Facing::Idle
    }
}

#[derive(Debug, Clone)]
struct WalkSheet {
    image: Handle<Image>,
    layout: Handle<TextureAtlasLayout>,
    frames: usize,
}

#[derive(Resource, Debug)]
pub struct PlayerSheets {
    sheets: Vec<WalkSheet>,
}

impl PlayerSheets {
    fn get(&self, facing: Facing) -> Option<&WalkSheet> {
        self.sheets.get(facing.index())
    }
}

impl FromWorld for PlayerSheets {
    fn from_world(world: &mut World) -> Self {
        let images: Vec<Handle<Image>> = {
            let asset_server = world.resource::<AssetServer>();
            Facing::ALL
                .iter()
                .map(|facing| asset_server.load(facing.sheet().0))
                .collect()
        };
        let mut layouts = world.resource_mut::<Assets<TextureAtlasLayout>>();
        let sheets = Facing::ALL
            .iter()
            .zip(images)
            .map(|(facing, image)| WalkSheet {
                image,
                layout: layouts.add(TextureAtlasLayout::from_grid(
                    facing.sheet().1,
                    FRAMES_PER_SHEET,
                    1,
                    None,
                    None,
                )),
                frames: FRAMES_PER_SHEET as usize,
            })
            .collect();
        Self { sheets }
    }
}

/// Spawns the scene's player at `at` (world space), idle.
pub fn spawn_player(
    commands: &mut Commands,
    sheets: Option<&PlayerSheets>,
    at: Vec2,
    speed: f32,
    scene: SceneId,
) -> Entity {
    let mut player = commands.spawn((
        Player,
        Facing::Idle,
        PlayerSpeed(speed),
        Velocity::default(),
        Hitbox(PLAYER_HITBOX),
        Transform::from_translation(at.extend(PLAYER_Z)),
        DespawnOnExit(scene),
    ));
    if let Some(sheet) = sheets.and_then(|sheets| sheets.get(Facing::Idle)) {
        player.insert((
            Sprite::from_atlas_image(
                sheet.image.clone(),
                TextureAtlas {
                    layout: sheet.layout.clone(),
                    index: 0,
                },
            ),
            SpriteAnimation::looping(sheet.frames, WALK_FPS),
        ));
    }
    player.id()
}

fn steer_player(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    modal: Res<Modal>,
    mut player: Query<
        (
            &mut Velocity,
            &mut Facing,
            &PlayerSpeed,
            Option<&mut SpriteAnimation>,
        ),
        With<Player>,
    >,
) {
    let Ok((mut velocity, mut facing, speed, animation)) = player.single_mut() else {
        return;
    };

    let intent = match keyboard {
        Some(keyboard) if !modal.is_open() => movement_intent(
            keyboard.pressed(KeyCode::ArrowLeft),
            keyboard.pressed(KeyCode::ArrowRight),
            keyboard.pressed(KeyCode::ArrowUp),
            keyboard.pressed(KeyCode::ArrowDown),
        ),
        _ => Facing::Idle,
    };

    velocity.0 = intent.direction() * speed.0;
    facing.set_if_neq(intent);

    if let Some(mut animation) = animation
        && !modal.is_open()
        && !animation.is_playing()
    {
        animation.resume();
    }
}

fn face_player(
    sheets: Res<PlayerSheets>,
    mut player: Query<(&Facing, &mut Sprite, &mut SpriteAnimation), (With<Player>, Changed<Facing>)>,
) {
    for (facing, mut sprite, mut animation) in &mut player {
        let Some(sheet) = sheets.get(*facing) else {
            continue;
        };
        sprite.image = sheet.image.clone();
        sprite.texture_atlas = Some(TextureAtlas {
            layout: sheet.layout.clone(),
            index: 0,
        });
        animation.restart(sheet.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_input_wins() {
        assert_eq!(movement_intent(true, false, true, false), Facing::Left);
        assert_eq!(movement_intent(false, true, false, true), Facing::Right);
        assert_eq!(movement_intent(true, true, false, false), Facing::Left);
        assert_eq!(movement_intent(false, false, true, true), Facing::Up);
        assert_eq!(movement_intent(false, false, false, true), Facing::Down);
        assert_eq!(movement_intent(false, false, false, false), Facing::Idle);
    }

    #[test]
    fn up_moves_towards_positive_y() {
        assert_eq!(Facing::Up.direction(), Vec2::Y);
        assert_eq!(Facing::Idle.direction(), Vec2::ZERO);
    }

    fn steering_app() -> (App, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Modal>()
            .init_resource::<ButtonInput<KeyCode>>()
            .add_systems(Update, steer_player);
        let player = spawn_player(
            &mut app.world_mut().commands(),
            None,
            Vec2::ZERO,
            160.0,
            SceneId::Bedroom,
        );
        app.world_mut().flush();
        (app, player)
    }

    #[test]
    fn open_modal_holds_the_player_still() {
        let (mut app, player) = steering_app();
        app.world_mut().resource_mut::<Modal>().show("ciao");
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::ArrowLeft);

        for _ in 0..5 {
            app.update();
            assert_eq!(app.world().get::<Velocity>(player), Some(&Velocity(Vec2::ZERO)));
        }

        app.world_mut().resource_mut::<Modal>().hide();
        app.update();
        assert_eq!(
            app.world().get::<Velocity>(player),
            Some(&Velocity(Vec2::new(-160.0, 0.0)))
        );
        assert_eq!(app.world().get::<Facing>(player), Some(&Facing::Left));
    }
}
