// Just enough kinematics for a top-down walker: hitboxes, static solids,
// world bounds and per-frame overlap messages.
use bevy::prelude::*;

use crate::player::Player;
use crate::stage::GameplaySet;

pub struct BodyPlugin;

impl Plugin for BodyPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Overlap>()
            .init_resource::<WorldBounds>()
            .add_systems(Update, move_player.in_set(GameplaySet::Motion))
            .add_systems(Update, detect_overlaps.in_set(GameplaySet::Detect));
    }
}

/// Axis-aligned box in local units. The world size follows `Transform::scale`.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Hitbox(pub Vec2);

impl Hitbox {
    pub fn world_rect(&self, transform: &Transform) -> Rect {
        Rect::from_center_size(
            transform.translation.truncate(),
            self.0 * transform.scale.truncate().abs(),
        )
    }
}

/// Blocks the player instead of reporting overlaps.
#[derive(Component, Debug)]
pub struct Solid;

#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Deref, DerefMut)]
pub struct Velocity(pub Vec2);

/// Walkable area of the current scene. `None` leaves the player unbounded.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct WorldBounds(pub Option<Rect>);

/// The player's hitbox touches `entity` this frame. Sent every frame it persists.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub entity: Entity,
}

fn intersects(a: Rect, b: Rect) -> bool {
    !a.intersect(b).is_empty()
}

fn clamp_axis(value: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        value.clamp(lo, hi)
    }
}

/// Keeps a box of `size` centred at `center` fully inside `bounds`.
pub fn clamp_into(center: Vec2, size: Vec2, bounds: Rect) -> Vec2 {
    let half = size / 2.0;
    Vec2::new(
        clamp_axis(center.x, bounds.min.x + half.x, bounds.max.x - half.x),
        clamp_axis(center.y, bounds.min.y + half.y, bounds.max.y - half.y),
    )
}

/// Moves a box one axis at a time, refusing any step that newly enters a solid.
///
/// A box that already overlaps a solid may still move, so it can walk out.
pub fn resolve_motion(
    from: Vec2,
    size: Vec2,
    step: Vec2,
    solids: &[Rect],
    bounds: Option<Rect>,
) -> Vec2 {
    let mut position = from;
    for axis_step in [Vec2::new(step.x, 0.0), Vec2::new(0.0, step.y)] {
        if axis_step == Vec2::ZERO {
            continue;
        }
        let current = Rect::from_center_size(position, size);
        let moved = Rect::from_center_size(position + axis_step, size);
        let blocked = solids
            .iter()
            .any(|solid| intersects(moved, *solid) && !intersects(current, *solid));
        if !blocked {
            position += axis_step;
        }
    }

    match bounds {
        Some(bounds) => clamp_into(position, size, bounds),
        None => position,
    }
}

fn move_player(
    time: Res<Time>,
    bounds: Res<WorldBounds>,
    solids: Query<(&Transform, &Hitbox), (With<Solid>, Without<Player>)>,
    mut player: Query<(&mut Transform, &Hitbox, &Velocity), With<Player>>,
) {
    let Ok((mut transform, hitbox, velocity)) = player.single_mut() else {
        return;
    };

    let solids: Vec<Rect> = solids
        .iter()
        .map(|(transform, hitbox)| hitbox.world_rect(transform))
        .collect();
    let size = hitbox.world_rect(&transform).size();
    let next = resolve_motion(
        transform.translation.truncate(),
        size,
        velocity.0 * time.delta_secs(),
        &solids,
        bounds.0,
    );
    transform.translation.x = next.x;
    transform.translation.y = next.y;
}

fn detect_overlaps(
    player: Query<(&Transform, &Hitbox), With<Player>>,
    bodies: Query<(Entity, &Transform, &Hitbox), (Without<Player>, Without<Solid>)>,
    mut overlaps: MessageWriter<Overlap>,
) {
    let Ok((transform, hitbox)) = player.single() else {
        return;
    };
    let player_rect = hitbox.world_rect(transform);

    for (entity, transform, hitbox) in &bodies {
        if intersects(player_rect, hitbox.world_rect(transform)) {
            overlaps.write(Overlap { entity });
        }
    }
}
