// Frame-driven motion: sprite sheet playback, the floating idle bob and easing curves.
use std::f32::consts::PI;

use bevy::prelude::*;

pub struct TweenPlugin;

impl Plugin for TweenPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (animate_sprites, float_objects));
    }
}

/// Height of the floating bob.
pub const FLOAT_RISE: f32 = 8.0;
/// Seconds for one leg of the bob; the full cycle is two legs.
pub const FLOAT_LEG: f32 = 1.2;

pub fn ease_sine_in_out(t: f32) -> f32 {
    (1.0 - (PI * t.clamp(0.0, 1.0)).cos()) / 2.0
}

pub fn ease_cubic_out(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}

/// Vertical offset of a floating object `elapsed` seconds after it spawned.
pub fn floating_offset(elapsed: f32) -> f32 {
    let legs = elapsed.max(0.0) / FLOAT_LEG;
    let progress = legs.fract();
    // Odd legs run back down (yoyo).
    let progress = if (legs as u64) % 2 == 0 {
        progress
    } else {
        1.0 - progress
    };
    FLOAT_RISE * ease_sine_in_out(progress)
}

/// Idle bob around a resting height. Removing the component stops it.
#[derive(Component, Debug, Clone, Copy)]
pub struct Floating {
    rest_y: f32,
    elapsed: f32,
}

impl Floating {
    pub fn resting_at(rest_y: f32) -> Self {
        Self {
            rest_y,
            elapsed: 0.0,
        }
    }
}

fn float_objects(time: Res<Time>, mut query: Query<(&mut Floating, &mut Transform)>) {
    for (mut floating, mut transform) in &mut query {
        floating.elapsed += time.delta_secs();
        transform.translation.y = floating.rest_y + floating_offset(floating.elapsed);
    }
}

/// Loops through the frames of a sprite's texture atlas.
#[derive(Component, Debug, Clone)]
pub struct SpriteAnimation {
    frames: usize,
    timer: Timer,
    playing: bool,
}

impl SpriteAnimation {
    pub fn looping(frames: usize, fps: f32) -> Self {
        Self {
            frames: frames.max(1),
            timer: Timer::from_seconds(1.0 / fps, TimerMode::Repeating),
            playing: true,
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn resume(&mut self) {
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Switches to a sheet with `frames` frames. A stopped animation stays stopped.
    pub fn restart(&mut self, frames: usize) {
        self.frames = frames.max(1);
        self.timer.reset();
    }

    fn advance(&mut self, delta: std::time::Duration, index: usize) -> usize {
        if !self.playing {
            return index;
        }
        self.timer.tick(delta);
        (index + self.timer.times_finished_this_tick() as usize) % self.frames
    }
}

fn animate_sprites(time: Res<Time>, mut query: Query<(&mut SpriteAnimation, &mut Sprite)>) {
    for (mut animation, mut sprite) in &mut query {
        let Some(atlas) = sprite.texture_atlas.as_mut() else {
            continue;
        };
        atlas.index = animation.advance(time.delta(), atlas.index);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn easing_curves_hit_their_end_points() {
        assert_eq!(ease_sine_in_out(0.0), 0.0);
        assert!((ease_sine_in_out(1.0) - 1.0).abs() < 1e-6);
        assert!((ease_sine_in_out(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(ease_cubic_out(0.0), 0.0);
        assert_eq!(ease_cubic_out(1.0), 1.0);
        assert_eq!(ease_cubic_out(2.0), 1.0);
    }

    #[test]
    fn floating_rises_then_returns_each_cycle() {
        assert_eq!(floating_offset(0.0), 0.0);
        assert!((floating_offset(FLOAT_LEG * 0.999) - FLOAT_RISE).abs() < 0.01);
        assert!((floating_offset(FLOAT_LEG * 1.5) - FLOAT_RISE / 2.0).abs() < 0.01);
        assert!(floating_offset(FLOAT_LEG * 1.999) < 0.01);
        for step in 0..100 {
            let offset = floating_offset(step as f32 * 0.07);
            assert!((0.0..=FLOAT_RISE).contains(&offset));
        }
    }

    #[test]
    fn animation_wraps_and_pauses() {
        let mut animation = SpriteAnimation::looping(3, 10.0);
        let frame = Duration::from_millis(101);

        assert_eq!(animation.advance(frame, 0), 1);
        assert_eq!(animation.advance(frame, 2), 0);

        animation.stop();
        assert_eq!(animation.advance(frame * 5, 1), 1);

        animation.resume();
        assert_eq!(animation.advance(frame * 2, 1), 0);
    }
}
