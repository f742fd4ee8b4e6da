// Scene scripts: which object is revealed next, and when the door opens.
//
// Two gating policies exist side by side. An ordered script reveals its beats
// one at a time, each after the previous beat's dialogue is dismissed, and
// ends in the door. A threshold script lays every beat out at once and opens
// the door after enough distinct interactions.
use std::collections::HashMap;
use std::time::Duration;

use bevy::prelude::*;

use crate::interactable::Interacted;
use crate::modal::{Modal, ModalDismissed};
use crate::stage::{GameplaySet, Stagehand};

pub struct ScriptPlugin;

impl Plugin for ScriptPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, expire_interactions.in_set(GameplaySet::Flow))
            .add_systems(
                Update,
                (advance_script, reveal_after_dismiss)
                    .chain()
                    .in_set(GameplaySet::Script),
            );
    }
}

/// How long a threshold script remembers an interaction when re-triggering is allowed.
pub const INTERACTION_COOLDOWN: Duration = Duration::from_secs(10);

/// One narrative beat: an object to find and the line it unlocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    pub key: &'static str,
    pub sprite: &'static str,
    /// Map pixels.
    pub at: Vec2,
    /// Native sprite size before `scale`.
    pub size: Vec2,
    pub scale: f32,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrigger {
    /// Objects vanish on first touch.
    Never,
    /// Objects stay; a key counts again once it has been forgotten.
    AfterCooldown(Duration),
}

#[derive(Debug, Clone, Copy)]
pub enum ScriptSpec {
    Ordered(&'static [Beat]),
    Threshold {
        beats: &'static [Beat],
        count: usize,
        retrigger: Retrigger,
    },
}

/// Something the scene should place in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reveal {
    Object { beat: &'static Beat, one_shot: bool },
    Door,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCursor {
    Step(usize),
    Terminal,
}

#[derive(Debug, Clone)]
pub struct OrderedScript {
    beats: &'static [Beat],
    cursor: ScriptCursor,
    revealed: Option<ScriptCursor>,
}

impl OrderedScript {
    pub fn new(beats: &'static [Beat]) -> Self {
        Self {
            beats,
            cursor: cursor_at(beats, 0),
            revealed: None,
        }
    }

    pub fn cursor(&self) -> ScriptCursor {
        self.cursor
    }

    /// The current step, unless it is already in the world.
    pub fn reveal(&mut self) -> Option<Reveal> {
        if self.revealed == Some(self.cursor) {
            return None;
        }
        self.revealed = Some(self.cursor);
        let beats = self.beats;
        Some(match self.cursor {
            ScriptCursor::Step(index) => Reveal::Object {
                beat: &beats[index],
                one_shot: true,
            },
            ScriptCursor::Terminal => Reveal::Door,
        })
    }

    /// Finishes the live step if `key` names it. The cursor only moves forward.
    pub fn complete(&mut self, key: &str) -> Option<&'static Beat> {
        let ScriptCursor::Step(index) = self.cursor else {
            return None;
        };
        if self.revealed != Some(self.cursor) {
            return None;
        }
        let beats = self.beats;
        let beat = &beats[index];
        if beat.key != key {
            return None;
        }
        self.cursor = cursor_at(beats, index + 1);
        Some(beat)
    }
}

fn cursor_at(beats: &[Beat], index: usize) -> ScriptCursor {
    if index < beats.len() {
        ScriptCursor::Step(index)
    } else {
        ScriptCursor::Terminal
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdScript {
    beats: &'static [Beat],
    threshold: usize,
    retrigger: Retrigger,
    interacted: HashMap<&'static str, Duration>,
    count: usize,
    objects_revealed: bool,
    door_revealed: bool,
}

impl ThresholdScript {
    pub fn new(beats: &'static [Beat], threshold: usize, retrigger: Retrigger) -> Self {
        Self {
            beats,
            threshold,
            retrigger,
            interacted: HashMap::new(),
            count: 0,
            objects_revealed: false,
            door_revealed: false,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_interacted(&self, key: &str) -> bool {
        self.interacted.contains_key(key)
    }

    /// Every beat on the first call, then the door once the threshold is met.
    pub fn reveal(&mut self) -> Vec<Reveal> {
        let mut reveals = Vec::new();
        if !self.objects_revealed {
            self.objects_revealed = true;
            let one_shot = self.retrigger == Retrigger::Never;
            let beats = self.beats;
            reveals.extend(beats.iter().map(|beat| Reveal::Object { beat, one_shot }));
        }
        if !self.door_revealed && self.count >= self.threshold {
            self.door_revealed = true;
            reveals.push(Reveal::Door);
        }
        reveals
    }

    /// Counts `key` unless it is still remembered.
    pub fn record(&mut self, key: &str, now: Duration) -> Option<&'static Beat> {
        if self.interacted.contains_key(key) {
            return None;
        }
        let beats = self.beats;
        let beat = beats.iter().find(|beat| beat.key == key)?;
        self.count += 1;
        self.interacted.insert(beat.key, now);
        Some(beat)
    }

    /// Forgets interactions older than the cool-down. Returns how many.
    pub fn expire(&mut self, now: Duration) -> usize {
        let Retrigger::AfterCooldown(cooldown) = self.retrigger else {
            return 0;
        };
        let before = self.interacted.len();
        self.interacted
            .retain(|_, added| now.saturating_sub(*added) < cooldown);
        before - self.interacted.len()
    }
}

/// What an accepted interaction produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub beat: &'static Beat,
    /// Objects to place right away; an ordered script waits for the dialogue instead.
    pub reveals: Vec<Reveal>,
}

/// The running script of the current scene.
#[derive(Resource, Debug, Clone)]
pub enum SceneScript {
    Ordered(OrderedScript),
    Threshold(ThresholdScript),
}

impl SceneScript {
    pub fn new(spec: &ScriptSpec) -> Self {
        match *spec {
            ScriptSpec::Ordered(beats) => SceneScript::Ordered(OrderedScript::new(beats)),
            ScriptSpec::Threshold {
                beats,
                count,
                retrigger,
            } => SceneScript::Threshold(ThresholdScript::new(beats, count, retrigger)),
        }
    }

    /// Objects present when the scene opens.
    pub fn opening(&mut self) -> Vec<Reveal> {
        match self {
            SceneScript::Ordered(script) => script.reveal().into_iter().collect(),
            SceneScript::Threshold(script) => script.reveal(),
        }
    }

    pub fn on_interaction(&mut self, key: &str, now: Duration) -> Option<Progress> {
        match self {
            SceneScript::Ordered(script) => script.complete(key).map(|beat| Progress {
                beat,
                reveals: Vec::new(),
            }),
            SceneScript::Threshold(script) => {
                let beat = script.record(key, now)?;
                Some(Progress {
                    beat,
                    reveals: script.reveal(),
                })
            }
        }
    }

    pub fn on_dismiss(&mut self) -> Vec<Reveal> {
        match self {
            SceneScript::Ordered(script) => script.reveal().into_iter().collect(),
            SceneScript::Threshold(_) => Vec::new(),
        }
    }

    pub fn expire(&mut self, now: Duration) {
        if let SceneScript::Threshold(script) = self {
            let forgotten = script.expire(now);
            if forgotten > 0 {
                debug!("{forgotten} interaction(s) cooled down");
            }
        }
    }
}

fn expire_interactions(time: Res<Time>, mut script: ResMut<SceneScript>) {
    script.expire(time.elapsed());
}

fn advance_script(
    time: Res<Time>,
    mut interactions: MessageReader<Interacted>,
    mut script: ResMut<SceneScript>,
    mut modal: ResMut<Modal>,
    mut stagehand: Stagehand,
) {
    for interaction in interactions.read() {
        let Some(progress) = script.on_interaction(interaction.key, time.elapsed()) else {
            continue;
        };
        debug!("beat `{}` reached", progress.beat.key);
        modal.show(progress.beat.text);
        stagehand.place(&progress.reveals);
    }
}

fn reveal_after_dismiss(
    mut dismissals: MessageReader<ModalDismissed>,
    mut script: ResMut<SceneScript>,
    mut stagehand: Stagehand,
) {
    for _ in dismissals.read() {
        let reveals = script.on_dismiss();
        stagehand.place(&reveals);
    }
}
