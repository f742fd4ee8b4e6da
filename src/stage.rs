// Scene lifecycle: builds each scene on enter, tears it down on exit and
// orders the gameplay systems that run in between.
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use strum::IntoEnumIterator;

use crate::body::WorldBounds;
use crate::config::GameConfig;
use crate::door::{PortalSheet, spawn_door};
use crate::interactable::spawn_interactable;
use crate::map::{ActiveMap, BOUNDS_PADDING, MapLayout, spawn_map};
use crate::modal::Modal;
use crate::overlay::{ShowFinal, ShowTitle, TitleEnded};
use crate::player::{PlayerSheets, spawn_player};
use crate::scenes::SceneId;
use crate::script::{Reveal, SceneScript};

pub struct StagePlugin;

impl Plugin for StagePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneFlow>()
            .configure_sets(
                Update,
                (
                    GameplaySet::Flow,
                    GameplaySet::Input,
                    GameplaySet::Motion,
                    GameplaySet::Detect,
                    GameplaySet::Trigger,
                    GameplaySet::Script,
                )
                    .chain(),
            )
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, close_title.in_set(GameplaySet::Flow));

        for set in GameplaySet::ALL {
            app.configure_sets(Update, set.run_if(resource_exists::<SceneScript>));
        }
        for set in [GameplaySet::Input, GameplaySet::Motion] {
            app.configure_sets(Update, set.run_if(accepting_input));
        }

        add_scene_lifecycle(app);
    }
}

fn add_scene_lifecycle(app: &mut App) {
    for scene in SceneId::iter() {
        app.add_systems(
            OnEnter(scene),
            (
                build_stage,
                reveal_opening.run_if(resource_exists::<SceneScript>),
            )
                .chain(),
        )
        .add_systems(
            OnExit(scene),
            move |commands: Commands, bounds: ResMut<WorldBounds>| {
                strike_stage(commands, bounds, scene)
            },
        );
    }
}

/// Viewport used when there is no window to measure.
pub const FALLBACK_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

/// Per-frame gameplay order. Only runs while a scene script is live.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameplaySet {
    /// Timers and guards.
    Flow,
    /// Keyboard handling. Paused until the title closes and while fading.
    Input,
    Motion,
    Detect,
    /// Reactions to overlaps.
    Trigger,
    Script,
}

impl GameplaySet {
    const ALL: [GameplaySet; 6] = [
        GameplaySet::Flow,
        GameplaySet::Input,
        GameplaySet::Motion,
        GameplaySet::Detect,
        GameplaySet::Trigger,
        GameplaySet::Script,
    ];
}

/// Guards for the scene being played.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneFlow {
    title_closed: bool,
    fading: bool,
}

impl SceneFlow {
    pub fn accepts_input(&self) -> bool {
        self.title_closed && !self.fading
    }

    pub fn close_title(&mut self) {
        self.title_closed = true;
    }

    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Starts the exit fade. Returns false if it had already started.
    pub fn begin_fade(&mut self) -> bool {
        !std::mem::replace(&mut self.fading, true)
    }
}

fn accepting_input(flow: Res<SceneFlow>) -> bool {
    flow.accepts_input()
}

fn close_title(mut ended: MessageReader<TitleEnded>, mut flow: ResMut<SceneFlow>) {
    if ended.read().count() > 0 && !flow.title_closed {
        debug!("title closed, input enabled");
        flow.close_title();
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Places revealed objects and doors in the current scene.
#[derive(SystemParam)]
pub struct Stagehand<'w, 's> {
    commands: Commands<'w, 's>,
    asset_server: Res<'w, AssetServer>,
    active_map: Option<Res<'w, ActiveMap>>,
    portal: Option<Res<'w, PortalSheet>>,
    scene: Res<'w, State<SceneId>>,
}

impl Stagehand<'_, '_> {
    pub fn place(&mut self, reveals: &[Reveal]) {
        if reveals.is_empty() {
            return;
        }
        let scene = *self.scene.get();
        let Some(spec) = scene.spec() else {
            return;
        };
        let Some(map) = self.active_map.as_deref() else {
            warn!("nothing to place {} reveal(s) on in {scene}", reveals.len());
            return;
        };

        for reveal in reveals {
            match *reveal {
                Reveal::Object { beat, one_shot } => {
                    debug!("revealing `{}`", beat.key);
                    spawn_interactable(
                        &mut self.commands,
                        &self.asset_server,
                        beat,
                        map.map_to_world(beat.at),
                        one_shot,
                        scene,
                    );
                }
                Reveal::Door => {
                    debug!("door to {} revealed", spec.door.next);
                    spawn_door(
                        &mut self.commands,
                        self.portal.as_deref(),
                        spec.door.next,
                        spec.door.at.resolve_world(map),
                        scene,
                    );
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_stage(
    mut commands: Commands,
    scene: Res<State<SceneId>>,
    config: Option<Res<GameConfig>>,
    asset_server: Res<AssetServer>,
    windows: Query<&Window, With<PrimaryWindow>>,
    sheets: Option<Res<PlayerSheets>>,
    mut bounds: ResMut<WorldBounds>,
    mut titles: MessageWriter<ShowTitle>,
    mut finals: MessageWriter<ShowFinal>,
) {
    let scene = *scene.get();
    info!("entering {scene}");
    commands.insert_resource(SceneFlow::default());
    commands.insert_resource(Modal::default());

    let Some(spec) = scene.spec() else {
        bounds.0 = None;
        finals.write(ShowFinal);
        return;
    };

    let config = config.as_deref().cloned().unwrap_or_default();
    let viewport = windows
        .single()
        .map(|window| window.size())
        .unwrap_or(FALLBACK_VIEWPORT);
    let layout = MapLayout::new(spec.map.load(viewport), viewport);

    spawn_map(
        &mut commands,
        &asset_server,
        &spec.map,
        &layout,
        scene,
        config.debug_colliders,
    );
    bounds.0 = Some(layout.world_bounds(BOUNDS_PADDING));
    spawn_player(
        &mut commands,
        sheets.as_deref(),
        spec.player_start.resolve_world(&layout),
        config.player_speed,
        scene,
    );

    commands.insert_resource(ActiveMap(layout));
    commands.insert_resource(SceneScript::new(&spec.script));
    titles.write(ShowTitle {
        title: spec.title.to_string(),
        subtitle: spec.subtitle.map(str::to_string),
    });
}

fn reveal_opening(mut script: ResMut<SceneScript>, mut stagehand: Stagehand) {
    let reveals = script.opening();
    stagehand.place(&reveals);
}

fn strike_stage(mut commands: Commands, mut bounds: ResMut<WorldBounds>, scene: SceneId) {
    info!("leaving {scene}");
    commands.remove_resource::<SceneScript>();
    commands.remove_resource::<ActiveMap>();
    bounds.0 = None;
}

#[cfg(test)]
mod tests {
    use bevy::state::app::StatesPlugin;

    use super::*;
    use crate::body::{Hitbox, Solid};
    use crate::door::Door;
    use crate::interactable::Interactable;
    use crate::player::Player;

    #[test]
    fn flow_accepts_input_only_between_title_and_fade() {
        let mut flow = SceneFlow::default();
        assert!(!flow.accepts_input());
        flow.close_title();
        assert!(flow.accepts_input());
        assert!(flow.begin_fade());
        assert!(!flow.begin_fade());
        assert!(!flow.accepts_input());
    }

    fn stage_app(start: SceneId) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin, AssetPlugin::default()))
            .init_asset::<Image>()
            .insert_state(start)
            .init_resource::<WorldBounds>()
            .add_message::<ShowTitle>()
            .add_message::<ShowFinal>()
            .add_message::<TitleEnded>();
        add_scene_lifecycle(&mut app);
        app
    }

    fn count<F: bevy::ecs::query::QueryFilter>(app: &mut App) -> usize {
        let mut query = app.world_mut().query_filtered::<(), F>();
        query.iter(app.world()).count()
    }

    #[test]
    fn entering_a_threshold_scene_lays_out_every_object() {
        let mut app = stage_app(SceneId::Bedroom);
        app.update();

        assert!(app.world().contains_resource::<SceneScript>());
        assert!(app.world().contains_resource::<ActiveMap>());
        assert!(app.world().resource::<WorldBounds>().0.is_some());
        assert_eq!(count::<With<Player>>(&mut app), 1);
        assert_eq!(count::<With<Interactable>>(&mut app), 2);
        assert_eq!(count::<With<Door>>(&mut app), 0);
        assert!(count::<(With<Solid>, With<Hitbox>)>(&mut app) > 0);
    }

    #[test]
    fn ordered_scene_opens_with_a_single_object() {
        let mut app = stage_app(SceneId::Brucoli);
        app.update();
        assert_eq!(count::<With<Interactable>>(&mut app), 1);
    }

    #[test]
    fn leaving_a_scene_clears_it_before_the_next_is_built() {
        let mut app = stage_app(SceneId::Bedroom);
        app.update();
        app.world_mut()
            .resource_mut::<NextState<SceneId>>()
            .set(SceneId::Final);
        app.update();

        assert!(!app.world().contains_resource::<SceneScript>());
        assert!(!app.world().contains_resource::<ActiveMap>());
        assert!(app.world().resource::<WorldBounds>().0.is_none());
        assert_eq!(count::<With<Player>>(&mut app), 0);
        assert_eq!(count::<With<Interactable>>(&mut app), 0);
        assert_eq!(count::<With<Solid>>(&mut app), 0);
    }
}
