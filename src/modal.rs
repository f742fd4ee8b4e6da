// Dialogue box. While it is open the player stands still; Enter closes it.
use bevy::prelude::*;

use crate::scenes::SceneId;
use crate::stage::GameplaySet;

pub struct ModalPlugin;

impl Plugin for ModalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Modal>()
            .add_message::<ModalDismissed>()
            .add_systems(Update, acknowledge_modal.in_set(GameplaySet::Input))
            .add_systems(Update, sync_modal_ui.after(GameplaySet::Script));
    }
}

const BACKDROP: Color = Color::srgba(0.0, 0.0, 0.0, 0.7);
const PANEL: Color = Color::srgba(0.173, 0.243, 0.314, 0.95);
const PANEL_BORDER: Color = Color::srgb(0.204, 0.286, 0.369);
const PROMPT: Color = Color::srgb(0.741, 0.765, 0.780);

/// The scene's dialogue state. Reset whenever a scene is entered.
#[derive(Resource, Debug, Default, Clone)]
pub struct Modal {
    open: bool,
    text: String,
}

impl Modal {
    pub fn show(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.open = true;
    }

    /// Closes the dialogue. Returns whether it was open.
    pub fn hide(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The player closed the dialogue.
#[derive(Message, Debug, Clone, Copy)]
pub struct ModalDismissed;

#[derive(Component)]
struct ModalRoot;

#[derive(Component)]
struct ModalText;

fn acknowledge_modal(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut modal: ResMut<Modal>,
    mut dismissed: MessageWriter<ModalDismissed>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    if modal.is_open() && keyboard.just_pressed(KeyCode::Enter) && modal.hide() {
        dismissed.write(ModalDismissed);
    }
}

fn sync_modal_ui(
    mut commands: Commands,
    modal: Res<Modal>,
    scene: Option<Res<State<SceneId>>>,
    mut roots: Query<&mut Visibility, With<ModalRoot>>,
    mut texts: Query<&mut Text, With<ModalText>>,
) {
    if !modal.is_changed() {
        return;
    }

    if roots.is_empty() {
        // Built on first use, then reused until the scene ends.
        if let (true, Some(scene)) = (modal.is_open(), scene) {
            spawn_modal_ui(&mut commands, modal.text(), *scene.get());
        }
        return;
    }

    let visibility = if modal.is_open() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut root in &mut roots {
        *root = visibility;
    }
    for mut text in &mut texts {
        text.0 = modal.text().to_string();
    }
}

fn spawn_modal_ui(commands: &mut Commands, text: &str, scene: SceneId) {
    commands
        .spawn((
            ModalRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                position_type: PositionType::Absolute,
                ..default()
            },
            BackgroundColor(BACKDROP),
            GlobalZIndex(50),
            DespawnOnExit(scene),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        width: Val::Px(600.0),
                        height: Val::Px(300.0),
                        border: UiRect::all(Val::Px(3.0)),
                        padding: UiRect::all(Val::Px(24.0)),
                        flex_direction: FlexDirection::Column,
                        justify_content: JustifyContent::SpaceBetween,
                        align_items: AlignItems::Center,
                        ..default()
                    },
                    BackgroundColor(PANEL),
                    BorderColor::all(PANEL_BORDER),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        ModalText,
                        Text::new(text),
                        TextFont {
                            font_size: 20.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                    panel.spawn((
                        Text::new("Press ENTER to continue"),
                        TextFont {
                            font_size: 16.0,
                            ..default()
                        },
                        TextColor(PROMPT),
                    ));
                });
        });
}
