// Parchment title cards at the start of each scene, and the closing letter.
use bevy::prelude::*;

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ShowTitle>()
            .add_message::<TitleEnded>()
            .add_message::<ShowFinal>()
            .add_systems(Update, (show_title, fade_card).chain())
            .add_systems(Update, (show_final, fade_final).chain());
    }
}

const FADE_IN: f32 = 1.0;
const HOLD: f32 = 1.5;
const FADE_OUT: f32 = 0.5;
const TOTAL: f32 = FADE_IN + HOLD + FADE_OUT;

const FINAL_FADE: f32 = 1.2;

const PARCHMENT: &str = "ui/parchment.png";
const INK: Color = Color::srgb(0.443, 0.247, 0.071);

const FINAL_LETTER: &str = "\
Tre anni di litigate, arrabbiature, momenti tristi e poco belli MA,\n\n\
Insieme a tutto questo, sono stati anche tre anni di Amore, di Felicità, di Gioia, \
di Gioco e di Divertimento. Li ripeterei tutti, dalla prima all'ultima cosa. \
Magari, questa volta, ti darei io le ripetizioni di matematica...\n\n\
Mi hai fatto capire cosa significa davvero avere accanto qualcuno che mi ama e mi \
sostiene, sia nelle stupidaggini che nelle cose più serie.\n\n\
Ci sei, e ci sei sempre stata. Spero tanto di essere stato lo stesso per te.\n\n\
Ti amo, e ti amerò ancora di più nei prossimi 3, 5, 10... 100.000.000 anni.\n\n\
Grazie per essere la mia forza, la mia ispirazione, ciò che ogni giorno mi spinge \
a dare il meglio e a non arrendermi.\n\n\
Grazie per questi splendidi, meravigliosi, felici, scherzosi (e a volte litigarelli) \
anni insieme. Con la certezza che ne verranno tanti, tantissimi altri.";

/// Put a title card on screen, replacing any card already showing.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ShowTitle {
    pub title: String,
    pub subtitle: Option<String>,
}

/// The title card finished and was removed.
#[derive(Message, Debug, Clone, Copy)]
pub struct TitleEnded;

/// Show the closing letter.
#[derive(Message, Debug, Clone, Copy)]
pub struct ShowFinal;

#[derive(Component, Debug, Default)]
struct TitleCard {
    elapsed: f32,
}

impl TitleCard {
    /// Opacity at the current time.
    fn alpha(&self) -> f32 {
        card_alpha(self.elapsed)
    }
}

fn card_alpha(t: f32) -> f32 {
    if t < FADE_IN {
        t / FADE_IN
    } else if t < FADE_IN + HOLD {
        1.0
    } else {
        (1.0 - (t - FADE_IN - HOLD) / FADE_OUT).max(0.0)
    }
}

#[derive(Component)]
struct FinalScreen {
    elapsed: f32,
}

fn show_title(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut requests: MessageReader<ShowTitle>,
    cards: Query<Entity, With<TitleCard>>,
) {
    let Some(request) = requests.read().last() else {
        return;
    };
    for card in &cards {
        commands.entity(card).despawn();
    }

    commands
        .spawn((
            TitleCard::default(),
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                position_type: PositionType::Absolute,
                ..default()
            },
            GlobalZIndex(100),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        width: Val::Px(520.0),
                        height: Val::Px(260.0),
                        flex_direction: FlexDirection::Column,
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        row_gap: Val::Px(12.0),
                        ..default()
                    },
                    ImageNode::new(asset_server.load(PARCHMENT))
                        .with_color(Color::WHITE.with_alpha(0.0)),
                ))
                .with_children(|parchment| {
                    parchment.spawn((
                        Text::new(request.title.clone()),
                        TextFont {
                            font_size: 48.0,
                            ..default()
                        },
                        TextColor(INK.with_alpha(0.0)),
                    ));
                    if let Some(subtitle) = &request.subtitle {
                        parchment.spawn((
                            Text::new(subtitle.clone()),
                            TextFont {
                                font_size: 24.0,
                                ..default()
                            },
                            TextColor(INK.with_alpha(0.0)),
                        ));
                    }
                });
        });
}

fn fade_card(
    mut commands: Commands,
    time: Res<Time>,
    mut cards: Query<(Entity, &mut TitleCard)>,
    children: Query<&Children>,
    mut images: Query<&mut ImageNode>,
    mut texts: Query<&mut TextColor>,
    mut ended: MessageWriter<TitleEnded>,
) {
    for (entity, mut card) in &mut cards {
        card.elapsed += time.delta_secs();

        if card.elapsed >= TOTAL {
            commands.entity(entity).despawn();
            ended.write(TitleEnded);
            continue;
        }

        let alpha = card.alpha();
        for descendant in children.iter_descendants(entity) {
            if let Ok(mut image) = images.get_mut(descendant) {
                image.color.set_alpha(alpha);
            }
            if let Ok(mut text) = texts.get_mut(descendant) {
                text.0.set_alpha(alpha);
            }
        }
    }
}

fn show_final(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut requests: MessageReader<ShowFinal>,
    screens: Query<(), With<FinalScreen>>,
) {
    if requests.read().count() == 0 || !screens.is_empty() {
        return;
    }
    info!("showing the final letter");

    commands
        .spawn((
            FinalScreen { elapsed: 0.0 },
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                padding: UiRect::all(Val::Px(80.0)),
                position_type: PositionType::Absolute,
                ..default()
            },
            ImageNode::new(asset_server.load(PARCHMENT))
                .with_color(Color::WHITE.with_alpha(0.0)),
            GlobalZIndex(100),
        ))
        .with_children(|parent| {
            parent.spawn((
                Node {
                    max_width: Val::Px(850.0),
                    ..default()
                },
                Text::new(FINAL_LETTER),
                TextFont {
                    font_size: 26.0,
                    ..default()
                },
                TextColor(INK.with_alpha(0.0)),
            ));
        });
}

fn fade_final(
    time: Res<Time>,
    mut screens: Query<(&mut FinalScreen, &mut ImageNode, &Children)>,
    mut texts: Query<&mut TextColor>,
) {
    for (mut screen, mut image, children) in &mut screens {
        if screen.elapsed >= FINAL_FADE {
            continue;
        }
        screen.elapsed += time.delta_secs();
        let alpha = (screen.elapsed / FINAL_FADE).min(1.0);

        image.color.set_alpha(alpha);
        for child in children.iter() {
            if let Ok(mut text) = texts.get_mut(child) {
                text.0.set_alpha(alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;

    #[test]
    fn card_fades_in_holds_and_fades_out() {
        assert_eq!(card_alpha(0.0), 0.0);
        assert!((card_alpha(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(card_alpha(1.0), 1.0);
        assert_eq!(card_alpha(2.4), 1.0);
        assert!((card_alpha(2.75) - 0.5).abs() < 1e-5);
        assert_eq!(card_alpha(TOTAL), 0.0);
        assert_eq!(TOTAL, 3.0);
    }

    #[derive(Resource, Default)]
    struct Ended(usize);

    fn count(mut ended: MessageReader<TitleEnded>, mut seen: ResMut<Ended>) {
        seen.0 += ended.read().count();
    }

    #[test]
    fn title_ends_after_three_seconds() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Image>()
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(250)))
            .init_resource::<Ended>()
            .add_message::<ShowTitle>()
            .add_message::<TitleEnded>()
            .add_systems(Update, (show_title, fade_card, count).chain());

        app.world_mut().write_message(ShowTitle {
            title: "Brucoli".to_string(),
            subtitle: Some("3 Settembre 2022".to_string()),
        });

        // The first update only primes the clock.
        for _ in 0..12 {
            app.update();
        }
        assert_eq!(app.world().resource::<Ended>().0, 0);

        for _ in 0..2 {
            app.update();
        }
        assert_eq!(app.world().resource::<Ended>().0, 1);

        let mut cards = app.world_mut().query::<&TitleCard>();
        assert_eq!(cards.iter(app.world()).count(), 0);
    }
}
