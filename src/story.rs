// The authored story: every scene's title, map, objects and exit.
use bevy::math::Vec2;

use crate::map::{MapSpec, Placement};
use crate::scenes::{DoorSpec, SceneId, SceneSpec};
use crate::script::{Beat, INTERACTION_COOLDOWN, Retrigger, ScriptSpec};

const fn screen(anchor_x: f32, anchor_y: f32, offset_x: f32, offset_y: f32) -> Placement {
    Placement::Screen {
        anchor: Vec2::new(anchor_x, anchor_y),
        offset: Vec2::new(offset_x, offset_y),
    }
}

const fn map(x: f32, y: f32) -> Placement {
    Placement::Map(Vec2::new(x, y))
}

static BEDROOM_BEATS: [Beat; 2] = [
    Beat {
        key: "phone",
        sprite: "objects/phone.png",
        at: Vec2::new(120.0, 350.0),
        size: Vec2::new(1024.0, 1024.0),
        scale: 0.05,
        text: "Ricordi le interminabili chiamate?\n\nNon vedevo l'ora arrivasse quel momento della giornata",
    },
    Beat {
        key: "laptop",
        sprite: "objects/laptop.png",
        at: Vec2::new(280.0, 100.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.15,
        text: "Le ore passate a guardare lo schermo del computer, non riuscendo a studiare\nSolo perchè mi sei entrata in testa",
    },
];

pub static BEDROOM: SceneSpec = SceneSpec {
    title: "Davide's Bedroom",
    subtitle: Some("Catania"),
    map: MapSpec {
        identifier: "bedroom",
        collision: include_str!("../assets/maps/bedroom.json"),
    },
    player_start: screen(0.5, 0.5, 0.0, 124.0),
    script: ScriptSpec::Threshold {
        beats: &BEDROOM_BEATS,
        count: 2,
        retrigger: Retrigger::Never,
    },
    door: DoorSpec {
        next: SceneId::Brucoli,
        at: map(260.0, 680.0),
    },
};

static BRUCOLI_BEATS: [Beat; 5] = [
    Beat {
        key: "star",
        sprite: "objects/star.png",
        at: Vec2::new(482.0, 1360.0),
        size: Vec2::new(256.0, 256.0),
        scale: 0.2,
        text: "Quindi devi mettere le stelline tra pochi giorni?\nSei pronta al dolore?",
    },
    Beat {
        key: "school",
        sprite: "objects/backpack.png",
        at: Vec2::new(692.0, 1128.0),
        size: Vec2::new(1024.0, 1024.0),
        scale: 0.05,
        text: "Allora inizierai in una scuola 'Paritaria' Bene!\n\n\nMA COSA DIAMINE È UNA SCUOLA PARITARIA",
    },
    Beat {
        key: "jacket",
        sprite: "objects/jacket.png",
        at: Vec2::new(596.0, 704.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Ma perchè la giacca di jeans su un vestito così bello...\nQuesta è proprio stupida...",
    },
    Beat {
        key: "exam",
        sprite: "objects/book.png",
        at: Vec2::new(162.0, 768.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Devo dare un esame si, Algebra Lineare\nNon so nulla lo boccio sicuro!",
    },
    Beat {
        key: "movie",
        sprite: "objects/movie.png",
        at: Vec2::new(502.0, 256.0),
        size: Vec2::new(400.0, 400.0),
        scale: 0.13,
        text: "Sai esiste questa serie TV molto bella. Si chiama\n\nRiverdale",
    },
];

pub static BRUCOLI: SceneSpec = SceneSpec {
    title: "Brucoli",
    subtitle: Some("3 Settembre 2022"),
    map: MapSpec {
        identifier: "brucoli",
        collision: include_str!("../assets/maps/brucoli.json"),
    },
    player_start: screen(0.5, 1.0, 160.0, 0.0),
    script: ScriptSpec::Ordered(&BRUCOLI_BEATS),
    door: DoorSpec {
        next: SceneId::MedievalFest,
        at: screen(0.5, 0.0, -40.0, 56.0),
    },
};

static MEDIEVAL_FEST_BEATS: [Beat; 3] = [
    Beat {
        key: "lantern",
        sprite: "objects/lantern.png",
        at: Vec2::new(192.0, 420.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Tutte quelle lanterne accese...\nE noi due persi tra le bancarelle",
    },
    Beat {
        key: "crown",
        sprite: "objects/crown.png",
        at: Vec2::new(820.0, 480.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Una corona di fiori per la mia regina\nAnche se si lamentava che pungeva",
    },
    Beat {
        key: "scroll",
        sprite: "objects/scroll.png",
        at: Vec2::new(300.0, 640.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Il menu scritto su una pergamena\nE alla fine abbiamo preso le solite cose",
    },
];

pub static MEDIEVAL_FEST: SceneSpec = SceneSpec {
    title: "Medieval Fest",
    subtitle: None,
    map: MapSpec {
        identifier: "medieval_fest",
        collision: include_str!("../assets/maps/medieval_fest.json"),
    },
    player_start: screen(0.5, 0.5, 0.0, 124.0),
    script: ScriptSpec::Ordered(&MEDIEVAL_FEST_BEATS),
    door: DoorSpec {
        next: SceneId::StreetFood,
        at: map(512.0, 120.0),
    },
};

static STREET_FOOD_BEATS: [Beat; 3] = [
    Beat {
        key: "arancino",
        sprite: "objects/arancino.png",
        at: Vec2::new(250.0, 500.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Arancino, non arancina.\nSu questo non si discute",
    },
    Beat {
        key: "granita",
        sprite: "objects/granita.png",
        at: Vec2::new(512.0, 350.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Granita e brioche a colazione\nAnche a mezzanotte",
    },
    Beat {
        key: "cannolo",
        sprite: "objects/cannolo.png",
        at: Vec2::new(780.0, 520.0),
        size: Vec2::new(512.0, 512.0),
        scale: 0.1,
        text: "Un cannolo in due\nMa la metà più grande era sempre la tua",
    },
];

pub static STREET_FOOD: SceneSpec = SceneSpec {
    title: "Street Food",
    subtitle: None,
    map: MapSpec {
        identifier: "street_food",
        collision: include_str!("../assets/maps/street_food.json"),
    },
    player_start: screen(0.5, 1.0, 0.0, 0.0),
    script: ScriptSpec::Threshold {
        beats: &STREET_FOOD_BEATS,
        count: 3,
        retrigger: Retrigger::AfterCooldown(INTERACTION_COOLDOWN),
    },
    door: DoorSpec {
        next: SceneId::Final,
        at: map(512.0, 140.0),
    },
};

#[cfg(test)]
mod tests {
    use bevy::math::Rect;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::body::clamp_into;
    use crate::door::PORTAL_FRAME;
    use crate::map::{BOUNDS_PADDING, MapLayout, MapSettings};
    use crate::player::PLAYER_HITBOX;
    use crate::stage::FALLBACK_VIEWPORT;

    #[test]
    fn doors_lead_through_every_scene_to_the_final_screen() {
        let mut visited = vec![SceneId::Bedroom];
        let mut scene = SceneId::Bedroom;
        while let Some(spec) = scene.spec() {
            scene = spec.door.next;
            assert!(!visited.contains(&scene), "door loop at {scene}");
            visited.push(scene);
        }
        assert_eq!(scene, SceneId::Final);
        assert_eq!(visited, SceneId::iter().collect::<Vec<_>>());
    }

    #[test]
    fn brucoli_beats_keep_their_order() {
        let ScriptSpec::Ordered(beats) = BRUCOLI.script else {
            panic!("Brucoli is an ordered scene");
        };
        let keys: Vec<_> = beats.iter().map(|beat| beat.key).collect();
        assert_eq!(keys, ["star", "school", "jacket", "exam", "movie"]);
    }

    #[test]
    fn every_bundled_map_parses() {
        for scene in SceneId::iter() {
            let Some(spec) = scene.spec() else {
                continue;
            };
            let settings = MapSettings::from_json(spec.map.collision)
                .unwrap_or_else(|err| panic!("{scene}: {err}"));
            assert!(settings.box_count() > 0, "{scene} has no colliders");
        }
    }

    /// Whether the player, pushed as far toward `target` as the bounds allow,
    /// touches a box of `size` centred on it.
    fn reachable(layout: &MapLayout, target: Vec2, size: Vec2) -> bool {
        let bounds = layout.world_bounds(BOUNDS_PADDING);
        let player = clamp_into(target, PLAYER_HITBOX, bounds);
        let player = Rect::from_center_size(player, PLAYER_HITBOX);
        !player.intersect(Rect::from_center_size(target, size)).is_empty()
    }

    #[test]
    fn every_object_and_door_is_within_reach() {
        for scene in SceneId::iter() {
            let Some(spec) = scene.spec() else {
                continue;
            };
            let layout = MapLayout::new(spec.map.load(FALLBACK_VIEWPORT), FALLBACK_VIEWPORT);
            let beats = match spec.script {
                ScriptSpec::Ordered(beats) => beats,
                ScriptSpec::Threshold { beats, .. } => beats,
            };
            for beat in beats {
                let at = layout.map_to_world(beat.at);
                assert!(
                    reachable(&layout, at, beat.size * beat.scale),
                    "{scene}: `{}` at {at} is out of reach",
                    beat.key
                );
            }
            let door = spec.door.at.resolve_world(&layout);
            assert!(
                reachable(&layout, door, PORTAL_FRAME.as_vec2()),
                "{scene}: door at {door} is out of reach"
            );
        }
    }

    #[test]
    fn medieval_fest_uses_the_tile_grid() {
        let settings = MapSettings::from_json(MEDIEVAL_FEST.map.collision).expect("tile grid");
        assert_eq!((settings.map_width, settings.map_height), (1024.0, 768.0));
        assert_eq!(settings.colliders[0].name, "Collision");
    }
}
