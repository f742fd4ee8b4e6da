// Collision maps: both JSON encodings, viewport fitting and collider spawning.
use bevy::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::body::{Hitbox, Solid};
use crate::scenes::SceneId;

/// Gap kept between the scaled map edge and the walkable area.
pub const BOUNDS_PADDING: f32 = 64.0;

const COLLISION_LAYER: &str = "Collision";
const BLOCKING_CELL: u32 = 1;

const BACKGROUND_Z: f32 = -10.0;
const DEBUG_Z: f32 = 1.0;
const DEBUG_COLOUR: Color = Color::srgba(0.0, 1.0, 0.0, 0.5);
const DEBUG_TEXT: Color = Color::srgb(1.0, 0.0, 0.0);

/// One collision rectangle in map pixels. `(x, y)` is the centre.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MapBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Collider {
    pub name: String,
    pub boxes: Vec<MapBox>,
}

/// Canonical collision map, whichever encoding it was read from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSettings {
    #[serde(default)]
    pub map_identifier: String,
    pub map_width: f32,
    pub map_height: f32,
    pub colliders: Vec<Collider>,
}

/// Tiled-style grid export: cells equal to 1 in the collision layer block.
#[derive(Debug, Deserialize)]
struct TileGrid {
    width: u32,
    height: u32,
    tilewidth: f32,
    tileheight: f32,
    layers: Vec<GridLayer>,
}

#[derive(Debug, Deserialize)]
struct GridLayer {
    name: String,
    #[serde(default)]
    data: Vec<u32>,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("collision map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collision map field `{path}` is invalid: {message}")]
    Field { path: String, message: String },
    #[error("collision map has neither `colliders` nor `layers`")]
    UnknownEncoding,
    #[error("tile grid has no `{0}` layer")]
    MissingLayer(&'static str),
    #[error("tile grid layer holds {actual} cells, expected {expected}")]
    GridSizeMismatch { expected: usize, actual: usize },
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },
}

impl MapSettings {
    /// Reads either the box-list or the tile-grid encoding.
    pub fn from_json(raw: &str) -> Result<Self, MapError> {
        let value: Value = serde_json::from_str(raw)?;
        let settings = if value.get("colliders").is_some() {
            deserialize_at::<MapSettings>(value)?
        } else if value.get("layers").is_some() {
            deserialize_at::<TileGrid>(value)?.into_settings()?
        } else {
            return Err(MapError::UnknownEncoding);
        };

        let (width, height) = (settings.map_width, settings.map_height);
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(MapError::InvalidDimensions { width, height });
        }
        Ok(settings)
    }

    /// A map the size of the viewport with nothing to collide with.
    pub fn without_colliders(identifier: &str, viewport: Vec2) -> Self {
        Self {
            map_identifier: identifier.to_string(),
            map_width: viewport.x.max(1.0),
            map_height: viewport.y.max(1.0),
            colliders: Vec::new(),
        }
    }

    pub fn box_count(&self) -> usize {
        self.colliders.iter().map(|collider| collider.boxes.len()).sum()
    }
}

fn deserialize_at<T: DeserializeOwned>(value: Value) -> Result<T, MapError> {
    serde_path_to_error::deserialize(value).map_err(|err| MapError::Field {
        path: err.path().to_string(),
        message: err.inner().to_string(),
    })
}

impl TileGrid {
    fn into_settings(self) -> Result<MapSettings, MapError> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::InvalidDimensions {
                width: self.width as f32,
                height: self.height as f32,
            });
        }
        let layer = self
            .layers
            .into_iter()
            .find(|layer| layer.name == COLLISION_LAYER)
            .ok_or(MapError::MissingLayer(COLLISION_LAYER))?;

        let expected = self.width as usize * self.height as usize;
        if layer.data.len() != expected {
            return Err(MapError::GridSizeMismatch {
                expected,
                actual: layer.data.len(),
            });
        }

        let (tile_w, tile_h) = (self.tilewidth, self.tileheight);
        let mut boxes = Vec::new();
        for (row, cells) in layer.data.chunks(self.width as usize).enumerate() {
            // Merge horizontal runs of blocking cells into one box.
            let mut col = 0;
            while col < cells.len() {
                if cells[col] != BLOCKING_CELL {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < cells.len() && cells[col] == BLOCKING_CELL {
                    col += 1;
                }
                let run = (col - start) as f32;
                boxes.push(MapBox {
                    x: start as f32 * tile_w + run * tile_w / 2.0,
                    y: row as f32 * tile_h + tile_h / 2.0,
                    width: run * tile_w,
                    height: tile_h,
                });
            }
        }

        Ok(MapSettings {
            map_identifier: String::new(),
            map_width: self.width as f32 * tile_w,
            map_height: self.height as f32 * tile_h,
            colliders: vec![Collider {
                name: COLLISION_LAYER.to_string(),
                boxes,
            }],
        })
    }
}

/// Size of the map once fitted into the viewport. Never upscaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledDisplay {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl ScaledDisplay {
    pub fn fit(settings: &MapSettings, viewport: Vec2) -> Self {
        let scale = (viewport.x / settings.map_width)
            .min(viewport.y / settings.map_height)
            .min(1.0);
        Self {
            width: settings.map_width * scale,
            height: settings.map_height * scale,
            scale,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// A collider box placed on screen (top-left origin, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBox<'a> {
    pub collider: &'a str,
    pub source: MapBox,
    pub center: Vec2,
    pub size: Vec2,
}

/// A map fitted to a viewport.
///
/// Three coordinate spaces are in play: map pixels, screen pixels (top-left
/// origin, y down, the space authored positions are written in) and Bevy world
/// units (centre origin, y up).
#[derive(Debug, Clone)]
pub struct MapLayout {
    settings: MapSettings,
    viewport: Vec2,
    display: ScaledDisplay,
}

impl MapLayout {
    pub fn new(settings: MapSettings, viewport: Vec2) -> Self {
        let display = ScaledDisplay::fit(&settings, viewport);
        Self {
            settings,
            viewport,
            display,
        }
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn display(&self) -> ScaledDisplay {
        self.display
    }

    /// Screen position of the scaled map's top-left corner.
    fn origin(&self) -> Vec2 {
        (self.viewport - self.display.size()) / 2.0
    }

    pub fn map_to_screen(&self, point: Vec2) -> Vec2 {
        point * self.display.scale + self.origin()
    }

    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x - self.viewport.x / 2.0,
            self.viewport.y / 2.0 - point.y,
        )
    }

    pub fn map_to_world(&self, point: Vec2) -> Vec2 {
        self.screen_to_world(self.map_to_screen(point))
    }

    pub fn placed_boxes(&self) -> impl Iterator<Item = PlacedBox<'_>> {
        self.settings.colliders.iter().flat_map(move |collider| {
            collider.boxes.iter().map(move |source| PlacedBox {
                collider: collider.name.as_str(),
                source: *source,
                center: self.map_to_screen(Vec2::new(source.x, source.y)),
                size: Vec2::new(source.width, source.height) * self.display.scale,
            })
        })
    }

    /// Walkable world rectangle: the scaled map minus `padding` on every side.
    pub fn world_bounds(&self, padding: f32) -> Rect {
        let origin = self.origin();
        let size = self.display.size();
        let (min, max) = (origin + padding, origin + size - padding);
        // A map smaller than twice the padding collapses to its centre.
        let centre = origin + size / 2.0;
        let min_screen = min.min(centre);
        let max_screen = max.max(centre);
        Rect::from_corners(
            self.screen_to_world(min_screen),
            self.screen_to_world(max_screen),
        )
    }
}

/// Where to find a scene's collision map and background image.
#[derive(Debug, Clone, Copy)]
pub struct MapSpec {
    pub identifier: &'static str,
    pub collision: &'static str,
}

impl MapSpec {
    /// Parses the embedded collision map, falling back to no collision.
    pub fn load(&self, viewport: Vec2) -> MapSettings {
        match MapSettings::from_json(self.collision) {
            Ok(mut settings) => {
                if settings.map_identifier.is_empty() {
                    settings.map_identifier = self.identifier.to_string();
                }
                settings
            }
            Err(err) => {
                warn!(
                    "map `{}`: {err}; continuing without collision",
                    self.identifier
                );
                MapSettings::without_colliders(self.identifier, viewport)
            }
        }
    }

    pub fn background_path(&self) -> String {
        format!("maps/{}.png", self.identifier)
    }
}

/// An authored position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Map pixels, scaled with the map.
    Map(Vec2),
    /// A fraction of the viewport plus a fixed screen offset.
    Screen { anchor: Vec2, offset: Vec2 },
}

impl Placement {
    pub fn resolve(&self, layout: &MapLayout) -> Vec2 {
        match *self {
            Placement::Map(point) => layout.map_to_screen(point),
            Placement::Screen { anchor, offset } => layout.viewport() * anchor + offset,
        }
    }

    pub fn resolve_world(&self, layout: &MapLayout) -> Vec2 {
        layout.screen_to_world(self.resolve(layout))
    }
}

/// The fitted map of the scene being played.
#[derive(Resource, Debug, Clone, Deref)]
pub struct ActiveMap(pub MapLayout);

/// Spawns the background and one static solid per collider box.
pub fn spawn_map(
    commands: &mut Commands,
    asset_server: &AssetServer,
    spec: &MapSpec,
    layout: &MapLayout,
    scene: SceneId,
    debug: bool,
) {
    let settings = layout.settings();
    commands.spawn((
        Sprite {
            image: asset_server.load(spec.background_path()),
            custom_size: Some(Vec2::new(settings.map_width, settings.map_height)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, BACKGROUND_Z)
            .with_scale(Vec3::new(layout.display().scale, layout.display().scale, 1.0)),
        DespawnOnExit(scene),
    ));

    let mut labelled = String::new();
    for placed in layout.placed_boxes() {
        let world = layout.screen_to_world(placed.center);
        let mut solid = commands.spawn((
            Solid,
            Hitbox(placed.size),
            Transform::from_translation(world.extend(DEBUG_Z)),
            DespawnOnExit(scene),
        ));
        if !debug {
            continue;
        }
        solid.insert(Sprite::from_color(DEBUG_COLOUR, placed.size));

        spawn_debug_label(
            commands,
            format!("({}, {})", placed.source.x, placed.source.y),
            layout.screen_to_world(placed.center + Vec2::new(0.0, 15.0)),
            12.0,
            scene,
        );
        if labelled != placed.collider {
            labelled = placed.collider.to_string();
            spawn_debug_label(
                commands,
                labelled.clone(),
                layout.screen_to_world(placed.center - Vec2::new(0.0, 50.0)),
                10.0,
                scene,
            );
        }
    }

    debug!(
        "map `{}` fitted at scale {:.3} with {} colliders",
        settings.map_identifier,
        layout.display().scale,
        settings.box_count()
    );
}

fn spawn_debug_label(
    commands: &mut Commands,
    label: String,
    at: Vec2,
    font_size: f32,
    scene: SceneId,
) {
    commands.spawn((
        Text2d::new(label),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(DEBUG_TEXT),
        Transform::from_translation(at.extend(DEBUG_Z + 1.0)),
        DespawnOnExit(scene),
    ));
}
