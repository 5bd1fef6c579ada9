use std::collections::{BTreeMap, VecDeque};

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{EntityId, Point, Rect, RoomCoord, Side, pathfinding::PathGrid};

const ADJECTIVES: [&str; 10] = [
    "Stinky",
    "Glorious",
    "Slippery",
    "Angry",
    "Cabbage-Scented",
    "Mildly Annoying",
    "Shiny",
    "Suspicious",
    "Fluffy",
    "Extreme",
];

const NOUNS: [&str; 10] = [
    "Armpit", "Basement", "Toilet", "Paradise", "Doom", "Garden", "Lair", "Swamp", "Elevator",
    "Buffet",
];

/// Background colors a room may be painted with.
pub const PALETTE: [Rgb; 5] = [
    Rgb(34, 139, 34),
    Rgb(101, 67, 33),
    Rgb(20, 80, 80),
    Rgb(107, 142, 35),
    Rgb(47, 79, 79),
];

/// Picks a silly "<Adjective> <Noun>" room name.
pub fn funny_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Nameless");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Room");
    format!("{adjective} {noun}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Visual theme; decides how blocks and decorations are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    Trees,
    Rocks,
    Blocks,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Trees, Theme::Rocks, Theme::Blocks];
}

/// What produced an obstacle rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Wall,
    Block,
    /// The footprint of a decoration.
    Footprint,
}

/// An image-backed obstacle. Only `footprint` blocks movement; the sprite
/// itself may overlap entities and other sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub sprite: Rect,
    pub footprint: Rect,
}

/// Requested vs. actually placed counts for each rejection-sampled category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub requested: usize,
    pub placed: usize,
}

impl Placement {
    pub fn is_short(&self) -> bool {
        self.placed < self.requested
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub blocks: Placement,
    pub decorations: Placement,
    pub enemies: Placement,
    pub carrots: Placement,
    pub traps: Placement,
}

impl PlacementReport {
    /// True if any category came up short of its request.
    pub fn has_shortfall(&self) -> bool {
        [
            self.blocks,
            self.decorations,
            self.enemies,
            self.carrots,
            self.traps,
        ]
        .iter()
        .any(Placement::is_short)
    }
}

/// The part of a room that never changes after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomLayout {
    pub name: String,
    pub theme: Theme,
    pub color: Rgb,
    pub safe_zone: Rect,
    /// Walls, blocks and decoration footprints; the collision set.
    pub obstacles: Vec<Rect>,
    /// Parallel to `obstacles`.
    pub obstacle_kinds: Vec<ObstacleKind>,
    pub decorations: Vec<Decoration>,
    pub portals: BTreeMap<Side, Rect>,
    /// Hazards; never collidable.
    pub traps: Vec<Rect>,
}

impl RoomLayout {
    pub fn portal(&self, side: Side) -> Option<&Rect> {
        self.portals.get(&side)
    }

    /// Obstacles of one kind, e.g. only the boundary walls.
    pub fn obstacles_of(&self, kind: ObstacleKind) -> impl Iterator<Item = &Rect> {
        self.obstacles
            .iter()
            .zip(&self.obstacle_kinds)
            .filter(move |(_, k)| **k == kind)
            .map(|(rect, _)| rect)
    }
}

/// A chasing fox and its cached route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub rect: Rect,
    /// Waypoints still to visit, as cell centers.
    pub path: VecDeque<Point>,
}

impl Enemy {
    pub fn new(id: EntityId, rect: Rect) -> Self {
        Enemy {
            id,
            rect,
            path: VecDeque::new(),
        }
    }
}

/// A generated room: an immutable layout plus the lists that change during play.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub coord: RoomCoord,
    layout: RoomLayout,
    nav: PathGrid,
    placement: PlacementReport,
    pub carrots: Vec<Rect>,
    pub enemies: Vec<Enemy>,
    next_enemy_id: EntityId,
}

impl Room {
    pub fn new(
        coord: RoomCoord,
        layout: RoomLayout,
        nav: PathGrid,
        placement: PlacementReport,
        carrots: Vec<Rect>,
        enemies: Vec<Enemy>,
    ) -> Self {
        let next_enemy_id = enemies.iter().map(|e| e.id + 1).max().unwrap_or(0);
        Room {
            coord,
            layout,
            nav,
            placement,
            carrots,
            enemies,
            next_enemy_id,
        }
    }

    pub fn layout(&self) -> &RoomLayout {
        &self.layout
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.layout.obstacles
    }

    pub fn traps(&self) -> &[Rect] {
        &self.layout.traps
    }

    pub fn name(&self) -> &str {
        &self.layout.name
    }

    /// Navigation grid derived from the static obstacles.
    pub fn nav(&self) -> &PathGrid {
        &self.nav
    }

    pub fn placement(&self) -> &PlacementReport {
        &self.placement
    }

    /// Foxes alongside the static data they move through.
    pub fn chase_parts(&mut self) -> (&mut [Enemy], &[Rect], &PathGrid) {
        (&mut self.enemies, &self.layout.obstacles, &self.nav)
    }

    /// Generates a unique id for a fox added to this room.
    pub fn reserve_enemy_id(&mut self) -> EntityId {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }

    /// The portal the rectangle is touching, if any.
    pub fn touching_portal(&self, rect: &Rect) -> Option<Side> {
        self.layout
            .portals
            .iter()
            .find(|(_, portal)| rect.collides(portal))
            .map(|(side, _)| *side)
    }
}
