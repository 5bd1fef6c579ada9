use serde::{Deserialize, Serialize};

pub mod agent;
pub mod collision;
pub mod config;
pub mod environment;
pub mod error;
pub mod generation;
pub mod geometry;
pub mod map;
pub mod pathfinding;
pub mod room;
pub mod world;

pub use error::WorldError;
pub use geometry::Rect;

/// Unique identifier for entities (foxes spawned into a room).
pub type EntityId = usize;

/// A point in continuous room (pixel) coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Integer address of a room in the endless room lattice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomCoord {
    pub x: i32,
    pub y: i32,
}

impl RoomCoord {
    pub const ORIGIN: RoomCoord = RoomCoord { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        RoomCoord { x, y }
    }
}

impl From<(i32, i32)> for RoomCoord {
    fn from((x, y): (i32, i32)) -> Self {
        RoomCoord { x, y }
    }
}

/// One of the four room edges. Each edge carries exactly one portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// The side a player arrives on after walking through this one.
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}
