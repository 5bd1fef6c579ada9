use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{Point, Rect, WorldError};

/// An inclusive `min..=max` count range that serializes as a plain table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        CountRange { min, max }
    }

    pub fn as_range(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }

    fn validate(&self, what: &str) -> Result<(), WorldError> {
        if self.min > self.max {
            return Err(WorldError::InvalidConfig(format!(
                "{what}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Static layout parameters shared by every room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub room_width: i32,
    pub room_height: i32,
    pub wall_thickness: i32,

    /// Side of a random block; blocks snap to a grid of this size.
    pub block_size: i32,
    pub block_count: CountRange,

    /// Length of a portal along its edge.
    pub portal_size: i32,
    /// Thickness of a portal perpendicular to its edge.
    pub portal_depth: i32,

    pub safe_zone_width: i32,
    pub safe_zone_height: i32,

    pub decoration_count: CountRange,
    pub decoration_width: i32,
    pub decoration_height: i32,
    /// Footprint width as a fraction of the sprite width.
    pub footprint_width_ratio: f32,
    /// Footprint height as a fraction of the sprite height.
    pub footprint_height_ratio: f32,

    pub carrot_size: i32,
    pub carrot_count: CountRange,
    pub trap_size: i32,
    pub trap_count: CountRange,
    pub enemy_width: i32,
    pub enemy_height: i32,
    pub enemy_count: CountRange,

    /// Attempts per item before a placement loop gives up.
    pub placement_attempts: usize,

    pub path_cell_size: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            room_width: 1280,
            room_height: 720,
            wall_thickness: 20,
            block_size: 80,
            block_count: CountRange::new(8, 14),
            portal_size: 70,
            portal_depth: 30,
            safe_zone_width: 300,
            safe_zone_height: 300,
            decoration_count: CountRange::new(2, 5),
            decoration_width: 96,
            decoration_height: 128,
            footprint_width_ratio: 0.5,
            footprint_height_ratio: 0.25,
            carrot_size: 25,
            carrot_count: CountRange::new(3, 6),
            trap_size: 40,
            trap_count: CountRange::new(1, 3),
            enemy_width: 50,
            enemy_height: 50,
            enemy_count: CountRange::new(1, 1),
            placement_attempts: 300,
            path_cell_size: 50,
        }
    }
}

impl WorldConfig {
    /// The whole room as a rectangle anchored at the origin.
    pub fn bounds(&self) -> Result<Rect, WorldError> {
        Rect::new(0, 0, self.room_width, self.room_height)
    }

    /// The area inside the boundary walls.
    pub fn interior(&self) -> Result<Rect, WorldError> {
        let t = self.wall_thickness;
        Rect::new(t, t, self.room_width - 2 * t, self.room_height - 2 * t)
    }

    /// The central rectangle kept free of obstacles for spawning.
    pub fn safe_zone(&self) -> Result<Rect, WorldError> {
        Rect::centered(
            self.room_center(),
            self.safe_zone_width,
            self.safe_zone_height,
        )
    }

    pub fn room_center(&self) -> Point {
        Point::new(self.room_width / 2, self.room_height / 2)
    }

    /// Size of the collision box under a sprite of the given size.
    pub fn footprint_size(&self, sprite_width: i32, sprite_height: i32) -> (i32, i32) {
        let scale = |length: i32, ratio: f32| ((length as f32 * ratio).round() as i32).max(1);
        (
            scale(sprite_width, self.footprint_width_ratio),
            scale(sprite_height, self.footprint_height_ratio),
        )
    }

    /// Largest per-axis movement step that cannot pass through any obstacle
    /// this config generates: the thinnest of walls, blocks and footprints.
    pub fn max_move_step(&self) -> i32 {
        let (foot_w, foot_h) = self.footprint_size(self.decoration_width, self.decoration_height);
        self.wall_thickness
            .min(self.block_size)
            .min(foot_w)
            .min(foot_h)
            .max(1)
    }

    /// Checks every size and range; called by the world before generating anything.
    pub fn validate(&self) -> Result<(), WorldError> {
        let positive = [
            ("room_width", self.room_width),
            ("room_height", self.room_height),
            ("wall_thickness", self.wall_thickness),
            ("block_size", self.block_size),
            ("portal_size", self.portal_size),
            ("portal_depth", self.portal_depth),
            ("safe_zone_width", self.safe_zone_width),
            ("safe_zone_height", self.safe_zone_height),
            ("decoration_width", self.decoration_width),
            ("decoration_height", self.decoration_height),
            ("carrot_size", self.carrot_size),
            ("trap_size", self.trap_size),
            ("enemy_width", self.enemy_width),
            ("enemy_height", self.enemy_height),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(WorldError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.path_cell_size <= 0 {
            return Err(WorldError::InvalidCellSize(self.path_cell_size));
        }
        for (name, ratio) in [
            ("footprint_width_ratio", self.footprint_width_ratio),
            ("footprint_height_ratio", self.footprint_height_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(WorldError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }
        if self.placement_attempts == 0 {
            return Err(WorldError::InvalidConfig(
                "placement_attempts must be at least 1".to_string(),
            ));
        }
        self.block_count.validate("block_count")?;
        self.decoration_count.validate("decoration_count")?;
        self.carrot_count.validate("carrot_count")?;
        self.trap_count.validate("trap_count")?;
        self.enemy_count.validate("enemy_count")?;

        // Portals sit just inside the walls, so the interior must fit two of
        // them plus the safe zone between them on both axes.
        let interior = self.interior().map_err(|_| {
            WorldError::InvalidConfig("walls leave no room interior".to_string())
        })?;
        let safe_zone = self.safe_zone()?;
        let inset = self.wall_thickness + self.portal_depth;
        let clear = Rect::new(
            inset,
            inset,
            self.room_width - 2 * inset,
            self.room_height - 2 * inset,
        )
        .map_err(|_| WorldError::InvalidConfig("portals leave no room interior".to_string()))?;
        if !interior.contains_rect(&safe_zone) || !clear.contains_rect(&safe_zone) {
            return Err(WorldError::InvalidConfig(format!(
                "safe zone {}x{} does not fit between the portals of a {}x{} room",
                self.safe_zone_width, self.safe_zone_height, self.room_width, self.room_height
            )));
        }
        if self.portal_size > interior.width() || self.portal_size > interior.height() {
            return Err(WorldError::InvalidConfig(format!(
                "portal_size {} is larger than the room interior",
                self.portal_size
            )));
        }
        let cols = self.room_width / self.block_size;
        let rows = self.room_height / self.block_size;
        if cols < 5 || rows < 5 {
            return Err(WorldError::InvalidConfig(format!(
                "block_size {} leaves a {cols}x{rows} block lattice, need at least 5x5",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// How foxes decide where to go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaseMode {
    /// Step straight toward the player on both axes.
    Direct,
    /// Follow an A* route, periodically recomputed.
    #[default]
    Pathfinding,
}

/// Session rules: speeds, timers and win/lose thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player_width: i32,
    pub player_height: i32,
    /// Pixels per second.
    pub player_speed: f32,
    pub fox_speed: f32,
    pub lives: u32,
    pub target_score: u32,

    /// Seconds of immunity after taking a hit.
    pub invincibility_duration: f32,
    pub knockback_pixels: i32,
    pub trap_cooldown: f32,

    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,

    pub speed_boost_score: u32,
    pub speed_boost_multiplier: f32,

    pub chase: ChaseMode,
    /// Per-tick probability that a fox replans even with a usable path.
    pub path_recompute_chance: f64,
    /// Distance from the arrival edge after walking through a portal.
    pub portal_arrival_margin: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            player_width: 40,
            player_height: 50,
            player_speed: 650.0,
            fox_speed: 300.0,
            lives: 3,
            target_score: 15,
            invincibility_duration: 1.0,
            knockback_pixels: 60,
            trap_cooldown: 0.6,
            dash_speed: 1400.0,
            dash_duration: 0.15,
            dash_cooldown: 1.0,
            speed_boost_score: 10,
            speed_boost_multiplier: 1.25,
            chase: ChaseMode::Pathfinding,
            path_recompute_chance: 0.05,
            portal_arrival_margin: 120,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.player_width <= 0 || self.player_height <= 0 {
            return Err(WorldError::InvalidDimensions {
                width: self.player_width,
                height: self.player_height,
            });
        }
        for (name, value) in [
            ("player_speed", self.player_speed),
            ("fox_speed", self.fox_speed),
            ("dash_speed", self.dash_speed),
            ("speed_boost_multiplier", self.speed_boost_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(WorldError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("invincibility_duration", self.invincibility_duration),
            ("trap_cooldown", self.trap_cooldown),
            ("dash_duration", self.dash_duration),
            ("dash_cooldown", self.dash_cooldown),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(WorldError::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.path_recompute_chance) {
            return Err(WorldError::InvalidConfig(format!(
                "path_recompute_chance must be in [0, 1], got {}",
                self.path_recompute_chance
            )));
        }
        if self.lives == 0 || self.target_score == 0 {
            return Err(WorldError::InvalidConfig(
                "lives and target_score must be at least 1".to_string(),
            ));
        }
        if self.knockback_pixels < 0 || self.portal_arrival_margin < 0 {
            return Err(WorldError::InvalidConfig(
                "knockback_pixels and portal_arrival_margin must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
