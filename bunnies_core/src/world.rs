use std::collections::{HashMap, hash_map::Entry};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    EntityId, Rect, RoomCoord, Side, WorldError,
    config::WorldConfig,
    generation::{generate_room, sample_rect},
    room::{Enemy, Room},
};

/// Owns every room generated so far, keyed by coordinate.
///
/// Rooms are built on first visit and then kept until [`World::reset`], so a
/// coordinate always maps to the same layout within one run. The random
/// source is injected; seed it for reproducible layouts.
#[derive(Debug)]
pub struct World<R = StdRng> {
    config: WorldConfig,
    rooms: HashMap<RoomCoord, Room>,
    rng: R,
}

impl World<StdRng> {
    /// A world whose layouts are fully determined by `seed`.
    pub fn from_seed(config: WorldConfig, seed: u64) -> Result<Self, WorldError> {
        World::new(config, StdRng::seed_from_u64(seed))
    }

    /// A world seeded from the operating system.
    pub fn from_entropy(config: WorldConfig) -> Result<Self, WorldError> {
        World::new(config, StdRng::from_os_rng())
    }
}

impl<R: Rng> World<R> {
    /// Validates `config` and creates an empty world.
    pub fn new(config: WorldConfig, rng: R) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(World {
            config,
            rooms: HashMap::new(),
            rng,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the room at `coord`, generating and caching it on first use.
    pub fn get_or_create_room(&mut self, coord: RoomCoord) -> Result<&mut Room, WorldError> {
        self.room_and_rng(coord).map(|(room, _)| room)
    }

    /// Like [`World::get_or_create_room`], also lending out the random source
    /// so callers can roll dice while holding the room.
    pub fn room_and_rng(&mut self, coord: RoomCoord) -> Result<(&mut Room, &mut R), WorldError> {
        let room = match self.rooms.entry(coord) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(generate_room(coord, &self.config, &mut self.rng)?)
            }
        };
        Ok((room, &mut self.rng))
    }

    /// The cached room at `coord`, without generating one.
    pub fn room(&self, coord: RoomCoord) -> Option<&Room> {
        self.rooms.get(&coord)
    }

    pub fn room_mut(&mut self, coord: RoomCoord) -> Option<&mut Room> {
        self.rooms.get_mut(&coord)
    }

    pub fn rooms_generated(&self) -> usize {
        self.rooms.len()
    }

    /// Forgets every room; the next visit to any coordinate builds a new one.
    pub fn reset(&mut self) {
        log::info!("World reset, discarding {} rooms", self.rooms.len());
        self.rooms.clear();
    }

    /// Walks `player` through the portal on `side` of the room at `coord`.
    ///
    /// Returns the destination coordinate. The player keeps its position along
    /// the crossed edge and is placed `arrival_margin` pixels in from the
    /// opposite edge; if that spot is blocked in the destination room it is
    /// moved to the safe-zone center instead.
    pub fn portal_transition(
        &mut self,
        side: Side,
        coord: RoomCoord,
        player: &mut Rect,
        arrival_margin: i32,
    ) -> Result<RoomCoord, WorldError> {
        let (width, height) = (self.config.room_width, self.config.room_height);
        let destination = match side {
            Side::Top => {
                player.y = height - arrival_margin;
                RoomCoord::new(coord.x, coord.y + 1)
            }
            Side::Bottom => {
                player.y = arrival_margin;
                RoomCoord::new(coord.x, coord.y - 1)
            }
            Side::Left => {
                player.x = width - arrival_margin;
                RoomCoord::new(coord.x - 1, coord.y)
            }
            Side::Right => {
                player.x = arrival_margin;
                RoomCoord::new(coord.x + 1, coord.y)
            }
        };

        let interior = self.config.interior()?;
        let room = self.get_or_create_room(destination)?;
        let layout = room.layout();
        if !interior.contains_rect(player)
            || player.collides_any(&layout.obstacles)
            || player.collides_any(layout.portals.values())
        {
            player.set_center(layout.safe_zone.center());
        }
        log::info!(
            "Portal {:?}: ({}, {}) -> ({}, {}) \"{}\"",
            side,
            coord.x,
            coord.y,
            destination.x,
            destination.y,
            room.name()
        );
        Ok(destination)
    }

    /// Adds one fox to the room at `coord` at a free spot away from `avoid`.
    ///
    /// Returns `Ok(None)` if no free spot turned up within the retry budget.
    pub fn spawn_enemy(
        &mut self,
        coord: RoomCoord,
        avoid: &Rect,
    ) -> Result<Option<EntityId>, WorldError> {
        let interior = self.config.interior()?;
        let (width, height) = (self.config.enemy_width, self.config.enemy_height);
        let attempts = self.config.placement_attempts;
        let keep_out = avoid.inflate(2 * width, 2 * height);
        let (room, rng) = self.room_and_rng(coord)?;
        let spot = sample_rect(rng, &interior, width, height, attempts, |r| {
            r.collides(&keep_out)
                || r.collides_any(room.obstacles())
                || room.enemies.iter().any(|e| r.collides(&e.rect))
        });
        let Some(rect) = spot else {
            log::warn!("No free spot for a new fox in room ({}, {})", coord.x, coord.y);
            return Ok(None);
        };
        let id = room.reserve_enemy_id();
        room.enemies.push(Enemy::new(id, rect));
        log::debug!("Spawned fox {id} at ({}, {})", rect.x, rect.y);
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountRange;

    fn world(seed: u64) -> World {
        World::from_seed(WorldConfig::default(), seed).unwrap()
    }

    #[test]
    fn repeated_lookups_return_the_cached_room() {
        let mut world = world(11);
        let first = world.get_or_create_room((2, 3).into()).unwrap().clone();
        let second = world.get_or_create_room((2, 3).into()).unwrap().clone();
        assert_eq!(first.layout(), second.layout());
        assert_eq!(world.rooms_generated(), 1);
    }

    #[test]
    fn reset_discards_rooms() {
        let mut world = world(12);
        let before = world.get_or_create_room((2, 3).into()).unwrap().clone();
        world.reset();
        assert_eq!(world.rooms_generated(), 0);
        assert!(world.room((2, 3).into()).is_none());
        let after = world.get_or_create_room((2, 3).into()).unwrap().clone();
        // The rng has moved on, so the rebuilt room is a fresh draw.
        assert_ne!(before.layout(), after.layout());
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = WorldConfig {
            room_width: 0,
            ..WorldConfig::default()
        };
        assert!(World::from_seed(config, 1).is_err());
    }

    #[test]
    fn portal_transitions_move_between_neighbors() {
        let mut world = world(13);
        let origin = RoomCoord::ORIGIN;
        world.get_or_create_room(origin).unwrap();
        let mut player = Rect::new(620, 25, 40, 50).unwrap();

        let dest = world
            .portal_transition(Side::Top, origin, &mut player, 120)
            .unwrap();
        assert_eq!(dest, RoomCoord::new(0, 1));
        let room = world.room(dest).unwrap();
        assert!(!player.collides_any(room.obstacles()));

        let back = world
            .portal_transition(Side::Bottom, dest, &mut player, 120)
            .unwrap();
        assert_eq!(back, origin);
        let dest = world
            .portal_transition(Side::Left, origin, &mut player, 120)
            .unwrap();
        assert_eq!(dest, RoomCoord::new(-1, 0));
        let dest = world
            .portal_transition(Side::Right, dest, &mut player, 120)
            .unwrap();
        assert_eq!(dest, origin);
        assert_eq!(world.rooms_generated(), 3);
    }

    #[test]
    fn spawned_foxes_avoid_obstacles_and_the_player() {
        let config = WorldConfig {
            enemy_count: CountRange::new(0, 0),
            ..WorldConfig::default()
        };
        let mut world = World::from_seed(config, 14).unwrap();
        let player = Rect::new(600, 300, 40, 50).unwrap();
        for _ in 0..3 {
            assert!(world.spawn_enemy(RoomCoord::ORIGIN, &player).unwrap().is_some());
        }
        let room = world.room(RoomCoord::ORIGIN).unwrap();
        assert_eq!(room.enemies.len(), 3);
        let ids: Vec<_> = room.enemies.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        for enemy in &room.enemies {
            assert!(!enemy.rect.collides(&player));
            assert!(!enemy.rect.collides_any(room.obstacles()));
        }
    }
}
