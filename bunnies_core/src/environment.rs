use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    EntityId, Point, Rect, RoomCoord, Side, WorldError,
    agent::{Pursuit, pursuit_for},
    collision::{clamp_to, knockback, pixel_step, sweep_with_collision},
    config::GameConfig,
    room::Room,
    world::World,
};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Playing,
    Paused,
    Won,
    Lost,
}

/// Player intent for one tick. Axis values are -1, 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub x: i8,
    pub y: i8,
    pub dash: bool,
}

impl Input {
    pub fn new(x: i8, y: i8) -> Self {
        Input {
            x: x.signum(),
            y: y.signum(),
            dash: false,
        }
    }

    pub fn with_dash(mut self) -> Self {
        self.dash = true;
        self
    }

    pub fn is_moving(&self) -> bool {
        self.x != 0 || self.y != 0
    }
}

/// Something notable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    DashStarted,
    CarrotCollected { score: u32 },
    TrapTriggered { lives: u32 },
    CaughtByFox { fox: EntityId, lives: u32 },
    FoxSpawned { fox: EntityId },
    PortalTaken { side: Side, to: RoomCoord },
    Won,
    Lost,
}

/// Countdown timers, in seconds. Each clamps at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    pub invincibility: f32,
    pub trap_cooldown: f32,
    pub dash: f32,
    pub dash_cooldown: f32,
}

impl Timers {
    fn decay(&mut self, dt: f32) {
        for timer in [
            &mut self.invincibility,
            &mut self.trap_cooldown,
            &mut self.dash,
            &mut self.dash_cooldown,
        ] {
            *timer = (*timer - dt).max(0.0);
        }
    }
}

/// A running session: the world, the player and the rules that tie them together.
pub struct Game<R = StdRng> {
    config: GameConfig,
    world: World<R>,
    pursuit: Box<dyn Pursuit>,
    pub player: Rect,
    pub coord: RoomCoord,
    pub score: u32,
    pub lives: u32,
    pub state: GameState,
    pub timers: Timers,
}

impl<R: Rng> Game<R> {
    /// Starts a session in room (0, 0) with the player in the safe zone.
    pub fn new(config: GameConfig, world: World<R>) -> Result<Self, WorldError> {
        config.validate()?;
        let start = world.config().room_center();
        let player = Rect::centered(start, config.player_width, config.player_height)?;
        let pursuit = pursuit_for(config.chase, config.path_recompute_chance);
        let mut game = Game {
            lives: config.lives,
            config,
            world,
            pursuit,
            player,
            coord: RoomCoord::ORIGIN,
            score: 0,
            state: GameState::Playing,
            timers: Timers::default(),
        };
        game.world.get_or_create_room(game.coord)?;
        Ok(game)
    }

    /// Replaces the fox behaviour, e.g. with a custom [`Pursuit`].
    pub fn set_pursuit(&mut self, pursuit: Box<dyn Pursuit>) {
        self.pursuit = pursuit;
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World<R> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World<R> {
        &mut self.world
    }

    /// The room the player is standing in.
    pub fn current_room(&self) -> Option<&Room> {
        self.world.room(self.coord)
    }

    pub fn is_invincible(&self) -> bool {
        self.timers.invincibility > 0.0
    }

    /// Speed multiplier earned by collecting enough carrots.
    pub fn speed_boost(&self) -> f32 {
        if self.score >= self.config.speed_boost_score {
            self.config.speed_boost_multiplier
        } else {
            1.0
        }
    }

    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            GameState::Playing => GameState::Paused,
            GameState::Paused => GameState::Playing,
            other => other,
        };
    }

    /// Throws away every room and starts over from scratch.
    pub fn restart(&mut self) -> Result<(), WorldError> {
        self.world.reset();
        self.coord = RoomCoord::ORIGIN;
        self.player.set_center(self.world.config().room_center());
        self.score = 0;
        self.lives = self.config.lives;
        self.state = GameState::Playing;
        self.timers = Timers::default();
        self.world.get_or_create_room(self.coord)?;
        log::info!("Game restarted");
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Does nothing unless the game is [`GameState::Playing`].
    pub fn tick(&mut self, input: Input, dt: f32) -> Result<Vec<GameEvent>, WorldError> {
        let mut events = Vec::new();
        if self.state != GameState::Playing {
            return Ok(events);
        }
        self.timers.decay(dt);

        if input.dash && input.is_moving() && self.timers.dash_cooldown <= 0.0 {
            self.timers.dash = self.config.dash_duration;
            self.timers.dash_cooldown = self.config.dash_cooldown;
            events.push(GameEvent::DashStarted);
        }

        let base_speed = if self.timers.dash > 0.0 {
            self.config.dash_speed
        } else {
            self.config.player_speed
        };
        let speed = base_speed * self.speed_boost();
        let dx = pixel_step(f32::from(input.x) * speed, dt);
        let dy = pixel_step(f32::from(input.y) * speed, dt);

        let bounds = self.world.config().bounds()?;
        let max_step = self.world.config().max_move_step();
        let portal = {
            let room = self.world.get_or_create_room(self.coord)?;
            sweep_with_collision(&mut self.player, room.obstacles(), dx, dy, max_step);
            clamp_to(&mut self.player, &bounds);
            room.touching_portal(&self.player)
        };
        if let Some(side) = portal {
            let margin = self.config.portal_arrival_margin;
            self.coord = self
                .world
                .portal_transition(side, self.coord, &mut self.player, margin)?;
            events.push(GameEvent::PortalTaken {
                side,
                to: self.coord,
            });
            return Ok(events);
        }

        self.check_traps(&mut events)?;
        if self.state != GameState::Playing {
            return Ok(events);
        }
        self.chase(dt, &mut events)?;
        if self.state != GameState::Playing {
            return Ok(events);
        }
        self.collect_carrots(&mut events)?;
        Ok(events)
    }

    /// Takes a life and records `cause` (built from the remaining lives)
    /// ahead of any game-over event.
    fn lose_life(&mut self, events: &mut Vec<GameEvent>, cause: impl FnOnce(u32) -> GameEvent) {
        self.lives = self.lives.saturating_sub(1);
        self.timers.invincibility = self.config.invincibility_duration;
        events.push(cause(self.lives));
        if self.lives == 0 {
            self.state = GameState::Lost;
            events.push(GameEvent::Lost);
            log::info!("Out of lives with {} carrots", self.score);
        }
    }

    fn check_traps(&mut self, events: &mut Vec<GameEvent>) -> Result<(), WorldError> {
        if self.is_invincible() || self.timers.trap_cooldown > 0.0 {
            return Ok(());
        }
        let pixels = self.config.knockback_pixels;
        let max_step = self.world.config().max_move_step();
        let (room, rng) = self.world.room_and_rng(self.coord)?;
        let Some(trap) = room.traps().iter().find(|t| self.player.collides(t)).copied() else {
            return Ok(());
        };
        knockback(&mut self.player, trap.center(), room.obstacles(), pixels, max_step, rng);
        self.timers.trap_cooldown = self.config.trap_cooldown;
        self.lose_life(events, |lives| GameEvent::TrapTriggered { lives });
        Ok(())
    }

    fn chase(&mut self, dt: f32, events: &mut Vec<GameEvent>) -> Result<(), WorldError> {
        let step = pixel_step(self.config.fox_speed, dt);
        let pixels = self.config.knockback_pixels;
        let max_step = self.world.config().max_move_step();
        let target = self.player.center();
        let invincible = self.is_invincible();
        let mut catcher: Option<(EntityId, Point)> = None;
        {
            let (room, rng) = self.world.room_and_rng(self.coord)?;
            let (enemies, obstacles, nav) = room.chase_parts();
            let rng: &mut dyn RngCore = rng;
            for enemy in enemies.iter_mut() {
                let (dx, dy) = self.pursuit.steer(enemy, target, nav, step, rng);
                sweep_with_collision(&mut enemy.rect, obstacles, dx, dy, max_step);
                if !invincible && enemy.rect.collides(&self.player) {
                    catcher = Some((enemy.id, enemy.rect.center()));
                    break;
                }
            }
            if let Some((_, source)) = catcher {
                knockback(&mut self.player, source, obstacles, pixels, max_step, rng);
            }
        }

        let Some((fox, _)) = catcher else {
            return Ok(());
        };
        self.lose_life(events, |lives| GameEvent::CaughtByFox { fox, lives });
        if let Some(spawned) = self.world.spawn_enemy(self.coord, &self.player)? {
            events.push(GameEvent::FoxSpawned { fox: spawned });
        }
        Ok(())
    }

    fn collect_carrots(&mut self, events: &mut Vec<GameEvent>) -> Result<(), WorldError> {
        let room = self.world.get_or_create_room(self.coord)?;
        let player = self.player;
        let before = room.carrots.len();
        room.carrots.retain(|carrot| !player.collides(carrot));
        for _ in room.carrots.len()..before {
            self.score += 1;
            events.push(GameEvent::CarrotCollected { score: self.score });
        }
        if self.score >= self.config.target_score && self.state == GameState::Playing {
            self.state = GameState::Won;
            events.push(GameEvent::Won);
            log::info!("Collected {} carrots, game won", self.score);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChaseMode, CountRange, WorldConfig};
    use crate::room::ObstacleKind;

    /// A room with no foxes, carrots, traps or decorations unless a test adds them.
    fn quiet_world(seed: u64) -> World {
        let config = WorldConfig {
            decoration_count: CountRange::new(0, 0),
            enemy_count: CountRange::new(0, 0),
            carrot_count: CountRange::new(0, 0),
            trap_count: CountRange::new(0, 0),
            ..WorldConfig::default()
        };
        World::from_seed(config, seed).unwrap()
    }

    fn game(seed: u64) -> Game {
        Game::new(GameConfig::default(), quiet_world(seed)).unwrap()
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn player_starts_centered_in_the_safe_zone() {
        let game = game(1);
        let room = game.current_room().unwrap();
        assert_eq!(game.player.center(), Point::new(640, 360));
        assert!(room.layout().safe_zone.contains_rect(&game.player));
        assert_eq!(game.state, GameState::Playing);
        assert_eq!(game.lives, 3);
    }

    #[test]
    fn movement_uses_truncated_pixel_steps() {
        let mut game = game(2);
        let start = game.player;
        game.tick(Input::new(1, 0), DT).unwrap();
        // 650 px/s at 60 fps is 10.83 px, truncated to 10.
        assert_eq!(game.player.x - start.x, 10);
        assert_eq!(game.player.y, start.y);
    }

    #[test]
    fn dash_speeds_up_and_then_cools_down() {
        let mut game = game(3);
        let start = game.player.x;
        let events = game.tick(Input::new(-1, 0).with_dash(), DT).unwrap();
        assert!(events.contains(&GameEvent::DashStarted));
        assert_eq!(start - game.player.x, 23);
        // Still cooling down: a second request does nothing.
        let events = game.tick(Input::new(-1, 0).with_dash(), DT).unwrap();
        assert!(!events.contains(&GameEvent::DashStarted));
        assert!(game.timers.dash_cooldown > 0.0);
    }

    #[test]
    fn dash_needs_a_direction() {
        let mut game = game(4);
        let events = game.tick(Input::default().with_dash(), DT).unwrap();
        assert!(events.is_empty());
        assert_eq!(game.timers.dash_cooldown, 0.0);
    }

    #[test]
    fn paused_game_does_not_advance() {
        let mut game = game(5);
        game.toggle_pause();
        let before = game.player;
        assert!(game.tick(Input::new(1, 1), DT).unwrap().is_empty());
        assert_eq!(game.player, before);
        game.toggle_pause();
        assert_eq!(game.state, GameState::Playing);
    }

    #[test]
    fn carrots_score_and_win() {
        let mut game = Game::new(
            GameConfig {
                target_score: 2,
                ..GameConfig::default()
            },
            quiet_world(6),
        )
        .unwrap();
        let center = game.player.center();
        let room = game.world_mut().get_or_create_room(RoomCoord::ORIGIN).unwrap();
        room.carrots.push(Rect::centered(center, 25, 25).unwrap());
        room.carrots.push(Rect::centered(Point::new(center.x + 5, center.y), 25, 25).unwrap());

        let events = game.tick(Input::default(), DT).unwrap();
        assert_eq!(game.score, 2);
        assert_eq!(game.state, GameState::Won);
        assert!(events.contains(&GameEvent::Won));
        assert!(game.current_room().unwrap().carrots.is_empty());
    }

    #[test]
    fn fox_contact_costs_a_life_and_spawns_another_fox() {
        let mut game = Game::new(
            GameConfig {
                chase: ChaseMode::Direct,
                ..GameConfig::default()
            },
            quiet_world(7),
        )
        .unwrap();
        let fox_rect = game.player.translate(30, 0);
        let room = game.world_mut().get_or_create_room(RoomCoord::ORIGIN).unwrap();
        let id = room.reserve_enemy_id();
        room.enemies.push(crate::room::Enemy::new(id, fox_rect));

        let events = game.tick(Input::default(), DT).unwrap();
        assert_eq!(game.lives, 2);
        assert!(game.is_invincible());
        assert!(matches!(events[0], GameEvent::CaughtByFox { fox: 0, lives: 2 }));
        assert!(events.contains(&GameEvent::FoxSpawned { fox: 1 }));
        assert_eq!(game.current_room().unwrap().enemies.len(), 2);

        // Invincible: touching again is free.
        let events = game.tick(Input::default(), DT).unwrap();
        assert!(!events.iter().any(|e| matches!(e, GameEvent::CaughtByFox { .. })));
    }

    #[test]
    fn traps_hurt_knock_back_and_cool_down() {
        let config = WorldConfig {
            enemy_count: CountRange::new(0, 0),
            carrot_count: CountRange::new(0, 0),
            trap_count: CountRange::new(0, 0),
            ..WorldConfig::default()
        };
        let mut game = Game::new(
            GameConfig {
                lives: 1,
                ..GameConfig::default()
            },
            World::from_seed(config, 8).unwrap(),
        )
        .unwrap();
        // Traps are part of the static layout, so build a room by hand.
        let trap = Rect::centered(game.player.center(), 40, 40).unwrap();
        let room = game.world_mut().get_or_create_room(RoomCoord::ORIGIN).unwrap();
        let mut layout = room.layout().clone();
        layout.traps.push(trap);
        let nav = room.nav().clone();
        *room = Room::new(
            RoomCoord::ORIGIN,
            layout,
            nav,
            Default::default(),
            Vec::new(),
            Vec::new(),
        );

        let before = game.player.center();
        let events = game.tick(Input::default(), DT).unwrap();
        // The cause comes before the game-over.
        assert_eq!(
            events,
            vec![GameEvent::TrapTriggered { lives: 0 }, GameEvent::Lost]
        );
        assert_eq!(game.state, GameState::Lost);
        assert_ne!(game.player.center(), before);
        assert!(game.timers.trap_cooldown > 0.0);
    }

    /// Swaps the origin room's obstacles for the boundary walls plus `extra`.
    fn walls_plus(game: &mut Game, extra: &[Rect]) {
        let room = game.world_mut().room_mut(RoomCoord::ORIGIN).unwrap();
        let mut layout = room.layout().clone();
        let walls: Vec<Rect> = layout.obstacles_of(ObstacleKind::Wall).copied().collect();
        layout.obstacle_kinds = vec![ObstacleKind::Wall; walls.len()];
        layout.obstacle_kinds.extend(std::iter::repeat_n(ObstacleKind::Block, extra.len()));
        layout.obstacles = walls;
        layout.obstacles.extend_from_slice(extra);
        layout.decorations.clear();
        let nav = room.nav().clone();
        *room = Room::new(
            RoomCoord::ORIGIN,
            layout,
            nav,
            Default::default(),
            Vec::new(),
            Vec::new(),
        );
    }

    #[test]
    fn long_dash_stops_at_the_boundary_wall() {
        let mut game = game(11);
        walls_plus(&mut game, &[]);
        game.player.set_center(Point::new(45, 150));
        let events = game.tick(Input::new(-1, 0).with_dash(), 0.1).unwrap();
        assert!(events.contains(&GameEvent::DashStarted));
        assert_eq!(game.player.x, game.world().config().wall_thickness);
        let room = game.current_room().unwrap();
        assert!(!game.player.collides_any(room.obstacles()));
    }

    #[test]
    fn long_dash_stops_at_a_thin_block() {
        let mut game = game(12);
        let block = Rect::new(700, 300, 20, 120).unwrap();
        walls_plus(&mut game, &[block]);
        let events = game.tick(Input::new(1, 0).with_dash(), 0.1).unwrap();
        assert!(events.contains(&GameEvent::DashStarted));
        assert_eq!(game.player.right(), block.left());
        let room = game.current_room().unwrap();
        assert!(!game.player.collides_any(room.obstacles()));
    }

    /// Foxes that never move.
    struct Frozen;

    impl Pursuit for Frozen {
        fn steer(
            &mut self,
            _enemy: &mut crate::room::Enemy,
            _target: Point,
            _nav: &crate::pathfinding::PathGrid,
            _step: i32,
            _rng: &mut dyn RngCore,
        ) -> (i32, i32) {
            (0, 0)
        }
    }

    #[test]
    fn custom_pursuit_replaces_the_configured_one() {
        let mut game = game(13);
        let fox_rect = game.player.translate(45, 0);
        let room = game.world_mut().room_mut(RoomCoord::ORIGIN).unwrap();
        let id = room.reserve_enemy_id();
        room.enemies.push(crate::room::Enemy::new(id, fox_rect));

        game.set_pursuit(Box::new(Frozen));
        for _ in 0..30 {
            game.tick(Input::default(), DT).unwrap();
        }
        let room = game.current_room().unwrap();
        assert_eq!(room.enemies[0].rect, fox_rect);
        assert_eq!(game.lives, 3);
    }

    #[test]
    fn walking_into_a_portal_changes_rooms() {
        let mut game = game(9);
        let portal = *game.current_room().unwrap().layout().portal(Side::Right).unwrap();
        game.player.set_center(Point::new(portal.left() - 30, portal.center().y));
        let mut taken = None;
        for _ in 0..10 {
            let events = game.tick(Input::new(1, 0), DT).unwrap();
            if let Some(GameEvent::PortalTaken { side, to }) = events.last() {
                taken = Some((*side, *to));
                break;
            }
        }
        assert_eq!(taken, Some((Side::Right, RoomCoord::new(1, 0))));
        assert_eq!(game.coord, RoomCoord::new(1, 0));
        assert_eq!(game.world().rooms_generated(), 2);
    }

    #[test]
    fn restart_resets_everything() {
        let mut game = game(10);
        game.score = 7;
        game.lives = 1;
        game.coord = RoomCoord::new(3, 3);
        game.state = GameState::Lost;
        game.restart().unwrap();
        assert_eq!((game.score, game.lives), (0, 3));
        assert_eq!(game.coord, RoomCoord::ORIGIN);
        assert_eq!(game.state, GameState::Playing);
        assert_eq!(game.world().rooms_generated(), 1);
    }
}
