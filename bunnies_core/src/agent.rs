use rand::{Rng, RngCore};

use crate::{Point, config::ChaseMode, pathfinding::PathGrid, room::Enemy};

/// Decides how a fox moves toward its target each tick.
///
/// `&mut self` lets a behaviour keep state between ticks; per-fox state
/// (the cached route) lives on the [`Enemy`] itself.
pub trait Pursuit {
    /// Returns the pixel delta the fox wants to move this tick, each axis
    /// bounded by `step`. Collision is applied by the caller.
    fn steer(
        &mut self,
        enemy: &mut Enemy,
        target: Point,
        nav: &PathGrid,
        step: i32,
        rng: &mut dyn RngCore,
    ) -> (i32, i32);
}

/// Per-axis step from `from` toward `to`, never overshooting.
fn step_toward(from: Point, to: Point, step: i32) -> (i32, i32) {
    (
        (to.x - from.x).clamp(-step, step),
        (to.y - from.y).clamp(-step, step),
    )
}

/// Heads straight for the target on both axes, ignoring obstacles.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectChase;

impl Pursuit for DirectChase {
    fn steer(
        &mut self,
        enemy: &mut Enemy,
        target: Point,
        _nav: &PathGrid,
        step: i32,
        _rng: &mut dyn RngCore,
    ) -> (i32, i32) {
        step_toward(enemy.rect.center(), target, step)
    }
}

/// Follows an A* route through the room's navigation grid.
///
/// Routes are only rebuilt when the cached one is nearly used up, or on a
/// small random chance each tick, so a fox may trail a moving player by a
/// few ticks. With no route it falls back to [`DirectChase`].
#[derive(Debug, Clone, Copy)]
pub struct PathChase {
    recompute_chance: f64,
}

impl PathChase {
    pub fn new(recompute_chance: f64) -> Self {
        PathChase {
            recompute_chance: recompute_chance.clamp(0.0, 1.0),
        }
    }
}

impl Pursuit for PathChase {
    fn steer(
        &mut self,
        enemy: &mut Enemy,
        target: Point,
        nav: &PathGrid,
        step: i32,
        rng: &mut dyn RngCore,
    ) -> (i32, i32) {
        let position = enemy.rect.center();
        if enemy.path.len() <= 1 || rng.random_bool(self.recompute_chance) {
            enemy.path = nav.find_path(position, target).into();
        }

        // Drop waypoints already reached.
        while enemy.path.front() == Some(&position) {
            enemy.path.pop_front();
        }

        match enemy.path.front() {
            Some(&waypoint) => step_toward(position, waypoint, step),
            None => DirectChase.steer(enemy, target, nav, step, rng),
        }
    }
}

/// Builds the behaviour selected by `mode`.
pub fn pursuit_for(mode: ChaseMode, recompute_chance: f64) -> Box<dyn Pursuit> {
    match mode {
        ChaseMode::Direct => Box::new(DirectChase),
        ChaseMode::Pathfinding => Box::new(PathChase::new(recompute_chance)),
    }
}
