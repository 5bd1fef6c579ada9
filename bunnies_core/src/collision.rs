use rand::Rng;

use crate::{Point, Rect};

/// Moves `rect` by `(dx, dy)`, one axis at a time, stopping flush against obstacles.
///
/// The x step is applied and every overlapped obstacle snaps the leading edge
/// back to the obstacle's near edge; then the same happens for y. A zero delta
/// on an axis never corrects that axis. Obstacles are visited in slice order,
/// so a rect squeezed between several overlapping obstacles at once may end up
/// snapped by whichever came last.
pub fn move_with_collision(rect: &mut Rect, obstacles: &[Rect], dx: i32, dy: i32) {
    rect.x += dx;
    for obstacle in obstacles {
        if rect.collides(obstacle) {
            if dx > 0 {
                rect.set_right(obstacle.left());
            } else if dx < 0 {
                rect.set_left(obstacle.right());
            }
        }
    }

    rect.y += dy;
    for obstacle in obstacles {
        if rect.collides(obstacle) {
            if dy > 0 {
                rect.set_bottom(obstacle.top());
            } else if dy < 0 {
                rect.set_top(obstacle.bottom());
            }
        }
    }
}

/// Like [`move_with_collision`], but split into sub-steps of at most
/// `max_step` pixels per axis so a long move cannot skip over an obstacle
/// thinner than the move itself.
pub fn sweep_with_collision(rect: &mut Rect, obstacles: &[Rect], dx: i32, dy: i32, max_step: i32) {
    let max_step = max_step.max(1).unsigned_abs();
    let steps = dx.unsigned_abs().max(dy.unsigned_abs()).div_ceil(max_step) as i64;
    let (dx, dy) = (i64::from(dx), i64::from(dy));
    for i in 0..steps {
        let step_x = dx * (i + 1) / steps - dx * i / steps;
        let step_y = dy * (i + 1) / steps - dy * i / steps;
        move_with_collision(rect, obstacles, step_x as i32, step_y as i32);
    }
}

/// Converts a per-tick velocity into whole pixels, truncating toward zero.
pub fn pixel_step(velocity: f32, dt: f32) -> i32 {
    (velocity * dt) as i32
}

/// Shoves `rect` `pixels` away from `source`, still respecting obstacles.
///
/// When the centers coincide a random diagonal is used. The push is swept in
/// steps of at most `max_step` pixels.
pub fn knockback<R: Rng + ?Sized>(
    rect: &mut Rect,
    source: Point,
    obstacles: &[Rect],
    pixels: i32,
    max_step: i32,
    rng: &mut R,
) {
    let center = rect.center();
    let (mut vx, mut vy) = ((center.x - source.x) as f32, (center.y - source.y) as f32);
    if vx == 0.0 && vy == 0.0 {
        vx = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        vy = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    }
    let length = vx.hypot(vy);
    let (nx, ny) = (vx / length, vy / length);
    sweep_with_collision(
        rect,
        obstacles,
        (nx * pixels as f32) as i32,
        (ny * pixels as f32) as i32,
        max_step,
    );
}

/// Pulls `rect` back inside `bounds` if it has strayed past an edge.
pub fn clamp_to(rect: &mut Rect, bounds: &Rect) {
    if rect.left() < bounds.left() {
        rect.set_left(bounds.left());
    }
    if rect.right() > bounds.right() {
        rect.set_right(bounds.right());
    }
    if rect.top() < bounds.top() {
        rect.set_top(bounds.top());
    }
    if rect.bottom() > bounds.bottom() {
        rect.set_bottom(bounds.bottom());
    }
}
