use std::collections::BTreeMap;

use rand::{Rng, seq::IndexedRandom};

use crate::{
    Rect, RoomCoord, Side, WorldError,
    config::WorldConfig,
    pathfinding::PathGrid,
    room::{
        Decoration, Enemy, ObstacleKind, PALETTE, PlacementReport, Rgb, Room,
        RoomLayout, Theme, funny_name,
    },
};

/// Draws a `width` x `height` rect fully inside `area` that `reject` accepts.
///
/// Gives up after `attempts` draws, and immediately if the rect cannot fit.
pub(crate) fn sample_rect<R, F>(
    rng: &mut R,
    area: &Rect,
    width: i32,
    height: i32,
    attempts: usize,
    mut reject: F,
) -> Option<Rect>
where
    R: Rng + ?Sized,
    F: FnMut(&Rect) -> bool,
{
    if width > area.width() || height > area.height() {
        return None;
    }
    for _ in 0..attempts {
        let x = rng.random_range(area.left()..=area.right() - width);
        let y = rng.random_range(area.top()..=area.bottom() - height);
        let candidate = Rect::new(x, y, width, height).ok()?;
        if !reject(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// The four boundary walls: top, bottom, left, right.
pub fn boundary_walls(config: &WorldConfig) -> Result<[Rect; 4], WorldError> {
    let (w, h, t) = (config.room_width, config.room_height, config.wall_thickness);
    Ok([
        Rect::new(0, 0, w, t)?,
        Rect::new(0, h - t, w, t)?,
        Rect::new(0, 0, t, h)?,
        Rect::new(w - t, 0, t, h)?,
    ])
}

/// One portal per side, centered on its edge and sitting just inside the wall.
pub fn portals(config: &WorldConfig) -> Result<BTreeMap<Side, Rect>, WorldError> {
    let (w, h, t) = (config.room_width, config.room_height, config.wall_thickness);
    let (size, depth) = (config.portal_size, config.portal_depth);
    let mut portals = BTreeMap::new();
    portals.insert(Side::Top, Rect::new(w / 2 - size / 2, t, size, depth)?);
    portals.insert(
        Side::Bottom,
        Rect::new(w / 2 - size / 2, h - t - depth, size, depth)?,
    );
    portals.insert(Side::Left, Rect::new(t, h / 2 - size / 2, depth, size)?);
    portals.insert(
        Side::Right,
        Rect::new(w - t - depth, h / 2 - size / 2, depth, size)?,
    );
    Ok(portals)
}

/// Footprint of a decoration sprite: a narrower, shorter box anchored at the
/// bottom-center of the sprite.
pub fn footprint(sprite: &Rect, config: &WorldConfig) -> Result<Rect, WorldError> {
    let (width, height) = config.footprint_size(sprite.width(), sprite.height());
    Rect::new(
        sprite.center().x - width / 2,
        sprite.bottom() - height,
        width,
        height,
    )
}

/// Builds a fresh room for `coord`.
///
/// Every placement loop is bounded by `config.placement_attempts` per item;
/// running out of attempts places fewer items and is recorded in the room's
/// [`PlacementReport`] rather than treated as an error.
pub fn generate_room<R: Rng + ?Sized>(
    coord: RoomCoord,
    config: &WorldConfig,
    rng: &mut R,
) -> Result<Room, WorldError> {
    config.validate()?;
    let interior = config.interior()?;
    let safe_zone = config.safe_zone()?;
    let portals = portals(config)?;
    let attempts = config.placement_attempts;
    let mut report = PlacementReport::default();

    let theme = *Theme::ALL.choose(rng).unwrap_or(&Theme::Blocks);
    let color = *PALETTE.choose(rng).unwrap_or(&Rgb(34, 139, 34));

    let mut obstacles: Vec<Rect> = Vec::new();
    let mut obstacle_kinds: Vec<ObstacleKind> = Vec::new();
    for wall in boundary_walls(config)? {
        obstacles.push(wall);
        obstacle_kinds.push(ObstacleKind::Wall);
    }

    // Blocks snap to a lattice, keeping two lattice steps clear of every edge.
    let block = config.block_size;
    let max_col = config.room_width / block - 3;
    let max_row = config.room_height / block - 3;
    report.blocks.requested = rng.random_range(config.block_count.as_range());
    let mut blocks: Vec<Rect> = Vec::new();
    for _ in 0..report.blocks.requested {
        let mut placed = None;
        for _ in 0..attempts {
            let bx = rng.random_range(2..=max_col) * block;
            let by = rng.random_range(2..=max_row) * block;
            let candidate = Rect::new(bx, by, block, block)?;
            if candidate.collides(&safe_zone)
                || candidate.collides_any(portals.values())
                || candidate.collides_any(&blocks)
            {
                continue;
            }
            placed = Some(candidate);
            break;
        }
        if let Some(candidate) = placed {
            blocks.push(candidate);
        }
    }
    report.blocks.placed = blocks.len();
    obstacle_kinds.extend(std::iter::repeat_n(ObstacleKind::Block, blocks.len()));
    obstacles.extend(&blocks);

    report.decorations.requested = rng.random_range(config.decoration_count.as_range());
    let mut decorations: Vec<Decoration> = Vec::new();
    for _ in 0..report.decorations.requested {
        let mut placed = None;
        for _ in 0..attempts {
            let Some(sprite) = sample_rect(
                rng,
                &interior,
                config.decoration_width,
                config.decoration_height,
                1,
                |_| false,
            ) else {
                break;
            };
            let foot = footprint(&sprite, config)?;
            if foot.collides(&safe_zone)
                || foot.collides_any(portals.values())
                || foot.collides_any(&blocks)
                || decorations.iter().any(|d| foot.collides(&d.footprint))
            {
                continue;
            }
            placed = Some(Decoration {
                sprite,
                footprint: foot,
            });
            break;
        }
        if let Some(decoration) = placed {
            decorations.push(decoration);
        }
    }
    report.decorations.placed = decorations.len();
    for decoration in &decorations {
        obstacles.push(decoration.footprint);
        obstacle_kinds.push(ObstacleKind::Footprint);
    }

    report.enemies.requested = rng.random_range(config.enemy_count.as_range());
    let mut enemies: Vec<Enemy> = Vec::new();
    for id in 0..report.enemies.requested {
        let spot = sample_rect(
            rng,
            &interior,
            config.enemy_width,
            config.enemy_height,
            attempts,
            |r| r.collides(&safe_zone) || r.collides_any(&obstacles) || r.collides_any(portals.values()),
        );
        if let Some(rect) = spot {
            enemies.push(Enemy::new(id, rect));
        }
    }
    report.enemies.placed = enemies.len();

    report.carrots.requested = rng.random_range(config.carrot_count.as_range());
    let mut carrots: Vec<Rect> = Vec::new();
    for _ in 0..report.carrots.requested {
        let spot = sample_rect(
            rng,
            &interior,
            config.carrot_size,
            config.carrot_size,
            attempts,
            |r| {
                r.collides(&safe_zone)
                    || r.collides_any(&obstacles)
                    || r.collides_any(portals.values())
                    || r.collides_any(&carrots)
            },
        );
        carrots.extend(spot);
    }
    report.carrots.placed = carrots.len();

    report.traps.requested = rng.random_range(config.trap_count.as_range());
    let mut traps: Vec<Rect> = Vec::new();
    for _ in 0..report.traps.requested {
        let spot = sample_rect(
            rng,
            &interior,
            config.trap_size,
            config.trap_size,
            attempts,
            |r| {
                r.collides(&safe_zone)
                    || r.collides_any(&obstacles)
                    || r.collides_any(portals.values())
                    || r.collides_any(&carrots)
                    || r.collides_any(&traps)
            },
        );
        traps.extend(spot);
    }
    report.traps.placed = traps.len();

    let nav = PathGrid::new(
        config.room_width,
        config.room_height,
        config.path_cell_size,
        &obstacles,
    )?;
    let layout = RoomLayout {
        name: funny_name(rng),
        theme,
        color,
        safe_zone,
        obstacles,
        obstacle_kinds,
        decorations,
        portals,
        traps,
    };

    log::debug!(
        "Generated room ({}, {}) \"{}\": {} obstacles, {} carrots, {} traps, {} foxes",
        coord.x,
        coord.y,
        layout.name,
        layout.obstacles.len(),
        carrots.len(),
        layout.traps.len(),
        enemies.len()
    );
    if report.has_shortfall() {
        log::warn!(
            "Room ({}, {}) placed fewer items than requested: {:?}",
            coord.x,
            coord.y,
            report
        );
    }

    Ok(Room::new(coord, layout, nav, report, carrots, enemies))
}
