use std::{cmp::Ordering, collections::BinaryHeap};

use crate::{
    Point, Rect, WorldError,
    map::{Cell, Grid},
};

/// A coarse occupancy grid over a room, used only for chase routing.
///
/// A cell is blocked when its square overlaps any obstacle rectangle. The
/// grid is built once per room since the obstacle list never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGrid {
    cell_size: i32,
    blocked: Grid<bool>,
}

/// Result of a single A* run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Cell centers from the step after the start up to and including the goal.
    pub path: Vec<Point>,
    /// Number of cells popped and expanded.
    pub expanded: usize,
}

impl PathGrid {
    /// Quantizes a `width` x `height` area into `cell_size` squares.
    ///
    /// A trailing partial row or column still gets a cell.
    pub fn new(
        width: i32,
        height: i32,
        cell_size: i32,
        obstacles: &[Rect],
    ) -> Result<Self, WorldError> {
        if cell_size <= 0 {
            return Err(WorldError::InvalidCellSize(cell_size));
        }
        if width <= 0 || height <= 0 {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        let cols = ((width + cell_size - 1) / cell_size) as usize;
        let rows = ((height + cell_size - 1) / cell_size) as usize;
        let mut blocked = Grid::new(cols, rows);
        // Mark every cell whose square overlaps an obstacle.
        let span = |lo: i32, hi: i32, count: usize| {
            let first = (lo.max(0) / cell_size) as usize;
            let last = (((hi - 1) / cell_size) as usize).min(count.saturating_sub(1));
            first..=last
        };
        for obstacle in obstacles {
            if obstacle.right() <= 0 || obstacle.bottom() <= 0 {
                continue;
            }
            for y in span(obstacle.top(), obstacle.bottom(), rows) {
                for x in span(obstacle.left(), obstacle.right(), cols) {
                    blocked.set(x, y, true)?;
                }
            }
        }
        Ok(PathGrid { cell_size, blocked })
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn columns(&self) -> usize {
        self.blocked.width()
    }

    pub fn rows(&self) -> usize {
        self.blocked.height()
    }

    /// The cell containing `point`, or `None` outside the grid.
    pub fn cell_of(&self, point: Point) -> Option<Cell> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let cell = Cell::new(
            (point.x / self.cell_size) as usize,
            (point.y / self.cell_size) as usize,
        );
        self.blocked.is_valid(cell.x, cell.y).then_some(cell)
    }

    pub fn center_of(&self, cell: Cell) -> Point {
        let half = self.cell_size / 2;
        Point::new(
            cell.x as i32 * self.cell_size + half,
            cell.y as i32 * self.cell_size + half,
        )
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.blocked.get(cell.x, cell.y).copied().unwrap_or(true)
    }

    /// In-bounds, unblocked 4-neighbours of `cell`.
    fn open_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.blocked
            .neighbors(cell)
            .filter(move |n| !self.blocked[*n])
    }

    /// Shortest 4-directional route from the cell of `start` to the cell of `goal`.
    ///
    /// Empty when start and goal share a cell, when either lies outside the
    /// grid, or when the goal cannot be reached.
    pub fn find_path(&self, start: Point, goal: Point) -> Vec<Point> {
        self.search(start, goal).path
    }

    /// Like [`PathGrid::find_path`], also reporting how much work was done.
    pub fn search(&self, start: Point, goal: Point) -> Search {
        let empty = Search {
            path: Vec::new(),
            expanded: 0,
        };
        let (Some(start), Some(goal)) = (self.cell_of(start), self.cell_of(goal)) else {
            return empty;
        };
        if start == goal {
            return empty;
        }

        // Min-heap on priority; among equal priorities the earlier push wins.
        #[derive(Clone, Eq, PartialEq)]
        struct Frontier {
            priority: usize,
            order: usize,
            cell: Cell,
        }

        impl Ord for Frontier {
            fn cmp(&self, other: &Self) -> Ordering {
                other
                    .priority
                    .cmp(&self.priority)
                    .then_with(|| other.order.cmp(&self.order))
            }
        }

        impl PartialOrd for Frontier {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let (cols, rows) = (self.columns(), self.rows());
        let mut cost: Grid<Option<usize>> = Grid::new(cols, rows);
        let mut came_from: Grid<Option<Cell>> = Grid::new(cols, rows);
        let mut closed: Grid<bool> = Grid::new(cols, rows);
        let mut frontier = BinaryHeap::new();
        let mut pushes = 0;
        let mut expanded = 0;

        cost[start] = Some(0);
        frontier.push(Frontier {
            priority: start.manhattan(&goal),
            order: pushes,
            cell: start,
        });

        let mut reached = false;
        while let Some(Frontier { cell: current, .. }) = frontier.pop() {
            if current == goal {
                reached = true;
                break;
            }
            if closed[current] {
                continue;
            }
            closed[current] = true;
            expanded += 1;

            let step_cost = cost[current].unwrap_or(usize::MAX - 1) + 1;
            for neighbor in self.open_neighbors(current) {
                if cost[neighbor].is_none_or(|known| step_cost < known) {
                    cost[neighbor] = Some(step_cost);
                    came_from[neighbor] = Some(current);
                    pushes += 1;
                    frontier.push(Frontier {
                        priority: step_cost + neighbor.manhattan(&goal),
                        order: pushes,
                        cell: neighbor,
                    });
                }
            }
        }

        if !reached {
            return Search {
                path: Vec::new(),
                expanded,
            };
        }

        let mut cells = Vec::new();
        let mut current = goal;
        while current != start {
            cells.push(current);
            match came_from[current] {
                Some(previous) => current = previous,
                None => break,
            }
        }
        cells.reverse();
        Search {
            path: cells.into_iter().map(|c| self.center_of(c)).collect(),
            expanded,
        }
    }
}

/// One-shot search over a `width` x `height` room without keeping the grid.
pub fn find_path(
    start: Point,
    goal: Point,
    obstacles: &[Rect],
    cell_size: i32,
    width: i32,
    height: i32,
) -> Result<Vec<Point>, WorldError> {
    Ok(PathGrid::new(width, height, cell_size, obstacles)?.find_path(start, goal))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h).unwrap()
    }

    #[test]
    fn same_cell_is_empty_path() {
        let grid = PathGrid::new(500, 500, 50, &[]).unwrap();
        assert!(grid.find_path(Point::new(10, 10), Point::new(40, 45)).is_empty());
    }

    #[test]
    fn corridor_yields_intermediate_centers() {
        // Row 0 is the only open row between x=0 and x=250.
        let walls = [rect(0, 50, 250, 50)];
        let path = find_path(Point::new(0, 0), Point::new(200, 0), &walls, 50, 250, 100).unwrap();
        assert_eq!(
            path,
            vec![
                Point::new(75, 25),
                Point::new(125, 25),
                Point::new(175, 25),
                Point::new(225, 25),
            ]
        );
    }

    #[test]
    fn walled_off_goal_returns_empty() {
        // Goal cell (6, 5) boxed in on all four sides.
        let walls = [
            rect(250, 200, 150, 50),
            rect(250, 300, 150, 50),
            rect(250, 250, 50, 50),
            rect(350, 250, 50, 50),
        ];
        let grid = PathGrid::new(500, 500, 50, &walls).unwrap();
        let search = grid.search(Point::new(25, 25), Point::new(325, 275));
        assert!(search.path.is_empty());
        assert!(search.expanded <= grid.columns() * grid.rows());
    }

    #[test]
    fn blocked_goal_cell_is_unreachable() {
        let grid = PathGrid::new(500, 500, 50, &[rect(400, 400, 50, 50)]).unwrap();
        assert!(grid.find_path(Point::new(25, 25), Point::new(410, 410)).is_empty());
    }

    #[test]
    fn detours_around_a_wall() {
        // Vertical wall at column 2 with a gap at row 4.
        let walls = [rect(100, 0, 50, 200)];
        let grid = PathGrid::new(250, 250, 50, &walls).unwrap();
        let path = grid.find_path(Point::new(25, 25), Point::new(225, 25));
        // 4 steps down, 4 across, 4 back up.
        assert_eq!(path.len(), 12);
        assert_eq!(path.last(), Some(&Point::new(225, 25)));
        for window in path.windows(2) {
            let (a, b) = (window[0], window[1]);
            assert_eq!((a.x - b.x).abs() + (a.y - b.y).abs(), 50);
        }
    }

    #[test]
    fn out_of_bounds_points_have_no_path() {
        let grid = PathGrid::new(200, 200, 50, &[]).unwrap();
        assert!(grid.find_path(Point::new(-1, 10), Point::new(100, 100)).is_empty());
        assert!(grid.find_path(Point::new(10, 10), Point::new(900, 100)).is_empty());
    }

    #[test]
    fn partial_cells_are_covered() {
        let grid = PathGrid::new(1280, 720, 50, &[]).unwrap();
        assert_eq!((grid.columns(), grid.rows()), (26, 15));
        assert!(grid.cell_of(Point::new(1279, 719)).is_some());
    }

    #[test]
    fn rejects_bad_cell_size() {
        assert_eq!(
            PathGrid::new(100, 100, 0, &[]),
            Err(WorldError::InvalidCellSize(0))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn paths_are_shortest_and_avoid_blocked_cells(
            blocks in proptest::collection::vec((0..10i32, 0..10i32), 0..30),
            start in (0..10i32, 0..10i32),
            goal in (0..10i32, 0..10i32),
        ) {
            let obstacles: Vec<Rect> = blocks
                .iter()
                .filter(|&&b| b != start && b != goal)
                .map(|&(x, y)| rect(x * 20, y * 20, 20, 20))
                .collect();
            let grid = PathGrid::new(200, 200, 20, &obstacles).unwrap();
            let start_point = Point::new(start.0 * 20 + 5, start.1 * 20 + 5);
            let goal_point = Point::new(goal.0 * 20 + 5, goal.1 * 20 + 5);
            let search = grid.search(start_point, goal_point);

            prop_assert!(search.expanded <= 100);
            if let Some(last) = search.path.last() {
                prop_assert_eq!(grid.cell_of(*last), grid.cell_of(goal_point));
                let manhattan = ((start.0 - goal.0).abs() + (start.1 - goal.1).abs()) as usize;
                prop_assert!(search.path.len() >= manhattan);
                if obstacles.is_empty() {
                    prop_assert_eq!(search.path.len(), manhattan);
                }
                for point in &search.path {
                    let cell = grid.cell_of(*point).unwrap();
                    prop_assert!(!grid.is_blocked(cell));
                }
            }
        }
    }
}
