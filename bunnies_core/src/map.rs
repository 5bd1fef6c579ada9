use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::WorldError;

/// Address of a square in a [`Grid`], in column/row units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(&self, other: &Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A dense 2D grid stored row-major in a flat vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        if self.is_valid(x, y) {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.cells.get(self.coords_to_index(x, y)?)
    }

    /// Sets the value at `(x, y)`.
    ///
    /// Returns `Err(WorldError::GridOutOfBounds)` if the coordinates are invalid.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<(), WorldError> {
        let index = self
            .coords_to_index(x, y)
            .ok_or(WorldError::GridOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// The in-bounds 4-neighbours of `cell` (down, up, right, left).
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
        DIRECTIONS.iter().filter_map(move |&(dx, dy)| {
            let x = cell.x.checked_add_signed(dx)?;
            let y = cell.y.checked_add_signed(dy)?;
            self.is_valid(x, y).then_some(Cell::new(x, y))
        })
    }
}

impl<T> Index<Cell> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: Cell) -> &Self::Output {
        match self.coords_to_index(cell.x, cell.y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Cell> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, cell: Cell) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.coords_to_index(cell.x, cell.y) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.y, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_out_of_bounds_is_an_error() {
        let mut grid: Grid<bool> = Grid::new(3, 2);
        assert!(grid.set(2, 1, true).is_ok());
        assert_eq!(
            grid.set(3, 0, true),
            Err(WorldError::GridOutOfBounds {
                x: 3,
                y: 0,
                width: 3,
                height: 2
            })
        );
        assert!(grid[Cell::new(2, 1)]);
    }

    #[test]
    fn corner_cells_have_two_neighbors() {
        let grid: Grid<u8> = Grid::new(4, 4);
        assert_eq!(grid.neighbors(Cell::new(0, 0)).count(), 2);
        assert_eq!(grid.neighbors(Cell::new(3, 3)).count(), 2);
        assert_eq!(grid.neighbors(Cell::new(1, 2)).count(), 4);
    }

    #[test]
    fn get_is_row_major_and_bounded() {
        let mut grid: Grid<usize> = Grid::new(3, 2);
        grid[Cell::new(1, 1)] = 11;
        assert_eq!(grid.get(1, 1), Some(&11));
        assert_eq!(grid.get(0, 0), Some(&0));
        assert_eq!(grid.get(0, 2), None);
    }
}
