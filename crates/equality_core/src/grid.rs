//! A fixed 2D grid of cells that holds the terms sitting on a plate.
//!
//! The grid is filled from the bottom up, so there is never an empty cell
//! below an occupied cell in the same column. Cells are identified by a
//! row-major index; row 0 is the top row. The grid's location is the
//! bottom-center of its bounds, in the same y-down coordinates the view uses.

use crate::error::{EqualityError, Result};
use crate::term::TermId;
use crate::traits::Movable;
use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub type Location = Vector2<f64>;

/// Dimensions of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub rows: usize,
    pub columns: usize,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            rows: 6,
            columns: 6,
            cell_width: 49.0,
            cell_height: 45.0,
        }
    }
}

/// Axis-aligned bounds, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn contains(&self, location: &Location) -> bool {
        location.x >= self.min_x
            && location.x <= self.max_x
            && location.y >= self.min_y
            && location.y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cell_width: f64,
    cell_height: f64,
    /// Row-major, left-to-right then top-to-bottom. `None` is an empty cell.
    cells: Vec<Option<TermId>>,
    bounds: Bounds,
}

impl Grid {
    pub fn new(location: Location, settings: GridSettings) -> Self {
        let mut grid = Self {
            rows: settings.rows,
            columns: settings.columns,
            cell_width: settings.cell_width,
            cell_height: settings.cell_height,
            cells: vec![None; settings.rows * settings.columns],
            bounds: Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            },
        };
        grid.bounds = grid.bounds_at(location);
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn bounds_at(&self, location: Location) -> Bounds {
        let half_width = self.columns as f64 * self.cell_width / 2.0;
        Bounds {
            min_x: location.x - half_width,
            min_y: location.y - self.rows as f64 * self.cell_height,
            max_x: location.x + half_width,
            max_y: location.y,
        }
    }

    /// Moves the grid, and every term in it, so that its bottom-center is at `location`.
    pub fn set_location(&mut self, location: Location, movable: &mut impl Movable) {
        self.bounds = self.bounds_at(location);
        for index in 0..self.cells.len() {
            if let Some(term) = self.cells[index] {
                movable.move_to(term, self.cell_center(index));
            }
        }
    }

    pub fn is_valid_cell(&self, index: usize) -> bool {
        index < self.cells.len()
    }

    fn check_cell(&self, index: usize) -> Result<()> {
        if self.is_valid_cell(index) {
            Ok(())
        } else {
            Err(EqualityError::InvalidCell(index))
        }
    }

    pub fn is_empty_cell(&self, index: usize) -> Result<bool> {
        self.check_cell(index)?;
        Ok(self.cells[index].is_none())
    }

    pub fn clear_cell(&mut self, index: usize) -> Result<()> {
        self.check_cell(index)?;
        self.cells[index] = None;
        Ok(())
    }

    pub fn clear_all_cells(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    pub fn contains_location(&self, location: &Location) -> bool {
        self.bounds.contains(location)
    }

    /// Index of the cell that contains `location`, `None` if outside the grid.
    pub fn cell_at_location(&self, location: &Location) -> Option<usize> {
        if !self.contains_location(location) {
            return None;
        }
        let row = ((location.y - self.bounds.min_y) / self.cell_height).floor() as usize;
        let column = ((location.x - self.bounds.min_x) / self.cell_width).floor() as usize;

        // the max edges are inside the bounds but one past the last cell
        let row = row.min(self.rows - 1);
        let column = column.min(self.columns - 1);
        Some(row * self.columns + column)
    }

    pub fn cell_for_term(&self, term: TermId) -> Option<usize> {
        self.cells.iter().position(|cell| *cell == Some(term))
    }

    pub fn term_for_cell(&self, index: usize) -> Result<Option<TermId>> {
        self.check_cell(index)?;
        Ok(self.cells[index])
    }

    pub fn term_at_location(&self, location: &Location) -> Option<TermId> {
        self.cell_at_location(location)
            .and_then(|index| self.cells[index])
    }

    /// Puts a term in an empty cell and moves it to the cell's center.
    pub fn put_term(&mut self, term: TermId, index: usize, movable: &mut impl Movable) -> Result<()> {
        self.check_cell(index)?;
        if self.cells[index].is_some() {
            return Err(EqualityError::CellOccupied(index));
        }
        self.cells[index] = Some(term);
        movable.move_to(term, self.cell_center(index));
        Ok(())
    }

    /// Removes a term. Terms above it in the same column move down one row.
    /// Returns the cell the term occupied.
    pub fn remove_term(&mut self, term: TermId, movable: &mut impl Movable) -> Result<usize> {
        let index = self
            .cell_for_term(term)
            .ok_or(EqualityError::TermNotFound(term))?;
        self.cells[index] = None;
        self.shift_down(index, movable)?;
        Ok(index)
    }

    /// Puts `new` in the cell occupied by `old`, without shifting anything.
    /// Returns the cell.
    pub fn replace_term(
        &mut self,
        old: TermId,
        new: TermId,
        movable: &mut impl Movable,
    ) -> Result<usize> {
        let index = self
            .cell_for_term(old)
            .ok_or(EqualityError::TermNotFound(old))?;
        self.cells[index] = None;
        self.put_term(new, index, movable)?;
        Ok(index)
    }

    fn shift_down(&mut self, index: usize, movable: &mut impl Movable) -> Result<()> {
        debug_assert!(self.cells[index].is_none(), "cell is not empty: {index}");

        let removed_row = self.index_to_row(index)?;
        let column = self.index_to_column(index)?;

        // start with the row above the removed term, and work up
        for row in (0..removed_row).rev() {
            let current = self.row_column_to_index(row, column)?;
            if let Some(term) = self.cells[current].take() {
                let below = self.row_column_to_index(row + 1, column)?;
                trace!("shift {term} from cell {current} to {below}");
                self.put_term(term, below, movable)?;
            }
        }
        Ok(())
    }

    /// Center of a cell.
    pub fn location_for_cell(&self, index: usize) -> Result<Location> {
        self.check_cell(index)?;
        Ok(self.cell_center(index))
    }

    fn cell_center(&self, index: usize) -> Location {
        let row = index / self.columns;
        let column = index % self.columns;
        Location::new(
            self.bounds.min_x + column as f64 * self.cell_width + 0.5 * self.cell_width,
            self.bounds.min_y + row as f64 * self.cell_height + 0.5 * self.cell_height,
        )
    }

    /// First empty cell, scanning the bottom row first, right to left.
    pub fn first_empty_cell(&self) -> Option<usize> {
        self.cells.iter().rposition(Option::is_none)
    }

    /// Empty cell closest to `location`. After the nearest cell is found, the
    /// term falls to the lowest empty cell in that column.
    pub fn closest_empty_cell(&self, location: &Location) -> Option<usize> {
        let mut closest = self.first_empty_cell()?;
        let mut closest_distance = (self.cell_center(closest) - location).norm();

        for (index, cell) in self.cells.iter().enumerate() {
            if cell.is_none() {
                let distance = (self.cell_center(index) - location).norm();
                if distance < closest_distance {
                    closest_distance = distance;
                    closest = index;
                }
            }
        }

        let closest_row = closest / self.columns;
        let column = closest % self.columns;
        for row in ((closest_row + 1)..self.rows).rev() {
            let below = row * self.columns + column;
            if self.cells[below].is_none() {
                return Some(below);
            }
        }
        Some(closest)
    }

    pub fn index_to_row(&self, index: usize) -> Result<usize> {
        self.check_cell(index)?;
        Ok(index / self.columns)
    }

    pub fn index_to_column(&self, index: usize) -> Result<usize> {
        self.check_cell(index)?;
        Ok(index % self.columns)
    }

    pub fn row_column_to_index(&self, row: usize, column: usize) -> Result<usize> {
        if row >= self.rows || column >= self.columns {
            return Err(EqualityError::InvalidRowColumn { row, column });
        }
        Ok(row * self.columns + column)
    }

    /// Occupied cells and their terms, in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, TermId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.map(|term| (index, term)))
    }

    pub fn number_of_terms(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    impl Movable for HashMap<TermId, Location> {
        fn move_to(&mut self, term: TermId, location: Location) {
            self.insert(term, location);
        }
    }

    fn grid(rows: usize, columns: usize) -> Grid {
        Grid::new(
            Location::new(0.0, 0.0),
            GridSettings {
                rows,
                columns,
                cell_width: 10.0,
                cell_height: 10.0,
            },
        )
    }

    /// No empty cell may sit below an occupied cell in the same column.
    fn assert_compacted(grid: &Grid) {
        for column in 0..grid.columns() {
            let mut seen_occupied = false;
            for row in 0..grid.rows() {
                let index = grid.row_column_to_index(row, column).unwrap();
                let empty = grid.is_empty_cell(index).unwrap();
                if seen_occupied {
                    assert!(!empty, "gap below occupied cell in column {column}, row {row}");
                }
                seen_occupied |= !empty;
            }
        }
    }

    #[test]
    fn fills_all_cells_then_reports_full() {
        let mut grid = grid(6, 6);
        let mut positions = HashMap::new();
        for id in 0..36 {
            let index = grid.first_empty_cell().expect("grid has room");
            grid.put_term(TermId(id), index, &mut positions).unwrap();
        }
        assert!(grid.is_full());
        assert_eq!(grid.number_of_terms(), 36);
        assert_eq!(grid.first_empty_cell(), None);
        assert_eq!(grid.closest_empty_cell(&Location::new(0.0, -30.0)), None);
    }

    #[test]
    fn first_empty_cell_scans_bottom_row_right_to_left() {
        let mut grid = grid(2, 3);
        let mut positions = HashMap::new();
        assert_eq!(grid.first_empty_cell(), Some(5));
        grid.put_term(TermId(1), 5, &mut positions).unwrap();
        assert_eq!(grid.first_empty_cell(), Some(4));
    }

    #[test]
    fn put_term_rejects_occupied_and_invalid_cells() {
        let mut grid = grid(2, 2);
        let mut positions = HashMap::new();
        grid.put_term(TermId(1), 3, &mut positions).unwrap();
        assert_eq!(
            grid.put_term(TermId(2), 3, &mut positions),
            Err(EqualityError::CellOccupied(3))
        );
        assert_eq!(
            grid.put_term(TermId(2), 4, &mut positions),
            Err(EqualityError::InvalidCell(4))
        );
        assert_eq!(grid.is_empty_cell(9), Err(EqualityError::InvalidCell(9)));
        assert_eq!(
            grid.remove_term(TermId(7), &mut positions),
            Err(EqualityError::TermNotFound(TermId(7)))
        );
    }

    #[test]
    fn put_term_moves_term_to_cell_center() {
        let mut grid = grid(2, 2);
        let mut positions = HashMap::new();
        // bounds are x in [-10, 10], y in [-20, 0]
        grid.put_term(TermId(1), 0, &mut positions).unwrap();
        assert_eq!(positions[&TermId(1)], Location::new(-5.0, -15.0));
        grid.put_term(TermId(2), 3, &mut positions).unwrap();
        assert_eq!(positions[&TermId(2)], Location::new(5.0, -5.0));
    }

    #[test]
    fn remove_term_shifts_column_down() {
        let mut grid = grid(3, 2);
        let mut positions = HashMap::new();
        // column 0, bottom to top: cells 4, 2, 0
        grid.put_term(TermId(1), 4, &mut positions).unwrap();
        grid.put_term(TermId(2), 2, &mut positions).unwrap();
        grid.put_term(TermId(3), 0, &mut positions).unwrap();

        assert_eq!(grid.remove_term(TermId(1), &mut positions), Ok(4));
        assert_eq!(grid.cell_for_term(TermId(2)), Some(4));
        assert_eq!(grid.cell_for_term(TermId(3)), Some(2));
        assert!(grid.is_empty_cell(0).unwrap());
        assert_eq!(positions[&TermId(3)], grid.location_for_cell(2).unwrap());
        assert_compacted(&grid);
    }

    #[test]
    fn replace_term_keeps_the_column_in_place() {
        let mut grid = grid(3, 2);
        let mut positions = HashMap::new();
        grid.put_term(TermId(1), 4, &mut positions).unwrap();
        grid.put_term(TermId(2), 2, &mut positions).unwrap();

        assert_eq!(grid.replace_term(TermId(1), TermId(9), &mut positions), Ok(4));
        assert_eq!(grid.cell_for_term(TermId(9)), Some(4));
        assert_eq!(grid.cell_for_term(TermId(2)), Some(2));
        assert_eq!(grid.cell_for_term(TermId(1)), None);
        assert_eq!(positions[&TermId(9)], grid.location_for_cell(4).unwrap());
    }

    #[test]
    fn closest_empty_cell_falls_to_bottom_of_column() {
        let mut grid = grid(3, 3);
        let mut positions = HashMap::new();
        grid.put_term(TermId(1), 6, &mut positions).unwrap();

        // top-left cell center is nearest, but the term falls to row 1
        let top_left = grid.location_for_cell(0).unwrap();
        assert_eq!(grid.closest_empty_cell(&top_left), Some(3));

        // top-right column is empty all the way down
        let top_right = grid.location_for_cell(2).unwrap();
        assert_eq!(grid.closest_empty_cell(&top_right), Some(8));
    }

    #[test]
    fn cell_at_location_maps_points_to_cells() {
        let grid = grid(2, 2);
        assert_eq!(grid.cell_at_location(&Location::new(-9.0, -19.0)), Some(0));
        assert_eq!(grid.cell_at_location(&Location::new(10.0, 0.0)), Some(3));
        assert_eq!(grid.cell_at_location(&Location::new(11.0, 0.0)), None);
        assert_eq!(grid.term_at_location(&Location::new(1.0, -1.0)), None);
    }

    #[test]
    fn set_location_moves_terms_with_the_grid() {
        let mut grid = grid(2, 2);
        let mut positions = HashMap::new();
        grid.put_term(TermId(1), 2, &mut positions).unwrap();
        grid.set_location(Location::new(100.0, 50.0), &mut positions);
        assert_eq!(positions[&TermId(1)], Location::new(95.0, 45.0));
        assert_eq!(grid.bounds().min_y, 30.0);
    }

    #[test]
    fn index_conversions_are_inverse() {
        let grid = grid(4, 7);
        for row in 0..4 {
            for column in 0..7 {
                let index = grid.row_column_to_index(row, column).unwrap();
                assert_eq!(grid.index_to_row(index), Ok(row));
                assert_eq!(grid.index_to_column(index), Ok(column));
            }
        }
        assert!(grid.row_column_to_index(4, 0).is_err());
    }

    proptest! {
        #[test]
        fn removal_keeps_columns_compacted(
            drops in proptest::collection::vec((0.0f64..1.0, 0.0f64..1.0), 1..30),
            removals in proptest::collection::vec(0usize..30, 0..30),
        ) {
            let mut grid = grid(5, 4);
            let mut positions = HashMap::new();
            let mut placed = Vec::new();
            let bounds = grid.bounds();
            for (id, (fx, fy)) in drops.into_iter().enumerate() {
                let target = Location::new(
                    bounds.min_x + fx * bounds.width(),
                    bounds.min_y + fy * bounds.height(),
                );
                if let Some(index) = grid.closest_empty_cell(&target) {
                    grid.put_term(TermId(id as u64), index, &mut positions).unwrap();
                    placed.push(TermId(id as u64));
                }
            }
            assert_compacted(&grid);

            for pick in removals {
                if placed.is_empty() {
                    break;
                }
                let term = placed.remove(pick % placed.len());
                grid.remove_term(term, &mut positions).unwrap();
                assert_compacted(&grid);
                for &(index, remaining) in &grid.occupied_cells().collect::<Vec<_>>() {
                    prop_assert_eq!(positions[&remaining], grid.location_for_cell(index).unwrap());
                }
            }
        }
    }
}
