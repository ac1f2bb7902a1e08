//! One side of the balance scale.

use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::grid::{Grid, GridSettings, Location};
use crate::term::{TermId, TermMap, Variable};
use crate::traits::Movable;
use num_traits::Zero;

/// A plate holds terms in a grid and knows their total weight.
///
/// The weight is a cached sum that the owner refreshes with `update_weight`
/// after every mutation. It is always recomputed from scratch.
#[derive(Debug, Clone)]
pub struct Plate {
    grid: Grid,
    location: Location,
    weight: ReducedFraction,
    support_height: f64,
    diameter: f64,
}

impl Plate {
    pub fn new(location: Location, support_height: f64, diameter: f64, grid: GridSettings) -> Self {
        Self {
            grid: Grid::new(location, grid),
            location,
            weight: ReducedFraction::zero(),
            support_height,
            diameter,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Bottom-center of the grid, where the plate's support meets it.
    pub fn location(&self) -> Location {
        self.location
    }

    pub fn support_height(&self) -> f64 {
        self.support_height
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn weight(&self) -> ReducedFraction {
        self.weight
    }

    /// Moves the plate and every term on it in one step.
    pub fn set_location(&mut self, location: Location, movable: &mut impl Movable) {
        self.location = location;
        self.grid.set_location(location, movable);
    }

    pub fn add_term(&mut self, term: TermId, cell: usize, movable: &mut impl Movable) -> Result<()> {
        if self.grid.cell_for_term(term).is_some() {
            return Err(EqualityError::TermAlreadyOnPlate(term));
        }
        self.grid.put_term(term, cell, movable)
    }

    /// Removes a term and returns the cell it occupied.
    pub fn remove_term(&mut self, term: TermId, movable: &mut impl Movable) -> Result<usize> {
        self.grid.remove_term(term, movable)
    }

    /// Swaps a term for another in the same cell.
    pub fn replace_term(
        &mut self,
        old: TermId,
        new: TermId,
        movable: &mut impl Movable,
    ) -> Result<usize> {
        if self.grid.cell_for_term(new).is_some() {
            return Err(EqualityError::TermAlreadyOnPlate(new));
        }
        self.grid.replace_term(old, new, movable)
    }

    /// Total weight of the terms on this plate, without caching it.
    pub fn weigh(&self, terms: &TermMap, variables: &[Variable]) -> Result<ReducedFraction> {
        self.grid
            .occupied_cells()
            .filter_map(|(_, id)| terms.get(&id))
            .try_fold(ReducedFraction::zero(), |sum, term| {
                sum.plus(term.weight(variables)?)
            })
    }

    /// Recomputes the total weight of the terms on this plate. On error the
    /// cached weight is left as it was.
    pub fn update_weight(
        &mut self,
        terms: &TermMap,
        variables: &[Variable],
    ) -> Result<ReducedFraction> {
        self.weight = self.weigh(terms, variables)?;
        Ok(self.weight)
    }

    pub(crate) fn set_weight(&mut self, weight: ReducedFraction) {
        self.weight = weight;
    }

    /// Empties every cell. The terms themselves are the owner's business.
    pub fn clear(&mut self) {
        self.grid.clear_all_cells();
        self.weight = ReducedFraction::zero();
    }

    pub fn cell_for_term(&self, term: TermId) -> Option<usize> {
        self.grid.cell_for_term(term)
    }

    pub fn term_for_cell(&self, cell: usize) -> Result<Option<TermId>> {
        self.grid.term_for_cell(cell)
    }

    pub fn term_at_location(&self, location: &Location) -> Option<TermId> {
        self.grid.term_at_location(location)
    }

    pub fn is_empty_cell(&self, cell: usize) -> Result<bool> {
        self.grid.is_empty_cell(cell)
    }

    pub fn first_empty_cell(&self) -> Option<usize> {
        self.grid.first_empty_cell()
    }

    pub fn closest_empty_cell(&self, location: &Location) -> Option<usize> {
        self.grid.closest_empty_cell(location)
    }

    pub fn location_for_cell(&self, cell: usize) -> Result<Location> {
        self.grid.location_for_cell(cell)
    }

    pub fn number_of_terms(&self) -> usize {
        self.grid.number_of_terms()
    }

    pub fn is_full(&self) -> bool {
        self.grid.is_full()
    }

    pub fn terms(&self) -> impl Iterator<Item = (usize, TermId)> + '_ {
        self.grid.occupied_cells()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Term, TermValue};
    use crate::term_creator::CreatorId;

    fn constant_term(id: u64, value: i64) -> Term {
        Term {
            id: TermId(id),
            creator: CreatorId(0),
            value: TermValue::Constant {
                constant_value: ReducedFraction::with_integer(value),
            },
            location: Location::zeros(),
            diameter: 10.0,
            locked_partner: None,
        }
    }

    fn plate() -> Plate {
        Plate::new(
            Location::new(0.0, 0.0),
            10.0,
            100.0,
            GridSettings {
                rows: 3,
                columns: 3,
                cell_width: 10.0,
                cell_height: 10.0,
            },
        )
    }

    #[test]
    fn weight_is_recomputed_from_occupied_cells() {
        let mut terms = TermMap::new();
        terms.insert(TermId(1), constant_term(1, 3));
        terms.insert(TermId(2), constant_term(2, -1));
        terms.insert(TermId(3), constant_term(3, 100)); // not on the plate

        let mut plate = plate();
        plate.add_term(TermId(1), 8, &mut terms).unwrap();
        plate.add_term(TermId(2), 7, &mut terms).unwrap();
        assert_eq!(plate.update_weight(&terms, &[]), Ok(ReducedFraction::with_integer(2)));

        plate.remove_term(TermId(1), &mut terms).unwrap();
        assert_eq!(plate.update_weight(&terms, &[]), Ok(ReducedFraction::with_integer(-1)));
    }

    #[test]
    fn weight_overflow_keeps_the_cached_weight() {
        let mut terms = TermMap::new();
        terms.insert(TermId(1), constant_term(1, i64::MAX));
        terms.insert(TermId(2), constant_term(2, 1));
        let mut plate = plate();
        plate.add_term(TermId(1), 8, &mut terms).unwrap();
        plate.update_weight(&terms, &[]).unwrap();

        plate.add_term(TermId(2), 7, &mut terms).unwrap();
        assert_eq!(plate.update_weight(&terms, &[]), Err(EqualityError::Overflow));
        assert_eq!(plate.weight(), ReducedFraction::with_integer(i64::MAX));
    }

    #[test]
    fn add_term_rejects_a_term_already_on_the_plate() {
        let mut terms = TermMap::new();
        terms.insert(TermId(1), constant_term(1, 1));
        let mut plate = plate();
        plate.add_term(TermId(1), 8, &mut terms).unwrap();
        assert_eq!(
            plate.add_term(TermId(1), 7, &mut terms),
            Err(EqualityError::TermAlreadyOnPlate(TermId(1)))
        );
    }

    #[test]
    fn moving_the_plate_moves_its_terms() {
        let mut terms = TermMap::new();
        terms.insert(TermId(1), constant_term(1, 1));
        let mut plate = plate();
        plate.add_term(TermId(1), 8, &mut terms).unwrap();
        plate.set_location(Location::new(20.0, 40.0), &mut terms);
        assert_eq!(plate.location(), Location::new(20.0, 40.0));
        assert_eq!(terms[&TermId(1)].location, plate.location_for_cell(8).unwrap());
        assert_eq!(terms[&TermId(1)].location, Location::new(30.0, 35.0));
    }
}
