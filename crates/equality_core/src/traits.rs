use crate::grid::Location;
use crate::term::TermId;

/// Owns the positions of terms.
///
/// Grids and plates only hold term ids. Whenever they place or shift a term
/// they tell the owner of the term where it now lives, so positions stay in
/// step with cell geometry without the grid owning any term data.
pub trait Movable {
    /// Moves a term to `location`. Unknown ids are ignored.
    fn move_to(&mut self, term: TermId, location: Location);
}
