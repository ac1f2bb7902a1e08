//! The `equality_core` crate is the model behind Equality Explorer: a two-pan
//! balance scale that users load with terms to explore equations.
//!
//! Key components:
//! - **Fraction**: `ReducedFraction`, exact rational values for term weights and coefficients.
//! - **Grid / Plate / BalanceScale**: gravity-filled cell grids on two plates, and the beam
//!   angle derived from their weights.
//! - **Term / TermCreator**: constant, variable and mystery terms, and the creators that build,
//!   combine and transform them.
//! - **Scene**: the arena that owns creators and terms, applies universal operations, locks
//!   the two sides together and saves snapshots.
//! - **Scenes**: the built-in scene catalogue.
pub mod balance_scale;
pub mod error;
pub mod fraction;
pub mod grid;
pub mod operation;
pub mod plate;
pub mod scene;
pub mod scenes;
pub mod snapshot;
pub mod term;
pub mod term_creator;
pub mod traits;

pub use error::{EqualityError, Result};
