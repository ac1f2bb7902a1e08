//! The balance scale: two plates on a beam balanced on a fulcrum.
//!
//! The beam tilts by an angle proportional to the weight difference between
//! the plates, clamped at `max_weight` where a plate bottoms out. Positive
//! angles mean the right plate is heavier (and lower, in y-down coordinates).

use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::grid::{GridSettings, Location};
use crate::plate::Plate;
use crate::term::{TermMap, Variable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Geometry and behavior of the scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleSettings {
    /// Point where the beam balances on the fulcrum.
    pub location: Location,
    pub beam_width: f64,
    /// Radians.
    pub max_angle: f64,
    /// Weight difference at which a plate bottoms out.
    pub max_weight: f64,
    /// Height of the vertical support that connects a plate to the beam.
    pub plate_support_height: f64,
    pub plate_diameter: f64,
    /// Inset of the plates from the ends of the beam.
    pub plate_x_inset: f64,
    pub grid: GridSettings,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            location: Location::new(355.0, 420.0),
            beam_width: 450.0,
            max_angle: 22.0_f64.to_radians(),
            max_weight: 30.0,
            plate_support_height: 70.0,
            plate_diameter: 300.0,
            plate_x_inset: 45.0,
            grid: GridSettings::default(),
        }
    }
}

impl ScaleSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_weight <= 0.0 {
            return Err(EqualityError::InvalidSettings(
                "max_weight must be positive".into(),
            ));
        }
        if self.beam_width - 2.0 * self.plate_x_inset <= self.plate_diameter {
            return Err(EqualityError::InvalidSettings("plates will overlap".into()));
        }
        if self.grid.rows == 0 || self.grid.columns == 0 {
            return Err(EqualityError::InvalidSettings(
                "grid must have at least one cell".into(),
            ));
        }
        if self.grid.columns as f64 * self.grid.cell_width > self.plate_diameter {
            return Err(EqualityError::InvalidSettings(
                "grid is wider than plate".into(),
            ));
        }
        Ok(())
    }
}

/// Angle of the beam for the given plate weights.
///
/// `clamp(right - left, ±max_weight) / max_weight * max_angle`. The view must
/// use exactly this formula to agree with the model about "balanced".
pub fn tilt_angle(left_weight: f64, right_weight: f64, max_weight: f64, max_angle: f64) -> f64 {
    let delta = (right_weight - left_weight).clamp(-max_weight, max_weight);
    delta / max_weight * max_angle
}

#[derive(Debug, Clone)]
pub struct BalanceScale {
    settings: ScaleSettings,
    left_plate: Plate,
    right_plate: Plate,
    angle: f64,
}

impl BalanceScale {
    pub fn new(settings: ScaleSettings) -> Result<Self> {
        settings.validate()?;
        let (left, right) = plate_locations(&settings, 0.0);
        let plate = |location| {
            Plate::new(
                location,
                settings.plate_support_height,
                settings.plate_diameter,
                settings.grid,
            )
        };
        Ok(Self {
            settings,
            left_plate: plate(left),
            right_plate: plate(right),
            angle: 0.0,
        })
    }

    pub fn settings(&self) -> &ScaleSettings {
        &self.settings
    }

    pub fn plate(&self, side: Side) -> &Plate {
        match side {
            Side::Left => &self.left_plate,
            Side::Right => &self.right_plate,
        }
    }

    pub fn plate_mut(&mut self, side: Side) -> &mut Plate {
        match side {
            Side::Left => &mut self.left_plate,
            Side::Right => &mut self.right_plate,
        }
    }

    /// Radians, zero is balanced.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Exact comparison of the plate weights.
    pub fn is_balanced(&self) -> bool {
        self.left_plate.weight() == self.right_plate.weight()
    }

    pub fn number_of_terms(&self) -> usize {
        self.left_plate.number_of_terms() + self.right_plate.number_of_terms()
    }

    /// (left, right) weights for the given terms and variable values,
    /// without changing the scale.
    pub fn weigh(
        &self,
        terms: &TermMap,
        variables: &[Variable],
    ) -> Result<(ReducedFraction, ReducedFraction)> {
        Ok((
            self.left_plate.weigh(terms, variables)?,
            self.right_plate.weigh(terms, variables)?,
        ))
    }

    /// Recomputes plate weights, then the angle, then moves both plates (and
    /// their terms) to match the angle. Nothing changes if either weight
    /// overflows.
    pub fn update(&mut self, terms: &mut TermMap, variables: &[Variable]) -> Result<()> {
        let (left, right) = self.weigh(terms, variables)?;
        self.left_plate.set_weight(left);
        self.right_plate.set_weight(right);
        self.angle = tilt_angle(
            left.to_decimal(),
            right.to_decimal(),
            self.settings.max_weight,
            self.settings.max_angle,
        );
        let (left_location, right_location) = plate_locations(&self.settings, self.angle);
        self.left_plate.set_location(left_location, terms);
        self.right_plate.set_location(right_location, terms);
        Ok(())
    }
}

/// Locations of the (left, right) plates for a beam angle.
fn plate_locations(settings: &ScaleSettings, angle: f64) -> (Location, Location) {
    let hypotenuse = settings.beam_width / 2.0 - settings.plate_x_inset.abs();
    let dx = angle.cos() * hypotenuse;
    let dy = angle.sin() * hypotenuse;
    let pivot = settings.location;
    let support = settings.plate_support_height;
    (
        Location::new(pivot.x - dx, pivot.y - dy - support),
        Location::new(pivot.x + dx, pivot.y + dy - support),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fraction::ReducedFraction;
    use crate::term::{Term, TermId, TermValue};
    use crate::term_creator::CreatorId;

    const MAX_ANGLE: f64 = 0.4;
    const MAX_WEIGHT: f64 = 30.0;

    #[test]
    fn equal_weights_are_level() {
        assert_eq!(tilt_angle(5.0, 5.0, MAX_WEIGHT, MAX_ANGLE), 0.0);
    }

    #[test]
    fn angle_clamps_at_max_weight() {
        assert_eq!(tilt_angle(0.0, MAX_WEIGHT, MAX_WEIGHT, MAX_ANGLE), MAX_ANGLE);
        assert_eq!(tilt_angle(0.0, 2.0 * MAX_WEIGHT, MAX_WEIGHT, MAX_ANGLE), MAX_ANGLE);
        assert_eq!(tilt_angle(2.0 * MAX_WEIGHT, 0.0, MAX_WEIGHT, MAX_ANGLE), -MAX_ANGLE);
        assert!((tilt_angle(0.0, 15.0, MAX_WEIGHT, MAX_ANGLE) - MAX_ANGLE / 2.0).abs() < 1e-12);
    }

    #[test]
    fn level_plates_sit_symmetrically() {
        let scale = BalanceScale::new(ScaleSettings::default()).unwrap();
        let left = scale.plate(Side::Left).location();
        let right = scale.plate(Side::Right).location();
        assert!((left.x - (355.0 - 180.0)).abs() < 1e-9);
        assert!((right.x - (355.0 + 180.0)).abs() < 1e-9);
        assert!((left.y - 350.0).abs() < 1e-9);
        assert!((right.y - 350.0).abs() < 1e-9);
    }

    #[test]
    fn heavier_right_plate_drops_and_carries_its_terms() {
        let mut scale = BalanceScale::new(ScaleSettings::default()).unwrap();
        let mut terms = TermMap::new();
        terms.insert(
            TermId(1),
            Term {
                id: TermId(1),
                creator: CreatorId(0),
                value: TermValue::Constant {
                    constant_value: ReducedFraction::with_integer(5),
                },
                location: Location::zeros(),
                diameter: 10.0,
                locked_partner: None,
            },
        );
        scale
            .plate_mut(Side::Right)
            .add_term(TermId(1), 35, &mut terms)
            .unwrap();
        scale.update(&mut terms, &[]).unwrap();

        assert!(scale.angle() > 0.0);
        assert!(!scale.is_balanced());
        let right = scale.plate(Side::Right);
        assert!(right.location().y > scale.plate(Side::Left).location().y);
        assert_eq!(terms[&TermId(1)].location, right.location_for_cell(35).unwrap());
    }

    #[test]
    fn rejects_overlapping_plates() {
        let settings = ScaleSettings {
            plate_diameter: 400.0,
            ..ScaleSettings::default()
        };
        assert!(matches!(
            BalanceScale::new(settings),
            Err(EqualityError::InvalidSettings(_))
        ));
    }
}
