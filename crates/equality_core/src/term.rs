//! Terms, the units that sit in plate cells, and the variables they refer to.

use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::grid::Location;
use crate::term_creator::CreatorId;
use crate::traits::Movable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Diameter of terms in scenes that do not combine like terms.
pub const SMALL_TERM_DIAMETER: f64 = 45.0;
/// Diameter of terms in scenes that combine like terms.
pub const BIG_TERM_DIAMETER: f64 = 90.0;

/// Range and default of the variable `x`.
pub const X_RANGE: (i64, i64) = (-40, 40);
pub const X_DEFAULT: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermId(pub u64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub usize);

/// A named integer variable shared by every term that refers to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub symbol: String,
    value: i64,
    default_value: i64,
    min: i64,
    max: i64,
}

impl Variable {
    pub fn new(symbol: impl Into<String>, default_value: i64, min: i64, max: i64) -> Result<Self> {
        check_range(default_value, min, max)?;
        Ok(Self {
            symbol: symbol.into(),
            value: default_value,
            default_value,
            min,
            max,
        })
    }

    /// The variable `x` over `X_RANGE`.
    pub fn x() -> Self {
        Self {
            symbol: "x".to_string(),
            value: X_DEFAULT,
            default_value: X_DEFAULT,
            min: X_RANGE.0,
            max: X_RANGE.1,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    pub fn set_value(&mut self, value: i64) -> Result<()> {
        check_range(value, self.min, self.max)?;
        self.value = value;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.value = self.default_value;
    }
}

fn check_range(value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(EqualityError::VariableOutOfRange { value, min, max });
    }
    Ok(())
}

/// What a term is worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TermValue {
    Constant {
        constant_value: ReducedFraction,
    },
    Variable {
        symbol: String,
        coefficient: ReducedFraction,
        variable: VariableId,
    },
    /// A mystery object whose integer weight is hidden from the user.
    Mystery { name: String, weight: i64 },
}

impl TermValue {
    /// Weight on the scale, always computed from the current variable values.
    pub fn weight(&self, variables: &[Variable]) -> Result<ReducedFraction> {
        match self {
            TermValue::Constant { constant_value } => Ok(*constant_value),
            TermValue::Variable {
                coefficient,
                variable,
                ..
            } => {
                let value = variables
                    .get(variable.0)
                    .ok_or(EqualityError::VariableNotFound(variable.0))?
                    .value();
                coefficient.times_integer(value)
            }
            TermValue::Mystery { weight, .. } => Ok(ReducedFraction::with_integer(*weight)),
        }
    }

    /// The constant value or the coefficient. Mystery terms have neither.
    pub fn significant_value(&self) -> Option<ReducedFraction> {
        match self {
            TermValue::Constant { constant_value } => Some(*constant_value),
            TermValue::Variable { coefficient, .. } => Some(*coefficient),
            TermValue::Mystery { .. } => None,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            TermValue::Variable { symbol, .. } => Some(symbol),
            TermValue::Mystery { name, .. } => Some(name),
            TermValue::Constant { .. } => None,
        }
    }
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Constant { constant_value } => write!(f, "{constant_value}"),
            TermValue::Variable {
                symbol,
                coefficient,
                ..
            } => write!(f, "{coefficient}{symbol}"),
            TermValue::Mystery { name, .. } => write!(f, "{name}"),
        }
    }
}

/// One placed (or dragged) unit on the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub creator: CreatorId,
    pub value: TermValue,
    pub location: Location,
    pub diameter: f64,
    /// The mirrored term on the other plate while the scene is locked.
    pub locked_partner: Option<TermId>,
}

impl Term {
    pub fn weight(&self, variables: &[Variable]) -> Result<ReducedFraction> {
        self.value.weight(variables)
    }
}

/// Every live term in a scene, by id.
pub type TermMap = BTreeMap<TermId, Term>;

impl Movable for TermMap {
    fn move_to(&mut self, term: TermId, location: Location) {
        if let Some(term) = self.get_mut(&term) {
            term.location = location;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> ReducedFraction {
        ReducedFraction::new(n, d).unwrap()
    }

    #[test]
    fn variable_weight_follows_variable_value() {
        let mut variables = vec![Variable::x()];
        let value = TermValue::Variable {
            symbol: "x".into(),
            coefficient: frac(-3, 2),
            variable: VariableId(0),
        };
        assert_eq!(value.weight(&variables), Ok(frac(-3, 2)));
        variables[0].set_value(4).unwrap();
        assert_eq!(value.weight(&variables), Ok(ReducedFraction::with_integer(-6)));
    }

    #[test]
    fn weight_of_an_unknown_variable_is_an_error() {
        let value = TermValue::Variable {
            symbol: "y".into(),
            coefficient: ReducedFraction::with_integer(2),
            variable: VariableId(1),
        };
        assert_eq!(
            value.weight(&[Variable::x()]),
            Err(EqualityError::VariableNotFound(1))
        );
    }

    #[test]
    fn variable_rejects_values_outside_range() {
        let mut x = Variable::x();
        assert_eq!(
            x.set_value(41),
            Err(EqualityError::VariableOutOfRange {
                value: 41,
                min: -40,
                max: 40
            })
        );
        x.set_value(-40).unwrap();
        x.reset();
        assert_eq!(x.value(), X_DEFAULT);
    }

    #[test]
    fn mystery_weight_is_its_hidden_integer() {
        let dog = TermValue::Mystery {
            name: "dog".into(),
            weight: 11,
        };
        assert_eq!(dog.weight(&[]), Ok(ReducedFraction::with_integer(11)));
        assert_eq!(dog.significant_value(), None);
        assert_eq!(dog.symbol(), Some("dog"));
    }
}
