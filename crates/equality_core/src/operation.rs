//! Universal operations: one operator and integer operand applied to every
//! term on the scale.

use crate::error::{EqualityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operands the user can pick. Zero is excluded, so dividing by the operand
/// is always defined.
pub const OPERAND_RANGE: (i64, i64) = (-10, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Divide,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Plus => '+',
            Operator::Minus => '\u{2212}',
            Operator::Times => '\u{00d7}',
            Operator::Divide => '\u{00f7}',
        }
    }

    pub fn is_additive(self) -> bool {
        matches!(self, Operator::Plus | Operator::Minus)
    }
}

impl FromStr for Operator {
    type Err = EqualityError;

    fn from_str(symbol: &str) -> Result<Self> {
        match symbol.trim() {
            "+" => Ok(Operator::Plus),
            "-" | "\u{2212}" => Ok(Operator::Minus),
            "*" | "\u{00d7}" => Ok(Operator::Times),
            "/" | "\u{00f7}" => Ok(Operator::Divide),
            other => Err(EqualityError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversalOperation {
    operator: Operator,
    operand: i64,
}

impl UniversalOperation {
    /// Fails with `InvalidOperand` for zero or an operand outside `OPERAND_RANGE`.
    pub fn new(operator: Operator, operand: i64) -> Result<Self> {
        let (min, max) = OPERAND_RANGE;
        if operand == 0 || operand < min || operand > max {
            return Err(EqualityError::InvalidOperand(operand));
        }
        Ok(Self { operator, operand })
    }

    /// Parses the operator symbol, then validates like `new`.
    pub fn parse(operator: &str, operand: i64) -> Result<Self> {
        Self::new(operator.parse()?, operand)
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand(&self) -> i64 {
        self.operand
    }
}

impl fmt::Display for UniversalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ascii_and_math_symbols() {
        assert_eq!("+".parse::<Operator>(), Ok(Operator::Plus));
        assert_eq!("\u{2212}".parse::<Operator>(), Ok(Operator::Minus));
        assert_eq!("*".parse::<Operator>(), Ok(Operator::Times));
        assert_eq!("\u{00f7}".parse::<Operator>(), Ok(Operator::Divide));
        assert_eq!(
            "^".parse::<Operator>(),
            Err(EqualityError::InvalidOperator("^".into()))
        );
    }

    #[test]
    fn operand_range_excludes_zero() {
        assert_eq!(
            UniversalOperation::new(Operator::Times, 0),
            Err(EqualityError::InvalidOperand(0))
        );
        assert_eq!(
            UniversalOperation::new(Operator::Divide, 0),
            Err(EqualityError::InvalidOperand(0))
        );
        assert_eq!(
            UniversalOperation::new(Operator::Plus, 11),
            Err(EqualityError::InvalidOperand(11))
        );
        let op = UniversalOperation::parse("/", -10).unwrap();
        assert_eq!(op.operator(), Operator::Divide);
        assert_eq!(op.operand(), -10);
        assert_eq!(op.to_string(), "\u{00f7} -10");
    }
}
