//! Term creators: one per "kind of term" on each side of the scale.
//!
//! A creator knows how to build terms of its kind, how to combine two of
//! them, and how a universal operation changes one. It also keeps the ids of
//! the terms it created. The terms themselves, and the plates, are owned by
//! the `Scene`, which calls into the creator for every value decision and
//! then performs the mutation.
//!
//! The three kinds are a closed set. Mystery creators (the Basics screen)
//! cannot combine, copy, or take part in universal operations; those calls
//! return `EqualityError::Unsupported`.

use crate::balance_scale::Side;
use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::grid::Location;
use crate::operation::{Operator, UniversalOperation};
use crate::snapshot::TermRecord;
use crate::term::{Term, TermId, TermMap, TermValue, VariableId, SMALL_TERM_DIAMETER};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CreatorId(pub usize);

impl fmt::Display for CreatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "creator#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantTermKind {
    pub default_value: ReducedFraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableTermKind {
    pub symbol: String,
    pub variable: VariableId,
    pub default_coefficient: ReducedFraction,
}

/// An object with a fixed integer weight that the user has to discover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MysteryTermKind {
    pub name: String,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TermCreatorKind {
    Constant(ConstantTermKind),
    Variable(VariableTermKind),
    Mystery(MysteryTermKind),
}

impl TermCreatorKind {
    pub fn constant(value: i64) -> Self {
        TermCreatorKind::Constant(ConstantTermKind {
            default_value: ReducedFraction::with_integer(value),
        })
    }

    pub fn variable(symbol: impl Into<String>, variable: VariableId, coefficient: i64) -> Self {
        TermCreatorKind::Variable(VariableTermKind {
            symbol: symbol.into(),
            variable,
            default_coefficient: ReducedFraction::with_integer(coefficient),
        })
    }

    pub fn mystery(name: impl Into<String>, weight: i64) -> Self {
        TermCreatorKind::Mystery(MysteryTermKind {
            name: name.into(),
            weight,
        })
    }
}

/// Per-creator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreatorOptions {
    /// Terms placed on the plate when the scene is built or reset.
    pub initial_number_of_terms_on_plate: usize,
    /// Whether like terms share one cell and combine when dropped on it.
    pub combine_like_terms: bool,
    pub diameter: f64,
}

impl Default for CreatorOptions {
    fn default() -> Self {
        Self {
            initial_number_of_terms_on_plate: 0,
            combine_like_terms: false,
            diameter: SMALL_TERM_DIAMETER,
        }
    }
}

/// Overrides for a term that is about to be created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TermOptions {
    /// Constant value or coefficient. Defaults to the creator's.
    pub value: Option<ReducedFraction>,
    pub diameter: Option<f64>,
}

impl TermOptions {
    pub fn with_value(value: ReducedFraction) -> Self {
        Self {
            value: Some(value),
            diameter: None,
        }
    }
}

/// What a universal operation does to one term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationOutcome {
    /// The operation has no effect on this term.
    Unchanged,
    /// The term is replaced by one with this constant value or coefficient.
    Replace(ReducedFraction),
    /// The term's value became zero; it disappears.
    SumToZero,
}

#[derive(Debug, Clone)]
pub struct TermCreator {
    id: CreatorId,
    side: Side,
    kind: TermCreatorKind,
    options: CreatorOptions,
    inverse: Option<CreatorId>,
    equivalent: Option<CreatorId>,
    like_terms_cell: Option<usize>,
    /// Where new terms appear before they are dragged. Set by the view.
    location: Location,
    all_terms: Vec<TermId>,
    terms_on_plate: Vec<TermId>,
}

impl TermCreator {
    pub fn new(id: CreatorId, side: Side, kind: TermCreatorKind, options: CreatorOptions) -> Self {
        Self {
            id,
            side,
            kind,
            options,
            inverse: None,
            equivalent: None,
            like_terms_cell: None,
            location: Location::zeros(),
            all_terms: Vec::new(),
            terms_on_plate: Vec::new(),
        }
    }

    pub fn id(&self) -> CreatorId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> &TermCreatorKind {
        &self.kind
    }

    pub fn options(&self) -> &CreatorOptions {
        &self.options
    }

    pub fn combine_like_terms(&self) -> bool {
        self.options.combine_like_terms
    }

    pub fn inverse(&self) -> Option<CreatorId> {
        self.inverse
    }

    pub fn equivalent(&self) -> Option<CreatorId> {
        self.equivalent
    }

    pub fn like_terms_cell(&self) -> Option<usize> {
        self.like_terms_cell
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub(crate) fn set_inverse(&mut self, inverse: CreatorId) {
        self.inverse = Some(inverse);
    }

    pub(crate) fn set_equivalent(&mut self, equivalent: CreatorId) {
        self.equivalent = Some(equivalent);
    }

    pub(crate) fn set_like_terms_cell(&mut self, cell: usize) {
        self.like_terms_cell = Some(cell);
    }

    /// Human-readable description, e.g. `-1`, `x`, `dog`.
    pub fn name(&self) -> String {
        match &self.kind {
            TermCreatorKind::Constant(kind) => kind.default_value.to_string(),
            TermCreatorKind::Variable(kind) => {
                let c = kind.default_coefficient;
                if c.is_one() {
                    kind.symbol.clone()
                } else if c == ReducedFraction::with_integer(-1) {
                    format!("-{}", kind.symbol)
                } else {
                    format!("{c}{}", kind.symbol)
                }
            }
            TermCreatorKind::Mystery(kind) => kind.name.clone(),
        }
    }

    fn unsupported(&self, operation: &'static str) -> EqualityError {
        EqualityError::Unsupported {
            operation,
            creator: self.name(),
        }
    }

    /// Default constant value or coefficient.
    pub fn default_value(&self) -> Option<ReducedFraction> {
        match &self.kind {
            TermCreatorKind::Constant(kind) => Some(kind.default_value),
            TermCreatorKind::Variable(kind) => Some(kind.default_coefficient),
            TermCreatorKind::Mystery(_) => None,
        }
    }

    /// Sign of the terms this creator makes by default. Mystery objects are positive.
    pub fn default_sign(&self) -> i32 {
        self.default_value().map_or(1, ReducedFraction::sign)
    }

    /// Whether a term with this value belongs to this creator rather than to its inverse.
    pub fn owns_sign(&self, value: ReducedFraction) -> bool {
        value.sign() == self.default_sign()
    }

    /// Same kind (and variable), values are negatives. Mystery objects have no inverse.
    pub fn is_inverse_of(&self, other: &TermCreator) -> bool {
        match (&self.kind, &other.kind) {
            (TermCreatorKind::Constant(a), TermCreatorKind::Constant(b)) => {
                a.default_value.negated() == Ok(b.default_value)
            }
            (TermCreatorKind::Variable(a), TermCreatorKind::Variable(b)) => {
                a.variable == b.variable
                    && a.default_coefficient.negated() == Ok(b.default_coefficient)
            }
            _ => false,
        }
    }

    /// Same kind (and variable) and same default value. Pairs the left and
    /// right creators for the lock feature. Mystery objects have no equivalent.
    pub fn is_equivalent_to(&self, other: &TermCreator) -> bool {
        match (&self.kind, &other.kind) {
            (TermCreatorKind::Constant(a), TermCreatorKind::Constant(b)) => {
                a.default_value == b.default_value
            }
            (TermCreatorKind::Variable(a), TermCreatorKind::Variable(b)) => {
                a.variable == b.variable && a.default_coefficient == b.default_coefficient
            }
            _ => false,
        }
    }

    /// Builds the value of a new term. `value` overrides the default constant
    /// value or coefficient; mystery terms cannot be overridden.
    pub fn term_value(&self, value: Option<ReducedFraction>) -> Result<TermValue> {
        match &self.kind {
            TermCreatorKind::Constant(kind) => Ok(TermValue::Constant {
                constant_value: value.unwrap_or(kind.default_value),
            }),
            TermCreatorKind::Variable(kind) => {
                let coefficient = value.unwrap_or(kind.default_coefficient);
                if coefficient.is_zero() {
                    return Err(EqualityError::ZeroCoefficient);
                }
                Ok(TermValue::Variable {
                    symbol: kind.symbol.clone(),
                    coefficient,
                    variable: kind.variable,
                })
            }
            TermCreatorKind::Mystery(kind) => match value {
                Some(_) => Err(self.unsupported("value override")),
                None => Ok(TermValue::Mystery {
                    name: kind.name.clone(),
                    weight: kind.weight,
                }),
            },
        }
    }

    /// Instantiates a term of this kind at the creator's location.
    pub fn create_term(&self, id: TermId, options: TermOptions) -> Result<Term> {
        Ok(Term {
            id,
            creator: self.id,
            value: self.term_value(options.value)?,
            location: self.location,
            diameter: options.diameter.unwrap_or(self.options.diameter),
            locked_partner: None,
        })
    }

    /// Value of the term that results from combining two like terms, `None`
    /// if they sum to zero. Which creator owns the result is decided by sign;
    /// see `owns_sign`.
    pub fn combined_value(&self, term1: &Term, term2: &Term) -> Result<Option<ReducedFraction>> {
        let sum = match (&self.kind, &term1.value, &term2.value) {
            (
                TermCreatorKind::Constant(_),
                TermValue::Constant { constant_value: a },
                TermValue::Constant { constant_value: b },
            ) => a.plus(*b)?,
            (
                TermCreatorKind::Variable(kind),
                TermValue::Variable {
                    coefficient: a,
                    variable: va,
                    ..
                },
                TermValue::Variable {
                    coefficient: b,
                    variable: vb,
                    ..
                },
            ) if *va == kind.variable && *vb == kind.variable => a.plus(*b)?,
            _ => return Err(self.unsupported("combine_terms")),
        };
        Ok(if sum.is_zero() { None } else { Some(sum) })
    }

    /// Value for a copy of `term`.
    pub fn copy_value(&self, term: &Term) -> Result<ReducedFraction> {
        match (&self.kind, term.value.significant_value()) {
            (TermCreatorKind::Mystery(_), _) | (_, None) => Err(self.unsupported("copy_term")),
            (_, Some(value)) => Ok(value),
        }
    }

    /// Universal operations are only defined when like terms are combined,
    /// and never for mystery objects.
    pub fn check_supports_operations(&self) -> Result<()> {
        if matches!(self.kind, TermCreatorKind::Mystery(_)) || !self.options.combine_like_terms {
            return Err(self.unsupported("apply_operation"));
        }
        Ok(())
    }

    /// How a universal operation changes one of this creator's terms.
    pub fn operation_outcome(
        &self,
        operation: &UniversalOperation,
        term: &Term,
    ) -> Result<OperationOutcome> {
        self.check_supports_operations()?;
        let operand = operation.operand();
        let value = match (&self.kind, &term.value) {
            (TermCreatorKind::Constant(_), TermValue::Constant { constant_value }) => {
                match operation.operator() {
                    Operator::Plus => constant_value.plus_integer(operand)?,
                    Operator::Minus => constant_value.minus_integer(operand)?,
                    Operator::Times => constant_value.times_integer(operand)?,
                    Operator::Divide => constant_value.divided_by_integer(operand)?,
                }
            }
            (TermCreatorKind::Variable(_), TermValue::Variable { coefficient, .. }) => {
                // adding a number to every term does not change a coefficient
                if operation.operator().is_additive() {
                    return Ok(OperationOutcome::Unchanged);
                }
                match operation.operator() {
                    Operator::Divide => coefficient.divided_by_integer(operand)?,
                    _ => coefficient.times_integer(operand)?,
                }
            }
            _ => return Err(EqualityError::TermNotFound(term.id)),
        };
        Ok(if value.is_zero() {
            OperationOutcome::SumToZero
        } else {
            OperationOutcome::Replace(value)
        })
    }

    /// Value of a term that a universal operation creates directly on the
    /// plate. Only `+`/`-` on a constant creator create anything, and only
    /// when the shared like-terms cell is empty and the result has this
    /// creator's sign.
    pub fn plate_operation_value(
        &self,
        operation: &UniversalOperation,
        like_terms_cell_is_empty: bool,
    ) -> Result<Option<ReducedFraction>> {
        self.check_supports_operations()?;
        if !matches!(self.kind, TermCreatorKind::Constant(_))
            || self.like_terms_cell.is_none()
            || !like_terms_cell_is_empty
        {
            return Ok(None);
        }
        let value = match operation.operator() {
            Operator::Plus => ReducedFraction::with_integer(operation.operand()),
            Operator::Minus => ReducedFraction::with_integer(-operation.operand()),
            Operator::Times | Operator::Divide => return Ok(None),
        };
        Ok(self.owns_sign(value).then_some(value))
    }

    /// Describes a term on the plate for a snapshot.
    pub fn snapshot_record(&self, term: &Term, cell_index: usize) -> Result<TermRecord> {
        match &term.value {
            TermValue::Constant { constant_value } => Ok(TermRecord::Constant {
                cell_index,
                constant_value: *constant_value,
            }),
            TermValue::Variable { coefficient, .. } => Ok(TermRecord::Variable {
                cell_index,
                coefficient: *coefficient,
            }),
            TermValue::Mystery { .. } => Ok(TermRecord::Mystery { cell_index }),
        }
    }

    /// Checks that a record was made by a creator of this kind.
    pub fn check_record(&self, record: &TermRecord) -> Result<()> {
        let matches = matches!(
            (&self.kind, record),
            (TermCreatorKind::Constant(_), TermRecord::Constant { .. })
                | (TermCreatorKind::Variable(_), TermRecord::Variable { .. })
                | (TermCreatorKind::Mystery(_), TermRecord::Mystery { .. })
        );
        if !matches {
            return Err(EqualityError::SnapshotMismatch(format!(
                "record {record:?} does not belong to {}",
                self.name()
            )));
        }
        if let TermRecord::Variable { coefficient, .. } = record {
            if coefficient.is_zero() {
                return Err(EqualityError::ZeroCoefficient);
            }
        }
        Ok(())
    }

    pub fn all_terms(&self) -> &[TermId] {
        &self.all_terms
    }

    pub fn terms_on_plate(&self) -> &[TermId] {
        &self.terms_on_plate
    }

    pub fn number_of_terms_on_plate(&self) -> usize {
        self.terms_on_plate.len()
    }

    pub fn is_term_on_plate(&self, term: TermId) -> bool {
        self.terms_on_plate.contains(&term)
    }

    /// Sum of constant values or coefficients on the plate.
    pub fn sum_of_values_on_plate(&self, terms: &TermMap) -> Result<ReducedFraction> {
        self.terms_on_plate
            .iter()
            .filter_map(|id| terms.get(id))
            .filter_map(|term| term.value.significant_value())
            .try_fold(ReducedFraction::zero(), ReducedFraction::plus)
    }

    pub(crate) fn track(&mut self, term: TermId) {
        debug_assert!(!self.all_terms.contains(&term));
        self.all_terms.push(term);
    }

    pub(crate) fn untrack(&mut self, term: TermId) {
        self.all_terms.retain(|t| *t != term);
        self.terms_on_plate.retain(|t| *t != term);
    }

    pub(crate) fn mark_on_plate(&mut self, term: TermId) {
        debug_assert!(self.all_terms.contains(&term));
        if !self.terms_on_plate.contains(&term) {
            self.terms_on_plate.push(term);
        }
    }

    pub(crate) fn mark_off_plate(&mut self, term: TermId) {
        self.terms_on_plate.retain(|t| *t != term);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creator(id: usize, kind: TermCreatorKind) -> TermCreator {
        TermCreator::new(
            CreatorId(id),
            Side::Left,
            kind,
            CreatorOptions {
                combine_like_terms: true,
                ..CreatorOptions::default()
            },
        )
    }

    fn constant(id: u64, value: i64) -> Term {
        creator(0, TermCreatorKind::constant(1))
            .create_term(
                TermId(id),
                TermOptions::with_value(ReducedFraction::with_integer(value)),
            )
            .unwrap()
    }

    fn op(symbol: &str, operand: i64) -> UniversalOperation {
        UniversalOperation::parse(symbol, operand).unwrap()
    }

    #[test]
    fn inverse_and_equivalent_relations() {
        let one = creator(0, TermCreatorKind::constant(1));
        let minus_one = creator(1, TermCreatorKind::constant(-1));
        let x = creator(2, TermCreatorKind::variable("x", VariableId(0), 1));
        let minus_x = creator(3, TermCreatorKind::variable("x", VariableId(0), -1));
        let dog = creator(4, TermCreatorKind::mystery("dog", 11));

        assert!(one.is_inverse_of(&minus_one));
        assert!(x.is_inverse_of(&minus_x));
        assert!(!one.is_inverse_of(&minus_x));
        assert!(!dog.is_inverse_of(&dog));

        assert!(one.is_equivalent_to(&creator(9, TermCreatorKind::constant(1))));
        assert!(!one.is_equivalent_to(&minus_one));
        assert!(!dog.is_equivalent_to(&dog.clone()));
        assert_eq!(minus_x.name(), "-x");
    }

    #[test]
    fn combined_value_sums_and_annihilates() {
        let one = creator(0, TermCreatorKind::constant(1));
        assert_eq!(
            one.combined_value(&constant(1, 3), &constant(2, -5)).unwrap(),
            Some(ReducedFraction::with_integer(-2))
        );
        assert_eq!(one.combined_value(&constant(1, 4), &constant(2, -4)).unwrap(), None);
        assert!(!one.owns_sign(ReducedFraction::with_integer(-2)));
    }

    #[test]
    fn mystery_creators_reject_combination_and_operations() {
        let dog = creator(0, TermCreatorKind::mystery("dog", 11));
        let term = dog.create_term(TermId(1), TermOptions::default()).unwrap();
        assert!(matches!(
            dog.combined_value(&term, &term),
            Err(EqualityError::Unsupported { operation: "combine_terms", .. })
        ));
        assert!(matches!(dog.copy_value(&term), Err(EqualityError::Unsupported { .. })));
        assert!(matches!(
            dog.operation_outcome(&op("*", 2), &term),
            Err(EqualityError::Unsupported { .. })
        ));
        assert!(matches!(
            dog.plate_operation_value(&op("+", 2), true),
            Err(EqualityError::Unsupported { .. })
        ));
    }

    #[test]
    fn constant_operation_outcomes() {
        let one = creator(0, TermCreatorKind::constant(1));
        let three = constant(1, 3);
        assert_eq!(
            one.operation_outcome(&op("*", 2), &three).unwrap(),
            OperationOutcome::Replace(ReducedFraction::with_integer(6))
        );
        assert_eq!(
            one.operation_outcome(&op("/", 2), &three).unwrap(),
            OperationOutcome::Replace(ReducedFraction::new(3, 2).unwrap())
        );
        assert_eq!(
            one.operation_outcome(&op("-", 3), &three).unwrap(),
            OperationOutcome::SumToZero
        );
    }

    #[test]
    fn operations_that_overflow_are_errors() {
        let one = creator(0, TermCreatorKind::constant(1));
        let big = constant(1, 10i64.pow(18));
        assert_eq!(
            one.operation_outcome(&op("*", 10), &big),
            Err(EqualityError::Overflow)
        );
        assert_eq!(
            one.combined_value(&constant(2, i64::MAX), &constant(3, 1)),
            Err(EqualityError::Overflow)
        );
    }

    #[test]
    fn variable_terms_ignore_addition() {
        let x = creator(0, TermCreatorKind::variable("x", VariableId(0), 1));
        let term = x.create_term(TermId(1), TermOptions::default()).unwrap();
        assert_eq!(
            x.operation_outcome(&op("+", 5), &term).unwrap(),
            OperationOutcome::Unchanged
        );
        assert_eq!(
            x.operation_outcome(&op("*", -3), &term).unwrap(),
            OperationOutcome::Replace(ReducedFraction::with_integer(-3))
        );
        assert_eq!(
            x.term_value(Some(ReducedFraction::zero())),
            Err(EqualityError::ZeroCoefficient)
        );
    }

    #[test]
    fn plate_operation_creates_only_matching_sign() {
        let mut one = creator(0, TermCreatorKind::constant(1));
        let mut minus_one = creator(1, TermCreatorKind::constant(-1));
        assert_eq!(one.plate_operation_value(&op("+", 2), true).unwrap(), None);

        one.set_like_terms_cell(30);
        minus_one.set_like_terms_cell(30);
        assert_eq!(
            one.plate_operation_value(&op("+", 2), true).unwrap(),
            Some(ReducedFraction::with_integer(2))
        );
        assert_eq!(minus_one.plate_operation_value(&op("+", 2), true).unwrap(), None);
        assert_eq!(
            minus_one.plate_operation_value(&op("-", 2), true).unwrap(),
            Some(ReducedFraction::with_integer(-2))
        );
        assert_eq!(one.plate_operation_value(&op("+", 2), false).unwrap(), None);
        assert_eq!(one.plate_operation_value(&op("*", 2), true).unwrap(), None);
    }

    #[test]
    fn operations_require_like_term_combination() {
        let one = TermCreator::new(
            CreatorId(0),
            Side::Right,
            TermCreatorKind::constant(1),
            CreatorOptions::default(),
        );
        assert!(one.check_supports_operations().is_err());
    }
}
