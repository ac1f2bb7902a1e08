use crate::term::TermId;
use crate::term_creator::CreatorId;
use thiserror::Error;

/// Everything that can go wrong inside the model.
///
/// Most variants are programmer errors (an invalid cell, a term that is not
/// where the caller thinks it is). A full grid is not an error at the grid
/// level; it is reported as `None` by the empty-cell queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EqualityError {
    #[error("invalid cell index: {0}")]
    InvalidCell(usize),

    #[error("row or column out of range: ({row}, {column})")]
    InvalidRowColumn { row: usize, column: usize },

    #[error("cell is occupied, index: {0}")]
    CellOccupied(usize),

    #[error("term not found: {0}")]
    TermNotFound(TermId),

    #[error("term is not on a plate: {0}")]
    TermNotOnPlate(TermId),

    #[error("term is already on a plate: {0}")]
    TermAlreadyOnPlate(TermId),

    #[error("term creator not found: {0}")]
    CreatorNotFound(CreatorId),

    #[error("{operation} is not supported by {creator}")]
    Unsupported {
        operation: &'static str,
        creator: String,
    },

    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    #[error("invalid operand: {0}")]
    InvalidOperand(i64),

    #[error("division by zero")]
    DivideByZero,

    #[error("fraction denominator must be non-zero")]
    ZeroDenominator,

    #[error("value does not fit in a 64-bit fraction")]
    Overflow,

    #[error("value {value} is out of range [{min}, {max}]")]
    VariableOutOfRange { value: i64, min: i64, max: i64 },

    #[error("variable not found: {0}")]
    VariableNotFound(usize),

    #[error("variable coefficient cannot be zero")]
    ZeroCoefficient,

    #[error("scene cannot be locked: {0}")]
    NotLockable(String),

    #[error("snapshot does not match scene: {0}")]
    SnapshotMismatch(String),

    #[error("snapshot slot out of range: {0}")]
    InvalidSnapshotSlot(usize),

    #[error("plate is full")]
    PlateFull,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, EqualityError>;
