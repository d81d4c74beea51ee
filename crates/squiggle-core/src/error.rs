//! Error types for the Squiggle distribution planner.
use thiserror::Error;

use crate::types::Amount;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("invalid date: {0}")] InvalidDate(String),
    #[error("invalid decimal literal: {0}")] InvalidDecimal(String),
    #[error("invalid address: {0}")] InvalidAddress(String),
    #[error("arithmetic overflow")] Overflow,
    #[error("arithmetic underflow")] Underflow,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// An allocation is missing a field its variant requires, or carries
    /// a value outside the range its variant allows.
    #[error("schema mismatch in {id}: expected {expected}, got {actual}")]
    SchemaMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("duplicate allocation id: {0}")]
    DuplicateId(String),

    #[error("unit conversion in {id}: {source}")]
    Unit { id: String, source: UnitError },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Obligations meet or exceed the configured supply.
    #[error("supply exceeded: allocations must stay below {total_supply} but sum to {allocated}")]
    SupplyExceeded { total_supply: Amount, allocated: Amount },

    /// A target or forward reference was never bound to an earlier action.
    #[error("unresolved reference from {id}")]
    UnresolvedReference { id: String },

    /// Mismatched action shape, such as parallel sequences of unequal length.
    #[error("schema mismatch in {id}: expected {expected}, got {actual}")]
    SchemaMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// A target was bound a second time.
    #[error("target already bound: {id}")]
    AlreadyBound { id: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Error, Debug)]
pub enum SquiggleError {
    #[error(transparent)] Unit(#[from] UnitError),
    #[error(transparent)] Model(#[from] ModelError),
    #[error(transparent)] Plan(#[from] PlanError),
}
