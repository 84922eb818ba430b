// SPDX-License-Identifier: MIT

//! Branch conditions for YAML-defined graphs
//!
//! A condition is a small boolean expression over state fields:
//! - `binary_score == 'yes'`
//! - `approved` (truthiness of a field)
//! - `attempts < 3 and not (grade == 'funny' or skip)`
//! - `review.tags contains 'bug'`
//!
//! `not` binds tighter than `and`, which binds tighter than `or`.

mod ast;
mod evaluator;
mod lexer;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use parser::{parse, ConditionError};
