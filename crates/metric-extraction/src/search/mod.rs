//! Search queries and aggregates, resolved into the column-level structure
//! of the transactions dataset.
//!
//! Resolution happens in two steps: `parse_query` turns query text into a
//! tree of `SearchExpr`, and `resolve_conditions` maps search keys onto
//! dataset columns and typed values, producing `WhereCondition`s and the
//! `having` conditions of aggregate filters.

mod parse;
mod resolve;

pub use parse::{
    parse_query, Comparator, FilterValue, ParseError, SearchExpr, SearchFilter, MAX_GROUP_DEPTH,
};
pub use resolve::{resolve_aggregate, resolve_conditions, SearchResolver};

use serde_json::Value;

/// Left-hand side of a resolved condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Lhs {
    /// A plain dataset column, such as `release` or `measurements[lcp]`.
    Column(String),
    /// A value computed by a function over columns.
    Function(Function),
}

/// Function application, as used by aggregates and computed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Resolved function name, such as `count` or `quantile(0.95)`.
    pub function: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Column(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
}

/// Condition compares a left-hand side to a literal right-hand side.
/// The right-hand side of `In` and `NotIn` is an array.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Lhs,
    pub op: Op,
    pub rhs: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanCondition {
    pub op: BooleanOp,
    pub conditions: Vec<WhereCondition>,
}

/// WhereCondition is a node of a resolved filter: either a single
/// comparison, or a boolean combination of nested conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    Condition(Condition),
    Boolean(BooleanCondition),
}

/// ResolvedConditions of a query. Top-level `where` conditions are implicitly
/// joined by AND. Aggregate filters are hoisted into `having`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConditions {
    pub where_conditions: Vec<WhereCondition>,
    pub having_conditions: Vec<Condition>,
}

impl Lhs {
    pub fn column(name: impl Into<String>) -> Self {
        Lhs::Column(name.into())
    }
}

impl Op {
    /// The operator which matches exactly when this one does not.
    pub fn negated(self) -> Op {
        match self {
            Op::Eq => Op::Neq,
            Op::Neq => Op::Eq,
            Op::Gt => Op::Lte,
            Op::Gte => Op::Lt,
            Op::Lt => Op::Gte,
            Op::Lte => Op::Gt,
            Op::Like => Op::NotLike,
            Op::NotLike => Op::Like,
            Op::In => Op::NotIn,
            Op::NotIn => Op::In,
        }
    }
}
